/// A high-level action produced by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Multiply movement speed while held.
    Boost,
    ToggleWireframe,
    ToggleOverlay,
    /// Put the camera back where it started.
    ResetCamera,
    Quit,
}

impl Action {
    /// Continuous actions apply every frame while held; the rest fire once per press.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            Action::MoveForward
                | Action::MoveBackward
                | Action::MoveLeft
                | Action::MoveRight
                | Action::MoveUp
                | Action::MoveDown
                | Action::Boost
        )
    }
}
