use crate::action::Action;
use glam::Vec3;
use std::collections::BTreeSet;

/// Speed multiplier applied while [`Action::Boost`] is held.
pub const BOOST_MULTIPLIER: f32 = 3.0;

/// Movement requested for one frame, in camera space.
///
/// `axes.x` is right(+)/left(-), `axes.y` up(+)/down(-), `axes.z`
/// forward(+)/backward(-). Each component is -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveIntent {
    pub axes: Vec3,
    pub speed_multiplier: f32,
}

impl MoveIntent {
    pub fn is_idle(&self) -> bool {
        self.axes == Vec3::ZERO
    }
}

/// Actions currently held down.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: BTreeSet<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. Returns `true` only on the rising edge, so key repeat
    /// does not re-trigger one-shot actions.
    pub fn press(&mut self, action: Action) -> bool {
        let rising = self.held.insert(action);
        if rising {
            tracing::trace!("pressed {action:?}");
        }
        rising
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// Drop everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn movement(&self) -> MoveIntent {
        let axis = |pos: Action, neg: Action| {
            (self.is_held(pos) as i32 - self.is_held(neg) as i32) as f32
        };
        MoveIntent {
            axes: Vec3::new(
                axis(Action::MoveRight, Action::MoveLeft),
                axis(Action::MoveUp, Action::MoveDown),
                axis(Action::MoveForward, Action::MoveBackward),
            ),
            speed_multiplier: if self.is_held(Action::Boost) {
                BOOST_MULTIPLIER
            } else {
                1.0
            },
        }
    }
}
