//! Viewer input: high-level actions and the set of actions currently held.
//!
//! # Invariants
//! - The viewer consumes actions, never raw key codes. Key mapping lives at the
//!   windowing edge.

pub mod action;
mod state;

pub use action::Action;
pub use state::{InputState, MoveIntent};
