//! Testing utilities and harness for hookrt

pub mod recording_renderer;
pub mod testing;

// Re-export testing utilities
pub use recording_renderer::RecordingRenderer;
pub use testing::*;

pub mod prelude {
    pub use crate::recording_renderer::RecordingRenderer;
    pub use crate::testing::*;
    pub use hookrt_core::{use_state, use_state_with, Action, HookError, OrderViolation, Setter};
}
