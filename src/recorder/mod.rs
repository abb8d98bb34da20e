//! Recording session orchestration.

mod controller;
mod error;
mod status;

pub use controller::{ControllerSettings, RecordOptions, RecordingController};
pub use error::RecorderError;
pub use status::{format_duration, RecorderPhase, RecorderState, RecorderStatusHandle};
