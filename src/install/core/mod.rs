//! Shared async plumbing for the installation engine
//!
//! Boxed futures for dyn-compatible trait seams and the event channel the
//! orchestration worker uses to report status and progress to the UI side.

mod async_task;
mod progress;

pub use async_task::AsyncTask;
pub use progress::{EngineEvent, EventSink};
