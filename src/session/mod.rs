pub mod controller;
mod loop_worker;
pub mod recorder;

pub use controller::{ModelLoader, PracticeController, PracticeDeps};
pub use recorder::{finalize, SessionRecorder, SESSION_MINUTES};
