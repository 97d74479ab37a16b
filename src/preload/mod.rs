// Preload module
// Bulk resolution of a vocabulary with progress reporting

pub mod orchestrator;
pub mod progress;

pub use orchestrator::{PreloadConfig, PreloadOrchestrator};
pub use progress::{Phase, PreloadMethod, PreloadResult, ProgressEvent};
