pub mod audio_io;
pub mod config;
pub mod dsp;
pub mod error;
pub mod extract;
pub mod hrtf;
pub mod kdtree;
pub mod math;
pub mod models;
pub mod processor;
pub mod renderer;
pub mod trajectory;

pub use error::{BackendError, Result};
pub use hrtf::HrtfEngine;
pub use models::{ObjectData, Physics, ProjectData, Role, Stem};
pub use renderer::{render_project, OutputFormat};
pub use trajectory::{TrajectoryEngine, TrajectoryPreset};
