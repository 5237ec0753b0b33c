use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no usable HRIR recordings found in {0}")]
    HrirLoad(PathBuf),

    #[error("HRIR database queried before load()")]
    NotLoaded,

    #[error("project file not found: {0}")]
    MissingProject(PathBuf),

    #[error("source file not found: {0}")]
    MissingSource(PathBuf),

    #[error("source rate {source_rate} Hz does not match project rate {project_rate} Hz")]
    SampleRateMismatch { source_rate: u32, project_rate: u32 },

    #[error("unknown output format '{0}'")]
    UnknownFormat(String),

    #[error("unknown trajectory preset '{0}'")]
    UnknownPreset(String),

    #[error("unsupported media file: {0}")]
    UnsupportedMedia(PathBuf),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("filter design error: {0}")]
    Filter(String),

    #[error("object '{name}': {source}")]
    Object {
        name: String,
        #[source]
        source: Box<BackendError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("project parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Attach the owning object's name to a per-object failure.
    pub fn for_object(self, name: &str) -> Self {
        BackendError::Object {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
