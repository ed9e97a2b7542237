use thiserror::Error;

/// All errors produced by earshot-core.
#[derive(Debug, Error)]
pub enum EarshotError {
    #[error("initialization already in progress")]
    AlreadyInitializing,

    #[error("recognizer has already been initialized")]
    AlreadyInitialized,

    #[error("recognizer is not initialized")]
    NotInitialized,

    #[error("recognition is already running")]
    AlreadyRunning,

    #[error("failed to load model from {path}: {reason}")]
    ModelLoad {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("engine construction failed: {0}")]
    EngineConstruction(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EarshotError>;
