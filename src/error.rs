use thiserror::Error;

use crate::state::TransitionError;

/// Application-level errors using thiserror for structured error handling.
///
/// Each collaborator (capture, OCR, template matching, mouse input) has its
/// own enum; `WorkerError` wraps them so a tool iteration can use `?` on all
/// of them. The binary composes everything with anyhow.

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors")]
    MonitorsUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("No monitors found")]
    NoMonitors,

    #[error("Failed to capture screen")]
    CaptureFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Capture region {region:?} lies outside the {width}x{height} screen")]
    OutOfBounds {
        region: [u32; 4],
        width: u32,
        height: u32,
    },

    #[error("Capture region has zero size: {0:?}")]
    EmptyRegion([u32; 4]),

    #[error("Failed to open screenshot: {path}")]
    ImageLoadFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine")]
    InitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to perform OCR on image")]
    RecognitionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to write OCR scratch image")]
    ScratchImageFailed(#[source] image::ImageError),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to load template image: {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Template image is empty: {0}")]
    EmptyTemplate(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to simulate {action} at ({x}, {y})")]
    SimulateFailed {
        action: &'static str,
        x: i32,
        y: i32,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Could not locate the current executable")]
    ExecutableNotFound(#[source] std::io::Error),

    #[error("Failed to spawn {tool}")]
    SpawnFailed {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PickError {
    #[error("Unknown config field: {0}")]
    UnknownField(String),

    #[error("'{0}' is not a screen position or region")]
    NotPickable(String),

    #[error("'{field}' is a list; give an entry number from 1 to {len}")]
    NeedsIndex { field: String, len: usize },

    #[error("'{field}' has {len} entries, there is no entry {index}")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },

    #[error("'{0}' is a single value and takes no entry number")]
    UnexpectedIndex(String),

    #[error("'{field}' needs a {expected}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("Selection cancelled")]
    Cancelled,

    #[error("Mouse listener failed: {0}")]
    ListenFailed(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Failed to start worker thread")]
    ThreadSpawnFailed(#[source] std::io::Error),

    #[error("Worker thread panicked")]
    Panicked,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
