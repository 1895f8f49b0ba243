//! Error types for the cloud renderer

use thiserror::Error;

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or running the renderer
#[derive(Error, Debug)]
pub enum Error {
    /// Shader stage failed to compile
    #[error("Shader compilation error ({stage}): {log}")]
    ShaderCompile { stage: &'static str, log: String },

    /// Program failed to link
    #[error("Program link error: {0}")]
    ProgramLink(String),

    /// A GL object could not be created
    #[error("Failed to create {what}: {reason}")]
    GlResource { what: &'static str, reason: String },

    /// Framebuffer status was not FRAMEBUFFER_COMPLETE after setup
    #[error("Framebuffer incomplete (status 0x{0:X})")]
    IncompleteFramebuffer(u32),

    /// Density grid dimensions must be positive multiples of the block size
    #[error("Invalid density resolution {xz}x{y}x{xz}: components must be positive multiples of {block}")]
    InvalidResolution { xz: u32, y: u32, block: u32 },

    /// Mesh arrays are inconsistent
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Operation not provided by this renderer
    #[error("{renderer} does not support {operation}")]
    Unsupported {
        renderer: String,
        operation: &'static str,
    },

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn gl(what: &'static str, reason: impl Into<String>) -> Self {
        Self::GlResource {
            what,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(renderer: &str, operation: &'static str) -> Self {
        Self::Unsupported {
            renderer: renderer.to_string(),
            operation,
        }
    }
}
