use thiserror::Error;

/// Universal error type for EPS operations.
///
/// Covers failures in reading, prescanning, interpreting and rasterizing
/// EPS documents. The top-level renderer never surfaces these to its caller;
/// they travel between tiers and end up in the log.
#[derive(Error, Debug)]
pub enum EpsError {
    /// Reading the source stream or a scratch file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input contained no bytes
    #[error("Empty EPS document")]
    EmptyDocument,

    /// A binary EPS header pointed outside the file
    #[error("Invalid binary EPS header: {0}")]
    InvalidBinaryHeader(String),

    /// A malformed DSC comment line
    #[error("Malformed DSC comment: {0}")]
    MalformedComment(String),

    /// Raster surface allocation or painting failed
    #[error("Rendering error: {0}")]
    RenderingError(String),

    /// Decoding or encoding an image failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The native engine failed to produce output
    #[error("Native engine error: {0}")]
    NativeEngine(String),
}

impl EpsError {
    /// Create a rendering error.
    pub fn rendering(message: impl Into<String>) -> Self {
        EpsError::RenderingError(message.into())
    }

    /// Create a malformed-comment error.
    pub fn malformed(message: impl Into<String>) -> Self {
        EpsError::MalformedComment(message.into())
    }

    /// Create a native engine error.
    pub fn native(message: impl Into<String>) -> Self {
        EpsError::NativeEngine(message.into())
    }
}

/// Result type alias for EPS operations
pub type EpsResult<T> = Result<T, EpsError>;
