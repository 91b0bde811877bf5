//! Error types and handling for Handwave

/// Result type alias for Handwave operations
pub type Result<T> = std::result::Result<T, HandwaveError>;

/// Error types surfaced by construction, configuration and I/O paths.
///
/// Matching and lookup never produce these; they answer `false`/`None` instead.
#[derive(Debug, thiserror::Error)]
pub enum HandwaveError {
    /// I/O related errors (file operations, mmap, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Memory allocation or mapping failures
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A frame exceeds the fixed cardinality of the channel layout
    #[error("Capacity exceeded: {what} has {requested}, layout allows {available}")]
    Capacity {
        what: String,
        requested: usize,
        available: usize,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Platform-specific errors
    #[error("Platform error: {message}")]
    Platform { message: String },

    /// The external detector failed for one frame
    #[error("Detector error: {message}")]
    Detector { message: String },

    /// Pipeline control errors (invalid state transitions, worker failures)
    #[error("Pipeline error: {message}")]
    Pipeline { message: String },
}

impl HandwaveError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a capacity error
    pub fn capacity(what: impl Into<String>, requested: usize, available: usize) -> Self {
        Self::Capacity {
            what: what.into(),
            requested,
            available,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Create a detector error
    pub fn detector(message: impl Into<String>) -> Self {
        Self::Detector {
            message: message.into(),
        }
    }

    /// Create a pipeline error
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HandwaveError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<bincode::Error> for HandwaveError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(format!("Bincode error: {}", err))
    }
}

impl From<serde_json::Error> for HandwaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
