//! Error types for medscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Session lifecycle errors
    #[error("Invalid session state: {message}")]
    InvalidState { message: String },

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    // Voiceprint enrollment errors
    #[error("Voiceprint enrollment failed: {message}")]
    Enrollment { message: String },

    // Transcription / identification provider errors
    #[error("Provider error: {message}")]
    Provider { message: String, transient: bool },

    // Export errors
    #[error("Export destination already exists: {path}")]
    ExportConflict { path: String },

    // Blob storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    // Repository errors
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn enrollment(message: impl Into<String>) -> Self {
        Self::Enrollment {
            message: message.into(),
        }
    }

    pub fn provider_transient(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            transient: true,
        }
    }

    pub fn provider_fatal(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            transient: false,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Whether this error is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Provider { transient: true, .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
