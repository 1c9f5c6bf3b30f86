//! Error types for the decision engine.
//!
//! Everything on the per-tick decision path degrades to the safest
//! known-good behavior instead of returning errors; the variants here
//! cover training, persistence and configuration, where the caller can
//! actually react.

use std::fmt;
use std::path::Path;

use crate::config::ConfigError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    /// Training was requested with too few durable samples. Recoverable:
    /// keep collecting feedback and retry.
    InsufficientData { have: usize, need: usize },

    /// No usable persisted model (missing, bad magic, or undecodable).
    /// Recovered by falling back to rule-only decisions.
    ModelUnavailable { reason: String },

    /// Persistence I/O failed. A soft warning: in-memory state stays
    /// valid and the tick loop continues.
    StorageWriteFailed {
        path: String,
        source: std::io::Error,
    },

    /// Malformed configuration file.
    Config(ConfigError),
}

impl EngineError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        EngineError::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn storage(path: &Path, source: std::io::Error) -> Self {
        EngineError::StorageWriteFailed {
            path: path.display().to_string(),
            source,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InsufficientData { have, need } => write!(
                f,
                "Insufficient training data: {have} samples stored, {need} required"
            ),
            EngineError::ModelUnavailable { reason } => {
                write!(f, "No usable model: {reason}")
            }
            EngineError::StorageWriteFailed { path, source } => {
                write!(f, "Failed to write {path}: {source}")
            }
            EngineError::Config(err) => write!(f, "Configuration error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::StorageWriteFailed { source, .. } => Some(source),
            EngineError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        EngineError::Config(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_shortfall() {
        let err = EngineError::InsufficientData { have: 5, need: 20 };
        let text = err.to_string();
        assert!(text.contains('5'));
        assert!(text.contains("20"));
    }

    #[test]
    fn storage_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = EngineError::storage(Path::new("/data/x.bin"), io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/data/x.bin"));
    }
}
