//! State management-specific error types.

use std::path::PathBuf;

/// Errors that can occur during state operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A dropped or typed path could not be read
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// System clipboard unavailable or empty
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    /// A step transition is still running
    #[error("Step transition already in progress")]
    TransitionInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_display() {
        let error = StateError::FileRead {
            path: PathBuf::from("/tmp/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        assert!(error.to_string().contains("/tmp/missing.png"));
        assert!(error.to_string().contains("No such file"));

        let error = StateError::Clipboard("no display".to_string());
        assert!(error.to_string().contains("Clipboard unavailable"));
        assert!(error.to_string().contains("no display"));

        let error = StateError::TransitionInProgress;
        assert!(error.to_string().contains("in progress"));
    }
}
