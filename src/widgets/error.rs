//! Widget-specific error types.

/// Errors surfaced by widget operations.
///
/// None of these are fatal: each one leaves the widget in a stable state the
/// host can retry from.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// A step controller needs at least one step
    #[error("A multi-step form needs at least one step")]
    NoSteps,

    /// Timers can only be scheduled from inside an async runtime
    #[error("No async runtime available to schedule timer: {0}")]
    NoRuntime(String),

    /// Batch admission failed because the file count limit would be exceeded
    #[error("Maximum {max} files allowed")]
    TooManyFiles { max: usize },

    /// The accept pattern could not be compiled
    #[error("Invalid accept pattern '{pattern}': {message}")]
    InvalidAcceptPattern { pattern: String, message: String },

    /// Resend was requested before the countdown expired
    #[error("Resend available in {remaining_secs}s")]
    ResendUnavailable { remaining_secs: u32 },

    /// Manual verification requires every cell to be filled
    #[error("Code is incomplete")]
    IncompleteCode,

    /// Column identifier does not exist in the table
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Page size is not part of the page size menu
    #[error("Page size {0} is not available")]
    InvalidPageSize(usize),

    /// A table row could not be converted into searchable text
    #[error("Failed to index table row: {0}")]
    RowSerialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_error_display() {
        let error = WidgetError::TooManyFiles { max: 5 };
        assert_eq!(error.to_string(), "Maximum 5 files allowed");

        let error = WidgetError::ResendUnavailable { remaining_secs: 42 };
        assert!(error.to_string().contains("42s"));

        let error = WidgetError::InvalidAcceptPattern {
            pattern: "image/[".to_string(),
            message: "bad".to_string(),
        };
        assert!(error.to_string().contains("image/["));

        let error = WidgetError::UnknownColumn("email".to_string());
        assert!(error.to_string().contains("email"));

        let error = WidgetError::InvalidPageSize(7);
        assert!(error.to_string().contains('7'));
    }
}
