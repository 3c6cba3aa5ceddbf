//! Error types module
//!
//! `AppError` is the error type used inside the processing pipeline. It never
//! crosses the public adapter or orchestrator boundary: those convert every
//! error into result data (`ScanResult`, `ExtractionResult`, `SignedUrlResult`,
//! `ProcessingOutcome`).

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Warning level - for rejected input and missing records
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Evidence record not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Machine-readable error code (e.g., "NOT_FOUND")
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Repository(_) => "REPOSITORY_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::NotFound(_) | AppError::InvalidInput(_) => LogLevel::Warn,
            AppError::Repository(_) | AppError::Internal(_) => LogLevel::Error,
        }
    }

    /// Emit this error through `tracing` at its own level.
    pub fn log(&self, context: &str) {
        match self.log_level() {
            LogLevel::Warn => tracing::warn!(code = self.error_code(), error = %self, "{}", context),
            LogLevel::Error => {
                tracing::error!(code = self.error_code(), error = %self, "{}", context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_is_a_warning() {
        let err = AppError::NotFound("ev-42".to_string());
        assert_eq!(err.to_string(), "Evidence record not found: ev-42");
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn repository_failures_log_as_errors() {
        let err = AppError::Repository("connection reset".to_string());
        assert_eq!(err.error_code(), "REPOSITORY_ERROR");
        assert_eq!(err.log_level(), LogLevel::Error);
        assert_eq!(
            AppError::Internal("boom".to_string()).log_level(),
            LogLevel::Error
        );
    }
}
