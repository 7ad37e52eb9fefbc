use thiserror::Error;

/// Main error type for replygraph
#[derive(Error, Debug)]
pub enum ReplygraphError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (e.g. empty server name)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested artifact or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Graph rendering errors
    #[error("Render error: {0}")]
    Render(String),

    /// Discord gateway / HTTP errors
    #[error("Discord error: {0}")]
    Discord(String),
}

/// Convenient Result type using ReplygraphError
pub type Result<T> = std::result::Result<T, ReplygraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplygraphError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_invalid_input_display() {
        let err = ReplygraphError::InvalidInput("server_name is required".to_string());
        assert_eq!(err.to_string(), "Invalid input: server_name is required");
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: ReplygraphError = rusqlite_err.into();
        assert!(matches!(err, ReplygraphError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReplygraphError = io_err.into();
        assert!(matches!(err, ReplygraphError::Io(_)));
    }
}
