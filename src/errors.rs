use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Dump file is missing or unreadable
    #[error("Could not read from file {path}: {reason}")]
    InputFile { path: String, reason: String },
    /// Pre/post SQL script is missing or unreadable
    #[error("Could not load SQL script {path}: {reason}. Are you running from the correct path?")]
    Script { path: String, reason: String },
    /// The XML document itself is broken; the reader cannot continue
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },
    /// A single row element could not be turned into a record
    #[error("Malformed row at byte {position}: {reason}")]
    MalformedRow { position: u64, reason: String },
    /// Error reported by the database driver or server
    #[error("Database error ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Database {
        code: Option<String>,
        message: String,
    },
    /// Invalid input format
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Configuration file could not be used
    #[error("Config error: {0}")]
    Config(String),
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<postgres::Error> for AppError {
    fn from(err: postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => AppError::Database {
                code: Some(db.code().code().to_string()),
                message: db.message().to_string(),
            },
            None => AppError::Database {
                code: None,
                message: err.to_string(),
            },
        }
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
