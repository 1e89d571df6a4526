use serde::Serialize;

/// Coarse error category, so callers can decide whether to abort, log or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Parse,
    Filesystem,
    Rendering,
    Config,
    Internal,
}

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Network ──
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Request to {url} returned status {status}")]
    HttpStatus { status: u16, url: String },

    // ── Parsing ──
    #[error("Failed to parse response: {0}")]
    Parse(String),

    // ── Files ──
    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── Tables / charts ──
    #[error("Table construction failed: {0}")]
    Table(String),

    #[error("No price data for ticker {0} in any snapshot")]
    MissingTicker(String),

    #[error("Chart rendering failed: {0}")]
    Render(String),

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── General ──
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Network(_) | AppError::HttpStatus { .. } => ErrorKind::Network,
            AppError::Parse(_) => ErrorKind::Parse,
            AppError::FileRead(_) | AppError::FileWrite(_) | AppError::Serialization(_) => {
                ErrorKind::Filesystem
            }
            AppError::Table(_) | AppError::MissingTicker(_) | AppError::Render(_) => {
                ErrorKind::Rendering
            }
            AppError::InvalidConfig(_) => ErrorKind::Config,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Network(_) => "NETWORK",
            AppError::HttpStatus { .. } => "HTTP_STATUS",
            AppError::Parse(_) => "PARSE",
            AppError::FileRead(_) => "FILE_READ",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::Serialization(_) => "SERIALIZATION",
            AppError::Table(_) => "TABLE",
            AppError::MissingTicker(_) => "MISSING_TICKER",
            AppError::Render(_) => "RENDER",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

/// Serializable error summary, written to the log on a failed run.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

// ── Conversions from external errors ──

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Parse(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

impl From<tempfile::PersistError> for AppError {
    fn from(err: tempfile::PersistError) -> Self {
        AppError::FileWrite(err.to_string())
    }
}

impl From<polars::error::PolarsError> for AppError {
    fn from(err: polars::error::PolarsError) -> Self {
        AppError::Table(err.to_string())
    }
}
