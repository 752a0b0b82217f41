//! Shared error type across wxgauge crates.

use thiserror::Error;

/// Stable error codes, used in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Configuration could not be read or failed validation.
    InvalidConfig,
    /// A view definition is malformed.
    InvalidView,
    /// A view with the same name is already registered.
    ViewAlreadyRegistered,
    /// The weather source could not be reached or answered with an error.
    Fetch,
    /// The weather response body was not valid JSON.
    Decode,
    /// I/O failure (socket bind, stdin).
    Io,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::InvalidView => "INVALID_VIEW",
            ErrorCode::ViewAlreadyRegistered => "VIEW_ALREADY_REGISTERED",
            ErrorCode::Fetch => "FETCH",
            ErrorCode::Decode => "DECODE",
            ErrorCode::Io => "IO",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WxError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum WxError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid view: {0}")]
    InvalidView(String),
    #[error("view already registered: {0}")]
    ViewAlreadyRegistered(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl WxError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WxError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            WxError::InvalidView(_) => ErrorCode::InvalidView,
            WxError::ViewAlreadyRegistered(_) => ErrorCode::ViewAlreadyRegistered,
            WxError::Fetch(_) => ErrorCode::Fetch,
            WxError::Decode(_) => ErrorCode::Decode,
            WxError::Io(_) => ErrorCode::Io,
            WxError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Startup errors stop the process; fetch and decode errors only skip a tick.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WxError::Fetch(_) | WxError::Decode(_))
    }
}
