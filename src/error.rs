use thiserror::Error;

/// Failures surfaced by ledger operations.
///
/// Every variant maps to a stable code (see [`LedgerError::code`]) so callers
/// can branch on the kind of failure without matching message text.
#[derive(Debug, Error)]
pub(crate) enum LedgerError {
    #[error("You must be signed in to perform this action")]
    Unauthenticated,

    #[error("{0} does not belong to the signed-in user")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Nothing to work with: {0}")]
    NoData(String),

    #[error("There are no unread insights")]
    NoUnreadInsights,

    #[error("AI extraction failed: {0}")]
    AiError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LedgerError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NoData(_) => "NO_DATA",
            Self::NoUnreadInsights => "NO_UNREAD_INSIGHTS",
            Self::AiError(_) => "AI_ERROR",
            Self::Storage(_) => "STORAGE",
            Self::Http(_) => "HTTP",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub(crate) type LedgerResult<T> = std::result::Result<T, LedgerError>;
