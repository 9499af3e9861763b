//! Client error types.

/// Errors that can occur when using the toolcredits client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The API key was missing or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// The user cannot afford the tool.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Price of one use.
        required: i64,
    },

    /// The tool is not in the pricing catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The tool exists but is switched off.
    #[error("tool inactive: {0}")]
    ToolInactive(String),

    /// No usage record with the given id.
    #[error("usage record not found: {0}")]
    UsageNotFound(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// `true` if the user has to buy credits before trying again.
    #[must_use]
    pub fn is_insufficient_credits(&self) -> bool {
        matches!(self, Self::InsufficientCredits { .. })
    }
}
