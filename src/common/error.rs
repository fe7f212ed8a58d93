//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by an external whitelist authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("Whitelist authority unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors from the persisted link store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access link store '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt link store '{path}': {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown link code: {code}")]
    UnknownCode { code: u32 },

    #[error("Minecraft account {name} is already linked")]
    MinecraftTaken { name: String },

    #[error("Discord user {discord_id} is already linked")]
    DiscordTaken { discord_id: u64 },
}

/// Errors from publishing to an external chat sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Transient failure; the publish may be retried.
    #[error("Chat sink unavailable: {message}")]
    Unavailable { message: String },

    /// The sink refused the message; retrying will not help.
    #[error("Chat sink rejected message: {message}")]
    Rejected { message: String },
}

impl SinkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Unavailable { .. })
    }
}

/// Errors on the host plugin connection.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Malformed host frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Host line error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for link store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
