//! Error types for Domain Scout lookups and bot transport.

use thiserror::Error;

/// Main error type for Domain Scout operations
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Invalid configuration value in the named section
    #[error("invalid config in [{0}]: {1}")]
    InvalidConfig(String, String),

    /// Bot token could not be read or resolved
    #[error("bot token unavailable: {0}")]
    TokenUnavailable(String),

    /// DNS resolution failed for a domain (other than "no records")
    #[error("DNS lookup failed for '{0}': {1}")]
    Dns(String, String),

    /// WHOIS exchange with a server failed
    #[error("WHOIS query to '{0}' failed: {1}")]
    Whois(String, String),

    /// WHOIS exchange exceeded the configured timeout
    #[error("WHOIS query to '{0}' timed out")]
    WhoisTimeout(String),

    /// Telegram Bot API answered with ok = false
    #[error("Telegram API error in {0}: {1}")]
    TelegramApi(String, String),

    /// HTTP transport error talking to the Bot API
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local filesystem error (temp artifacts, token file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response could not be serialized for file output
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for Domain Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;
