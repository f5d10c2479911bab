//! Error types for the bridge.

/// Top-level error type for the bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel not found: {0}")]
    NotFound(String),

    #[error("Channel {channel} is missing required credential: {credential}")]
    MissingCredential { channel: String, credential: String },

    #[error("Operation {operation} is not supported by channel {channel}")]
    Unsupported { channel: String, operation: String },

    #[error("Send failed on {channel}: {message}")]
    SendFailed { channel: String, message: String },

    #[error("Channel {0} failed to start: {1}")]
    StartFailed(String, String),

    #[error("Channel {0} failed to stop: {1}")]
    StopFailed(String, String),
}

/// Persisted store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store read failed: {0}")]
    Read(String),

    #[error("Store write failed: {0}")]
    Write(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Agent runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Failed to create agent session: {0}")]
    SessionCreate(String),

    #[error("Agent turn failed: {0}")]
    Prompt(String),

    #[error("Agent runtime unavailable: {0}")]
    Unavailable(String),

    #[error("Agent event stream ended unexpectedly")]
    StreamClosed,
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
