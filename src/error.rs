use thiserror::Error;

/// Result type for shadow operations
pub type Result<T> = std::result::Result<T, ShadowError>;

/// Errors that can occur when talking to the shadow store or handling a request
#[derive(Error, Debug)]
pub enum ShadowError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Request timed out waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Store returned an error response
    #[error("Store error: {detail}")]
    Store {
        /// Error detail message from the store
        detail: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration is missing or invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid or unexpected response from the store
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Incoming event matches neither front end
    #[error("Unrecognized event: {0}")]
    UnrecognizedEvent(String),

    /// Skill request came from a different application
    #[error("Application id mismatch: expected {expected}, got {actual}")]
    ApplicationMismatch {
        /// Configured application id
        expected: String,
        /// Application id carried by the request
        actual: String,
    },
}
