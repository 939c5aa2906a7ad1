// Error handling for the player facade and its engines

use thiserror::Error;

/// Player error types
///
/// Errors never leave the facade as return values. They travel to the
/// observer inside [`crate::PlayerEvent::Failed`], so the type is `Clone`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The media URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL parsed but no engine source handles its scheme
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Failed to open or probe the media resource
    #[error("Load error: {0}")]
    Load(String),

    /// Media format not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Network error (range requests, size probing)
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Playback error reported by an engine
    #[error("Playback error: {0}")]
    Playback(String),

    /// Engine thread or channel failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Command rejected by the state machine
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::Io(err.to_string())
    }
}

impl From<url::ParseError> for PlayerError {
    fn from(err: url::ParseError) -> Self {
        PlayerError::InvalidUrl(err.to_string())
    }
}
