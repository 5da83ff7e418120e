//! Error types for handsfree-core
//!
//! Collaborator failures are reported through these types but the core only
//! logs them; see [`crate::dispatcher::HandsfreeCore`]. Configuration, logging setup
//! and the service lifecycle hand them back to the caller.

use thiserror::Error;

/// Result type for handsfree-core operations
pub type Result<T> = std::result::Result<T, HandsfreeError>;

/// Errors that can occur in handsfree-core
#[derive(Debug, Error)]
pub enum HandsfreeError {
    /// Voice-channel collaborator refused a request
    #[error("Voice channel {operation} failed: {reason}")]
    VoiceChannel { operation: String, reason: String },

    /// Audio stream collaborator failure
    #[error("Audio stream {operation} failed: {reason}")]
    AudioStream { operation: String, reason: String },

    /// Host transport failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The service event loop is no longer running
    #[error("Event loop channel closed")]
    ChannelClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HandsfreeError {
    /// Create a voice-channel error
    pub fn voice_channel(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VoiceChannel {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an audio stream error
    pub fn audio_stream(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AudioStream {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
