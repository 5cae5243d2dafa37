//! Error types for pronunciation practice
//!
//! Playback-path errors (`DecodeFailure`, `LoadTimeout`, `PlaybackRejected`,
//! `VoiceUnavailable`, `Speech`) are absorbed by the controllers and never shown.
//! Recording-path errors (`PermissionDenied`, `Device`) block an explicit user
//! action and are the only ones surfaced.

use thiserror::Error;

/// Result type alias for practice operations
pub type PracticeResult<T> = Result<T, PracticeError>;

/// Message shown when the microphone cannot be used
pub const MICROPHONE_MESSAGE: &str =
    "Could not access microphone. Please check your browser permissions.";

/// Errors that can occur in the practice pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PracticeError {
    /// Microphone permission was refused
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// Capture device failed after permission was granted
    #[error("recording device error: {0}")]
    Device(String),

    /// Native audio could not be decoded or fetched
    #[error("audio decode failure: {0}")]
    DecodeFailure(String),

    /// Native audio did not become ready in time
    #[error("audio load timed out after {0} ms")]
    LoadTimeout(u64),

    /// The platform refused to start native playback
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),

    /// No synthesis voice matches the requested language
    #[error("no voice available for language {0}")]
    VoiceUnavailable(String),

    /// Speech synthesis failed
    #[error("speech synthesis error: {0}")]
    Speech(String),

    /// Catalog lookup or parsing error
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

impl PracticeError {
    /// Whether this error is shown to the user
    ///
    /// Only recording failures are user-visible; everything on the playback
    /// path is recovered locally.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::Device(_))
    }

    /// Message for the UI, if this error is user-visible
    #[must_use]
    pub fn user_message(&self) -> Option<&'static str> {
        if self.is_user_visible() {
            Some(MICROPHONE_MESSAGE)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PracticeError::LoadTimeout(3000);
        assert_eq!(err.to_string(), "audio load timed out after 3000 ms");

        let err = PracticeError::DecodeFailure("no supported sources".into());
        assert_eq!(err.to_string(), "audio decode failure: no supported sources");
    }

    #[test]
    fn test_only_recording_errors_are_visible() {
        assert!(PracticeError::PermissionDenied("denied".into()).is_user_visible());
        assert!(PracticeError::Device("unplugged".into()).is_user_visible());

        assert!(!PracticeError::DecodeFailure("x".into()).is_user_visible());
        assert!(!PracticeError::LoadTimeout(3000).is_user_visible());
        assert!(!PracticeError::PlaybackRejected("x".into()).is_user_visible());
        assert!(!PracticeError::VoiceUnavailable("fr".into()).is_user_visible());
        assert!(!PracticeError::Speech("x".into()).is_user_visible());
    }

    #[test]
    fn test_user_message() {
        let err = PracticeError::PermissionDenied("NotAllowedError".into());
        assert_eq!(err.user_message(), Some(MICROPHONE_MESSAGE));
        assert_eq!(PracticeError::LoadTimeout(1).user_message(), None);
    }
}
