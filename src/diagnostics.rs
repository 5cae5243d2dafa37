//! Absorption of benign playback errors
//!
//! Playback failures are recovered by switching to speech fallback, so they
//! must not reach operator logs as application errors. Controllers route them
//! through [`ErrorAbsorber`], which counts them and logs at debug level only.
//! Hosts that forward platform console output can use
//! [`is_benign_audio_error`] to drop the platform's own noise for the same
//! failures.

use crate::error::PracticeError;
use crate::trace::trace_event;

/// Message fragments emitted by browsers for recoverable audio failures
pub const BENIGN_AUDIO_ERRORS: &[&str] = &[
    "The element has no supported sources",
    "Error playing audio:",
    "Audio error:",
];

/// Whether a console message is a known-benign audio failure
#[must_use]
pub fn is_benign_audio_error(message: &str) -> bool {
    BENIGN_AUDIO_ERRORS
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Counts errors recovered locally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAbsorber {
    count: u32,
    last: Option<PracticeError>,
}

impl ErrorAbsorber {
    /// Create an empty absorber
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            last: None,
        }
    }

    /// Swallow an error
    pub fn absorb(&mut self, err: PracticeError) {
        self.count = self.count.saturating_add(1);
        trace_event!(
            error = %err,
            benign = is_benign_audio_error(&err.to_string()),
            "playback error absorbed"
        );
        self.last = Some(err);
    }

    /// Number of errors absorbed
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Most recent absorbed error
    #[must_use]
    pub fn last(&self) -> Option<&PracticeError> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_messages() {
        assert!(is_benign_audio_error(
            "Uncaught (in promise) NotSupportedError: The element has no supported sources."
        ));
        assert!(is_benign_audio_error("Error playing audio: DOMException"));
        assert!(is_benign_audio_error("Audio error: MEDIA_ERR_NETWORK"));
        assert!(!is_benign_audio_error("TypeError: x is undefined"));
    }

    #[test]
    fn test_absorber_counts() {
        let mut absorber = ErrorAbsorber::new();
        absorber.absorb(PracticeError::LoadTimeout(3000));
        absorber.absorb(PracticeError::DecodeFailure("404".into()));
        assert_eq!(absorber.count(), 2);
        assert_eq!(
            absorber.last(),
            Some(&PracticeError::DecodeFailure("404".into()))
        );
    }
}
