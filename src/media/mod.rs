//! Media primitives consumed by the controllers
//!
//! The controllers never touch a platform API directly. Everything they need
//! from the host is expressed here as a trait:
//!
//! | Primitive | Trait | Browser implementation |
//! |-----------|-------|------------------------|
//! | Native decode/playback | [`AudioBackend`] + [`NativeAudio`] | `HtmlAudioElement` |
//! | Speech synthesis | [`SpeechSynthesizer`] | `speechSynthesis` |
//! | Microphone capture | [`Microphone`] | `getUserMedia` + `MediaRecorder` |
//! | Blob URLs | [`BlobStore`] | `URL.createObjectURL` |
//! | Full decode | [`AudioDecoder`] | `WavDecoder`, else `AudioContext.decodeAudioData` |
//!
//! Asynchronous results flow back into the controllers as events
//! ([`NativeEvent`], [`SpeechEvent`], [`MicEvent`]) tagged with the
//! [`Generation`] of the resource that produced them. A controller drops any
//! event whose generation is no longer current.
//!
//! [`memory`] provides in-memory implementations of every primitive.

pub mod memory;

use crate::error::PracticeResult;

// ============================================================================
// Generation tokens
// ============================================================================

/// Identity of one live resource (audio source or recording session)
///
/// Every replacement issues the next generation, so callbacks from a torn-down
/// resource can be recognised and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any resource exists
    pub const INITIAL: Self = Self(0);

    /// The generation following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Audio sources
// ============================================================================

/// Where an audio source comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Fetched over the network
    Network,
    /// In-memory blob (`blob:` URL), e.g. a fresh recording
    Blob,
    /// No audio
    None,
}

/// A playable audio location; identity is the URL string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    url: Option<String>,
    kind: SourceKind,
}

impl AudioSource {
    /// Build a source from an optional URL, classifying `blob:` URLs
    #[must_use]
    pub fn new(url: Option<impl Into<String>>) -> Self {
        match url.map(Into::into) {
            Some(url) if url.is_empty() => Self::none(),
            Some(url) => {
                let kind = if url.starts_with("blob:") {
                    SourceKind::Blob
                } else {
                    SourceKind::Network
                };
                Self {
                    url: Some(url),
                    kind,
                }
            }
            None => Self::none(),
        }
    }

    /// Source for a URL
    #[must_use]
    pub fn url_of(url: impl Into<String>) -> Self {
        Self::new(Some(url))
    }

    /// The empty source
    #[must_use]
    pub const fn none() -> Self {
        Self {
            url: None,
            kind: SourceKind::None,
        }
    }

    /// URL, if any
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Source kind
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Whether this is a blob source
    #[must_use]
    pub fn is_blob(&self) -> bool {
        self.kind == SourceKind::Blob
    }

    /// Whether there is no URL
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.url.is_none()
    }
}

impl Default for AudioSource {
    fn default() -> Self {
        Self::none()
    }
}

// ============================================================================
// Native audio
// ============================================================================

/// Event reported by a native audio element
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// Metadata loaded; `duration` may still be NaN, infinite or zero
    LoadedMetadata {
        /// Reported duration in seconds
        duration: f64,
    },
    /// Enough data to start playing
    CanPlay,
    /// Reported duration changed
    DurationChange {
        /// Reported duration in seconds
        duration: f64,
    },
    /// Playback position advanced
    TimeUpdate {
        /// Element position in seconds
        current_time: f64,
        /// Element duration at this moment
        duration: f64,
    },
    /// Playback reached the end of the track
    Ended,
    /// Decode or network failure
    Error(crate::error::PracticeError),
    /// An asynchronous `play()` request was refused
    PlayRejected(crate::error::PracticeError),
}

/// One native audio element bound to a single URL
pub trait NativeAudio {
    /// Request playback
    ///
    /// # Errors
    ///
    /// Returns `PlaybackRejected` if the platform refuses synchronously. Hosts
    /// whose refusal arrives later report [`NativeEvent::PlayRejected`].
    fn play(&mut self) -> PracticeResult<()>;

    /// Pause playback
    fn pause(&mut self);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Move the play head
    fn set_current_time(&mut self, seconds: f64);

    /// Reported duration (may be NaN or infinite while streaming)
    fn duration(&self) -> f64;

    /// Set volume in [0, 1]
    fn set_volume(&mut self, volume: f32);

    /// Set muted flag
    fn set_muted(&mut self, muted: bool);

    /// Detach listeners and drop the underlying resource
    fn release(&mut self);
}

/// Factory for native audio elements
pub trait AudioBackend {
    /// Element type produced by this backend
    type Element: NativeAudio;

    /// Create an element for `url` and begin loading it
    ///
    /// Events for the element must be reported with `generation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot be created at all.
    fn open(&mut self, url: &str, generation: Generation) -> PracticeResult<Self::Element>;

    /// Start an out-of-band full decode of a blob source to measure its length
    ///
    /// Backends run an [`AudioDecoder`] over the blob payload and the host
    /// delivers the length to the owning controller's `on_decoded_duration`.
    /// Backends without a decoder ignore the request.
    fn request_decoded_duration(&mut self, url: &str, generation: Generation) {
        let _ = (url, generation);
    }
}

// ============================================================================
// Speech synthesis
// ============================================================================

/// A synthesis voice offered by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Display name
    pub name: String,
    /// BCP 47 language tag, e.g. `fr-FR`
    pub lang: String,
    /// Whether the platform marks this voice as its default
    pub is_default: bool,
}

impl Voice {
    /// Create a voice
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            is_default: false,
        }
    }
}

/// A request to speak text
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// Language tag
    pub lang: String,
    /// Chosen voice; `None` leaves the choice to the platform
    pub voice: Option<Voice>,
    /// Speaking rate
    pub rate: f32,
    /// Pitch
    pub pitch: f32,
    /// Volume in [0, 1]
    pub volume: f32,
}

/// Event reported by the speech engine
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// Speaking began
    Start,
    /// Speaking finished
    End,
    /// Speaking failed
    Error(crate::error::PracticeError),
}

/// Platform text-to-speech
pub trait SpeechSynthesizer {
    /// Voices currently available
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance; events must be reported with `generation`
    ///
    /// # Errors
    ///
    /// Returns `Speech` if the engine is unavailable.
    fn speak(&mut self, utterance: &Utterance, generation: Generation) -> PracticeResult<()>;

    /// Cancel everything queued or speaking
    fn cancel(&mut self);

    /// Whether the engine is speaking
    fn is_speaking(&self) -> bool;
}

// ============================================================================
// Microphone capture
// ============================================================================

/// Immediate answer to a permission request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequest {
    /// Access granted synchronously
    Granted,
    /// Answer will arrive as [`MicEvent::AccessGranted`] or [`MicEvent::AccessDenied`]
    Pending,
    /// Access refused synchronously
    Denied(crate::error::PracticeError),
}

/// Event reported by the microphone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicEvent {
    /// Permission granted
    AccessGranted,
    /// Permission refused
    AccessDenied(crate::error::PracticeError),
    /// Encoded audio chunk
    Chunk(Vec<u8>),
    /// Recorder flushed its last chunk after `stop()`
    Stopped,
    /// Device failure
    Error(crate::error::PracticeError),
}

/// Microphone stream plus recorder
pub trait Microphone {
    /// Ask for permission; events must be reported with `session`
    fn request_access(&mut self, session: Generation) -> AccessRequest;

    /// Start producing chunks
    ///
    /// # Errors
    ///
    /// Returns `Device` if the recorder cannot start.
    fn start(&mut self, session: Generation) -> PracticeResult<()>;

    /// Stop recording; the host reports [`MicEvent::Stopped`] once flushed
    fn stop(&mut self);

    /// Release the stream (stop all tracks)
    fn release(&mut self);

    /// Whether a stream is held
    fn is_live(&self) -> bool;
}

/// Turns recorded bytes into playable URLs
pub trait BlobStore {
    /// Join chunks into one blob and return its URL
    ///
    /// # Errors
    ///
    /// Returns `Device` if the blob cannot be created.
    fn create_url(&mut self, chunks: &[Vec<u8>], mime_type: &str) -> PracticeResult<String>;

    /// Free a URL created by this store
    fn revoke(&mut self, url: &str);
}

// ============================================================================
// Decoding
// ============================================================================

/// Decoded PCM audio (first channel or down-mix)
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Full-payload audio decoder
pub trait AudioDecoder {
    /// Decode an encoded payload
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the payload is not decodable.
    fn decode(&mut self, bytes: &[u8]) -> PracticeResult<DecodedAudio>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_sequence() {
        let g = Generation::INITIAL;
        assert_eq!(g.value(), 0);
        assert_eq!(g.next().next().value(), 2);
        assert!(g.next() > g);
    }

    #[test]
    fn test_source_classification() {
        assert_eq!(AudioSource::url_of("blob:http://x/1").kind(), SourceKind::Blob);
        assert_eq!(
            AudioSource::url_of("/placeholder.svg?height=1&width=1").kind(),
            SourceKind::Network
        );
        assert_eq!(AudioSource::new(None::<String>).kind(), SourceKind::None);
        assert!(AudioSource::new(Some("")).is_none());
    }

    #[test]
    fn test_source_identity_is_url() {
        assert_eq!(AudioSource::url_of("a.mp3"), AudioSource::url_of("a.mp3"));
        assert_ne!(AudioSource::url_of("a.mp3"), AudioSource::url_of("b.mp3"));
    }

    #[test]
    fn test_decoded_duration() {
        let audio = DecodedAudio {
            samples: vec![0.0; 24_000],
            sample_rate: 16_000,
        };
        assert!((audio.duration() - 1.5).abs() < 1e-9);

        let empty = DecodedAudio {
            samples: vec![],
            sample_rate: 0,
        };
        assert!(empty.duration().abs() < f64::EPSILON);
    }
}
