//! # Pronunciation Guide
//!
//! WASM-first audio core for a pronunciation practice widget: play a native
//! recording, record the learner, show both waveforms side by side with a score.
//!
//! ## Overview
//!
//! The crate owns the state machines and the browser owns the devices. Every
//! host facility (audio element, speech synthesis, microphone, blob URLs,
//! decoding, time) is a trait in [`media`] or [`clock`], so the same controllers
//! run under `wasm-bindgen` adapters in the browser and under the in-memory
//! fakes in [`media::memory`] in tests.
//!
//! - [`playback::PlaybackController`] plays a source, falls back to speech
//!   synthesis when the source is missing, broken or slow, and never surfaces a
//!   playback error to the user
//! - [`duration::DurationResolver`] settles a trustworthy length from hints,
//!   metadata, decoding and estimates
//! - [`recording::RecordingController`] runs a capped microphone session and
//!   always releases the device
//! - [`waveform`] draws amplitude bars onto any [`waveform::Surface`]
//! - [`selection::SelectionFlow`] drives language and phrase choice over the
//!   built-in [`catalog::Catalog`]
//!
//! ## Quick Start
//!
//! ```rust
//! use pronunciation_guide::catalog::Catalog;
//! use pronunciation_guide::scoring::FixedScorer;
//! use pronunciation_guide::selection::SelectionFlow;
//!
//! let catalog = Catalog::builtin()?;
//! let mut flow = SelectionFlow::new(catalog, FixedScorer(90))?;
//! flow.select_language("fr-FR")?;
//! flow.select_phrase("fr-1")?;
//! assert_eq!(flow.phrase().map(|p| p.text.as_str()), Some("Bonjour"));
//! # Ok::<(), pronunciation_guide::PracticeError>(())
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): controller spans and events via the `tracing` crate

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

#[macro_use]
pub mod trace;

pub mod catalog;
pub mod clock;
pub mod comparison;
pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod duration;
pub mod error;
pub mod media;
pub mod playback;
pub mod recording;
pub mod scoring;
pub mod selection;
pub mod speech;
pub mod waveform;

pub use catalog::{Catalog, Language, Phrase};
pub use clock::{Clock, ManualClock, SystemClock};
pub use comparison::{ComparisonPresenter, ComparisonResult, ComparisonView, FeedbackTier};
pub use config::WidgetConfig;
pub use duration::{format_time, round_half_up, DurationResolver, DurationSource};
pub use error::{PracticeError, PracticeResult};
pub use media::{AudioSource, Generation, SourceKind};
pub use playback::{PlaybackController, PlaybackMode, PlaybackState, PlaybackStatus};
pub use recording::{RecordingController, RecordingOutcome, RecordingState};
pub use scoring::{FixedScorer, RandomScorer, Scorer};
pub use selection::{LanguageChange, PracticeTab, SelectionFlow};
pub use speech::{FallbackSpeech, SpeechFallbackEngine};
pub use waveform::{Background, Rgb, Surface, WaveformConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
