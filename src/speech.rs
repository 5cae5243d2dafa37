//! Speech synthesis fallback
//!
//! When native audio is unusable the phrase is spoken by the platform's
//! text-to-speech engine instead. The engine reports only start and end, so
//! progress is simulated: a [`Ticker`] advances a virtual play head in fixed
//! steps toward an estimated duration (`chars × 80 ms`, at least 1 s).
//!
//! Synthesized speech cannot seek or resume mid-utterance. Every `play()`
//! speaks from the start and every `cancel()` rewinds to 0.

use serde::{Deserialize, Serialize};

use crate::clock::{Millis, Ticker};
use crate::error::{PracticeError, PracticeResult};
use crate::media::{Generation, SpeechEvent, SpeechSynthesizer, Utterance, Voice};
use crate::trace::{trace_enter, trace_event};

/// Speech fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Progress tick period in milliseconds
    pub tick_ms: Millis,
    /// Estimated speaking time per character in milliseconds
    pub ms_per_char: Millis,
    /// Lower bound on the estimate in milliseconds
    pub min_duration_ms: Millis,
    /// Speaking rate passed to the engine
    pub rate: f32,
    /// Pitch passed to the engine
    pub pitch: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            ms_per_char: 80,
            min_duration_ms: 1000,
            rate: 0.9,
            pitch: 1.0,
        }
    }
}

impl SpeechConfig {
    /// Set the tick period
    #[must_use]
    pub fn with_tick_ms(mut self, tick_ms: Millis) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    /// Set the per-character estimate
    #[must_use]
    pub fn with_ms_per_char(mut self, ms_per_char: Millis) -> Self {
        self.ms_per_char = ms_per_char;
        self
    }

    /// Estimated speaking time for `text` in milliseconds
    #[must_use]
    pub fn estimate_ms(&self, text: &str) -> Millis {
        let chars = text.chars().count() as Millis;
        chars
            .saturating_mul(self.ms_per_char)
            .max(self.min_duration_ms)
    }
}

/// Estimated speaking time for `text` in seconds with default settings
///
/// ```rust
/// use pronunciation_guide::speech::estimate_duration;
///
/// assert!((estimate_duration("Bonjour") - 1.0).abs() < f64::EPSILON);
/// assert!((estimate_duration("Je suis enchanté") - 1.28).abs() < 1e-9);
/// ```
#[must_use]
pub fn estimate_duration(text: &str) -> f64 {
    millis_to_secs(SpeechConfig::default().estimate_ms(text))
}

/// Base language subtag of a tag (`"es-ES"` → `"es"`)
#[must_use]
pub fn base_language(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Pick the voice best matching `lang`
///
/// An exact tag match wins; otherwise the first voice sharing the base
/// subtag. Comparison ignores case and accepts `_` as a separator.
#[must_use]
pub fn select_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
    let wanted = normalize_tag(lang);
    if wanted.is_empty() {
        return None;
    }
    let wanted_base = base_language(&wanted).to_string();

    voices
        .iter()
        .find(|v| normalize_tag(&v.lang) == wanted)
        .or_else(|| {
            voices
                .iter()
                .find(|v| base_language(&normalize_tag(&v.lang)) == wanted_base)
        })
}

#[allow(clippy::cast_precision_loss)]
fn millis_to_secs(ms: Millis) -> f64 {
    ms as f64 / 1000.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn secs_to_millis(secs: f64) -> Millis {
    (secs * 1000.0).round() as Millis
}

/// Text and language to speak when native audio is unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackSpeech {
    /// Text to speak
    pub text: String,
    /// BCP 47 language tag
    pub lang: String,
}

impl FallbackSpeech {
    /// Create a fallback request; empty text yields `None`
    #[must_use]
    pub fn new(text: impl Into<String>, lang: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self {
            text,
            lang: lang.into(),
        })
    }
}

/// Progress reported by the simulated clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeechProgress {
    /// Virtual play head moved to this many seconds
    Advanced(f64),
    /// Utterance finished; play head back at 0
    Finished,
}

/// Play/cancel-able "virtual audio" backed by speech synthesis
#[derive(Debug, Clone)]
pub struct SpeechFallbackEngine {
    request: FallbackSpeech,
    config: SpeechConfig,
    ticker: Ticker,
    elapsed_ms: Millis,
    duration_ms: Millis,
    volume: f32,
}

impl SpeechFallbackEngine {
    /// Create an idle engine for `request`
    #[must_use]
    pub fn new(request: FallbackSpeech, config: SpeechConfig) -> Self {
        let duration_ms = config.estimate_ms(&request.text);
        Self {
            ticker: Ticker::new(config.tick_ms),
            request,
            config,
            elapsed_ms: 0,
            duration_ms,
            volume: 1.0,
        }
    }

    /// What is being spoken
    #[must_use]
    pub fn request(&self) -> &FallbackSpeech {
        &self.request
    }

    /// Text-length estimate in seconds
    #[must_use]
    pub fn estimated_duration(&self) -> f64 {
        millis_to_secs(self.config.estimate_ms(&self.request.text))
    }

    /// Duration the current utterance is being timed against, in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        millis_to_secs(self.duration_ms)
    }

    /// Virtual play head in seconds
    #[must_use]
    pub fn current_time(&self) -> f64 {
        millis_to_secs(self.elapsed_ms)
    }

    /// Whether the progress clock is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ticker.is_running()
    }

    /// Volume for the next utterance
    ///
    /// Platform utterances fix their volume when queued, so a change applies
    /// from the next `play()`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Build the utterance for the current request
    #[must_use]
    pub fn utterance(&self, voices: &[Voice]) -> Utterance {
        let voice = select_voice(voices, &self.request.lang).cloned();
        if voice.is_none() {
            let err = PracticeError::VoiceUnavailable(self.request.lang.clone());
            trace_event!(error = %err, "using platform default voice");
        }
        Utterance {
            text: self.request.text.clone(),
            lang: self.request.lang.clone(),
            voice,
            rate: self.config.rate,
            pitch: self.config.pitch,
            volume: self.volume,
        }
    }

    /// Speak from the start and run the progress clock
    ///
    /// `duration` overrides the estimate when a resolved duration is known.
    ///
    /// # Errors
    ///
    /// Returns `Speech` if the engine refuses the utterance; the clock is not
    /// started in that case.
    pub fn play<S: SpeechSynthesizer>(
        &mut self,
        synth: &mut S,
        now: Millis,
        duration: Option<f64>,
        generation: Generation,
    ) -> PracticeResult<()> {
        let _guard = trace_enter!("speech.play");

        synth.cancel();
        self.ticker.stop();
        self.elapsed_ms = 0;

        let utterance = self.utterance(&synth.voices());
        synth.speak(&utterance, generation)?;

        self.duration_ms = duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map_or_else(|| self.config.estimate_ms(&self.request.text), secs_to_millis);
        self.ticker.start(now);
        trace_event!(
            generation = generation.value(),
            duration_ms = self.duration_ms,
            "speech fallback started"
        );
        Ok(())
    }

    /// Stop speaking and rewind
    pub fn cancel<S: SpeechSynthesizer>(&mut self, synth: &mut S) {
        synth.cancel();
        self.ticker.stop();
        self.elapsed_ms = 0;
    }

    /// Advance the virtual play head
    pub fn poll(&mut self, now: Millis) -> Option<SpeechProgress> {
        let ticks = self.ticker.due(now);
        if ticks == 0 {
            return None;
        }
        self.elapsed_ms = self
            .elapsed_ms
            .saturating_add(Millis::from(ticks) * self.ticker.period());
        if self.elapsed_ms >= self.duration_ms {
            self.finish();
            return Some(SpeechProgress::Finished);
        }
        Some(SpeechProgress::Advanced(self.current_time()))
    }

    /// Apply an engine event for the current generation
    pub fn on_event(&mut self, event: &SpeechEvent) -> Option<SpeechProgress> {
        match event {
            SpeechEvent::Start => None,
            SpeechEvent::End => {
                if !self.is_active() {
                    return None;
                }
                self.finish();
                Some(SpeechProgress::Finished)
            }
            SpeechEvent::Error(err) => {
                trace_event!(error = %err, "speech error absorbed");
                if !self.is_active() {
                    return None;
                }
                self.finish();
                Some(SpeechProgress::Finished)
            }
        }
    }

    fn finish(&mut self) {
        self.ticker.stop();
        self.elapsed_ms = 0;
    }
}
