//! Playback controller
//!
//! [`PlaybackController`] owns one audio source and presents a single
//! play/pause/seek/volume surface over two very different backends:
//!
//! - **Native**: an element from the host's [`AudioBackend`]
//! - **Fallback**: a [`SpeechFallbackEngine`] speaking the phrase text
//!
//! # State machine
//!
//! ```text
//!   set_source ──► Idle ──► Loading ──┬──► Ready ◄──► Playing ◄──► Paused
//!                                     └──► Failed
//! ```
//!
//! Native failures (open error, decode error, load timeout, rejected
//! `play()`) never surface. With fallback text available the controller
//! silently switches to [`PlaybackMode::Fallback`] and stays usable; seeking
//! is disabled there because speech cannot seek.
//!
//! # Driving the controller
//!
//! Nothing here runs on its own. The host forwards element and speech events
//! (tagged with the [`Generation`] they were created for) and calls
//! [`PlaybackController::poll`] periodically to run the load timeout, the
//! metadata poll and the speech progress clock. Events from a replaced source
//! carry an old generation and are dropped.

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, Deadline, Millis, Ticker};
use crate::diagnostics::ErrorAbsorber;
use crate::duration::{format_time, DurationResolver, DurationSource};
use crate::error::PracticeError;
use crate::media::{AudioBackend, AudioSource, Generation, NativeAudio, NativeEvent, SpeechEvent, SpeechSynthesizer};
use crate::speech::{FallbackSpeech, SpeechConfig, SpeechFallbackEngine, SpeechProgress};
use crate::trace::{trace_enter, trace_event};

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Time allowed for native audio to become ready (default: 3000 ms)
    pub load_timeout_ms: Millis,
    /// Period of the native metadata duration poll (default: 500 ms)
    pub duration_poll_ms: Millis,
    /// Speech fallback settings
    pub speech: SpeechConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 3000,
            duration_poll_ms: 500,
            speech: SpeechConfig::default(),
        }
    }
}

impl PlaybackConfig {
    /// Set the load timeout
    #[must_use]
    pub fn with_load_timeout_ms(mut self, ms: Millis) -> Self {
        self.load_timeout_ms = ms;
        self
    }

    /// Set the speech fallback settings
    #[must_use]
    pub fn with_speech(mut self, speech: SpeechConfig) -> Self {
        self.speech = speech;
        self
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// No source
    Idle,
    /// Native audio loading
    Loading,
    /// Ready to play
    Ready,
    /// Playing
    Playing,
    /// Paused (or finished)
    Paused,
    /// Native audio failed and there is nothing to fall back to
    Failed,
}

/// Which backend serves playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Native audio element
    Native,
    /// Speech synthesis
    Fallback,
}

/// Read-only playback snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Lifecycle status
    pub status: PlaybackStatus,
    /// Play head in seconds, never past `duration` when known
    pub current_time: f64,
    /// Resolved duration in seconds
    pub duration: Option<f64>,
    /// Volume in [0, 1]
    pub volume: f32,
    /// Muted flag
    pub muted: bool,
}

/// Unified native/fallback audio player for one source
pub struct PlaybackController<B: AudioBackend, S: SpeechSynthesizer, C: Clock> {
    backend: B,
    synth: S,
    clock: C,
    config: PlaybackConfig,

    source: AudioSource,
    generation: Generation,
    element: Option<B::Element>,
    speech: Option<SpeechFallbackEngine>,
    mode: PlaybackMode,

    resolver: DurationResolver,
    load_deadline: Deadline,
    duration_poll: Ticker,

    status: PlaybackStatus,
    current_time: f64,
    volume: f32,
    last_volume: f32,
    muted: bool,

    absorbed: ErrorAbsorber,
}

impl<B: AudioBackend, S: SpeechSynthesizer, C: Clock> PlaybackController<B, S, C> {
    /// Create an idle controller
    #[must_use]
    pub fn new(backend: B, synth: S, clock: C, config: PlaybackConfig) -> Self {
        let duration_poll = Ticker::new(config.duration_poll_ms);
        Self {
            backend,
            synth,
            clock,
            config,
            source: AudioSource::none(),
            generation: Generation::INITIAL,
            element: None,
            speech: None,
            mode: PlaybackMode::Native,
            resolver: DurationResolver::new(),
            load_deadline: Deadline::new(),
            duration_poll,
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            volume: 1.0,
            last_volume: 1.0,
            muted: false,
            absorbed: ErrorAbsorber::new(),
        }
    }

    // =========================================================================
    // Source lifecycle
    // =========================================================================

    /// Replace the source
    ///
    /// The previous element, speech and timers are torn down before anything
    /// new is created. Position resets to 0 and duration to the hint (if any).
    /// A source without URL but with fallback text starts directly in
    /// fallback mode.
    pub fn set_source(
        &mut self,
        source: AudioSource,
        fallback: Option<FallbackSpeech>,
        duration_hint: Option<f64>,
    ) {
        let _guard = trace_enter!("playback.set_source");

        self.teardown();
        self.generation = self.generation.next();
        self.source = source;
        self.mode = PlaybackMode::Native;
        self.current_time = 0.0;
        self.resolver = DurationResolver::with_hint(duration_hint);
        self.speech = fallback.map(|request| {
            let mut engine = SpeechFallbackEngine::new(request, self.config.speech.clone());
            engine.set_volume(self.effective_volume());
            engine
        });

        trace_event!(
            generation = self.generation.value(),
            url = self.source.url().unwrap_or(""),
            "source replaced"
        );

        let Some(url) = self.source.url().map(str::to_string) else {
            if self.speech.is_some() {
                self.enter_fallback();
            }
            return;
        };

        self.status = PlaybackStatus::Loading;
        match self.backend.open(&url, self.generation) {
            Ok(mut element) => {
                element.set_volume(self.volume);
                element.set_muted(self.muted);
                self.element = Some(element);

                let now = self.clock.now_ms();
                self.load_deadline.arm(now, self.config.load_timeout_ms);
                self.duration_poll.start(now);
                if self.source.is_blob() {
                    self.backend.request_decoded_duration(&url, self.generation);
                }
            }
            Err(err) => self.native_failed(err, false),
        }
    }

    /// Drop the source and return to `Idle`
    pub fn clear(&mut self) {
        self.set_source(AudioSource::none(), None, None);
    }

    fn teardown(&mut self) {
        self.release_element();
        if let Some(speech) = self.speech.as_mut() {
            speech.cancel(&mut self.synth);
        }
        self.speech = None;
        self.status = PlaybackStatus::Idle;
    }

    fn release_element(&mut self) {
        if let Some(mut element) = self.element.take() {
            element.pause();
            element.release();
        }
        self.load_deadline.disarm();
        self.duration_poll.stop();
    }

    fn enter_fallback(&mut self) {
        self.release_element();
        self.mode = PlaybackMode::Fallback;
        self.status = PlaybackStatus::Ready;
        self.current_time = 0.0;
        if let Some(speech) = self.speech.as_ref() {
            self.resolver.offer_estimate(speech.estimated_duration());
        }
        trace_event!(generation = self.generation.value(), "switched to speech fallback");
    }

    /// Absorb a native failure and fall back if possible
    fn native_failed(&mut self, err: PracticeError, resume: bool) {
        let timed_out = matches!(err, PracticeError::LoadTimeout(_));
        self.absorbed.absorb(err);

        if self.speech.is_some() {
            self.enter_fallback();
            if resume {
                self.start_speech();
            }
        } else if timed_out {
            // The element may still load; keep it and let the user try.
            self.status = PlaybackStatus::Ready;
            self.resolver.apply_floor();
        } else {
            self.release_element();
            self.status = PlaybackStatus::Failed;
        }
    }

    fn mark_ready(&mut self) {
        self.load_deadline.disarm();
        if self.status == PlaybackStatus::Loading {
            self.status = PlaybackStatus::Ready;
            trace_event!(generation = self.generation.value(), "native audio ready");
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        if generation == self.generation {
            return true;
        }
        trace_event!(
            stale = generation.value(),
            current = self.generation.value(),
            "stale callback dropped"
        );
        false
    }

    // =========================================================================
    // Controls
    // =========================================================================

    /// Start or resume playback
    ///
    /// Native mode rewinds first when at the end of the track. A rejected
    /// native start switches to fallback and speaks immediately. Fallback
    /// always speaks from the start.
    pub fn play(&mut self) {
        let _guard = trace_enter!("playback.play");
        if !self.can_play() || self.status == PlaybackStatus::Playing {
            return;
        }

        match self.mode {
            PlaybackMode::Fallback => self.start_speech(),
            PlaybackMode::Native => {
                let Some(element) = self.element.as_mut() else {
                    return;
                };
                let reported = element.duration();
                if reported.is_finite() && element.current_time() >= reported {
                    element.set_current_time(0.0);
                    self.current_time = 0.0;
                }
                match element.play() {
                    Ok(()) => {
                        self.status = PlaybackStatus::Playing;
                        self.resolver.offer(DurationSource::Metadata, reported);
                    }
                    Err(err) => self.native_failed(err, true),
                }
            }
        }
    }

    fn start_speech(&mut self) {
        let now = self.clock.now_ms();
        let duration = self.resolver.resolved();
        let Some(speech) = self.speech.as_mut() else {
            return;
        };
        match speech.play(&mut self.synth, now, duration, self.generation) {
            Ok(()) => {
                self.current_time = 0.0;
                self.status = PlaybackStatus::Playing;
            }
            Err(err) => self.absorbed.absorb(err),
        }
    }

    /// Pause playback; a no-op unless playing
    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        match self.mode {
            PlaybackMode::Native => {
                if let Some(element) = self.element.as_mut() {
                    element.pause();
                    self.current_time = element.current_time();
                }
            }
            PlaybackMode::Fallback => {
                if let Some(speech) = self.speech.as_mut() {
                    speech.cancel(&mut self.synth);
                }
                self.current_time = 0.0;
            }
        }
        self.status = PlaybackStatus::Paused;
    }

    /// Play if stopped, pause if playing
    pub fn toggle_play(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the play head; a no-op when seeking is unavailable
    pub fn seek(&mut self, seconds: f64) {
        if !self.can_seek() || !seconds.is_finite() {
            return;
        }
        let upper = self.resolver.resolved().unwrap_or(f64::MAX);
        let target = seconds.clamp(0.0, upper);
        if let Some(element) = self.element.as_mut() {
            element.set_current_time(target);
            self.current_time = target;
        }
    }

    /// Set volume in [0, 1]; zero mutes, non-zero unmutes
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 1.0 };
        self.volume = volume;
        if volume > 0.0 {
            self.last_volume = volume;
            self.muted = false;
        } else {
            self.muted = true;
        }
        self.apply_levels();
    }

    /// Set the muted flag; unmuting at zero volume restores the last level
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if !muted && self.volume <= 0.0 {
            self.volume = self.last_volume;
        }
        self.apply_levels();
    }

    /// Flip the muted flag
    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.muted);
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn apply_levels(&mut self) {
        let effective = self.effective_volume();
        if let Some(element) = self.element.as_mut() {
            element.set_volume(self.volume);
            element.set_muted(self.muted);
        }
        if let Some(speech) = self.speech.as_mut() {
            speech.set_volume(effective);
        }
    }

    // =========================================================================
    // Host callbacks
    // =========================================================================

    /// Apply an event from the native element created for `generation`
    pub fn handle_native_event(&mut self, generation: Generation, event: NativeEvent) {
        if !self.is_current(generation) || self.mode != PlaybackMode::Native || self.element.is_none() {
            return;
        }

        match event {
            NativeEvent::LoadedMetadata { duration } => {
                if !self.resolver.offer(DurationSource::Metadata, duration) {
                    self.resolver.apply_floor();
                }
                self.mark_ready();
            }
            NativeEvent::CanPlay => self.mark_ready(),
            NativeEvent::DurationChange { duration } => {
                self.resolver.offer(DurationSource::Metadata, duration);
            }
            NativeEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                self.resolver.offer(DurationSource::Metadata, duration);
                if current_time.is_finite() && current_time >= 0.0 {
                    self.current_time = current_time;
                }
            }
            NativeEvent::Ended => {
                self.status = PlaybackStatus::Paused;
                self.current_time = 0.0;
            }
            NativeEvent::Error(err) => {
                let resume = self.status == PlaybackStatus::Playing;
                self.native_failed(err, resume);
            }
            NativeEvent::PlayRejected(err) => {
                if self.status == PlaybackStatus::Playing {
                    self.status = PlaybackStatus::Paused;
                }
                self.native_failed(err, true);
            }
        }
    }

    /// Apply an event from the utterance spoken for `generation`
    pub fn handle_speech_event(&mut self, generation: Generation, event: SpeechEvent) {
        if !self.is_current(generation) || self.mode != PlaybackMode::Fallback {
            return;
        }
        let progress = self.speech.as_mut().and_then(|s| s.on_event(&event));
        if let Some(progress) = progress {
            self.apply_speech_progress(progress);
        }
    }

    /// Apply an out-of-band decode duration for the blob opened for `generation`
    pub fn on_decoded_duration(&mut self, generation: Generation, seconds: f64) {
        if !self.is_current(generation) {
            return;
        }
        if self.resolver.offer(DurationSource::Decoded, seconds) {
            self.duration_poll.stop();
        }
    }

    /// Run due timers: load timeout, metadata poll, speech progress
    pub fn poll(&mut self) {
        let now = self.clock.now_ms();

        if self.load_deadline.fire(now) && self.status == PlaybackStatus::Loading {
            self.native_failed(PracticeError::LoadTimeout(self.config.load_timeout_ms), false);
        }

        if self.duration_poll.due(now) > 0 {
            if let Some(element) = self.element.as_ref() {
                self.resolver.offer(DurationSource::Metadata, element.duration());
            }
            self.resolver.apply_floor();
            if self.resolver.is_settled() {
                self.duration_poll.stop();
            }
        }

        match self.mode {
            PlaybackMode::Native => {
                if self.status == PlaybackStatus::Playing {
                    if let Some(element) = self.element.as_ref() {
                        let position = element.current_time();
                        if position.is_finite() && position >= 0.0 {
                            self.current_time = position;
                        }
                    }
                }
            }
            PlaybackMode::Fallback => {
                let progress = self.speech.as_mut().and_then(|s| s.poll(now));
                if let Some(progress) = progress {
                    self.apply_speech_progress(progress);
                }
            }
        }
    }

    fn apply_speech_progress(&mut self, progress: SpeechProgress) {
        match progress {
            SpeechProgress::Advanced(seconds) => self.current_time = seconds,
            SpeechProgress::Finished => {
                self.current_time = 0.0;
                if self.status == PlaybackStatus::Playing {
                    self.status = PlaybackStatus::Paused;
                }
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current playback snapshot
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        let duration = self.resolver.resolved();
        let current_time = duration.map_or(self.current_time, |d| self.current_time.min(d));
        PlaybackState {
            status: self.status,
            current_time: current_time.max(0.0),
            duration,
            volume: self.volume,
            muted: self.muted,
        }
    }

    /// Lifecycle status
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Active backend
    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Current source
    #[must_use]
    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    /// Generation of the current source
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether the play control is usable
    #[must_use]
    pub fn can_play(&self) -> bool {
        match self.status {
            PlaybackStatus::Idle | PlaybackStatus::Loading | PlaybackStatus::Failed => false,
            PlaybackStatus::Ready | PlaybackStatus::Playing | PlaybackStatus::Paused => {
                self.element.is_some() || self.speech.is_some()
            }
        }
    }

    /// Whether the seek control is usable
    #[must_use]
    pub fn can_seek(&self) -> bool {
        self.mode == PlaybackMode::Native
            && self.element.is_some()
            && matches!(
                self.status,
                PlaybackStatus::Ready | PlaybackStatus::Playing | PlaybackStatus::Paused
            )
    }

    /// `"m:ss / m:ss"` label
    #[must_use]
    pub fn time_label(&self) -> String {
        let state = self.state();
        format!(
            "{} / {}",
            format_time(state.current_time),
            format_time(state.duration.unwrap_or(0.0))
        )
    }

    /// Number of playback errors absorbed so far
    #[must_use]
    pub fn absorbed_errors(&self) -> u32 {
        self.absorbed.count()
    }

    /// Duration resolver for the current source
    #[must_use]
    pub fn resolver(&self) -> &DurationResolver {
        &self.resolver
    }

    /// The audio backend
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The speech engine
    #[must_use]
    pub fn synth(&self) -> &S {
        &self.synth
    }
}

impl<B: AudioBackend, S: SpeechSynthesizer, C: Clock> Drop for PlaybackController<B, S, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<B: AudioBackend, S: SpeechSynthesizer, C: Clock> std::fmt::Debug for PlaybackController<B, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("source", &self.source)
            .field("generation", &self.generation)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("current_time", &self.current_time)
            .field("duration", &self.resolver.resolved())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::media::memory::{MemoryAudioBackend, MemorySpeech};
    use crate::media::Voice;

    type Controller = PlaybackController<MemoryAudioBackend, MemorySpeech, ManualClock>;

    struct Harness {
        controller: Controller,
        backend: MemoryAudioBackend,
        speech: MemorySpeech,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let backend = MemoryAudioBackend::new();
        let speech = MemorySpeech::with_voices(vec![Voice::new("Amélie", "fr-FR")]);
        let clock = ManualClock::new();
        let controller = PlaybackController::new(
            backend.clone(),
            speech.clone(),
            clock.clone(),
            PlaybackConfig::default(),
        );
        Harness {
            controller,
            backend,
            speech,
            clock,
        }
    }

    fn bonjour() -> Option<FallbackSpeech> {
        FallbackSpeech::new("Bonjour", "fr-FR")
    }

    fn loaded(h: &mut Harness, url: &str, duration: f64) {
        h.controller
            .set_source(AudioSource::url_of(url), bonjour(), None);
        let generation = h.controller.generation();
        h.controller
            .handle_native_event(generation, NativeEvent::LoadedMetadata { duration });
    }

    // =========================================================================
    // Source lifecycle
    // =========================================================================

    #[test]
    fn test_new_controller_is_idle() {
        let h = harness();
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(!h.controller.can_play());
        assert_eq!(h.controller.time_label(), "0:00 / 0:00");
    }

    #[test]
    fn test_set_source_starts_loading() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("a.mp3"), None, Some(1.5));
        let state = h.controller.state();
        assert_eq!(state.status, PlaybackStatus::Loading);
        assert!(state.current_time.abs() < f64::EPSILON);
        assert_eq!(state.duration, Some(1.5));
        assert!(!h.controller.can_play());
        assert_eq!(h.backend.opened(), 1);
    }

    #[test]
    fn test_replacing_source_releases_previous_element() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.play();
        h.controller
            .set_source(AudioSource::url_of("b.mp3"), None, None);
        assert_eq!(h.backend.opened(), 2);
        assert_eq!(h.backend.live_elements(), 1);
        assert_eq!(h.controller.status(), PlaybackStatus::Loading);
        assert_eq!(h.controller.state().duration, None);
    }

    #[test]
    fn test_no_url_with_text_is_fallback() {
        let mut h = harness();
        h.controller.set_source(AudioSource::none(), bonjour(), None);
        assert_eq!(h.controller.mode(), PlaybackMode::Fallback);
        assert_eq!(h.controller.status(), PlaybackStatus::Ready);
        assert_eq!(h.controller.state().duration, Some(1.0));
        assert!(h.controller.can_play());
        assert!(!h.controller.can_seek());
    }

    #[test]
    fn test_no_url_no_text_is_idle() {
        let mut h = harness();
        h.controller.set_source(AudioSource::none(), None, None);
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(!h.controller.can_play());
    }

    #[test]
    fn test_blob_source_requests_decode() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("blob:memory/1"), None, Some(3.0));
        let requests = h.backend.decode_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, h.controller.generation());
    }

    // =========================================================================
    // Native playback
    // =========================================================================

    #[test]
    fn test_metadata_marks_ready() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 2.4);
        assert_eq!(h.controller.status(), PlaybackStatus::Ready);
        assert!(h.controller.can_seek());
        assert_eq!(h.controller.time_label(), "0:00 / 0:02");
    }

    #[test]
    fn test_infinite_metadata_uses_floor_then_poll() {
        let mut h = harness();
        loaded(&mut h, "blob:memory/1", f64::INFINITY);
        assert_eq!(h.controller.state().duration, Some(1.0));

        h.backend.with_last_element(|e| e.duration = 4.6);
        h.clock.advance(500);
        h.controller.poll();
        assert_eq!(h.controller.state().duration, Some(4.6));
    }

    #[test]
    fn test_play_and_pause() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.play();
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
        assert!(h.backend.last_element().is_some_and(|e| e.playing));

        h.backend.with_last_element(|e| e.current_time = 1.25);
        h.controller.pause();
        assert_eq!(h.controller.status(), PlaybackStatus::Paused);
        assert!((h.controller.state().current_time - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pause_twice_is_noop() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.play();
        h.controller.pause();
        let before = h.controller.state();
        h.controller.pause();
        assert_eq!(h.controller.state(), before);
    }

    #[test]
    fn test_play_at_end_rewinds() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.backend.with_last_element(|e| {
            e.duration = 4.0;
            e.current_time = 4.0;
        });
        h.controller.play();
        assert!(h
            .backend
            .last_element()
            .is_some_and(|e| e.current_time.abs() < f64::EPSILON));
    }

    #[test]
    fn test_ended_resets_position() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.play();
        let generation = h.controller.generation();
        h.controller.handle_native_event(
            generation,
            NativeEvent::TimeUpdate {
                current_time: 3.9,
                duration: 4.0,
            },
        );
        h.controller.handle_native_event(generation, NativeEvent::Ended);
        assert_eq!(h.controller.status(), PlaybackStatus::Paused);
        assert!(h.controller.state().current_time.abs() < f64::EPSILON);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.seek(10.0);
        assert!((h.controller.state().current_time - 4.0).abs() < f64::EPSILON);
        h.controller.seek(-1.0);
        assert!(h.controller.state().current_time.abs() < f64::EPSILON);
    }

    // =========================================================================
    // Silent fallback
    // =========================================================================

    #[test]
    fn test_decode_error_switches_to_fallback() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("missing.mp3"), bonjour(), None);
        let generation = h.controller.generation();
        h.controller.handle_native_event(
            generation,
            NativeEvent::Error(PracticeError::DecodeFailure("404".into())),
        );
        assert_eq!(h.controller.mode(), PlaybackMode::Fallback);
        assert_eq!(h.controller.status(), PlaybackStatus::Ready);
        assert_eq!(h.controller.absorbed_errors(), 1);
        assert_eq!(h.backend.live_elements(), 0);
    }

    #[test]
    fn test_decode_error_without_text_fails() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("missing.mp3"), None, None);
        let generation = h.controller.generation();
        h.controller.handle_native_event(
            generation,
            NativeEvent::Error(PracticeError::DecodeFailure("404".into())),
        );
        assert_eq!(h.controller.status(), PlaybackStatus::Failed);
        assert!(!h.controller.can_play());
    }

    #[test]
    fn test_open_failure_switches_to_fallback() {
        let mut h = harness();
        h.backend.fail_open("bad.mp3");
        h.controller
            .set_source(AudioSource::url_of("bad.mp3"), bonjour(), None);
        assert_eq!(h.controller.mode(), PlaybackMode::Fallback);
        assert_eq!(h.controller.status(), PlaybackStatus::Ready);
    }

    #[test]
    fn test_timeout_switches_to_fallback() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("slow.mp3"), bonjour(), None);
        h.clock.advance(2999);
        h.controller.poll();
        assert_eq!(h.controller.status(), PlaybackStatus::Loading);

        h.clock.advance(1);
        h.controller.poll();
        assert_eq!(h.controller.status(), PlaybackStatus::Ready);
        assert_eq!(h.controller.mode(), PlaybackMode::Fallback);
        assert!(!h.controller.can_seek());
    }

    #[test]
    fn test_timeout_without_text_stays_native() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("slow.mp3"), None, None);
        h.clock.advance(3000);
        h.controller.poll();
        assert_eq!(h.controller.mode(), PlaybackMode::Native);
        assert_eq!(h.controller.status(), PlaybackStatus::Ready);
        assert_eq!(h.backend.live_elements(), 1);
    }

    #[test]
    fn test_rejected_play_speaks_immediately() {
        let mut h = harness();
        h.backend.reject_play("a.mp3");
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.play();
        assert_eq!(h.controller.mode(), PlaybackMode::Fallback);
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
        assert_eq!(h.speech.spoken()[0].text, "Bonjour");
    }

    #[test]
    fn test_async_rejection_speaks() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.play();
        let generation = h.controller.generation();
        h.controller.handle_native_event(
            generation,
            NativeEvent::PlayRejected(PracticeError::PlaybackRejected("NotAllowedError".into())),
        );
        assert_eq!(h.controller.mode(), PlaybackMode::Fallback);
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
        assert_eq!(h.speech.spoken().len(), 1);
    }

    #[test]
    fn test_seek_is_noop_in_fallback() {
        let mut h = harness();
        h.controller.set_source(AudioSource::none(), bonjour(), None);
        h.controller.seek(0.5);
        assert!(h.controller.state().current_time.abs() < f64::EPSILON);
    }

    #[test]
    fn test_fallback_progress_and_finish() {
        let mut h = harness();
        h.controller.set_source(AudioSource::none(), bonjour(), None);
        h.controller.play();
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);

        h.clock.advance(500);
        h.controller.poll();
        assert!((h.controller.state().current_time - 0.5).abs() < 1e-9);

        h.clock.advance(500);
        h.controller.poll();
        assert_eq!(h.controller.status(), PlaybackStatus::Paused);
        assert!(h.controller.state().current_time.abs() < f64::EPSILON);
    }

    #[test]
    fn test_fallback_pause_cancels_speech() {
        let mut h = harness();
        h.controller.set_source(AudioSource::none(), bonjour(), None);
        h.controller.play();
        h.clock.advance(300);
        h.controller.poll();
        h.controller.pause();
        assert_eq!(h.controller.status(), PlaybackStatus::Paused);
        assert!(h.controller.state().current_time.abs() < f64::EPSILON);
        assert!(!h.speech.is_speaking());
    }

    #[test]
    fn test_fallback_uses_hint_duration() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::none(), bonjour(), Some(2.0));
        h.controller.play();
        h.clock.advance(1500);
        h.controller.poll();
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
        assert_eq!(h.controller.time_label(), "0:02 / 0:02");
    }

    // =========================================================================
    // Stale callbacks
    // =========================================================================

    #[test]
    fn test_stale_events_are_dropped() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("a.mp3"), bonjour(), None);
        let old = h.controller.generation();
        h.controller
            .set_source(AudioSource::url_of("b.mp3"), bonjour(), None);

        h.controller.handle_native_event(
            old,
            NativeEvent::Error(PracticeError::DecodeFailure("late".into())),
        );
        h.controller.on_decoded_duration(old, 9.0);
        assert_eq!(h.controller.mode(), PlaybackMode::Native);
        assert_eq!(h.controller.status(), PlaybackStatus::Loading);
        assert_eq!(h.controller.state().duration, None);
    }

    #[test]
    fn test_stale_timeout_does_not_fire() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("a.mp3"), bonjour(), None);
        h.clock.advance(2000);
        h.controller
            .set_source(AudioSource::url_of("b.mp3"), bonjour(), None);
        h.clock.advance(1500);
        h.controller.poll();
        assert_eq!(h.controller.status(), PlaybackStatus::Loading);
    }

    #[test]
    fn test_decoded_duration_wins() {
        let mut h = harness();
        h.controller
            .set_source(AudioSource::url_of("blob:memory/1"), None, Some(3.0));
        let generation = h.controller.generation();
        h.controller.on_decoded_duration(generation, 3.4);
        assert_eq!(h.controller.state().duration, Some(3.4));
    }

    // =========================================================================
    // Volume
    // =========================================================================

    #[test]
    fn test_zero_volume_mutes_and_unmute_restores() {
        let mut h = harness();
        loaded(&mut h, "a.mp3", 4.0);
        h.controller.set_volume(0.6);
        h.controller.set_volume(0.0);
        assert!(h.controller.state().muted);

        h.controller.set_muted(false);
        let state = h.controller.state();
        assert!(!state.muted);
        assert!((state.volume - 0.6).abs() < f32::EPSILON);
        assert!(h
            .backend
            .last_element()
            .is_some_and(|e| (e.volume - 0.6).abs() < f32::EPSILON && !e.muted));
    }

    #[test]
    fn test_muted_fallback_speaks_silently() {
        let mut h = harness();
        h.controller.set_source(AudioSource::none(), bonjour(), None);
        h.controller.toggle_mute();
        h.controller.play();
        assert!(h.speech.spoken()[0].volume.abs() < f32::EPSILON);
    }

    #[test]
    fn test_drop_releases_resources() {
        let h = harness();
        let backend = h.backend.clone();
        let mut controller = h.controller;
        controller.set_source(AudioSource::url_of("a.mp3"), None, None);
        drop(controller);
        assert_eq!(backend.live_elements(), 0);
    }
}
