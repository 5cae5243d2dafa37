//! Microphone recording
//!
//! [`RecordingController`] runs one capture session at a time:
//!
//! ```text
//!   Idle ──start──► Requesting ──granted──► Recording ──stop/cap──► Stopping ──flushed──► Idle
//!                        │                                                       (callback)
//!                        └──denied──► Idle (error message)
//! ```
//!
//! A 1 s ticker counts elapsed seconds; reaching the cap stops the session
//! automatically. The reported duration is wall-clock time from start to
//! stop, clamped to the cap and rounded half-up, not a count of chunks. The completion callback fires
//! exactly once per successful session. Failures reset to `Idle`, release the
//! microphone and set a user-visible message instead.

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, Millis, Ticker};
use crate::duration::round_half_up;
use crate::error::{PracticeError, MICROPHONE_MESSAGE};
use crate::media::{AccessRequest, BlobStore, Generation, MicEvent, Microphone};
use crate::trace::{trace_enter, trace_event, trace_warn};

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Recording cap in seconds (default: 10)
    pub max_seconds: u32,
    /// Elapsed-counter tick in milliseconds (default: 1000)
    pub tick_ms: Millis,
    /// MIME type of the produced blob (default: `audio/webm`)
    pub mime_type: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_seconds: 10,
            tick_ms: 1000,
            mime_type: "audio/webm".to_string(),
        }
    }
}

impl RecorderConfig {
    /// Set the recording cap
    #[must_use]
    pub fn with_max_seconds(mut self, max_seconds: u32) -> Self {
        self.max_seconds = max_seconds;
        self
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No session
    Idle,
    /// Waiting for microphone permission
    Requesting,
    /// Capturing
    Recording,
    /// Waiting for the recorder to flush
    Stopping,
}

/// Result of a completed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingOutcome {
    /// Playable blob URL
    pub url: String,
    /// Recorded length in whole seconds
    pub duration_secs: u32,
}

type CompletionCallback = Box<dyn FnMut(RecordingOutcome)>;

/// Capped microphone recorder
pub struct RecordingController<M: Microphone, B: BlobStore, C: Clock> {
    mic: M,
    blobs: B,
    clock: C,
    config: RecorderConfig,

    state: RecordingState,
    session: Generation,
    started_at: Millis,
    stopped_at: Millis,
    elapsed_seconds: u32,
    ticker: Ticker,
    chunks: Vec<Vec<u8>>,

    last_url: Option<String>,
    error: Option<&'static str>,
    disabled: bool,
    on_complete: Option<CompletionCallback>,
}

impl<M: Microphone, B: BlobStore, C: Clock> RecordingController<M, B, C> {
    /// Create an idle recorder
    #[must_use]
    pub fn new(mic: M, blobs: B, clock: C, config: RecorderConfig) -> Self {
        let ticker = Ticker::new(config.tick_ms);
        Self {
            mic,
            blobs,
            clock,
            config,
            state: RecordingState::Idle,
            session: Generation::INITIAL,
            started_at: 0,
            stopped_at: 0,
            elapsed_seconds: 0,
            ticker,
            chunks: Vec::new(),
            last_url: None,
            error: None,
            disabled: false,
            on_complete: None,
        }
    }

    /// Register the completion callback
    pub fn on_complete(&mut self, callback: impl FnMut(RecordingOutcome) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Disable or enable starting new sessions
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    // =========================================================================
    // Session control
    // =========================================================================

    /// Request the microphone and start a session; a no-op unless idle
    pub fn start(&mut self) {
        let _guard = trace_enter!("recording.start");
        if !self.can_start() {
            return;
        }

        self.error = None;
        self.chunks.clear();
        self.elapsed_seconds = 0;
        self.session = self.session.next();
        self.state = RecordingState::Requesting;
        trace_event!(session = self.session.value(), "requesting microphone");

        match self.mic.request_access(self.session) {
            AccessRequest::Granted => self.begin(),
            AccessRequest::Pending => {}
            AccessRequest::Denied(err) => self.fail(err),
        }
    }

    fn begin(&mut self) {
        if let Err(err) = self.mic.start(self.session) {
            self.fail(err);
            return;
        }
        let now = self.clock.now_ms();
        self.started_at = now;
        self.stopped_at = now;
        self.ticker.start(now);
        self.state = RecordingState::Recording;
        trace_event!(session = self.session.value(), "recording started");
    }

    /// Stop the session
    ///
    /// While recording, the recorder is asked to flush and the outcome is
    /// delivered on [`MicEvent::Stopped`]. While still requesting
    /// permission, the session is abandoned without a callback.
    pub fn stop(&mut self) {
        match self.state {
            RecordingState::Recording => {
                // A late poll must not stretch the session past the cap
                let cap_at = self
                    .started_at
                    .saturating_add(Millis::from(self.config.max_seconds) * 1000);
                self.stopped_at = self.clock.now_ms().min(cap_at);
                self.ticker.stop();
                self.state = RecordingState::Stopping;
                self.mic.stop();
                trace_event!(
                    session = self.session.value(),
                    elapsed = self.elapsed_seconds,
                    "recording stopping"
                );
            }
            RecordingState::Requesting => {
                self.mic.release();
                self.reset();
                trace_event!("recording abandoned before permission");
            }
            RecordingState::Idle | RecordingState::Stopping => {}
        }
    }

    /// Advance the elapsed counter; stops automatically at the cap
    pub fn poll(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }
        let ticks = self.ticker.due(self.clock.now_ms());
        if ticks == 0 {
            return;
        }
        self.elapsed_seconds = self
            .elapsed_seconds
            .saturating_add(ticks)
            .min(self.config.max_seconds);
        if self.elapsed_seconds >= self.config.max_seconds {
            trace_event!(session = self.session.value(), "recording cap reached");
            self.stop();
        }
    }

    /// Apply a microphone event for `session`
    pub fn handle_mic_event(&mut self, session: Generation, event: MicEvent) {
        if session != self.session || self.state == RecordingState::Idle {
            trace_event!(stale = session.value(), "microphone event dropped");
            return;
        }

        match event {
            MicEvent::AccessGranted => {
                if self.state == RecordingState::Requesting {
                    self.begin();
                }
            }
            MicEvent::AccessDenied(err) => {
                if self.state == RecordingState::Requesting {
                    self.fail(err);
                }
            }
            MicEvent::Chunk(bytes) => {
                if !bytes.is_empty()
                    && matches!(self.state, RecordingState::Recording | RecordingState::Stopping)
                {
                    self.chunks.push(bytes);
                }
            }
            MicEvent::Stopped => {
                if self.state == RecordingState::Stopping {
                    self.finalize();
                }
            }
            MicEvent::Error(err) => self.fail(err),
        }
    }

    fn finalize(&mut self) {
        self.mic.release();

        let url = match self.blobs.create_url(&self.chunks, &self.config.mime_type) {
            Ok(url) => url,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let elapsed = self.stopped_at.saturating_sub(self.started_at) as f64 / 1000.0;
        let duration_secs = u32::try_from(round_half_up(elapsed)).unwrap_or(u32::MAX);

        if let Some(previous) = self.last_url.replace(url.clone()) {
            self.blobs.revoke(&previous);
        }
        self.reset();
        trace_event!(url = %url, duration_secs, "recording complete");

        if let Some(callback) = self.on_complete.as_mut() {
            callback(RecordingOutcome { url, duration_secs });
        }
    }

    fn fail(&mut self, err: PracticeError) {
        trace_warn!(error = %err, "recording failed");
        self.error = Some(err.user_message().unwrap_or(MICROPHONE_MESSAGE));
        if matches!(self.state, RecordingState::Recording) {
            self.mic.stop();
        }
        self.mic.release();
        self.reset();
    }

    /// Back to `Idle`; events from the finished session become stale
    fn reset(&mut self) {
        self.ticker.stop();
        self.chunks.clear();
        self.elapsed_seconds = 0;
        self.state = RecordingState::Idle;
        self.session = self.session.next();
    }

    // =========================================================================
    // UI state
    // =========================================================================

    /// Session state
    #[must_use]
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Current session token
    #[must_use]
    pub fn session(&self) -> Generation {
        self.session
    }

    /// Whole seconds elapsed in the current session
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    /// Recording cap in seconds
    #[must_use]
    pub fn max_seconds(&self) -> u32 {
        self.config.max_seconds
    }

    /// Whether a session can be started
    #[must_use]
    pub fn can_start(&self) -> bool {
        !self.disabled && self.state == RecordingState::Idle
    }

    /// Whether the stop control is usable
    #[must_use]
    pub fn can_stop(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Whether the record button is busy
    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(self.state, RecordingState::Requesting | RecordingState::Stopping)
    }

    /// Record button label
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self.state {
            RecordingState::Idle => "Start Recording",
            RecordingState::Requesting | RecordingState::Stopping => "Processing...",
            RecordingState::Recording => "Stop Recording",
        }
    }

    /// `"3s / 10s"`
    #[must_use]
    pub fn elapsed_label(&self) -> String {
        format!("{}s / {}s", self.elapsed_seconds, self.config.max_seconds)
    }

    /// Elapsed share of the cap, 0 to 100
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        if self.config.max_seconds == 0 {
            return 0;
        }
        self.elapsed_seconds.saturating_mul(100) / self.config.max_seconds
    }

    /// User-visible error from the last failed session
    #[must_use]
    pub fn error_message(&self) -> Option<&'static str> {
        self.error
    }

    /// The microphone
    #[must_use]
    pub fn microphone(&self) -> &M {
        &self.mic
    }
}

impl<M: Microphone, B: BlobStore, C: Clock> Drop for RecordingController<M, B, C> {
    fn drop(&mut self) {
        if self.state == RecordingState::Recording {
            self.mic.stop();
        }
        self.mic.release();
        self.ticker.stop();
    }
}

impl<M: Microphone, B: BlobStore, C: Clock> std::fmt::Debug for RecordingController<M, B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingController")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .field("chunks", &self.chunks.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
