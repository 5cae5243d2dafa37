//! In-memory media primitives
//!
//! Deterministic stand-ins for the browser APIs. They record every call so a
//! headless host (or a test) can inspect what the controllers did, and they
//! never produce events on their own: the host feeds events back explicitly.
//!
//! All types are cheap handles over shared state; clone one to keep an
//! inspection handle after moving the other into a controller.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::{
    AccessRequest, AudioBackend, AudioDecoder, BlobStore, Generation, Microphone, NativeAudio,
    SpeechSynthesizer, Utterance, Voice,
};
use crate::error::{PracticeError, PracticeResult};
use crate::trace::trace_event;

// ============================================================================
// Native audio
// ============================================================================

/// Observable state of one in-memory audio element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementState {
    /// URL the element was opened with
    pub url: String,
    /// Generation it was opened for
    pub generation: Generation,
    /// Whether the element is playing
    pub playing: bool,
    /// Play head in seconds
    pub current_time: f64,
    /// Reported duration
    pub duration: f64,
    /// Volume in [0, 1]
    pub volume: f32,
    /// Muted flag
    pub muted: bool,
    /// Whether `release()` was called
    pub released: bool,
    /// Number of `play()` calls
    pub play_calls: u32,
}

/// Element produced by [`MemoryAudioBackend`]
#[derive(Debug, Clone)]
pub struct MemoryAudio {
    state: Rc<RefCell<ElementState>>,
    reject_play: bool,
}

impl MemoryAudio {
    /// Snapshot of the element state
    #[must_use]
    pub fn snapshot(&self) -> ElementState {
        self.state.borrow().clone()
    }
}

impl NativeAudio for MemoryAudio {
    fn play(&mut self) -> PracticeResult<()> {
        let mut state = self.state.borrow_mut();
        state.play_calls += 1;
        if self.reject_play || state.released {
            return Err(PracticeError::PlaybackRejected(
                "The element has no supported sources".into(),
            ));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.state.borrow_mut().current_time = seconds;
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.released = true;
    }
}

#[derive(Default)]
struct BackendLog {
    elements: Vec<Rc<RefCell<ElementState>>>,
    decode_requests: Vec<(String, Generation)>,
    failing_urls: HashSet<String>,
    rejecting_urls: HashSet<String>,
    decoder: Option<(MemoryBlobStore, Box<dyn AudioDecoder>)>,
    decoded: Vec<(Generation, f64)>,
}

impl std::fmt::Debug for BackendLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendLog")
            .field("elements", &self.elements.len())
            .field("decode_requests", &self.decode_requests)
            .field("has_decoder", &self.decoder.is_some())
            .field("decoded", &self.decoded)
            .finish_non_exhaustive()
    }
}

/// In-memory [`AudioBackend`]
#[derive(Debug, Clone, Default)]
pub struct MemoryAudioBackend {
    log: Rc<RefCell<BackendLog>>,
}

impl MemoryAudioBackend {
    /// Create a backend whose elements accept every call
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail for `url`
    pub fn fail_open(&self, url: impl Into<String>) {
        self.log.borrow_mut().failing_urls.insert(url.into());
    }

    /// Make `play` reject for elements opened on `url`
    pub fn reject_play(&self, url: impl Into<String>) {
        self.log.borrow_mut().rejecting_urls.insert(url.into());
    }

    /// Number of elements opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.log.borrow().elements.len()
    }

    /// Number of elements not yet released
    #[must_use]
    pub fn live_elements(&self) -> usize {
        self.log
            .borrow()
            .elements
            .iter()
            .filter(|e| !e.borrow().released)
            .count()
    }

    /// State of the most recently opened element
    #[must_use]
    pub fn last_element(&self) -> Option<ElementState> {
        self.log.borrow().elements.last().map(|e| e.borrow().clone())
    }

    /// Mutate the most recently opened element (simulate platform progress)
    pub fn with_last_element(&self, f: impl FnOnce(&mut ElementState)) {
        if let Some(element) = self.log.borrow().elements.last() {
            f(&mut element.borrow_mut());
        }
    }

    /// Decode blob requests with `decoder`, reading payloads from `blobs`
    ///
    /// Without a decoder, requests are only logged.
    #[must_use]
    pub fn with_decoder(
        self,
        blobs: MemoryBlobStore,
        decoder: impl AudioDecoder + 'static,
    ) -> Self {
        self.log.borrow_mut().decoder = Some((blobs, Box::new(decoder)));
        self
    }

    /// Decode requests received so far
    #[must_use]
    pub fn decode_requests(&self) -> Vec<(String, Generation)> {
        self.log.borrow().decode_requests.clone()
    }

    /// Drain finished decodes as `(generation, seconds)`
    ///
    /// The host hands each one to the owning controller's
    /// `on_decoded_duration`.
    pub fn take_decoded(&self) -> Vec<(Generation, f64)> {
        std::mem::take(&mut self.log.borrow_mut().decoded)
    }
}

impl AudioBackend for MemoryAudioBackend {
    type Element = MemoryAudio;

    fn open(&mut self, url: &str, generation: Generation) -> PracticeResult<Self::Element> {
        let mut log = self.log.borrow_mut();
        if log.failing_urls.contains(url) {
            return Err(PracticeError::DecodeFailure(format!(
                "Audio error: cannot open {url}"
            )));
        }
        let state = Rc::new(RefCell::new(ElementState {
            url: url.to_string(),
            generation,
            playing: false,
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            released: false,
            play_calls: 0,
        }));
        log.elements.push(state.clone());
        Ok(MemoryAudio {
            state,
            reject_play: log.rejecting_urls.contains(url),
        })
    }

    fn request_decoded_duration(&mut self, url: &str, generation: Generation) {
        let mut log = self.log.borrow_mut();
        log.decode_requests.push((url.to_string(), generation));

        let Some((blobs, decoder)) = log.decoder.as_mut() else {
            return;
        };
        let Some(blob) = blobs.get(url) else {
            trace_event!(url, "decode skipped: unknown blob");
            return;
        };
        let decoded = decoder.decode(&blob.bytes);
        match decoded {
            Ok(audio) => log.decoded.push((generation, audio.duration())),
            Err(err) => trace_event!(url, error = %err, "decode skipped"),
        }
    }
}

// ============================================================================
// Speech synthesis
// ============================================================================

#[derive(Debug, Default)]
struct SpeechLog {
    voices: Vec<Voice>,
    spoken: Vec<(Utterance, Generation)>,
    cancels: u32,
    speaking: bool,
    unavailable: bool,
}

/// In-memory [`SpeechSynthesizer`]
#[derive(Debug, Clone, Default)]
pub struct MemorySpeech {
    log: Rc<RefCell<SpeechLog>>,
}

impl MemorySpeech {
    /// Create an engine with no voices
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine offering `voices`
    #[must_use]
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let speech = Self::default();
        speech.log.borrow_mut().voices = voices;
        speech
    }

    /// Make every `speak` call fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.log.borrow_mut().unavailable = unavailable;
    }

    /// Utterances spoken so far
    #[must_use]
    pub fn spoken(&self) -> Vec<Utterance> {
        self.log
            .borrow()
            .spoken
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }

    /// Generation of the last utterance
    #[must_use]
    pub fn last_generation(&self) -> Option<Generation> {
        self.log.borrow().spoken.last().map(|(_, g)| *g)
    }

    /// Number of `cancel` calls
    #[must_use]
    pub fn cancels(&self) -> u32 {
        self.log.borrow().cancels
    }

    /// Simulate the engine finishing on its own
    pub fn finish(&self) {
        self.log.borrow_mut().speaking = false;
    }
}

impl SpeechSynthesizer for MemorySpeech {
    fn voices(&self) -> Vec<Voice> {
        self.log.borrow().voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance, generation: Generation) -> PracticeResult<()> {
        let mut log = self.log.borrow_mut();
        if log.unavailable {
            return Err(PracticeError::Speech("speech synthesis unavailable".into()));
        }
        log.spoken.push((utterance.clone(), generation));
        log.speaking = true;
        Ok(())
    }

    fn cancel(&mut self) {
        let mut log = self.log.borrow_mut();
        log.cancels += 1;
        log.speaking = false;
    }

    fn is_speaking(&self) -> bool {
        self.log.borrow().speaking
    }
}

// ============================================================================
// Microphone
// ============================================================================

/// How [`MemoryMicrophone`] answers permission requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicPolicy {
    /// Grant immediately
    Grant,
    /// Leave the request pending; the host reports the answer
    Defer,
    /// Refuse immediately
    Deny,
    /// Grant, but fail when recording starts
    FailStart,
}

#[derive(Debug)]
struct MicLog {
    policy: MicPolicy,
    requests: Vec<Generation>,
    started: Vec<Generation>,
    stops: u32,
    releases: u32,
    live: bool,
}

/// In-memory [`Microphone`]
#[derive(Debug, Clone)]
pub struct MemoryMicrophone {
    log: Rc<RefCell<MicLog>>,
}

impl MemoryMicrophone {
    /// Create a microphone with the given permission policy
    #[must_use]
    pub fn new(policy: MicPolicy) -> Self {
        Self {
            log: Rc::new(RefCell::new(MicLog {
                policy,
                requests: Vec::new(),
                started: Vec::new(),
                stops: 0,
                releases: 0,
                live: false,
            })),
        }
    }

    /// Change the permission policy
    pub fn set_policy(&self, policy: MicPolicy) {
        self.log.borrow_mut().policy = policy;
    }

    /// Sessions that requested access
    #[must_use]
    pub fn requests(&self) -> Vec<Generation> {
        self.log.borrow().requests.clone()
    }

    /// Sessions that started recording
    #[must_use]
    pub fn started(&self) -> Vec<Generation> {
        self.log.borrow().started.clone()
    }

    /// Number of `stop` calls
    #[must_use]
    pub fn stops(&self) -> u32 {
        self.log.borrow().stops
    }

    /// Number of `release` calls
    #[must_use]
    pub fn releases(&self) -> u32 {
        self.log.borrow().releases
    }
}

impl Default for MemoryMicrophone {
    fn default() -> Self {
        Self::new(MicPolicy::Grant)
    }
}

impl Microphone for MemoryMicrophone {
    fn request_access(&mut self, session: Generation) -> AccessRequest {
        let mut log = self.log.borrow_mut();
        log.requests.push(session);
        match log.policy {
            MicPolicy::Grant | MicPolicy::FailStart => {
                log.live = true;
                AccessRequest::Granted
            }
            MicPolicy::Defer => {
                log.live = true;
                AccessRequest::Pending
            }
            MicPolicy::Deny => {
                AccessRequest::Denied(PracticeError::PermissionDenied("NotAllowedError".into()))
            }
        }
    }

    fn start(&mut self, session: Generation) -> PracticeResult<()> {
        let mut log = self.log.borrow_mut();
        if log.policy == MicPolicy::FailStart {
            return Err(PracticeError::Device("recorder failed to start".into()));
        }
        log.started.push(session);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.borrow_mut().stops += 1;
    }

    fn release(&mut self) {
        let mut log = self.log.borrow_mut();
        if log.live {
            log.releases += 1;
        }
        log.live = false;
    }

    fn is_live(&self) -> bool {
        self.log.borrow().live
    }
}

// ============================================================================
// Blob URLs
// ============================================================================

/// A blob created by [`MemoryBlobStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// URL handed out
    pub url: String,
    /// Joined bytes
    pub bytes: Vec<u8>,
    /// MIME type
    pub mime_type: String,
}

#[derive(Debug, Default)]
struct BlobLog {
    blobs: Vec<StoredBlob>,
    revoked: Vec<String>,
}

/// In-memory [`BlobStore`] handing out `blob:memory/<n>` URLs
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    log: Rc<RefCell<BlobLog>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blobs created so far
    #[must_use]
    pub fn blobs(&self) -> Vec<StoredBlob> {
        self.log.borrow().blobs.clone()
    }

    /// Look up a blob by URL
    #[must_use]
    pub fn get(&self, url: &str) -> Option<StoredBlob> {
        self.log.borrow().blobs.iter().find(|b| b.url == url).cloned()
    }

    /// URLs revoked so far
    #[must_use]
    pub fn revoked(&self) -> Vec<String> {
        self.log.borrow().revoked.clone()
    }
}

impl BlobStore for MemoryBlobStore {
    fn create_url(&mut self, chunks: &[Vec<u8>], mime_type: &str) -> PracticeResult<String> {
        let mut log = self.log.borrow_mut();
        let url = format!("blob:memory/{}", log.blobs.len() + 1);
        log.blobs.push(StoredBlob {
            url: url.clone(),
            bytes: chunks.concat(),
            mime_type: mime_type.to_string(),
        });
        Ok(url)
    }

    fn revoke(&mut self, url: &str) {
        self.log.borrow_mut().revoked.push(url.to_string());
    }
}
