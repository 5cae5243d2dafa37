//! Browser implementations of the media primitives
//!
//! Browser callbacks never call into the controllers. They push a
//! [`HostEvent`] onto the shared [`EventQueue`], which the widget drains on
//! its poll tick, so no callback runs while a controller is borrowed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use js_sys::{Array, Uint8Array};
use pronunciation_guide::clock::{Clock, Millis};
use pronunciation_guide::decode::WavDecoder;
use pronunciation_guide::diagnostics::is_benign_audio_error;
use pronunciation_guide::media::{
    AccessRequest, AudioBackend, AudioDecoder, BlobStore, Generation, MicEvent, Microphone,
    NativeAudio, NativeEvent, SpeechEvent, SpeechSynthesizer, Utterance, Voice,
};
use pronunciation_guide::waveform::{Rgb, Surface};
use pronunciation_guide::{PracticeError, PracticeResult, RecordingOutcome};
use tracing::debug;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

type Listener = Closure<dyn FnMut(web_sys::Event)>;
type Setter<T> = fn(&T, Option<&js_sys::Function>);

/// Which player an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    /// Native speaker sample
    Native,
    /// The learner's recording
    User,
}

/// Something the browser reported
#[derive(Debug)]
pub enum HostEvent {
    /// Audio element event
    Native {
        /// Owning player
        player: Player,
        /// Source generation
        generation: Generation,
        /// Event
        event: NativeEvent,
    },
    /// Full decode finished
    Decoded {
        /// Owning player
        player: Player,
        /// Source generation
        generation: Generation,
        /// Decoded length in seconds
        seconds: f64,
        /// First channel
        samples: Vec<f32>,
    },
    /// Speech synthesis event
    Speech {
        /// Owning player
        player: Player,
        /// Utterance generation
        generation: Generation,
        /// Event
        event: SpeechEvent,
    },
    /// Microphone or recorder event
    Mic {
        /// Recording session
        session: Generation,
        /// Event
        event: MicEvent,
    },
    /// A recording finished and has a blob URL
    Recorded(RecordingOutcome),
}

/// FIFO of browser events shared by every adapter
#[derive(Debug, Clone, Default)]
pub struct EventQueue(Rc<RefCell<VecDeque<HostEvent>>>);

impl EventQueue {
    /// Append an event
    pub fn push(&self, event: HostEvent) {
        self.0.borrow_mut().push_back(event);
    }

    /// Take the oldest event; the queue is not borrowed while it is handled
    pub fn pop(&self) -> Option<HostEvent> {
        self.0.borrow_mut().pop_front()
    }
}

/// Best-effort text for a thrown JS value
pub fn js_message(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn exception_name(value: &JsValue) -> Option<String> {
    value
        .dyn_ref::<web_sys::DomException>()
        .map(web_sys::DomException::name)
}

/// Map a `getUserMedia` / `MediaRecorder` failure onto the error taxonomy
pub fn mic_error(name: Option<&str>, message: String) -> PracticeError {
    match name {
        Some("NotAllowedError" | "SecurityError" | "PermissionDeniedError") => {
            PracticeError::PermissionDenied(message)
        }
        _ => PracticeError::Device(message),
    }
}

fn mic_error_from(value: &JsValue) -> PracticeError {
    mic_error(exception_name(value).as_deref(), js_message(value))
}

/// Whether a rejected `play()` promise needs the speech fallback
///
/// `AbortError` only means a later `pause()` or source change interrupted the
/// request.
pub fn play_rejection_matters(name: Option<&str>) -> bool {
    name != Some("AbortError")
}

// ============================================================================
// Clock
// ============================================================================

/// `performance.now()` clock
#[derive(Debug, Clone)]
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    /// Clock bound to the window's performance timeline
    #[must_use]
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Default for PerformanceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for PerformanceClock {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn now_ms(&self) -> Millis {
        self.performance
            .as_ref()
            .map_or(0, |p| p.now().max(0.0) as Millis)
    }
}

// ============================================================================
// Native audio
// ============================================================================

/// `HtmlAudioElement` factory
#[derive(Debug, Clone)]
pub struct WebAudioBackend {
    player: Player,
    queue: EventQueue,
}

impl WebAudioBackend {
    /// Backend whose events are tagged with `player`
    #[must_use]
    pub fn new(player: Player, queue: EventQueue) -> Self {
        Self { player, queue }
    }
}

impl AudioBackend for WebAudioBackend {
    type Element = WebAudio;

    fn open(&mut self, url: &str, generation: Generation) -> PracticeResult<WebAudio> {
        let element = web_sys::HtmlAudioElement::new_with_src(url)
            .map_err(|e| PracticeError::DecodeFailure(js_message(&e)))?;
        element.set_preload("auto");
        Ok(WebAudio::attach(element, self.player, generation, self.queue.clone()))
    }

    fn request_decoded_duration(&mut self, url: &str, generation: Generation) {
        spawn_decode(url.to_string(), self.player, generation, self.queue.clone());
    }
}

/// Fetch and decode `url` off the event loop, reporting [`HostEvent::Decoded`]
pub fn spawn_decode(url: String, player: Player, generation: Generation, queue: EventQueue) {
    wasm_bindgen_futures::spawn_local(async move {
        match decode_url(&url).await {
            Ok((seconds, samples)) => queue.push(HostEvent::Decoded {
                player,
                generation,
                seconds,
                samples,
            }),
            Err(err) => debug!(url = %url, error = %js_message(&err), "decode skipped"),
        }
    });
}

async fn decode_url(url: &str) -> Result<(f64, Vec<f32>), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!("HTTP {}", response.status())));
    }
    let bytes: js_sys::ArrayBuffer = JsFuture::from(response.array_buffer()?).await?.dyn_into()?;

    // WAV decodes synchronously in-crate; compressed formats need the browser
    if let Ok(audio) = WavDecoder.decode(&Uint8Array::new(&bytes).to_vec()) {
        return Ok((audio.duration(), audio.samples));
    }

    let context = web_sys::AudioContext::new()?;
    let decoded = JsFuture::from(context.decode_audio_data(&bytes)?).await;
    let _ = context.close();
    let buffer: web_sys::AudioBuffer = decoded?.dyn_into()?;
    Ok((buffer.duration(), buffer.get_channel_data(0)?))
}

/// One `<audio>` element plus its listeners
pub struct WebAudio {
    element: web_sys::HtmlAudioElement,
    listeners: Vec<(Setter<web_sys::HtmlElement>, Listener)>,
    player: Player,
    generation: Generation,
    queue: EventQueue,
}

impl WebAudio {
    fn attach(
        element: web_sys::HtmlAudioElement,
        player: Player,
        generation: Generation,
        queue: EventQueue,
    ) -> Self {
        let mut audio = Self {
            element,
            listeners: Vec::new(),
            player,
            generation,
            queue,
        };
        audio.listen(web_sys::HtmlElement::set_onloadedmetadata, |el| {
            Some(NativeEvent::LoadedMetadata {
                duration: el.duration(),
            })
        });
        audio.listen(web_sys::HtmlElement::set_oncanplay, |_| {
            Some(NativeEvent::CanPlay)
        });
        audio.listen(web_sys::HtmlElement::set_ondurationchange, |el| {
            Some(NativeEvent::DurationChange {
                duration: el.duration(),
            })
        });
        audio.listen(web_sys::HtmlElement::set_ontimeupdate, |el| {
            Some(NativeEvent::TimeUpdate {
                current_time: el.current_time(),
                duration: el.duration(),
            })
        });
        audio.listen(web_sys::HtmlElement::set_onended, |_| Some(NativeEvent::Ended));
        audio.listen(web_sys::HtmlElement::set_onerror, |el| {
            let message = el.error().map_or_else(
                || "unknown media error".to_string(),
                |e| format!("code {}: {}", e.code(), e.message()),
            );
            Some(NativeEvent::Error(PracticeError::DecodeFailure(message)))
        });
        audio
    }

    fn listen(
        &mut self,
        set: Setter<web_sys::HtmlElement>,
        map: impl Fn(&web_sys::HtmlAudioElement) -> Option<NativeEvent> + 'static,
    ) {
        let (element, queue) = (self.element.clone(), self.queue.clone());
        let (player, generation) = (self.player, self.generation);
        let listener = Closure::wrap(Box::new(move |_: web_sys::Event| {
            if let Some(event) = map(&element) {
                queue.push(HostEvent::Native {
                    player,
                    generation,
                    event,
                });
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        set(&self.element, Some(listener.as_ref().unchecked_ref()));
        self.listeners.push((set, listener));
    }
}

impl NativeAudio for WebAudio {
    fn play(&mut self) -> PracticeResult<()> {
        let promise = self
            .element
            .play()
            .map_err(|e| PracticeError::PlaybackRejected(js_message(&e)))?;
        let (queue, player, generation) = (self.queue.clone(), self.player, self.generation);
        wasm_bindgen_futures::spawn_local(async move {
            let Err(err) = JsFuture::from(promise).await else {
                return;
            };
            let message = js_message(&err);
            if !play_rejection_matters(exception_name(&err).as_deref()) {
                debug!(error = %message, "play request interrupted");
                return;
            }
            queue.push(HostEvent::Native {
                player,
                generation,
                event: NativeEvent::PlayRejected(PracticeError::PlaybackRejected(message)),
            });
        });
        Ok(())
    }

    fn pause(&mut self) {
        if let Err(err) = self.element.pause() {
            debug!(error = %js_message(&err), "pause failed");
        }
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.element.set_current_time(seconds);
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn set_volume(&mut self, volume: f32) {
        self.element.set_volume(f64::from(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.element.set_muted(muted);
    }

    fn release(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let _ = self.element.pause();
        for (set, _) in &self.listeners {
            set(&self.element, None);
        }
        self.listeners.clear();
        let _ = self.element.remove_attribute("src");
        self.element.load();
    }
}

impl Drop for WebAudio {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Speech synthesis
// ============================================================================

struct SpokenUtterance {
    utterance: web_sys::SpeechSynthesisUtterance,
    _listeners: Vec<Listener>,
}

impl Drop for SpokenUtterance {
    fn drop(&mut self) {
        self.utterance.set_onstart(None);
        self.utterance.set_onend(None);
        self.utterance.set_onerror(None);
    }
}

/// `window.speechSynthesis`
pub struct WebSpeech {
    player: Player,
    queue: EventQueue,
    synth: Option<web_sys::SpeechSynthesis>,
    current: Option<SpokenUtterance>,
}

impl WebSpeech {
    /// Speech engine whose events are tagged with `player`
    #[must_use]
    pub fn new(player: Player, queue: EventQueue) -> Self {
        let synth = web_sys::window().and_then(|w| w.speech_synthesis().ok());
        Self {
            player,
            queue,
            synth,
            current: None,
        }
    }

    fn platform_voices(&self) -> Vec<web_sys::SpeechSynthesisVoice> {
        self.synth.as_ref().map_or_else(Vec::new, |synth| {
            synth
                .get_voices()
                .iter()
                .filter_map(|v| v.dyn_into::<web_sys::SpeechSynthesisVoice>().ok())
                .collect()
        })
    }

    fn listener(
        &self,
        generation: Generation,
        map: impl Fn(&web_sys::Event) -> SpeechEvent + 'static,
    ) -> Listener {
        let (queue, player) = (self.queue.clone(), self.player);
        Closure::wrap(Box::new(move |event: web_sys::Event| {
            queue.push(HostEvent::Speech {
                player,
                generation,
                event: map(&event),
            });
        }) as Box<dyn FnMut(web_sys::Event)>)
    }
}

impl SpeechSynthesizer for WebSpeech {
    fn voices(&self) -> Vec<Voice> {
        self.platform_voices()
            .into_iter()
            .map(|v| Voice {
                name: v.name(),
                lang: v.lang(),
                is_default: v.default(),
            })
            .collect()
    }

    fn speak(&mut self, utterance: &Utterance, generation: Generation) -> PracticeResult<()> {
        let synth = self
            .synth
            .clone()
            .ok_or_else(|| PracticeError::Speech("speechSynthesis unavailable".into()))?;
        let spoken = web_sys::SpeechSynthesisUtterance::new_with_text(&utterance.text)
            .map_err(|e| PracticeError::Speech(js_message(&e)))?;
        spoken.set_lang(&utterance.lang);
        spoken.set_rate(utterance.rate);
        spoken.set_pitch(utterance.pitch);
        spoken.set_volume(utterance.volume);
        if let Some(voice) = &utterance.voice {
            let platform = self
                .platform_voices()
                .into_iter()
                .find(|v| v.name() == voice.name);
            spoken.set_voice(platform.as_ref());
        }

        let on_start = self.listener(generation, |_| SpeechEvent::Start);
        let on_end = self.listener(generation, |_| SpeechEvent::End);
        let on_error = self.listener(generation, |event| {
            let code = event
                .dyn_ref::<web_sys::SpeechSynthesisErrorEvent>()
                .map_or_else(|| "unknown".to_string(), |e| format!("{:?}", e.error()));
            SpeechEvent::Error(PracticeError::Speech(code))
        });
        spoken.set_onstart(Some(on_start.as_ref().unchecked_ref()));
        spoken.set_onend(Some(on_end.as_ref().unchecked_ref()));
        spoken.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.current = Some(SpokenUtterance {
            utterance: spoken.clone(),
            _listeners: vec![on_start, on_end, on_error],
        });
        synth.speak(&spoken);
        Ok(())
    }

    fn cancel(&mut self) {
        self.current = None;
        if let Some(synth) = &self.synth {
            synth.cancel();
        }
    }

    fn is_speaking(&self) -> bool {
        self.synth.as_ref().is_some_and(web_sys::SpeechSynthesis::speaking)
    }
}

// ============================================================================
// Microphone
// ============================================================================

#[derive(Default)]
struct MicShared {
    wanted: Option<Generation>,
    stream: Option<web_sys::MediaStream>,
    recorder: Option<web_sys::MediaRecorder>,
    pending_reads: u32,
    stop_seen: bool,
}

impl MicShared {
    fn stop_tracks(stream: &web_sys::MediaStream) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
                track.stop();
            }
        }
    }

    /// `Stopped` must follow the last chunk, whose bytes arrive asynchronously
    fn maybe_stopped(shared: &Rc<RefCell<Self>>, queue: &EventQueue, session: Generation) {
        let done = {
            let state = shared.borrow();
            state.stop_seen && state.pending_reads == 0
        };
        if done {
            shared.borrow_mut().stop_seen = false;
            queue.push(HostEvent::Mic {
                session,
                event: MicEvent::Stopped,
            });
        }
    }
}

/// `getUserMedia` + `MediaRecorder`
pub struct WebMicrophone {
    queue: EventQueue,
    mime_type: String,
    shared: Rc<RefCell<MicShared>>,
    listeners: Vec<Listener>,
}

impl WebMicrophone {
    /// Microphone recording in `mime_type` when the browser supports it
    #[must_use]
    pub fn new(queue: EventQueue, mime_type: impl Into<String>) -> Self {
        Self {
            queue,
            mime_type: mime_type.into(),
            shared: Rc::new(RefCell::new(MicShared::default())),
            listeners: Vec::new(),
        }
    }

    fn detach_recorder(&mut self) {
        if let Some(recorder) = self.shared.borrow_mut().recorder.take() {
            recorder.set_ondataavailable(None);
            recorder.set_onstop(None);
            recorder.set_onerror(None);
        }
        self.listeners.clear();
    }
}

impl Microphone for WebMicrophone {
    fn request_access(&mut self, session: Generation) -> AccessRequest {
        let devices = web_sys::window()
            .ok_or_else(|| JsValue::from_str("No window"))
            .and_then(|w| w.navigator().media_devices());
        let devices = match devices {
            Ok(devices) => devices,
            Err(err) => return AccessRequest::Denied(mic_error_from(&err)),
        };
        let constraints = web_sys::MediaStreamConstraints::new();
        constraints.set_audio(&JsValue::TRUE);
        let promise = match devices.get_user_media_with_constraints(&constraints) {
            Ok(promise) => promise,
            Err(err) => return AccessRequest::Denied(mic_error_from(&err)),
        };

        self.shared.borrow_mut().wanted = Some(session);
        let (shared, queue) = (Rc::clone(&self.shared), self.queue.clone());
        wasm_bindgen_futures::spawn_local(async move {
            let result = JsFuture::from(promise)
                .await
                .and_then(|v| v.dyn_into::<web_sys::MediaStream>().map_err(JsValue::from));
            let event = match result {
                Ok(stream) => {
                    if shared.borrow().wanted != Some(session) {
                        // Abandoned while the prompt was open
                        MicShared::stop_tracks(&stream);
                        return;
                    }
                    shared.borrow_mut().stream = Some(stream);
                    MicEvent::AccessGranted
                }
                Err(err) => MicEvent::AccessDenied(mic_error_from(&err)),
            };
            queue.push(HostEvent::Mic { session, event });
        });
        AccessRequest::Pending
    }

    fn start(&mut self, session: Generation) -> PracticeResult<()> {
        let stream = self
            .shared
            .borrow()
            .stream
            .clone()
            .ok_or_else(|| PracticeError::Device("no microphone stream".into()))?;
        let options = web_sys::MediaRecorderOptions::new();
        if web_sys::MediaRecorder::is_type_supported(&self.mime_type) {
            options.set_mime_type(&self.mime_type);
        }
        let recorder =
            web_sys::MediaRecorder::new_with_media_stream_and_media_recorder_options(&stream, &options)
                .map_err(|e| mic_error_from(&e))?;

        let (shared, queue) = (Rc::clone(&self.shared), self.queue.clone());
        let on_data = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Some(blob) = event
                .dyn_ref::<web_sys::BlobEvent>()
                .and_then(web_sys::BlobEvent::data)
            else {
                return;
            };
            shared.borrow_mut().pending_reads += 1;
            let (shared, queue) = (Rc::clone(&shared), queue.clone());
            wasm_bindgen_futures::spawn_local(async move {
                match JsFuture::from(blob.array_buffer()).await {
                    Ok(buffer) => queue.push(HostEvent::Mic {
                        session,
                        event: MicEvent::Chunk(Uint8Array::new(&buffer).to_vec()),
                    }),
                    Err(err) => debug!(error = %js_message(&err), "chunk read failed"),
                }
                shared.borrow_mut().pending_reads -= 1;
                MicShared::maybe_stopped(&shared, &queue, session);
            });
        }) as Box<dyn FnMut(web_sys::Event)>);

        let (shared, queue) = (Rc::clone(&self.shared), self.queue.clone());
        let on_stop = Closure::wrap(Box::new(move |_: web_sys::Event| {
            shared.borrow_mut().stop_seen = true;
            MicShared::maybe_stopped(&shared, &queue, session);
        }) as Box<dyn FnMut(web_sys::Event)>);

        let queue = self.queue.clone();
        let on_error = Closure::wrap(Box::new(move |_: web_sys::Event| {
            queue.push(HostEvent::Mic {
                session,
                event: MicEvent::Error(PracticeError::Device("MediaRecorder error".into())),
            });
        }) as Box<dyn FnMut(web_sys::Event)>);

        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));
        recorder.set_onstop(Some(on_stop.as_ref().unchecked_ref()));
        recorder.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        recorder.start().map_err(|e| mic_error_from(&e))?;

        {
            let mut state = self.shared.borrow_mut();
            state.recorder = Some(recorder);
            state.pending_reads = 0;
            state.stop_seen = false;
        }
        self.listeners = vec![on_data, on_stop, on_error];
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(recorder) = &self.shared.borrow().recorder {
            if let Err(err) = recorder.stop() {
                debug!(error = %js_message(&err), "recorder stop failed");
            }
        }
    }

    fn release(&mut self) {
        self.detach_recorder();
        let mut state = self.shared.borrow_mut();
        state.wanted = None;
        if let Some(stream) = state.stream.take() {
            MicShared::stop_tracks(&stream);
        }
    }

    fn is_live(&self) -> bool {
        let state = self.shared.borrow();
        state.stream.is_some() || state.wanted.is_some()
    }
}

impl Drop for WebMicrophone {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Blob URLs
// ============================================================================

/// `URL.createObjectURL` store
#[derive(Debug, Clone, Copy, Default)]
pub struct WebBlobStore;

impl BlobStore for WebBlobStore {
    fn create_url(&mut self, chunks: &[Vec<u8>], mime_type: &str) -> PracticeResult<String> {
        let parts = Array::new();
        for chunk in chunks {
            parts.push(&Uint8Array::from(chunk.as_slice()));
        }
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(mime_type);
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| PracticeError::Device(js_message(&e)))?;
        web_sys::Url::create_object_url_with_blob(&blob)
            .map_err(|e| PracticeError::Device(js_message(&e)))
    }

    fn revoke(&mut self, url: &str) {
        if let Err(err) = web_sys::Url::revoke_object_url(url) {
            debug!(url, error = %js_message(&err), "revoke failed");
        }
    }
}

// ============================================================================
// Canvas
// ============================================================================

/// 2D canvas drawing surface
pub struct CanvasSurface {
    canvas: web_sys::HtmlCanvasElement,
    context: web_sys::CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Wrap a canvas
    ///
    /// # Errors
    ///
    /// Fails if the canvas has no 2D context.
    pub fn new(canvas: web_sys::HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or("No 2d context")?
            .dyn_into::<web_sys::CanvasRenderingContext2d>()?;
        Ok(Self { canvas, context })
    }
}

impl Surface for CanvasSurface {
    fn width(&self) -> f64 {
        f64::from(self.canvas.width())
    }

    fn height(&self) -> f64 {
        f64::from(self.canvas.height())
    }

    fn clear(&mut self) {
        self.context.clear_rect(0.0, 0.0, self.width(), self.height());
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb) {
        self.context.set_fill_style_str(&color.to_string());
        self.context.fill_rect(x, y, w, h);
    }
}

/// Forward browser console noise only when it is not a recovered audio failure
pub fn log_console_error(message: &str) {
    if is_benign_audio_error(message) {
        debug!(message, "benign audio error suppressed");
    } else {
        web_sys::console::error_1(&JsValue::from_str(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mic_error_mapping() {
        assert!(matches!(
            mic_error(Some("NotAllowedError"), "denied".into()),
            PracticeError::PermissionDenied(_)
        ));
        assert!(matches!(
            mic_error(Some("NotFoundError"), "no device".into()),
            PracticeError::Device(_)
        ));
        assert!(matches!(mic_error(None, "?".into()), PracticeError::Device(_)));
    }

    #[test]
    fn test_abort_rejection_is_ignored() {
        assert!(!play_rejection_matters(Some("AbortError")));
        assert!(play_rejection_matters(Some("NotAllowedError")));
        assert!(play_rejection_matters(None));
    }
}
