//! End-to-end practice flow
//!
//! Drives the controllers the way the widget does, against the in-memory
//! host: select a phrase, play the native sample (with and without a working
//! URL), record an attempt, and compare.

use std::cell::RefCell;
use std::rc::Rc;

use pronunciation_guide::comparison::{ComparisonPresenter, ComparisonView, AWAITING_RECORDING};
use pronunciation_guide::decode::WavDecoder;
use pronunciation_guide::media::memory::{
    MemoryAudioBackend, MemoryBlobStore, MemoryMicrophone, MemorySpeech, MicPolicy,
};
use pronunciation_guide::media::{MicEvent, Microphone, NativeEvent, Voice};
use pronunciation_guide::playback::PlaybackConfig;
use pronunciation_guide::recording::RecorderConfig;
use pronunciation_guide::waveform::{RecordingSurface, WaveformConfig, USER_COLOR};
use pronunciation_guide::{
    AudioSource, Catalog, DurationSource, FeedbackTier, FixedScorer, ManualClock, PlaybackController,
    PlaybackMode, PlaybackStatus, PracticeTab, RecordingController, RecordingOutcome,
    RecordingState, SelectionFlow,
};

type Player = PlaybackController<MemoryAudioBackend, MemorySpeech, ManualClock>;
type Recorder = RecordingController<MemoryMicrophone, MemoryBlobStore, ManualClock>;

struct Widget {
    flow: SelectionFlow<FixedScorer>,
    native: Player,
    user: Player,
    recorder: Recorder,
    outcomes: Rc<RefCell<Vec<RecordingOutcome>>>,
    backend: MemoryAudioBackend,
    speech: MemorySpeech,
    mic: MemoryMicrophone,
    blobs: MemoryBlobStore,
    clock: ManualClock,
}

fn widget(score: u8) -> Widget {
    let blobs = MemoryBlobStore::new();
    let backend = MemoryAudioBackend::new().with_decoder(blobs.clone(), WavDecoder);
    let speech = MemorySpeech::with_voices(vec![
        Voice::new("Google US English", "en-US"),
        Voice::new("Thomas", "fr-FR"),
        Voice::new("Anna", "de-DE"),
    ]);
    let mic = MemoryMicrophone::new(MicPolicy::Grant);
    let clock = ManualClock::new();

    let catalog = Catalog::builtin().expect("builtin catalog");
    let flow = SelectionFlow::new(catalog, FixedScorer(score)).expect("flow");
    let native = PlaybackController::new(
        backend.clone(),
        speech.clone(),
        clock.clone(),
        PlaybackConfig::default(),
    );
    let user = PlaybackController::new(
        backend.clone(),
        speech.clone(),
        clock.clone(),
        PlaybackConfig::default(),
    );
    let mut recorder = RecordingController::new(
        mic.clone(),
        blobs.clone(),
        clock.clone(),
        RecorderConfig::default(),
    );
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&outcomes);
    recorder.on_complete(move |outcome| sink.borrow_mut().push(outcome));

    Widget {
        flow,
        native,
        user,
        recorder,
        outcomes,
        backend,
        speech,
        mic,
        blobs,
        clock,
    }
}

impl Widget {
    fn load_native(&mut self) {
        self.native.set_source(
            self.flow.native_source(),
            self.flow.native_fallback(),
            self.flow.native_duration_hint(),
        );
    }

    fn step(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.native.poll();
        self.user.poll();
        self.recorder.poll();
    }

    /// Hand finished blob decodes to the user player, the only blob owner
    fn deliver_decodes(&mut self) {
        for (generation, seconds) in self.backend.take_decoded() {
            self.user.on_decoded_duration(generation, seconds);
        }
    }

    fn record_for(&mut self, ms: u64, chunk_every: u64) {
        self.recorder.start();
        let session = self.recorder.session();
        let mut elapsed = 0;
        while elapsed < ms && self.recorder.state() == RecordingState::Recording {
            self.step(chunk_every);
            elapsed += chunk_every;
            self.recorder
                .handle_mic_event(session, MicEvent::Chunk(vec![elapsed as u8]));
        }
        self.recorder.stop();
        self.recorder.handle_mic_event(session, MicEvent::Stopped);
    }

    fn deliver_recording(&mut self) {
        let outcome = self.outcomes.borrow().last().cloned().expect("recording");
        self.flow.complete_recording(outcome);
        self.user
            .set_source(self.flow.user_source(), None, self.flow.user_duration().map(f64::from));
    }
}

// ============================================================================
// Native playback falls back to speech
// ============================================================================

#[test]
fn test_unreachable_native_audio_speaks_bonjour() {
    let mut w = widget(80);
    w.flow.select_language("fr-FR").expect("fr-FR");
    w.flow.select_phrase("fr-1").expect("fr-1");
    w.load_native();
    assert_eq!(w.native.status(), PlaybackStatus::Loading);
    assert!(!w.native.can_play());

    // Neither metadata nor an error ever arrives
    w.step(3000);
    assert_eq!(w.native.mode(), PlaybackMode::Fallback);
    assert_eq!(w.native.status(), PlaybackStatus::Ready);
    assert_eq!(w.backend.live_elements(), 0);

    w.native.play();
    assert_eq!(w.native.status(), PlaybackStatus::Playing);
    let spoken = w.speech.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "Bonjour");
    assert_eq!(spoken[0].lang, "fr-FR");
    assert_eq!(spoken[0].voice.as_ref().map(|v| v.name.as_str()), Some("Thomas"));

    // "Bonjour" is 7 characters: 560 ms estimate, floored to one second
    assert_eq!(w.native.state().duration, Some(1.0));
    w.step(500);
    assert_eq!(w.native.time_label(), "0:01 / 0:01");
    w.step(500);
    assert_eq!(w.native.status(), PlaybackStatus::Paused);
    assert!(w.native.state().current_time.abs() < f64::EPSILON);
}

#[test]
fn test_seek_is_ignored_after_timeout_fallback() {
    let mut w = widget(80);
    w.flow.select_language("fr-FR").expect("fr-FR");
    w.flow.select_phrase("fr-2").expect("fr-2");
    w.load_native();
    w.step(3000);
    assert!(!w.native.can_seek());

    let before = w.native.state();
    w.native.seek(0.4);
    assert_eq!(w.native.state(), before);
}

#[test]
fn test_decode_error_is_never_user_visible() {
    let mut w = widget(80);
    w.flow.select_phrase("es-1").expect("es-1");
    w.load_native();
    let generation = w.native.generation();
    w.native.handle_native_event(
        generation,
        NativeEvent::Error(pronunciation_guide::PracticeError::DecodeFailure(
            "MEDIA_ERR_SRC_NOT_SUPPORTED".into(),
        )),
    );
    assert_eq!(w.native.mode(), PlaybackMode::Fallback);
    assert!(w.native.can_play());
    assert_eq!(w.native.absorbed_errors(), 1);
    assert!(w.recorder.error_message().is_none());
}

#[test]
fn test_changing_phrase_resets_native_player() {
    let mut w = widget(80);
    w.flow.select_phrase("es-1").expect("es-1");
    w.load_native();
    let generation = w.native.generation();
    w.native
        .handle_native_event(generation, NativeEvent::LoadedMetadata { duration: 1.5 });
    w.native.play();
    w.backend.with_last_element(|e| e.current_time = 0.7);
    w.step(100);

    w.flow.select_phrase("es-2").expect("es-2");
    w.load_native();
    let state = w.native.state();
    assert_eq!(state.status, PlaybackStatus::Loading);
    assert!(state.current_time.abs() < f64::EPSILON);
    assert_eq!(w.backend.live_elements(), 1);
}

#[test]
fn test_pause_is_idempotent() {
    let mut w = widget(80);
    w.flow.select_phrase("es-1").expect("es-1");
    w.load_native();
    let generation = w.native.generation();
    w.native
        .handle_native_event(generation, NativeEvent::LoadedMetadata { duration: 1.5 });
    w.native.play();
    w.native.pause();
    let paused = w.native.state();
    w.native.pause();
    assert_eq!(w.native.state(), paused);
}

// ============================================================================
// Recording
// ============================================================================

#[test]
fn test_capped_recording_completes_once() {
    let mut w = widget(80);
    w.flow.select_phrase("es-1").expect("es-1");
    w.recorder.start();
    let session = w.recorder.session();

    for _ in 0..10 {
        w.step(1000);
        w.recorder.handle_mic_event(session, MicEvent::Chunk(vec![0xAB]));
    }
    // The cap stopped the recorder without a manual stop
    assert_eq!(w.recorder.state(), RecordingState::Stopping);
    assert_eq!(w.mic.stops(), 1);
    assert_eq!(w.recorder.elapsed_seconds(), 10);

    // Further ticks never exceed the cap or stop again
    w.step(5000);
    assert_eq!(w.mic.stops(), 1);

    w.recorder.handle_mic_event(session, MicEvent::Stopped);
    assert_eq!(w.outcomes.borrow().len(), 1);
    assert_eq!(w.outcomes.borrow()[0].duration_secs, 10);
    assert!(!w.mic.is_live());

    // Late chunks from the finished session are ignored
    w.recorder.handle_mic_event(session, MicEvent::Chunk(vec![1]));
    w.recorder.handle_mic_event(session, MicEvent::Stopped);
    assert_eq!(w.outcomes.borrow().len(), 1);
    let url = w.outcomes.borrow()[0].url.clone();
    assert_eq!(w.blobs.get(&url).map(|b| b.bytes.len()), Some(10));
}

#[test]
fn test_permission_denied_is_shown() {
    let mut w = widget(80);
    w.mic.set_policy(MicPolicy::Deny);
    w.recorder.start();
    assert_eq!(w.recorder.state(), RecordingState::Idle);
    assert_eq!(
        w.recorder.error_message(),
        Some(pronunciation_guide::error::MICROPHONE_MESSAGE)
    );
    assert!(w.outcomes.borrow().is_empty());
}

// ============================================================================
// Compare
// ============================================================================

#[test]
fn test_full_practice_round() {
    let mut w = widget(92);
    w.flow.select_language("de-DE").expect("de-DE");
    w.flow.select_phrase("de-1").expect("de-1");
    w.load_native();

    let presenter = ComparisonPresenter::new(WaveformConfig::default());
    assert_eq!(
        presenter.present(&w.native, None, &w.user, None, w.flow.result()),
        ComparisonView::AwaitingRecording {
            message: AWAITING_RECORDING
        }
    );

    w.record_for(2400, 400);
    assert_eq!(w.outcomes.borrow().len(), 1);
    w.deliver_recording();

    assert_eq!(w.flow.tab(), PracticeTab::Compare);
    assert_eq!(w.flow.user_duration(), Some(2));
    assert!(w.user.source().is_blob());
    assert_eq!(w.backend.decode_requests().len(), 1);

    let samples: Vec<f32> = (0..4000).map(|i| ((i as f32) * 0.05).sin()).collect();
    match presenter.present(&w.native, None, &w.user, Some(&samples), w.flow.result()) {
        ComparisonView::Ready {
            native,
            user,
            score: Some(score),
        } => {
            assert!(!native.has_samples);
            assert!(user.has_samples);
            assert_eq!(user.bars.len(), 100);
            assert_eq!(native.bars.len(), 50);
            assert_eq!(score.score, 92);
            assert_eq!(score.tier, FeedbackTier::Excellent);
        }
        other => panic!("expected comparison, got {other:?}"),
    }

    let mut surface = RecordingSurface::new(300.0, 100.0);
    presenter.paint(&mut surface, Some(&samples), USER_COLOR);
    assert_eq!(surface.bars(USER_COLOR).count(), 100);
}

#[test]
fn test_second_recording_revokes_first() {
    let mut w = widget(70);
    w.flow.select_phrase("es-3").expect("es-3");
    w.record_for(1000, 500);
    w.deliver_recording();
    let first = w.flow.user_source().url().map(str::to_owned).expect("url");

    w.record_for(2000, 500);
    w.deliver_recording();
    let second = w.flow.user_source().url().map(str::to_owned).expect("url");

    assert_ne!(first, second);
    assert_eq!(w.blobs.revoked(), vec![first]);
    assert_eq!(w.flow.result().map(|r| r.tier()), Some(FeedbackTier::GoodEffort));
}

/// Mono 16-bit PCM WAV of silence
fn silent_wav(frames: usize, sample_rate: u32) -> Vec<u8> {
    let data_len = (frames * 2) as u32;
    let mut out = Vec::with_capacity(44 + frames * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(44 + frames * 2, 0);
    out
}

#[test]
fn test_decoded_blob_supersedes_short_hint() {
    let mut w = widget(75);
    w.flow.select_phrase("es-1").expect("es-1");

    // One second of wall clock, but the payload holds 3.4 s of audio
    w.recorder.start();
    let session = w.recorder.session();
    w.step(1000);
    w.recorder
        .handle_mic_event(session, MicEvent::Chunk(silent_wav(27_200, 8_000)));
    w.recorder.stop();
    w.recorder.handle_mic_event(session, MicEvent::Stopped);
    assert_eq!(w.outcomes.borrow()[0].duration_secs, 1);

    w.deliver_recording();
    assert_eq!(w.user.resolver().source(), Some(DurationSource::Hint));
    assert_eq!(w.user.time_label(), "0:00 / 0:01");

    w.deliver_decodes();
    assert_eq!(w.user.resolver().source(), Some(DurationSource::Decoded));
    let seconds = w.user.resolver().resolved().expect("resolved");
    assert!((seconds - 3.4).abs() < 1e-9);
    assert_eq!(w.user.time_label(), "0:00 / 0:03");
}

#[test]
fn test_undecodable_blob_keeps_hint() {
    let mut w = widget(75);
    w.flow.select_phrase("es-1").expect("es-1");
    w.record_for(2000, 500);
    w.deliver_recording();

    w.deliver_decodes();
    assert_eq!(w.backend.decode_requests().len(), 1);
    assert_eq!(w.user.resolver().source(), Some(DurationSource::Hint));
    assert_eq!(w.user.time_label(), "0:00 / 0:02");
}

#[test]
fn test_language_change_after_recording_needs_confirmation() {
    let mut w = widget(85);
    w.flow.select_phrase("es-1").expect("es-1");
    w.record_for(1000, 500);
    w.deliver_recording();

    let change = w.flow.request_language_change("ja-JP").expect("ja-JP");
    assert_eq!(change, pronunciation_guide::LanguageChange::NeedsConfirmation);
    assert_eq!(w.flow.language_id(), "es-ES");

    assert!(w.flow.confirm_pending());
    assert_eq!(w.flow.language_id(), "ja-JP");
    assert!(w.flow.user_source().is_none());
    w.user.set_source(AudioSource::none(), None, None);
    assert_eq!(w.user.status(), PlaybackStatus::Idle);
}
