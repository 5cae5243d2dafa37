//! Pronunciation practice widget
//!
//! All DOM creation and logic happens in Rust via `#[wasm_bindgen(start)]`.
//! The HTML file only imports the module.
//!
//! # Architecture
//!
//! ```text
//! browser callbacks ──push──> EventQueue ──drain (50 ms tick)──> App
//!                                                               │
//!   SelectionFlow · PlaybackController ×2 · RecordingController ┘──> render()
//! ```
//!
//! Optional configuration is read from
//! `<script id="widget-config" type="application/json">`.

pub mod host;

use std::cell::RefCell;

use pronunciation_guide::comparison::{ComparisonView, PanelView, SCORE_HEADING};
use pronunciation_guide::selection::{CONFIRM_LANGUAGE_CHANGE, NO_PHRASES};
use pronunciation_guide::waveform::{NATIVE_COLOR, USER_COLOR};
use pronunciation_guide::{
    Catalog, ComparisonPresenter, LanguageChange, PlaybackController, PlaybackStatus,
    PracticeTab, RandomScorer, RecordingController, SelectionFlow, WidgetConfig,
};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use host::{
    CanvasSurface, EventQueue, HostEvent, PerformanceClock, Player, WebAudioBackend,
    WebBlobStore, WebMicrophone, WebSpeech,
};

const POLL_INTERVAL_MS: i32 = 50;

type AudioPlayer = PlaybackController<WebAudioBackend, WebSpeech, PerformanceClock>;
type Recorder = RecordingController<WebMicrophone, WebBlobStore, PerformanceClock>;

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

/// DOM handles for one player column
struct PanelUi {
    root: web_sys::Element,
    play: web_sys::HtmlButtonElement,
    mute: web_sys::HtmlButtonElement,
    time: web_sys::Element,
    seek: web_sys::HtmlInputElement,
    canvas: Option<CanvasSurface>,
}

struct Ui {
    document: web_sys::Document,
    language: web_sys::HtmlSelectElement,
    phrases: web_sys::Element,
    tabs: web_sys::Element,
    practice_tab: web_sys::HtmlButtonElement,
    compare_tab: web_sys::HtmlButtonElement,
    practice: web_sys::Element,
    compare: web_sys::Element,
    awaiting: web_sys::Element,
    native_practice: PanelUi,
    native_compare: PanelUi,
    user_compare: PanelUi,
    record: web_sys::HtmlButtonElement,
    record_status: web_sys::Element,
    record_error: web_sys::Element,
    score: web_sys::Element,
}

struct App {
    flow: SelectionFlow<RandomScorer>,
    native: AudioPlayer,
    user: AudioPlayer,
    recorder: Recorder,
    presenter: ComparisonPresenter,
    native_samples: Option<Vec<f32>>,
    user_samples: Option<Vec<f32>>,
    waveforms_dirty: bool,
    queue: EventQueue,
    ui: Ui,
}

/// Entry point
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    info!("practice widget: initializing");

    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;
    let config = load_config(&document);

    let catalog = Catalog::builtin().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let flow = SelectionFlow::new(catalog, RandomScorer::new())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let queue = EventQueue::default();
    let native = PlaybackController::new(
        WebAudioBackend::new(Player::Native, queue.clone()),
        WebSpeech::new(Player::Native, queue.clone()),
        PerformanceClock::new(),
        config.playback.clone(),
    );
    let user = PlaybackController::new(
        WebAudioBackend::new(Player::User, queue.clone()),
        WebSpeech::new(Player::User, queue.clone()),
        PerformanceClock::new(),
        config.playback.clone(),
    );
    let mut recorder = RecordingController::new(
        WebMicrophone::new(queue.clone(), config.recorder.mime_type.clone()),
        WebBlobStore,
        PerformanceClock::new(),
        config.recorder.clone(),
    );
    let sink = queue.clone();
    recorder.on_complete(move |outcome| sink.push(HostEvent::Recorded(outcome)));

    let ui = build_ui(&document, &flow)?;
    let mut app = App {
        flow,
        native,
        user,
        recorder,
        presenter: ComparisonPresenter::new(config.waveform),
        native_samples: None,
        user_samples: None,
        waveforms_dirty: true,
        queue,
        ui,
    };
    app.render_phrases()?;
    app.render();
    APP.with(|slot| *slot.borrow_mut() = Some(app));

    wire_events(&document)?;
    start_poll_loop(&window)?;

    info!("practice widget: ready");
    Ok(())
}

fn load_config(document: &web_sys::Document) -> WidgetConfig {
    let Some(json) = document
        .get_element_by_id("widget-config")
        .and_then(|el| el.text_content())
    else {
        return WidgetConfig::default();
    };
    WidgetConfig::from_json(&json).unwrap_or_else(|err| {
        warn!(error = %err, "invalid widget config, using defaults");
        WidgetConfig::default()
    })
}

fn with_app(f: impl FnOnce(&mut App) -> Result<(), JsValue>) {
    APP.with(|slot| {
        if let Some(app) = slot.borrow_mut().as_mut() {
            if let Err(err) = f(app) {
                host::log_console_error(&host::js_message(&err));
            }
            app.render();
        }
    });
}

fn start_poll_loop(window: &web_sys::Window) -> Result<(), JsValue> {
    let tick = Closure::wrap(Box::new(move || with_app(App::tick)) as Box<dyn FnMut()>);
    window.set_interval_with_callback_and_timeout_and_arguments_0(
        tick.as_ref().unchecked_ref(),
        POLL_INTERVAL_MS,
    )?;
    tick.forget();
    Ok(())
}

// ============================================================================
// App
// ============================================================================

impl App {
    fn player(&mut self, player: Player) -> &mut AudioPlayer {
        match player {
            Player::Native => &mut self.native,
            Player::User => &mut self.user,
        }
    }

    fn tick(&mut self) -> Result<(), JsValue> {
        while let Some(event) = self.queue.pop() {
            self.dispatch(event);
        }
        self.native.poll();
        self.user.poll();
        self.recorder.poll();
        Ok(())
    }

    fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::Native {
                player,
                generation,
                event,
            } => self.player(player).handle_native_event(generation, event),
            HostEvent::Decoded {
                player,
                generation,
                seconds,
                samples,
            } => {
                let controller = self.player(player);
                controller.on_decoded_duration(generation, seconds);
                if controller.generation() == generation {
                    match player {
                        Player::Native => self.native_samples = Some(samples),
                        Player::User => self.user_samples = Some(samples),
                    }
                    self.waveforms_dirty = true;
                }
            }
            HostEvent::Speech {
                player,
                generation,
                event,
            } => self.player(player).handle_speech_event(generation, event),
            HostEvent::Mic { session, event } => self.recorder.handle_mic_event(session, event),
            HostEvent::Recorded(outcome) => {
                let result = self.flow.complete_recording(outcome);
                info!(score = result.score(), "attempt scored");
                self.user.set_source(
                    self.flow.user_source(),
                    None,
                    self.flow.user_duration().map(f64::from),
                );
                self.user_samples = None;
                self.waveforms_dirty = true;
            }
        }
    }

    fn select_phrase(&mut self, phrase_id: &str) -> Result<(), JsValue> {
        self.flow
            .select_phrase(phrase_id)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.native.set_source(
            self.flow.native_source(),
            self.flow.native_fallback(),
            self.flow.native_duration_hint(),
        );
        if let Some(url) = self.native.source().url() {
            host::spawn_decode(
                url.to_string(),
                Player::Native,
                self.native.generation(),
                self.queue.clone(),
            );
        }
        self.user.clear();
        self.native_samples = None;
        self.user_samples = None;
        self.waveforms_dirty = true;
        self.render_phrases()
    }

    fn change_language(&mut self, language_id: &str) -> Result<(), JsValue> {
        let change = self
            .flow
            .request_language_change(language_id)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let applied = match change {
            LanguageChange::Unchanged => false,
            LanguageChange::Applied => true,
            LanguageChange::NeedsConfirmation => {
                let window = web_sys::window().ok_or("No window")?;
                if window.confirm_with_message(CONFIRM_LANGUAGE_CHANGE)? {
                    self.flow.confirm_pending()
                } else {
                    self.flow.cancel_pending();
                    self.ui.language.set_value(self.flow.language_id());
                    false
                }
            }
        };
        if applied {
            self.native.clear();
            self.user.clear();
            self.native_samples = None;
            self.user_samples = None;
            self.waveforms_dirty = true;
            self.render_phrases()?;
        }
        Ok(())
    }

    fn set_tab(&mut self, tab: PracticeTab) {
        if self.flow.set_tab(tab) {
            self.waveforms_dirty = true;
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn render_phrases(&mut self) -> Result<(), JsValue> {
        let document = &self.ui.document;
        self.ui.phrases.set_inner_html("");
        let phrases = self.flow.phrases();
        if phrases.is_empty() {
            let empty = document.create_element("p")?;
            empty.set_text_content(Some(NO_PHRASES));
            self.ui.phrases.append_child(&empty)?;
            return Ok(());
        }
        let selected = self.flow.phrase().map(|p| p.id.clone());
        for phrase in phrases {
            let item = document.create_element("button")?;
            item.set_attribute("data-phrase", &phrase.id)?;
            item.set_class_name(if selected.as_deref() == Some(phrase.id.as_str()) {
                "phrase selected"
            } else {
                "phrase"
            });
            item.set_inner_html(&format!(
                "<strong>{}</strong><br><small>{}</small>",
                escape(&phrase.text),
                escape(&phrase.translation)
            ));
            self.ui.phrases.append_child(&item)?;
        }
        Ok(())
    }

    fn render(&mut self) {
        let shows_tabs = self.flow.shows_tabs();
        set_hidden(&self.ui.tabs, !shows_tabs);
        let tab = self.flow.tab();
        set_hidden(&self.ui.practice, !shows_tabs || tab != PracticeTab::Practice);
        set_hidden(&self.ui.compare, !shows_tabs || tab != PracticeTab::Compare);
        self.ui.compare_tab.set_disabled(!self.flow.can_compare());
        self.ui
            .practice_tab
            .set_class_name(if tab == PracticeTab::Practice { "tab active" } else { "tab" });
        self.ui
            .compare_tab
            .set_class_name(if tab == PracticeTab::Compare { "tab active" } else { "tab" });

        render_player(&self.ui.native_practice, &self.native);
        self.render_recorder();

        match self.presenter.present(
            &self.native,
            self.native_samples.as_deref(),
            &self.user,
            self.user_samples.as_deref(),
            self.flow.result(),
        ) {
            ComparisonView::AwaitingRecording { message } => {
                self.ui.awaiting.set_text_content(Some(message));
                set_hidden(&self.ui.awaiting, false);
                set_hidden(&self.ui.native_compare.root, true);
                set_hidden(&self.ui.user_compare.root, true);
                set_hidden(&self.ui.score, true);
            }
            ComparisonView::Ready {
                native,
                user,
                score,
            } => {
                set_hidden(&self.ui.awaiting, true);
                set_hidden(&self.ui.native_compare.root, false);
                set_hidden(&self.ui.user_compare.root, false);
                render_panel(&self.ui.native_compare, &native, &self.native);
                render_panel(&self.ui.user_compare, &user, &self.user);
                match score {
                    Some(score) => {
                        self.ui.score.set_inner_html(&format!(
                            "<h3>{SCORE_HEADING}</h3><span class=\"badge {}\">{}</span><p>{}</p>",
                            score.badge_class, score.percent_label, score.feedback
                        ));
                        set_hidden(&self.ui.score, false);
                    }
                    None => set_hidden(&self.ui.score, true),
                }
            }
        }

        if self.waveforms_dirty && tab == PracticeTab::Compare {
            self.paint_waveforms();
        }
    }

    fn render_recorder(&self) {
        let recorder = &self.recorder;
        self.ui.record.set_inner_text(recorder.status_text());
        self.ui
            .record
            .set_disabled(!recorder.can_start() && !recorder.can_stop());
        self.ui.record_status.set_text_content(Some(&format!(
            "{} ({}%)",
            recorder.elapsed_label(),
            recorder.progress_percent()
        )));
        self.ui.record_error.set_text_content(recorder.error_message());
    }

    fn paint_waveforms(&mut self) {
        if let Some(surface) = self.ui.native_compare.canvas.as_mut() {
            self.presenter
                .paint(surface, self.native_samples.as_deref(), NATIVE_COLOR);
        }
        if let Some(surface) = self.ui.user_compare.canvas.as_mut() {
            self.presenter
                .paint(surface, self.user_samples.as_deref(), USER_COLOR);
        }
        self.waveforms_dirty = false;
    }
}

fn render_player(panel: &PanelUi, player: &AudioPlayer) {
    let state = player.state();
    panel.play.set_inner_text(if state.status == PlaybackStatus::Playing {
        "Pause"
    } else {
        "Play"
    });
    panel.play.set_disabled(!player.can_play());
    panel
        .mute
        .set_inner_text(if state.muted { "Unmute" } else { "Mute" });
    panel.time.set_text_content(Some(&player.time_label()));
    panel.seek.set_disabled(!player.can_seek());
    panel
        .seek
        .set_max(&state.duration.unwrap_or(0.0).to_string());
    panel.seek.set_value_as_number(state.current_time);
}

fn render_panel(panel: &PanelUi, view: &PanelView, player: &AudioPlayer) {
    render_player(panel, player);
    panel.time.set_text_content(Some(&view.time_label));
}

// ============================================================================
// DOM construction
// ============================================================================

fn build_ui(
    document: &web_sys::Document,
    flow: &SelectionFlow<RandomScorer>,
) -> Result<Ui, JsValue> {
    let body = document.body().ok_or("No body")?;
    body.set_inner_html("");

    let main = create_element(document, "main", "practice")?;
    let title = create_element(document, "h1", "")?;
    title.set_text_content(Some("Pronunciation Guide"));
    main.append_child(&title)?;

    let language: web_sys::HtmlSelectElement = document.create_element("select")?.dyn_into()?;
    language.set_id("language");
    for entry in flow.catalog().languages() {
        let option = document.create_element("option")?;
        option.set_attribute("value", &entry.id)?;
        option.set_text_content(Some(&entry.label()));
        language.append_child(&option)?;
    }
    language.set_value(flow.language_id());
    main.append_child(&language)?;

    let phrases = create_element(document, "div", "phrases")?;
    phrases.set_id("phrases");
    main.append_child(&phrases)?;

    let tabs = create_element(document, "nav", "tabs")?;
    let practice_tab = create_button(document, "tab-practice", "Practice")?;
    let compare_tab = create_button(document, "tab-compare", "Compare")?;
    tabs.append_child(&practice_tab)?;
    tabs.append_child(&compare_tab)?;
    main.append_child(&tabs)?;

    let practice = create_element(document, "section", "practice-tab")?;
    let native_practice = build_panel(document, "native-practice", "Native Speaker", false)?;
    practice.append_child(&native_practice.root)?;
    let record = create_button(document, "record", "Start Recording")?;
    let record_status = create_element(document, "div", "record-status")?;
    let record_error = create_element(document, "div", "record-error")?;
    record_error.set_attribute("role", "alert")?;
    practice.append_child(&record)?;
    practice.append_child(&record_status)?;
    practice.append_child(&record_error)?;
    main.append_child(&practice)?;

    let compare = create_element(document, "section", "compare-tab")?;
    let awaiting = create_element(document, "p", "awaiting")?;
    let native_compare = build_panel(document, "native-compare", "Native Speaker", true)?;
    let user_compare = build_panel(document, "user-compare", "Your Recording", true)?;
    let score = create_element(document, "div", "score")?;
    score.set_attribute("aria-live", "polite")?;
    compare.append_child(&awaiting)?;
    compare.append_child(&native_compare.root)?;
    compare.append_child(&user_compare.root)?;
    compare.append_child(&score)?;
    main.append_child(&compare)?;

    body.append_child(&main)?;

    Ok(Ui {
        document: document.clone(),
        language,
        phrases,
        tabs,
        practice_tab,
        compare_tab,
        practice,
        compare,
        awaiting,
        native_practice,
        native_compare,
        user_compare,
        record,
        record_status,
        record_error,
        score,
    })
}

fn build_panel(
    document: &web_sys::Document,
    id: &str,
    title: &str,
    with_canvas: bool,
) -> Result<PanelUi, JsValue> {
    let root = create_element(document, "div", "panel")?;
    root.set_id(id);
    let heading = create_element(document, "h3", "")?;
    heading.set_text_content(Some(title));
    root.append_child(&heading)?;

    let canvas = if with_canvas {
        let canvas: web_sys::HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_width(300);
        canvas.set_height(80);
        root.append_child(&canvas)?;
        Some(CanvasSurface::new(canvas)?)
    } else {
        None
    };

    let play = create_button(document, &format!("{id}-play"), "Play")?;
    play.set_attribute("data-action", "play")?;
    let mute = create_button(document, &format!("{id}-mute"), "Mute")?;
    mute.set_attribute("data-action", "mute")?;
    let time = create_element(document, "span", "time")?;
    let seek: web_sys::HtmlInputElement = document.create_element("input")?.dyn_into()?;
    seek.set_type("range");
    seek.set_min("0");
    seek.set_step("0.01");
    seek.set_attribute("data-action", "seek")?;
    root.append_child(&play)?;
    root.append_child(&time)?;
    root.append_child(&seek)?;
    root.append_child(&mute)?;

    Ok(PanelUi {
        root,
        play,
        mute,
        time,
        seek,
        canvas,
    })
}

fn create_element(
    document: &web_sys::Document,
    tag: &str,
    class: &str,
) -> Result<web_sys::Element, JsValue> {
    let element = document.create_element(tag)?;
    if !class.is_empty() {
        element.set_class_name(class);
    }
    Ok(element)
}

fn create_button(
    document: &web_sys::Document,
    id: &str,
    text: &str,
) -> Result<web_sys::HtmlButtonElement, JsValue> {
    let button: web_sys::HtmlButtonElement = document.create_element("button")?.dyn_into()?;
    button.set_id(id);
    button.set_inner_text(text);
    Ok(button)
}

fn set_hidden(element: &web_sys::Element, hidden: bool) {
    let result = if hidden {
        element.set_attribute("hidden", "")
    } else {
        element.remove_attribute("hidden")
    };
    if let Err(err) = result {
        warn!(error = %host::js_message(&err), "could not toggle visibility");
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ============================================================================
// Event wiring
// ============================================================================

/// Which player a panel id belongs to
fn panel_player(panel_id: &str) -> Player {
    if panel_id.starts_with("user") {
        Player::User
    } else {
        Player::Native
    }
}

fn wire_events(document: &web_sys::Document) -> Result<(), JsValue> {
    let body = document.body().ok_or("No body")?;

    // One delegated click handler for every button
    let onclick = Closure::wrap(Box::new(move |event: web_sys::MouseEvent| {
        let Some(target) = event
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        else {
            return;
        };
        with_app(|app| handle_click(app, &target));
    }) as Box<dyn FnMut(_)>);
    body.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
    onclick.forget();

    let oninput = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let Some(input) = event
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let Some(panel) = input.closest(".panel").ok().flatten() else {
            return;
        };
        let player = panel_player(&panel.id());
        let seconds = input.value_as_number();
        with_app(|app| {
            app.player(player).seek(seconds);
            Ok(())
        });
    }) as Box<dyn FnMut(_)>);
    body.add_event_listener_with_callback("input", oninput.as_ref().unchecked_ref())?;
    oninput.forget();

    let onchange = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let Some(select) = event
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlSelectElement>().ok())
        else {
            return;
        };
        let language_id = select.value();
        with_app(|app| app.change_language(&language_id));
    }) as Box<dyn FnMut(_)>);
    body.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
    onchange.forget();

    Ok(())
}

fn handle_click(app: &mut App, target: &web_sys::Element) -> Result<(), JsValue> {
    if let Some(item) = target.closest("[data-phrase]")? {
        if let Some(phrase_id) = item.get_attribute("data-phrase") {
            return app.select_phrase(&phrase_id);
        }
    }
    let Some(button) = target.closest("button")? else {
        return Ok(());
    };
    match button.id().as_str() {
        "record" => {
            if app.recorder.can_stop() {
                app.recorder.stop();
            } else {
                app.recorder.start();
            }
        }
        "tab-practice" => app.set_tab(PracticeTab::Practice),
        "tab-compare" => app.set_tab(PracticeTab::Compare),
        _ => {
            let Some(panel) = button.closest(".panel")? else {
                return Ok(());
            };
            let player = app.player(panel_player(&panel.id()));
            match button.get_attribute("data-action").as_deref() {
                Some("play") => player.toggle_play(),
                Some("mute") => player.toggle_mute(),
                _ => {}
            }
        }
    }
    Ok(())
}
