//! Language/phrase selection and tab flow
//!
//! [`SelectionFlow`] owns what is selected and which audio URLs the players
//! should be showing. It never touches a player itself; the host reads
//! [`SelectionFlow::native_source`] and [`SelectionFlow::user_source`] after
//! each action and hands them to its controllers.

use crate::catalog::{Catalog, Language, Phrase};
use crate::comparison::ComparisonResult;
use crate::error::{PracticeError, PracticeResult};
use crate::media::AudioSource;
use crate::recording::RecordingOutcome;
use crate::scoring::Scorer;
use crate::speech::FallbackSpeech;
use crate::trace::trace_event;

/// Shown when a language has no phrases
pub const NO_PHRASES: &str = "No phrases available for the selected language.";

/// Asked before a language change discards a recording
pub const CONFIRM_LANGUAGE_CHANGE: &str =
    "Changing the language will discard your recording. Continue?";

/// Visible tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeTab {
    /// Listen and record
    Practice,
    /// Side-by-side comparison
    Compare,
}

/// Outcome of a language change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageChange {
    /// Already selected
    Unchanged,
    /// Switched
    Applied,
    /// A recording would be lost; call `confirm_pending` or `cancel_pending`
    NeedsConfirmation,
}

/// Selection state for one practice widget
#[derive(Debug)]
pub struct SelectionFlow<S: Scorer> {
    catalog: Catalog,
    scorer: S,
    language_id: String,
    phrase_id: Option<String>,
    native_url: Option<String>,
    user_url: Option<String>,
    user_duration: Option<u32>,
    result: Option<ComparisonResult>,
    tab: PracticeTab,
    pending_language: Option<String>,
}

impl<S: Scorer> SelectionFlow<S> {
    /// Start on the first catalog language with nothing selected
    ///
    /// # Errors
    ///
    /// Returns `Catalog` if the catalog has no languages.
    pub fn new(catalog: Catalog, scorer: S) -> PracticeResult<Self> {
        let language_id = catalog
            .languages()
            .first()
            .map(|l| l.id.clone())
            .ok_or_else(|| PracticeError::Catalog("catalog has no languages".into()))?;
        Ok(Self {
            catalog,
            scorer,
            language_id,
            phrase_id: None,
            native_url: None,
            user_url: None,
            user_duration: None,
            result: None,
            tab: PracticeTab::Practice,
            pending_language: None,
        })
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Switch language unconditionally
    ///
    /// Clears the phrase, both URLs, the recording length and the score.
    ///
    /// # Errors
    ///
    /// Returns `Catalog` for an unknown language.
    pub fn select_language(&mut self, language_id: &str) -> PracticeResult<()> {
        if self.catalog.language(language_id).is_none() {
            return Err(PracticeError::Catalog(format!("unknown language {language_id}")));
        }
        self.language_id = language_id.to_string();
        self.phrase_id = None;
        self.native_url = None;
        self.clear_attempt();
        self.tab = PracticeTab::Practice;
        self.pending_language = None;
        trace_event!(language = language_id, "language selected");
        Ok(())
    }

    /// Switch language, asking first if a recording would be discarded
    ///
    /// # Errors
    ///
    /// Returns `Catalog` for an unknown language.
    pub fn request_language_change(&mut self, language_id: &str) -> PracticeResult<LanguageChange> {
        if self.catalog.language(language_id).is_none() {
            return Err(PracticeError::Catalog(format!("unknown language {language_id}")));
        }
        if language_id == self.language_id {
            self.pending_language = None;
            return Ok(LanguageChange::Unchanged);
        }
        if self.user_url.is_some() {
            self.pending_language = Some(language_id.to_string());
            return Ok(LanguageChange::NeedsConfirmation);
        }
        self.select_language(language_id)?;
        Ok(LanguageChange::Applied)
    }

    /// Apply the pending language change; false if none was pending
    pub fn confirm_pending(&mut self) -> bool {
        match self.pending_language.take() {
            Some(language_id) => self.select_language(&language_id).is_ok(),
            None => false,
        }
    }

    /// Drop the pending language change
    pub fn cancel_pending(&mut self) {
        self.pending_language = None;
    }

    /// Select a phrase of the current language
    ///
    /// Sets the native URL, clears the user's attempt and returns to the
    /// Practice tab.
    ///
    /// # Errors
    ///
    /// Returns `Catalog` if the phrase is unknown or belongs to another
    /// language.
    pub fn select_phrase(&mut self, phrase_id: &str) -> PracticeResult<()> {
        let phrase = self
            .catalog
            .phrase(phrase_id)
            .filter(|p| p.language_id == self.language_id)
            .ok_or_else(|| {
                PracticeError::Catalog(format!(
                    "phrase {phrase_id} not available for {}",
                    self.language_id
                ))
            })?;
        self.native_url = Some(phrase.audio_url.clone());
        self.phrase_id = Some(phrase_id.to_string());
        self.clear_attempt();
        self.tab = PracticeTab::Practice;
        trace_event!(phrase = phrase_id, "phrase selected");
        Ok(())
    }

    /// Store a finished recording, score it and show the comparison
    pub fn complete_recording(&mut self, outcome: RecordingOutcome) -> ComparisonResult {
        let score = self
            .scorer
            .compare(self.native_url.as_deref(), &outcome.url);
        let result = ComparisonResult::new(score);
        self.user_url = Some(outcome.url);
        self.user_duration = Some(outcome.duration_secs);
        self.result = Some(result);
        self.tab = PracticeTab::Compare;
        trace_event!(score, duration_secs = outcome.duration_secs, "recording scored");
        result
    }

    /// Switch tab; the Compare tab needs a recording
    pub fn set_tab(&mut self, tab: PracticeTab) -> bool {
        if tab == PracticeTab::Compare && !self.can_compare() {
            return false;
        }
        self.tab = tab;
        true
    }

    fn clear_attempt(&mut self) {
        self.user_url = None;
        self.user_duration = None;
        self.result = None;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The catalog
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Selected language
    #[must_use]
    pub fn language(&self) -> Option<&Language> {
        self.catalog.language(&self.language_id)
    }

    /// Selected language tag
    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    /// Phrases offered for the selected language
    #[must_use]
    pub fn phrases(&self) -> Vec<&Phrase> {
        self.catalog.phrases_for(&self.language_id).collect()
    }

    /// Selected phrase
    #[must_use]
    pub fn phrase(&self) -> Option<&Phrase> {
        self.phrase_id.as_deref().and_then(|id| self.catalog.phrase(id))
    }

    /// Native player source
    #[must_use]
    pub fn native_source(&self) -> AudioSource {
        AudioSource::new(self.native_url.as_deref())
    }

    /// Native player fallback speech
    #[must_use]
    pub fn native_fallback(&self) -> Option<FallbackSpeech> {
        self.phrase().and_then(Phrase::fallback_speech)
    }

    /// Native player duration hint
    #[must_use]
    pub fn native_duration_hint(&self) -> Option<f64> {
        self.phrase().and_then(Phrase::duration_hint)
    }

    /// User player source
    #[must_use]
    pub fn user_source(&self) -> AudioSource {
        AudioSource::new(self.user_url.as_deref())
    }

    /// Length of the user's recording
    #[must_use]
    pub fn user_duration(&self) -> Option<u32> {
        self.user_duration
    }

    /// Score of the current attempt
    #[must_use]
    pub fn result(&self) -> Option<ComparisonResult> {
        self.result
    }

    /// Visible tab
    #[must_use]
    pub fn tab(&self) -> PracticeTab {
        self.tab
    }

    /// Whether the Compare tab is enabled
    #[must_use]
    pub fn can_compare(&self) -> bool {
        self.user_url.is_some()
    }

    /// Whether the tabs are shown at all
    #[must_use]
    pub fn shows_tabs(&self) -> bool {
        self.phrase_id.is_some()
    }

    /// Language awaiting confirmation
    #[must_use]
    pub fn pending_language(&self) -> Option<&str> {
        self.pending_language.as_deref()
    }
}
