//! Static phrase catalog
//!
//! The built-in table (five languages, three phrases each) is embedded as
//! JSON and parsed on demand. Lookups preserve catalog order.

use serde::{Deserialize, Serialize};

use crate::error::{PracticeError, PracticeResult};
use crate::media::AudioSource;
use crate::speech::FallbackSpeech;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// A practice language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language tag, e.g. `fr-FR`
    pub id: String,
    /// English name
    pub name: String,
    /// Flag emoji
    pub flag: String,
}

impl Language {
    /// `"🇫🇷 French"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.flag, self.name)
    }
}

/// Phrase difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Beginner
    Beginner,
    /// Intermediate
    Intermediate,
    /// Advanced
    Advanced,
}

/// A phrase to practise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    /// Unique id
    pub id: String,
    /// Owning language tag
    pub language_id: String,
    /// Text in the target language
    pub text: String,
    /// English translation
    pub translation: String,
    /// Native recording URL
    pub audio_url: String,
    /// Precomputed length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
    /// Difficulty
    pub difficulty: Difficulty,
}

impl Phrase {
    /// Native audio source
    #[must_use]
    pub fn audio_source(&self) -> AudioSource {
        AudioSource::new(Some(self.audio_url.as_str()))
    }

    /// Speech fallback for this phrase
    #[must_use]
    pub fn fallback_speech(&self) -> Option<FallbackSpeech> {
        FallbackSpeech::new(self.text.as_str(), self.language_id.as_str())
    }

    /// Duration hint, if a positive one is recorded
    #[must_use]
    pub fn duration_hint(&self) -> Option<f64> {
        self.audio_duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// Ordered languages and phrases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    languages: Vec<Language>,
    phrases: Vec<Phrase>,
}

impl Catalog {
    /// Parse and validate a catalog
    ///
    /// # Errors
    ///
    /// Returns `Catalog` on malformed JSON, duplicate ids, or phrases whose
    /// language is not listed.
    pub fn from_json(json: &str) -> PracticeResult<Self> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| PracticeError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The embedded catalog
    ///
    /// # Errors
    ///
    /// Returns `Catalog` if the embedded table is invalid.
    pub fn builtin() -> PracticeResult<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    fn validate(&self) -> PracticeResult<()> {
        for (i, language) in self.languages.iter().enumerate() {
            if self.languages[..i].iter().any(|l| l.id == language.id) {
                return Err(PracticeError::Catalog(format!(
                    "duplicate language {}",
                    language.id
                )));
            }
        }
        for (i, phrase) in self.phrases.iter().enumerate() {
            if self.phrases[..i].iter().any(|p| p.id == phrase.id) {
                return Err(PracticeError::Catalog(format!("duplicate phrase {}", phrase.id)));
            }
            if self.language(&phrase.language_id).is_none() {
                return Err(PracticeError::Catalog(format!(
                    "phrase {} references unknown language {}",
                    phrase.id, phrase.language_id
                )));
            }
        }
        Ok(())
    }

    /// All languages in catalog order
    #[must_use]
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// All phrases in catalog order
    #[must_use]
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    /// Look up a language
    #[must_use]
    pub fn language(&self, id: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.id == id)
    }

    /// Look up a phrase
    #[must_use]
    pub fn phrase(&self, id: &str) -> Option<&Phrase> {
        self.phrases.iter().find(|p| p.id == id)
    }

    /// Phrases of one language in catalog order
    pub fn phrases_for<'a>(&'a self, language_id: &'a str) -> impl Iterator<Item = &'a Phrase> + 'a {
        self.phrases
            .iter()
            .filter(move |p| p.language_id == language_id)
    }
}
