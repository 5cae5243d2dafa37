//! Side-by-side comparison view
//!
//! [`ComparisonPresenter`] turns the native and user players, their waveform
//! data and the externally supplied score into a plain view model. The only
//! logic it owns is the fixed score → feedback tier mapping.

use crate::clock::Clock;
use crate::media::{AudioBackend, SpeechSynthesizer};
use crate::playback::{PlaybackController, PlaybackMode, PlaybackStatus};
use crate::waveform::{self, Rgb, Surface, WaveformConfig, NATIVE_COLOR, USER_COLOR};

/// Shown in place of the comparison until the user has recorded
pub const AWAITING_RECORDING: &str = "Please record your pronunciation first.";

/// Heading of the score card
pub const SCORE_HEADING: &str = "Pronunciation Accuracy";

/// Title of the native panel
pub const NATIVE_TITLE: &str = "Native Speaker";

/// Title of the user panel
pub const USER_TITLE: &str = "Your Recording";

/// Feedback tier for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FeedbackTier {
    /// Below 70
    KeepPracticing,
    /// 70 to 79
    GoodEffort,
    /// 80 to 89
    Great,
    /// 90 and above
    Excellent,
}

impl FeedbackTier {
    /// Tier for a score
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::Excellent,
            80..=89 => Self::Great,
            70..=79 => Self::GoodEffort,
            _ => Self::KeepPracticing,
        }
    }

    /// Short name
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Great => "great",
            Self::GoodEffort => "good effort",
            Self::KeepPracticing => "keep practicing",
        }
    }

    /// Feedback sentence
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent! Your pronunciation is very close to native.",
            Self::Great => "Great job! Your pronunciation is good.",
            Self::GoodEffort => "Good effort! Keep practicing to improve further.",
            Self::KeepPracticing => "Keep practicing! Try to match the native speaker more closely.",
        }
    }

    /// Badge colour class
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Excellent => "bg-green-500",
            Self::Great => "bg-emerald-500",
            Self::GoodEffort => "bg-amber-500",
            Self::KeepPracticing => "bg-red-500",
        }
    }
}

/// An accuracy score in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonResult {
    score: u8,
}

impl ComparisonResult {
    /// Wrap a score, clamping to 100
    #[must_use]
    pub fn new(score: u8) -> Self {
        Self {
            score: score.min(100),
        }
    }

    /// The score
    #[must_use]
    pub const fn score(self) -> u8 {
        self.score
    }

    /// Feedback tier
    #[must_use]
    pub const fn tier(self) -> FeedbackTier {
        FeedbackTier::from_score(self.score)
    }
}

/// One player column
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    /// Column title
    pub title: &'static str,
    /// `"m:ss / m:ss"`
    pub time_label: String,
    /// Player status
    pub status: PlaybackStatus,
    /// Active backend
    pub mode: PlaybackMode,
    /// Whether the play button is enabled
    pub can_play: bool,
    /// Whether the seek slider is enabled
    pub can_seek: bool,
    /// Bar heights as fractions of the canvas height
    pub bars: Vec<f32>,
    /// Whether `bars` come from decoded audio
    pub has_samples: bool,
    /// Bar colour
    pub color: Rgb,
}

/// The score card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreView {
    /// Raw score
    pub score: u8,
    /// `"85%"`
    pub percent_label: String,
    /// Tier
    pub tier: FeedbackTier,
    /// Feedback sentence
    pub feedback: &'static str,
    /// Badge colour class
    pub badge_class: &'static str,
}

impl From<ComparisonResult> for ScoreView {
    fn from(result: ComparisonResult) -> Self {
        let tier = result.tier();
        Self {
            score: result.score(),
            percent_label: format!("{}%", result.score()),
            tier,
            feedback: tier.message(),
            badge_class: tier.badge_class(),
        }
    }
}

/// What the comparison tab shows
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonView {
    /// No user recording yet
    AwaitingRecording {
        /// Prompt text
        message: &'static str,
    },
    /// Both players, plus the score once available
    Ready {
        /// Native speaker column
        native: PanelView,
        /// User column
        user: PanelView,
        /// Score card
        score: Option<ScoreView>,
    },
}

/// Composes players, waveforms and score into a [`ComparisonView`]
#[derive(Debug, Clone, Default)]
pub struct ComparisonPresenter {
    config: WaveformConfig,
}

impl ComparisonPresenter {
    /// Create a presenter
    #[must_use]
    pub fn new(config: WaveformConfig) -> Self {
        Self { config }
    }

    /// Waveform settings
    #[must_use]
    pub fn config(&self) -> &WaveformConfig {
        &self.config
    }

    fn panel<B, S, C>(
        &self,
        title: &'static str,
        player: &PlaybackController<B, S, C>,
        samples: Option<&[f32]>,
        color: Rgb,
    ) -> PanelView
    where
        B: AudioBackend,
        S: SpeechSynthesizer,
        C: Clock,
    {
        let (bars, has_samples) = match samples {
            Some(samples) if !samples.is_empty() => (
                waveform::amplitude_bars(samples, self.config.data_bars, self.config.gain),
                true,
            ),
            _ => (waveform::fallback_bars(self.config.fallback_bars), false),
        };
        PanelView {
            title,
            time_label: player.time_label(),
            status: player.status(),
            mode: player.mode(),
            can_play: player.can_play(),
            can_seek: player.can_seek(),
            bars,
            has_samples,
            color,
        }
    }

    /// Build the view
    ///
    /// The user player only counts once it has a source; before that the
    /// prompt is shown.
    #[allow(clippy::too_many_arguments)]
    pub fn present<B1, S1, C1, B2, S2, C2>(
        &self,
        native: &PlaybackController<B1, S1, C1>,
        native_samples: Option<&[f32]>,
        user: &PlaybackController<B2, S2, C2>,
        user_samples: Option<&[f32]>,
        result: Option<ComparisonResult>,
    ) -> ComparisonView
    where
        B1: AudioBackend,
        S1: SpeechSynthesizer,
        C1: Clock,
        B2: AudioBackend,
        S2: SpeechSynthesizer,
        C2: Clock,
    {
        if user.source().is_none() {
            return ComparisonView::AwaitingRecording {
                message: AWAITING_RECORDING,
            };
        }
        ComparisonView::Ready {
            native: self.panel(NATIVE_TITLE, native, native_samples, NATIVE_COLOR),
            user: self.panel(USER_TITLE, user, user_samples, USER_COLOR),
            score: result.map(ScoreView::from),
        }
    }

    /// Paint one waveform canvas
    pub fn paint<T: Surface + ?Sized>(&self, surface: &mut T, samples: Option<&[f32]>, color: Rgb) {
        waveform::render(surface, samples, color, &self.config);
    }
}
