//! Duration resolution
//!
//! Audio length arrives from several places, in no particular order:
//!
//! - a caller-supplied hint (catalog value, or the length measured when a
//!   recording stopped)
//! - the native element's metadata, which streams in progressively and often
//!   starts out as `NaN`, `Infinity` or 0
//! - a full decode of a blob payload (slow but exact)
//!
//! [`DurationResolver`] folds these into the single value shown to the user.
//! Until something real arrives it can hold a text-length estimate or the
//! one-second floor so the UI never shows a zero-length track.

/// Smallest duration ever displayed, in seconds
pub const DURATION_FLOOR: f64 = 1.0;

/// Round seconds to the nearest integer, `.5` rounding up
///
/// Non-finite and non-positive values round to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_half_up(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    // Positive input, so ties-away-from-zero is half-up
    seconds.round() as u64
}

/// Whether a reported duration carries information
#[must_use]
pub fn is_valid_duration(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

/// Render seconds as `m:ss`
///
/// ```rust
/// use pronunciation_guide::duration::format_time;
///
/// assert_eq!(format_time(65.4), "1:05");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
#[must_use]
pub fn format_time(seconds: f64) -> String {
    let total = round_half_up(seconds);
    format!("{}:{:02}", total / 60, total % 60)
}

/// Where a resolved duration came from, in increasing order of trust
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DurationSource {
    /// One-second floor applied when nothing resolved
    Floor,
    /// Estimate from fallback text length
    Estimate,
    /// Caller-supplied hint
    Hint,
    /// Native element metadata
    Metadata,
    /// Full decode of the payload
    Decoded,
}

impl DurationSource {
    /// Whether the value is a placeholder any real signal replaces
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        matches!(self, Self::Floor | Self::Estimate)
    }
}

/// Folds competing duration signals into one trusted value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationResolver {
    resolved: Option<(f64, DurationSource)>,
}

impl DurationResolver {
    /// Create an unresolved resolver
    #[must_use]
    pub const fn new() -> Self {
        Self { resolved: None }
    }

    /// Create a resolver seeded with an optional hint (`<= 0` means unknown)
    #[must_use]
    pub fn with_hint(hint: Option<f64>) -> Self {
        let mut resolver = Self::new();
        if let Some(hint) = hint {
            resolver.offer(DurationSource::Hint, hint);
        }
        resolver
    }

    /// Offer a new signal; returns true if it replaced the resolved value
    pub fn offer(&mut self, source: DurationSource, seconds: f64) -> bool {
        if !is_valid_duration(seconds) {
            return false;
        }

        let adopt = match self.resolved {
            None => true,
            Some((_, held)) if source.is_placeholder() => {
                held == DurationSource::Floor && source == DurationSource::Estimate
            }
            Some((_, held)) if held.is_placeholder() => true,
            Some((held_value, DurationSource::Hint)) => {
                matches!(source, DurationSource::Metadata | DurationSource::Decoded)
                    && seconds > held_value
                    && seconds > DURATION_FLOOR
            }
            Some((held_value, DurationSource::Metadata)) => match source {
                DurationSource::Decoded => true,
                DurationSource::Metadata => seconds > held_value,
                _ => false,
            },
            Some(_) => false,
        };

        if adopt {
            self.resolved = Some((seconds, source));
        }
        adopt
    }

    /// Apply the one-second floor if nothing has resolved
    pub fn apply_floor(&mut self) -> bool {
        self.offer(DurationSource::Floor, DURATION_FLOOR)
    }

    /// Offer a text-length estimate
    pub fn offer_estimate(&mut self, seconds: f64) -> bool {
        self.offer(DurationSource::Estimate, seconds)
    }

    /// Resolved duration in seconds
    #[must_use]
    pub fn resolved(&self) -> Option<f64> {
        self.resolved.map(|(value, _)| value)
    }

    /// Source of the resolved duration
    #[must_use]
    pub fn source(&self) -> Option<DurationSource> {
        self.resolved.map(|(_, source)| source)
    }

    /// Resolved duration rounded for display
    #[must_use]
    pub fn display_seconds(&self) -> Option<u64> {
        self.resolved().map(round_half_up)
    }

    /// Whether a real (non-placeholder) value above the floor is held
    ///
    /// The metadata poll stops once this holds; larger native values still
    /// arrive through element events.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(
            self.resolved,
            Some((value, source)) if !source.is_placeholder() && value > DURATION_FLOOR
        )
    }

    /// Forget everything (source changed)
    pub fn reset(&mut self) {
        self.resolved = None;
    }
}
