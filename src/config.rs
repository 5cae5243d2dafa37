//! Widget configuration
//!
//! Every field has a default, so a host can pass `{}` or only the values it
//! wants to change:
//!
//! ```rust
//! use pronunciation_guide::config::WidgetConfig;
//!
//! let config = WidgetConfig::from_json(r#"{"recorder": {"max_seconds": 5}}"#).unwrap();
//! assert_eq!(config.recorder.max_seconds, 5);
//! assert_eq!(config.playback.load_timeout_ms, 3000);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PracticeError, PracticeResult};
use crate::playback::PlaybackConfig;
use crate::recording::RecorderConfig;
use crate::waveform::WaveformConfig;

/// Configuration for a whole practice widget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Both players
    pub playback: PlaybackConfig,
    /// The recorder
    pub recorder: RecorderConfig,
    /// Waveform canvases
    pub waveform: WaveformConfig,
}

impl WidgetConfig {
    /// Parse and validate JSON
    ///
    /// # Errors
    ///
    /// Returns `Config` if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> PracticeResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PracticeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns `Config` if serialization fails.
    pub fn to_json(&self) -> PracticeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PracticeError::Config(e.to_string()))
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> PracticeResult<()> {
        let speech = &self.playback.speech;
        let checks: [(bool, &str); 10] = [
            (self.playback.load_timeout_ms > 0, "playback.load_timeout_ms must be > 0"),
            (self.playback.duration_poll_ms > 0, "playback.duration_poll_ms must be > 0"),
            (speech.tick_ms > 0, "playback.speech.tick_ms must be > 0"),
            (speech.rate.is_finite() && speech.rate > 0.0, "playback.speech.rate must be > 0"),
            (speech.pitch.is_finite() && speech.pitch >= 0.0, "playback.speech.pitch must be >= 0"),
            (self.recorder.max_seconds > 0, "recorder.max_seconds must be > 0"),
            (self.recorder.tick_ms > 0, "recorder.tick_ms must be > 0"),
            (self.waveform.data_bars > 0, "waveform.data_bars must be > 0"),
            (self.waveform.fallback_bars > 0, "waveform.fallback_bars must be > 0"),
            (
                self.waveform.gain.is_finite() && self.waveform.gain > 0.0,
                "waveform.gain must be > 0",
            ),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(PracticeError::Config((*message).to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::Background;

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.playback.load_timeout_ms, 3000);
        assert_eq!(config.playback.duration_poll_ms, 500);
        assert_eq!(config.playback.speech.tick_ms, 100);
        assert_eq!(config.playback.speech.ms_per_char, 80);
        assert_eq!(config.recorder.max_seconds, 10);
        assert_eq!(config.recorder.mime_type, "audio/webm");
        assert_eq!(config.waveform.data_bars, 100);
        assert_eq!(config.waveform.fallback_bars, 50);
        assert_eq!(config.waveform.background, Background::Dark);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = WidgetConfig::from_json("{}").expect("valid");
        assert_eq!(config, WidgetConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = WidgetConfig::from_json(
            r#"{"waveform": {"background": "light"}, "playback": {"speech": {"tick_ms": 50}}}"#,
        )
        .expect("valid");
        assert_eq!(config.waveform.background, Background::Light);
        assert_eq!(config.playback.speech.tick_ms, 50);
        assert_eq!(config.playback.speech.ms_per_char, 80);
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = WidgetConfig::default();
        let json = config.to_json().expect("serialize");
        assert_eq!(WidgetConfig::from_json(&json).expect("parse"), config);
    }

    #[test]
    fn test_rejects_zero_cap() {
        let err = WidgetConfig::from_json(r#"{"recorder": {"max_seconds": 0}}"#)
            .expect_err("zero cap");
        assert_eq!(
            err,
            PracticeError::Config("recorder.max_seconds must be > 0".into())
        );
    }

    #[test]
    fn test_rejects_bad_gain_and_json() {
        assert!(WidgetConfig::from_json(r#"{"waveform": {"gain": -1.0}}"#).is_err());
        assert!(matches!(
            WidgetConfig::from_json("not json"),
            Err(PracticeError::Config(_))
        ));
    }
}
