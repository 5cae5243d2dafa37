//! Waveform bar rendering
//!
//! Paints an amplitude bar chart onto any [`Surface`]. With decoded samples
//! the bars are bucket means of `|sample|` times a fixed gain; without data a
//! deterministic damped-sine shape is drawn instead so an absent recording
//! always looks the same.
//!
//! Bars are bottom-aligned with a 1-unit gap between them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trace::trace_enter;

/// An sRGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Bar colour for the native speaker
pub const NATIVE_COLOR: Rgb = Rgb(124, 58, 237);

/// Bar colour for the user's recording
pub const USER_COLOR: Rgb = Rgb(239, 68, 68);

/// Surface background variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Near-black
    #[default]
    Dark,
    /// Near-white
    Light,
}

impl Background {
    /// Fill colour
    #[must_use]
    pub const fn color(self) -> Rgb {
        match self {
            Self::Dark => Rgb(20, 20, 20),
            Self::Light => Rgb(245, 245, 245),
        }
    }
}

/// Waveform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Bars drawn from real samples (default: 100)
    pub data_bars: usize,
    /// Bars drawn for the placeholder shape (default: 50)
    pub fallback_bars: usize,
    /// Amplitude gain (default: 3.0)
    pub gain: f32,
    /// Background variant
    pub background: Background,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            data_bars: 100,
            fallback_bars: 50,
            gain: 3.0,
            background: Background::Dark,
        }
    }
}

impl WaveformConfig {
    /// Set the background variant
    #[must_use]
    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }
}

/// A 2D drawable area (canvas-like)
pub trait Surface {
    /// Width in drawing units
    fn width(&self) -> f64;

    /// Height in drawing units
    fn height(&self) -> f64;

    /// Erase everything
    fn clear(&mut self);

    /// Fill an axis-aligned rectangle
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb);
}

/// Bar heights from samples as fractions of the surface height
///
/// Samples are split into `bars` equal buckets (the remainder is ignored);
/// each bar is the bucket's mean absolute amplitude times `gain`, clipped to
/// `[0, 1]`. Fewer samples than bars yields one sample per bucket and zero
/// bars past the end.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn amplitude_bars(samples: &[f32], bars: usize, gain: f32) -> Vec<f32> {
    if bars == 0 {
        return Vec::new();
    }
    let step = (samples.len() / bars).max(1);

    (0..bars)
        .map(|i| {
            let start = i * step;
            if start >= samples.len() {
                return 0.0;
            }
            let bucket = &samples[start..(start + step).min(samples.len())];
            let sum: f32 = bucket
                .iter()
                .filter(|s| s.is_finite())
                .map(|s| s.abs())
                .sum();
            (sum / step as f32 * gain).clamp(0.0, 1.0)
        })
        .collect()
}

/// Placeholder bar heights as fractions of the surface height
///
/// `|sin(0.2 i) · (0.3 sin(0.2 i) + 0.7) · 0.7|`, independent of any input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fallback_bars(bars: usize) -> Vec<f32> {
    (0..bars)
        .map(|i| {
            let phase = (i as f64 * 0.2).sin();
            let damping = phase * 0.3 + 0.7;
            (phase * damping * 0.7).abs() as f32
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn paint_bars<S: Surface + ?Sized>(surface: &mut S, heights: &[f32], color: Rgb, background: Background) {
    let width = surface.width();
    let height = surface.height();

    surface.clear();
    surface.fill_rect(0.0, 0.0, width, height, background.color());

    if heights.is_empty() {
        return;
    }
    let slot = width / heights.len() as f64;
    let bar_width = (slot - 1.0).max(0.0);
    for (i, fraction) in heights.iter().enumerate() {
        let bar_height = f64::from(*fraction) * height;
        surface.fill_rect(i as f64 * slot, height - bar_height, bar_width, bar_height, color);
    }
}

/// Draw bars for decoded samples
pub fn render_samples<S: Surface + ?Sized>(
    surface: &mut S,
    samples: &[f32],
    color: Rgb,
    config: &WaveformConfig,
) {
    let _guard = trace_enter!("waveform.render_samples");
    let heights = amplitude_bars(samples, config.data_bars, config.gain);
    paint_bars(surface, &heights, color, config.background);
}

/// Draw the placeholder shape
pub fn render_fallback<S: Surface + ?Sized>(surface: &mut S, color: Rgb, config: &WaveformConfig) {
    let heights = fallback_bars(config.fallback_bars);
    paint_bars(surface, &heights, color, config.background);
}

/// Draw samples if present, otherwise the placeholder
pub fn render<S: Surface + ?Sized>(
    surface: &mut S,
    samples: Option<&[f32]>,
    color: Rgb,
    config: &WaveformConfig,
) {
    match samples {
        Some(samples) if !samples.is_empty() => render_samples(surface, samples, color, config),
        _ => render_fallback(surface, color, config),
    }
}

/// A drawing command captured by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Surface cleared
    Clear,
    /// Rectangle filled
    FillRect {
        /// Left edge
        x: f64,
        /// Top edge
        y: f64,
        /// Width
        w: f64,
        /// Height
        h: f64,
        /// Fill colour
        color: Rgb,
    },
}

/// Surface that records draw calls instead of painting
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    /// Create a surface of the given size
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Draw calls since the last clear
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Rectangles drawn in `color`
    pub fn bars(&self, color: Rgb) -> impl Iterator<Item = &DrawOp> + '_ {
        self.ops
            .iter()
            .filter(move |op| matches!(op, DrawOp::FillRect { color: c, .. } if *c == color))
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb) {
        self.ops.push(DrawOp::FillRect { x, y, w, h, color });
    }
}
