//! Fit-to-container scaling for the countdown display.
//!
//! The fitter measures a sample of the text that is about to be shown, compares
//! it with the box it has to live in, and answers with a uniform scale factor.
//! Measurement goes through the [`TextMeasure`] trait so that it never touches
//! what is currently on screen.
//!
//! # Basic Usage
//!
//! ```rust
//! use scene_countdown::fit::{BoxSize, FitConfig, TextFitter, TextMeasure};
//!
//! struct Fixed;
//!
//! impl TextMeasure for Fixed {
//!     fn measure(&self, _text: &str) -> BoxSize {
//!         BoxSize::new(200.0, 50.0)
//!     }
//! }
//!
//! let fitter = TextFitter::new(Fixed, FitConfig::new(1.0, 1.0).unwrap());
//! let scale = fitter.compute_scale("00:00:000", BoxSize::new(100.0, 100.0)).unwrap();
//! assert_eq!(scale, 0.5);
//! ```

use std::time::Duration;
use thiserror::Error;

/// Fraction of the container the text may occupy when nothing is configured.
pub const DEFAULT_PADDING_PERCENT: f64 = 0.96;

/// Upper bound on the scale factor when nothing is configured.
pub const DEFAULT_MAX_SCALE: f64 = 1.0;

/// How many times a fit is attempted while the container has no size yet.
pub const MAX_FIT_ATTEMPTS: u32 = 10;

/// Delay between two fit attempts while the container has no size yet.
pub const FIT_RETRY_BACKOFF: Duration = Duration::from_millis(120);

/// Errors produced while configuring or running the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FitError {
    /// The container has zero width or height, typically because the first
    /// terminal size has not been reported yet.
    #[error("container has not been laid out yet")]
    LayoutNotReady,
    /// `max_scale` must be a finite number greater than zero.
    #[error("max scale must be finite and greater than zero, got {0}")]
    InvalidMaxScale(f64),
}

/// Width and height of a rectangle, in terminal cells.
///
/// Used both for measured text and for the container the text is fitted into.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxSize {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl BoxSize {
    /// Creates a box of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` when the box cannot hold anything.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Immutable fitting parameters.
///
/// The padding fraction is clamped into `[0, 1]` on construction; a missing
/// (NaN) padding falls back to [`DEFAULT_PADDING_PERCENT`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    padding_percent: f64,
    max_scale: f64,
}

impl FitConfig {
    /// Builds a configuration, rejecting a non-positive or non-finite `max_scale`.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::InvalidMaxScale`] when `max_scale <= 0` or is not finite.
    pub fn new(padding_percent: f64, max_scale: f64) -> Result<Self, FitError> {
        if !max_scale.is_finite() || max_scale <= 0.0 {
            return Err(FitError::InvalidMaxScale(max_scale));
        }
        let padding_percent = if padding_percent.is_nan() {
            DEFAULT_PADDING_PERCENT
        } else {
            padding_percent.clamp(0.0, 1.0)
        };
        Ok(Self {
            padding_percent,
            max_scale,
        })
    }

    /// Fraction of the container the text may occupy.
    pub fn padding_percent(&self) -> f64 {
        self.padding_percent
    }

    /// Largest scale factor ever returned.
    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            padding_percent: DEFAULT_PADDING_PERCENT,
            max_scale: DEFAULT_MAX_SCALE,
        }
    }
}

/// Something that can report how large a piece of text would be when drawn
/// at scale 1, without drawing it.
pub trait TextMeasure {
    /// Returns the bounding box of `text` at scale 1.
    fn measure(&self, text: &str) -> BoxSize;
}

/// Computes the scale for an already measured text box.
///
/// Returns `None` when the container is degenerate. The result never exceeds
/// `min(1, max_scale)`.
pub fn scale_for(text: BoxSize, container: BoxSize, config: &FitConfig) -> Option<f64> {
    if container.is_degenerate() {
        return None;
    }

    let available_w = container.width * config.padding_percent;
    let available_h = container.height * config.padding_percent;

    let scale_x = if text.width > 0.0 {
        available_w / text.width
    } else {
        1.0
    };
    let scale_y = if text.height > 0.0 {
        available_h / text.height
    } else {
        1.0
    };

    Some(scale_x.min(scale_y).min(1.0).min(config.max_scale))
}

/// Measures text with a [`TextMeasure`] and scales it into a container.
#[derive(Debug, Clone)]
pub struct TextFitter<M> {
    measure: M,
    config: FitConfig,
}

impl<M: TextMeasure> TextFitter<M> {
    /// Creates a fitter around a measurer and a configuration.
    pub fn new(measure: M, config: FitConfig) -> Self {
        Self { measure, config }
    }

    /// The configuration this fitter was built with.
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// The measurer this fitter uses.
    pub fn measure(&self) -> &M {
        &self.measure
    }

    /// Computes the scale at which `sample_text` fits into `container`.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::LayoutNotReady`] when the container has zero width
    /// or height; callers are expected to retry later (see [`FitRetry`]).
    pub fn compute_scale(&self, sample_text: &str, container: BoxSize) -> Result<f64, FitError> {
        if container.is_degenerate() {
            return Err(FitError::LayoutNotReady);
        }
        let text = self.measure.measure(sample_text);
        scale_for(text, container, &self.config).ok_or(FitError::LayoutNotReady)
    }
}

/// Bounded retry bookkeeping for fits attempted before layout is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitRetry {
    attempts: u32,
    max_attempts: u32,
    backoff: Duration,
}

impl FitRetry {
    /// Retry policy with [`MAX_FIT_ATTEMPTS`] attempts every [`FIT_RETRY_BACKOFF`].
    pub fn new() -> Self {
        Self::with_policy(MAX_FIT_ATTEMPTS, FIT_RETRY_BACKOFF)
    }

    /// Retry policy with explicit limits.
    pub fn with_policy(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            backoff,
        }
    }

    /// Number of attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a failed attempt and returns the delay before the next one,
    /// or `None` once the budget is spent.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts < self.max_attempts {
            Some(self.backoff)
        } else {
            None
        }
    }
}

impl Default for FitRetry {
    fn default() -> Self {
        Self::new()
    }
}
