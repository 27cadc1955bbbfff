use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Size;

pub const DEFAULT_MIN_SCALE: f64 = 0.3;
pub const DEFAULT_MAX_SCALE: f64 = 5.0;
pub const COMPACT_MIN_SCALE: f64 = 0.5;
pub const COMPACT_MAX_SCALE: f64 = 3.0;
pub const DEFAULT_ZOOM_STEP: f64 = 0.25;
pub const DEFAULT_DOUBLE_TAP_SCALE: f64 = 2.0;
pub const DEFAULT_DOUBLE_TAP_WINDOW_MS: f64 = 300.0;
pub const DEFAULT_RECENT_FILES_CAP: usize = 10;
pub const COMPACT_RECENT_FILES_CAP: usize = 5;
pub const DEFAULT_FIT_PADDING: f64 = 20.0;
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u32 = 250;
pub const DEFAULT_TRANSITION_MS: u32 = 300;

/// US Letter in PDF points; used for the initial fit before any page is measured.
pub const REFERENCE_PAGE: Size = Size::new(612.0, 792.0);

pub const RECENT_FILES_KEY: &str = "recentPDFs";
pub const SETTINGS_KEY: &str = "folio_settings";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_scale must be positive (got {0})")]
    NonPositiveMinScale(f64),
    #[error("min_scale {min} exceeds max_scale {max}")]
    InvertedScaleBounds { min: f64, max: f64 },
    #[error("zoom_step must be positive (got {0})")]
    NonPositiveZoomStep(f64),
    #[error("double_tap_window_ms must be positive (got {0})")]
    NonPositiveDoubleTapWindow(f64),
    #[error("recent_files_cap must be at least 1")]
    EmptyRecentFiles,
}

/// Inclusive scale range every stored scale is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    /// Never panics; with inverted bounds `max` wins.
    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min.min(self.max);
        }
        scale.max(self.min).min(self.max)
    }

    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min && scale <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_step: f64,
    pub double_tap_scale: f64,
    pub double_tap_window_ms: f64,
    pub recent_files_cap: usize,
    pub fit_padding: f64,
    pub reference_page: Size,
    pub resize_debounce_ms: u32,
    pub transition_ms: u32,
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            zoom_step: DEFAULT_ZOOM_STEP,
            double_tap_scale: DEFAULT_DOUBLE_TAP_SCALE,
            double_tap_window_ms: DEFAULT_DOUBLE_TAP_WINDOW_MS,
            recent_files_cap: DEFAULT_RECENT_FILES_CAP,
            fit_padding: DEFAULT_FIT_PADDING,
            reference_page: REFERENCE_PAGE,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            transition_ms: DEFAULT_TRANSITION_MS,
            log_level: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Narrower zoom range and shorter history, for small screens.
    pub fn compact() -> Self {
        Self {
            min_scale: COMPACT_MIN_SCALE,
            max_scale: COMPACT_MAX_SCALE,
            recent_files_cap: COMPACT_RECENT_FILES_CAP,
            ..Self::default()
        }
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.min_scale <= 0.0 || self.min_scale.is_nan() {
            return Err(ConfigError::NonPositiveMinScale(self.min_scale));
        }
        if self.min_scale > self.max_scale || self.max_scale.is_nan() {
            return Err(ConfigError::InvertedScaleBounds {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if self.zoom_step <= 0.0 || self.zoom_step.is_nan() {
            return Err(ConfigError::NonPositiveZoomStep(self.zoom_step));
        }
        if self.double_tap_window_ms <= 0.0 || self.double_tap_window_ms.is_nan() {
            return Err(ConfigError::NonPositiveDoubleTapWindow(
                self.double_tap_window_ms,
            ));
        }
        if self.recent_files_cap == 0 {
            return Err(ConfigError::EmptyRecentFiles);
        }
        Ok(self)
    }

    pub fn bounds(&self) -> ScaleBounds {
        ScaleBounds {
            min: self.min_scale,
            max: self.max_scale,
        }
    }

    /// Double-tap zoom target, never beyond `max_scale`.
    pub fn double_tap_target(&self) -> f64 {
        self.double_tap_scale.min(self.max_scale)
    }
}
