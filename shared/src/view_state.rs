//! The authoritative record of what the viewer is showing.
//!
//! Every setter clamps its argument into the legal range before storing and
//! reports whether the stored value changed, so callers can skip redundant
//! re-renders.

use crate::config::ScaleBounds;
use crate::geometry::{Offset, Point, Size};

/// Tolerance used when snapping a scale onto the zoom-step grid.
const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    page: u32,
    page_count: u32,
    scale: f64,
    offset: Offset,
    surface: Size,
    container: Size,
    bounds: ScaleBounds,
}

impl ViewState {
    pub fn new(bounds: ScaleBounds) -> Self {
        Self {
            page: 1,
            page_count: 1,
            scale: bounds.clamp(1.0),
            offset: Offset::ZERO,
            surface: Size::ZERO,
            container: Size::ZERO,
            bounds,
        }
    }

    /// Start over for a freshly opened document. The container size is kept.
    pub fn reset(&mut self, page_count: u32, scale: f64) {
        self.page = 1;
        self.page_count = page_count.max(1);
        self.scale = self.bounds.clamp(scale);
        self.offset = Offset::ZERO;
        self.surface = Size::ZERO;
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn bounds(&self) -> ScaleBounds {
        self.bounds
    }

    /// Out-of-range page numbers are ignored rather than clamped.
    pub fn set_page(&mut self, page: u32) -> bool {
        if page < 1 || page > self.page_count || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    /// Continuous scale change (pinch, fit). Any real within bounds.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        let scale = self.bounds.clamp(scale);
        if scale == self.scale {
            return false;
        }
        self.scale = scale;
        true
    }

    /// Discrete zoom: move to the next multiple of `step` in `direction`.
    pub fn step_scale(&mut self, direction: ZoomDirection, step: f64) -> bool {
        let units = self.scale / step;
        let target = match direction {
            ZoomDirection::In => ((units + STEP_EPSILON).floor() + 1.0) * step,
            ZoomDirection::Out => ((units - STEP_EPSILON).ceil() - 1.0) * step,
        };
        self.set_scale(target)
    }

    pub fn set_offset(&mut self, offset: Offset) -> bool {
        let extent = self.scroll_extent();
        let clamped = Point::new(
            clamp_axis(offset.x, extent.width),
            clamp_axis(offset.y, extent.height),
        );
        if clamped == self.offset {
            return false;
        }
        self.offset = clamped;
        true
    }

    /// Record the visible container size. Returns whether the offset had to move.
    pub fn set_container(&mut self, container: Size) -> bool {
        self.container = container;
        self.set_offset(self.offset)
    }

    /// Record the rendered surface size. Returns whether the offset had to move.
    pub fn set_surface(&mut self, surface: Size) -> bool {
        self.surface = surface;
        self.set_offset(self.offset)
    }

    /// How far the container can scroll over the current surface.
    pub fn scroll_extent(&self) -> Size {
        Size::new(
            (self.surface.width - self.container.width).max(0.0),
            (self.surface.height - self.container.height).max(0.0),
        )
    }

    pub fn controls(&self) -> ControlsState {
        ControlsState::new(self.page, self.page_count, self.scale, self.bounds)
    }
}

fn clamp_axis(value: f64, extent: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, extent)
}

pub fn zoom_percent(scale: f64) -> u32 {
    (scale * 100.0).round().max(0.0) as u32
}

pub fn zoom_label(scale: f64) -> String {
    format!("{}%", zoom_percent(scale))
}

/// Indicator text and button availability derived from a [`ViewState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsState {
    pub page_label: String,
    pub zoom_label: String,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub zoom_in_enabled: bool,
    pub zoom_out_enabled: bool,
}

impl ControlsState {
    pub fn new(page: u32, page_count: u32, scale: f64, bounds: ScaleBounds) -> Self {
        Self {
            page_label: format!("{page} / {page_count}"),
            zoom_label: zoom_label(scale),
            previous_enabled: page > 1,
            next_enabled: page < page_count,
            zoom_in_enabled: scale < bounds.max,
            zoom_out_enabled: scale > bounds.min,
        }
    }
}
