//! Zoom math: keeping a focal point visually fixed across a re-render, and
//! the fit-to-container scales.

use crate::config::ScaleBounds;
use crate::geometry::{Offset, Point, Size};

/// How to move the scroll offset once a render at a new scale has settled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OffsetCorrection {
    #[default]
    None,
    /// Pinch: `focal` is surface-local (gesture-start offset plus the finger
    /// midpoint), measured at `start_scale`.
    Focal {
        start_offset: Offset,
        focal: Point,
        start_scale: f64,
    },
    /// Discrete zoom: `center` is the surface-local centre of view at `from_scale`.
    Center {
        center: Point,
        from_scale: f64,
        container: Size,
    },
}

impl OffsetCorrection {
    /// Target offset after rendering at `new_scale`, before clamping to the
    /// scroll extent.
    pub fn resolve(&self, new_scale: f64) -> Option<Offset> {
        match *self {
            Self::None => None,
            Self::Focal {
                start_offset,
                focal,
                start_scale,
            } => Some(focal_offset(start_offset, focal, start_scale, new_scale)),
            Self::Center {
                center,
                from_scale,
                container,
            } => Some(centered_offset(center, from_scale, new_scale, container)),
        }
    }
}

/// `start_offset + focal * (new_scale / start_scale - 1)`
pub fn focal_offset(start_offset: Offset, focal: Point, start_scale: f64, new_scale: f64) -> Offset {
    if start_scale <= 0.0 {
        return start_offset;
    }
    start_offset + focal * (new_scale / start_scale - 1.0)
}

/// Surface-local point at the centre of the container.
pub fn view_center(offset: Offset, container: Size) -> Point {
    offset + container.center()
}

/// Offset that puts `center` (captured at `from_scale`) back in the middle
/// of the container at `to_scale`. Never negative.
pub fn centered_offset(center: Point, from_scale: f64, to_scale: f64, container: Size) -> Offset {
    if from_scale <= 0.0 {
        return Offset::ZERO;
    }
    let scaled = center * (to_scale / from_scale) - container.center();
    Point::new(scaled.x.max(0.0), scaled.y.max(0.0))
}

/// Scale at which `page` fits entirely inside `container`, never above 1.0.
pub fn fit_page_scale(container: Size, page: Size, padding: f64, bounds: ScaleBounds) -> f64 {
    if page.width <= 0.0 || page.height <= 0.0 {
        return bounds.clamp(1.0);
    }
    let scale_x = (container.width - padding) / page.width;
    let scale_y = (container.height - padding) / page.height;
    bounds.clamp(scale_x.min(scale_y).min(1.0))
}

/// Scale at which a page of width `page_width` fills the container width.
pub fn fit_width_scale(container: Size, page_width: f64, padding: f64, bounds: ScaleBounds) -> f64 {
    if page_width <= 0.0 {
        return bounds.clamp(1.0);
    }
    bounds.clamp((container.width - padding) / page_width)
}
