//! Gesture classification for pointer and touch input.
//!
//! [`classify`] is a pure function from the current tracker state and one
//! input to the next tracker state plus what the view should do: move the
//! offset, or render at a new scale with an offset correction. It never
//! touches the view itself, so every gesture can be tested without a DOM.

use crate::config::ScaleBounds;
use crate::geometry::{Offset, Point};
use crate::zoom::OffsetCorrection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Other,
}

/// Raw pointer input. Positions are container-local CSS pixels; `touches`
/// lists every finger still on the screen after the event.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    MouseDown { position: Point, button: MouseButton },
    MouseMove { position: Point },
    /// Button released or pointer left the container.
    MouseUp,
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd { touches: Vec<Point>, time_ms: f64 },
}

/// State of the interaction between a press and its release.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureSession {
    #[default]
    Idle,
    Panning {
        start_point: Point,
        start_offset: Offset,
    },
    Pinching {
        start_distance: f64,
        start_scale: f64,
        start_offset: Offset,
        /// Latest finger midpoint, surface-local at `start_scale`.
        focal: Point,
    },
}

/// Gesture session plus the double-tap memory that outlives it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureTracker {
    pub session: GestureSession,
    last_tap_ms: Option<f64>,
    pinched: bool,
}

impl GestureTracker {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.session, GestureSession::Panning { .. })
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self.session, GestureSession::Pinching { .. })
    }
}

/// View values the classifier reads.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext {
    pub scale: f64,
    pub offset: Offset,
    pub bounds: ScaleBounds,
    pub double_tap_scale: f64,
    pub double_tap_window_ms: f64,
}

/// A render at `scale`, followed by `correction` once it settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomIntent {
    pub scale: f64,
    pub correction: OffsetCorrection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureStep {
    pub tracker: GestureTracker,
    pub pan_to: Option<Offset>,
    pub zoom: Option<ZoomIntent>,
    pub prevent_default: bool,
    /// `Some` when a drag started or ended (cursor feedback).
    pub panning: Option<bool>,
}

impl GestureStep {
    fn unchanged(tracker: GestureTracker) -> Self {
        Self {
            tracker,
            pan_to: None,
            zoom: None,
            prevent_default: false,
            panning: None,
        }
    }
}

pub fn classify(tracker: &GestureTracker, input: &PointerInput, ctx: &GestureContext) -> GestureStep {
    let mut step = GestureStep::unchanged(*tracker);
    match input {
        PointerInput::MouseDown { position, button } => {
            if *button == MouseButton::Primary {
                step.tracker.session = GestureSession::Panning {
                    start_point: *position,
                    start_offset: ctx.offset,
                };
                step.prevent_default = true;
                step.panning = Some(true);
            }
        }
        PointerInput::MouseMove { position } => {
            if let GestureSession::Panning {
                start_point,
                start_offset,
            } = tracker.session
            {
                step.pan_to = Some(start_offset + (start_point - *position));
                step.prevent_default = true;
            }
        }
        PointerInput::MouseUp => {
            if tracker.is_panning() {
                step.tracker.session = GestureSession::Idle;
                step.panning = Some(false);
            }
        }
        PointerInput::TouchStart { touches } => match touches.as_slice() {
            [finger] => {
                step.tracker.session = GestureSession::Panning {
                    start_point: *finger,
                    start_offset: ctx.offset,
                };
            }
            [a, b] => {
                step.tracker.session = GestureSession::Pinching {
                    start_distance: a.distance(*b),
                    start_scale: ctx.scale,
                    start_offset: ctx.offset,
                    focal: ctx.offset + a.midpoint(*b),
                };
                step.tracker.pinched = true;
                step.prevent_default = true;
            }
            _ => {}
        },
        PointerInput::TouchMove { touches } => match (touches.as_slice(), tracker.session) {
            (
                [finger],
                GestureSession::Panning {
                    start_point,
                    start_offset,
                },
            ) => {
                step.pan_to = Some(start_offset + (start_point - *finger));
                step.prevent_default = true;
            }
            (
                [a, b],
                GestureSession::Pinching {
                    start_distance,
                    start_scale,
                    start_offset,
                    ..
                },
            ) => {
                step.prevent_default = true;
                if start_distance <= 0.0 {
                    return step;
                }
                let focal = start_offset + a.midpoint(*b);
                step.tracker.session = GestureSession::Pinching {
                    start_distance,
                    start_scale,
                    start_offset,
                    focal,
                };
                let scale = ctx
                    .bounds
                    .clamp(start_scale * (a.distance(*b) / start_distance));
                if scale != ctx.scale {
                    step.zoom = Some(ZoomIntent {
                        scale,
                        correction: OffsetCorrection::Focal {
                            start_offset,
                            focal,
                            start_scale,
                        },
                    });
                }
            }
            _ => {}
        },
        PointerInput::TouchEnd { touches, time_ms } => match touches.as_slice() {
            [] => {
                step.tracker.session = GestureSession::Idle;
                if tracker.pinched {
                    step.tracker.pinched = false;
                    step.tracker.last_tap_ms = None;
                } else if let Some(last) = tracker.last_tap_ms
                    && *time_ms - last < ctx.double_tap_window_ms
                {
                    step.tracker.last_tap_ms = None;
                    step.zoom = double_tap_zoom(ctx);
                } else {
                    step.tracker.last_tap_ms = Some(*time_ms);
                }
            }
            [finger] if tracker.is_pinching() => {
                step.tracker.session = GestureSession::Panning {
                    start_point: *finger,
                    start_offset: ctx.offset,
                };
            }
            _ => {}
        },
    }
    step
}

/// Toggle between 1.0 and the secondary zoom level.
fn double_tap_zoom(ctx: &GestureContext) -> Option<ZoomIntent> {
    let target = if ctx.scale > 1.0 {
        ctx.bounds.clamp(1.0)
    } else {
        ctx.bounds.clamp(ctx.double_tap_scale)
    };
    if target == ctx.scale {
        return None;
    }
    Some(ZoomIntent {
        scale: target,
        correction: OffsetCorrection::None,
    })
}
