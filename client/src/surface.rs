use leptos::html::Canvas;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::CanvasRenderingContext2d;

use folio_shared::{Size, Surface};

pub fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .filter(|ratio| *ratio > 0.0)
        .unwrap_or(1.0)
}

/// The `<canvas>` pages are drawn into. The backing store is sized in device
/// pixels; the CSS box matches the page viewport.
#[derive(Clone, Copy)]
pub struct CanvasSurface {
    canvas: NodeRef<Canvas>,
}

impl CanvasSurface {
    pub fn new(canvas: NodeRef<Canvas>) -> Self {
        Self { canvas }
    }

    pub fn pixel_ratio(&self) -> f64 {
        device_pixel_ratio()
    }

    pub fn context(&self) -> Option<CanvasRenderingContext2d> {
        self.canvas
            .get_untracked()?
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()
    }
}

impl Surface for CanvasSurface {
    fn resize(&self, size: Size) {
        let Some(canvas) = self.canvas.get_untracked() else {
            return;
        };
        let ratio = self.pixel_ratio();
        canvas.set_width((size.width * ratio).floor().max(1.0) as u32);
        canvas.set_height((size.height * ratio).floor().max(1.0) as u32);
        let style = web_sys::HtmlElement::style(&canvas);
        style.set_property("width", &format!("{}px", size.width.floor())).ok();
        style.set_property("height", &format!("{}px", size.height.floor())).ok();
    }
}
