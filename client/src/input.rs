//! DOM event translation into controller input.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, HtmlElement, KeyboardEvent, MouseEvent, TouchEvent, WheelEvent};

use folio_shared::{InputEvent, MouseButton, Offset, Point, PointerInput, SelectedFile, Size};

/// Converts viewport coordinates into coordinates relative to `container`.
fn local_point(container: &Element, client_x: f64, client_y: f64) -> Point {
    let rect = container.get_bounding_client_rect();
    Point::new(client_x - rect.left(), client_y - rect.top())
}

fn touch_points(container: &Element, e: &TouchEvent) -> Vec<Point> {
    let touches = e.touches();
    (0..touches.length())
        .filter_map(|i| touches.get(i))
        .map(|t| local_point(container, f64::from(t.client_x()), f64::from(t.client_y())))
        .collect()
}

pub fn mouse_down(container: &Element, e: &MouseEvent) -> InputEvent {
    let button = if e.button() == 0 {
        MouseButton::Primary
    } else {
        MouseButton::Other
    };
    InputEvent::Pointer(PointerInput::MouseDown {
        position: local_point(container, f64::from(e.client_x()), f64::from(e.client_y())),
        button,
    })
}

pub fn mouse_move(container: &Element, e: &MouseEvent) -> InputEvent {
    InputEvent::Pointer(PointerInput::MouseMove {
        position: local_point(container, f64::from(e.client_x()), f64::from(e.client_y())),
    })
}

pub fn touch_start(container: &Element, e: &TouchEvent) -> InputEvent {
    InputEvent::Pointer(PointerInput::TouchStart {
        touches: touch_points(container, e),
    })
}

pub fn touch_move(container: &Element, e: &TouchEvent) -> InputEvent {
    InputEvent::Pointer(PointerInput::TouchMove {
        touches: touch_points(container, e),
    })
}

pub fn touch_end(container: &Element, e: &TouchEvent) -> InputEvent {
    InputEvent::Pointer(PointerInput::TouchEnd {
        touches: touch_points(container, e),
        time_ms: now_ms(),
    })
}

/// Ctrl on most platforms, Cmd on macOS. Trackpad pinches arrive as wheel
/// events with `ctrlKey` set.
pub fn wheel(e: &WheelEvent) -> InputEvent {
    InputEvent::Wheel {
        delta_y: e.delta_y(),
        zoom_modifier: e.ctrl_key() || e.meta_key(),
    }
}

pub fn key(e: &KeyboardEvent) -> InputEvent {
    InputEvent::Key {
        key: e.key(),
        command_modifier: e.ctrl_key() || e.meta_key(),
    }
}

pub fn scroll(container: &Element) -> InputEvent {
    InputEvent::Scroll {
        offset: Offset::new(
            f64::from(container.scroll_left()),
            f64::from(container.scroll_top()),
        ),
    }
}

pub fn resize(container: &Element) -> InputEvent {
    InputEvent::Resize {
        container: Size::new(
            f64::from(container.client_width()),
            f64::from(container.client_height()),
        ),
    }
}

/// True when the key event comes from a text field, where shortcuts must not fire.
pub fn is_typing(e: &KeyboardEvent) -> bool {
    e.target()
        .and_then(|t| t.dyn_into::<HtmlElement>().ok())
        .map(|el| matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA"))
        .unwrap_or(false)
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Read a chosen or dropped file into memory.
pub async fn read_file(file: web_sys::File) -> Result<SelectedFile, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|err| format!("{err:?}"))?;
    let bytes: Rc<[u8]> = js_sys::Uint8Array::new(&buffer).to_vec().into();
    Ok(SelectedFile::new(file.name(), file.type_(), bytes))
}
