use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::html::{Canvas, Div, Input};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event};

use folio_shared::{
    ControlsState, InputEvent, LoadState, ViewerConfig, ViewerError, ViewportController,
};

use crate::input;
use crate::pdfjs::PdfJsLoader;
use crate::shell::{BrowserSpawner, SignalShell, ViewerSignals};
use crate::storage;
use crate::surface::CanvasSurface;

type Controller = ViewportController<PdfJsLoader, CanvasSurface>;

struct WindowBindings {
    window: web_sys::Window,
    _keydown: Closure<dyn Fn(web_sys::KeyboardEvent)>,
    _resize: Closure<dyn Fn()>,
    _beforeunload: Closure<dyn Fn()>,
}

impl WindowBindings {
    fn detach(&self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("keydown", self._keydown.as_ref().unchecked_ref());
        let _ = self
            .window
            .remove_event_listener_with_callback("resize", self._resize.as_ref().unchecked_ref());
        let _ = self.window.remove_event_listener_with_callback(
            "beforeunload",
            self._beforeunload.as_ref().unchecked_ref(),
        );
    }
}

thread_local! {
    static WINDOW_BINDINGS: RefCell<Option<WindowBindings>> = const { RefCell::new(None) };
}

/// Feeds a container event to the controller and honours its prevent-default verdict.
fn forward(
    controller: &Controller,
    container: NodeRef<Div>,
    e: &Event,
    make: impl FnOnce(&Element) -> InputEvent,
) {
    let Some(el) = container.get_untracked() else {
        return;
    };
    let response = controller.dispatch(make(&el));
    if response.prevent_default {
        e.prevent_default();
    }
}

fn first_file(files: Option<web_sys::FileList>) -> Option<web_sys::File> {
    files.and_then(|list| list.get(0))
}

fn open_picked(controller: &Controller, signals: ViewerSignals, file: web_sys::File) {
    let controller = controller.clone();
    wasm_bindgen_futures::spawn_local(async move {
        match input::read_file(file).await {
            Ok(selected) => controller.open_file(selected),
            Err(err) => {
                tracing::warn!(error = %err, "could not read selected file");
                signals.error.set(Some(ViewerError::LoadFailure(err)));
            }
        }
    });
}

fn attach_window_bindings(controller: &Controller, container: NodeRef<Div>, debounce_ms: u32) {
    let Some(window) = web_sys::window() else {
        return;
    };

    WINDOW_BINDINGS.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            old.detach();
        }
    });

    let keydown = {
        let controller = controller.clone();
        Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
            if input::is_typing(&e) {
                return;
            }
            if controller.dispatch(input::key(&e)).prevent_default {
                e.prevent_default();
            }
        })
    };

    let resize = {
        let controller = controller.clone();
        let pending: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
        Closure::<dyn Fn()>::new(move || {
            let controller = controller.clone();
            // Replacing the handle cancels the previous timer.
            *pending.borrow_mut() = Some(Timeout::new(debounce_ms, move || {
                if let Some(el) = container.get_untracked() {
                    controller.dispatch(input::resize(&el));
                }
            }));
        })
    };

    let beforeunload = {
        let controller = controller.clone();
        Closure::<dyn Fn()>::new(move || controller.close())
    };

    let _ = window
        .add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref());
    let _ = window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());
    let _ = window
        .add_event_listener_with_callback("beforeunload", beforeunload.as_ref().unchecked_ref());

    WINDOW_BINDINGS.with(|slot| {
        *slot.borrow_mut() = Some(WindowBindings {
            window,
            _keydown: keydown,
            _resize: resize,
            _beforeunload: beforeunload,
        });
    });
}

#[component]
pub fn App(config: ViewerConfig) -> impl IntoView {
    let signals = ViewerSignals::new(storage::load_recent(config.recent_files_cap));
    let container_ref = NodeRef::<Div>::new();
    let canvas_ref = NodeRef::<Canvas>::new();
    let file_input_ref = NodeRef::<Input>::new();
    let password_ref = NodeRef::<Input>::new();
    let drag_over = RwSignal::new(false);
    let bounds = config.bounds();

    let shell = SignalShell::new(signals, container_ref, config.transition_ms);
    let controller: Controller = ViewportController::new(
        config.clone(),
        PdfJsLoader,
        CanvasSurface::new(canvas_ref),
        Rc::new(shell),
        Rc::new(BrowserSpawner),
    );

    attach_window_bindings(&controller, container_ref, config.resize_debounce_ms);

    // Report the container size once it mounts so fit-to-page has real numbers.
    Effect::new({
        let controller = controller.clone();
        move || {
            if let Some(el) = container_ref.get() {
                controller.dispatch(input::resize(&el));
            }
        }
    });

    let controls = Memo::new(move |_| {
        ControlsState::new(
            signals.page.get(),
            signals.page_count.get(),
            signals.scale.get(),
            bounds,
        )
    });
    let locked = move || signals.busy.get() || signals.load_state.get().is_busy();
    let has_document = move || signals.document.with(|d| d.is_some());

    // File screen

    let on_choose = move |_: web_sys::MouseEvent| {
        if let Some(el) = file_input_ref.get_untracked() {
            el.click();
        }
    };

    let on_file_change = {
        let controller = controller.clone();
        move |e: Event| {
            let Some(el) = e
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
            else {
                return;
            };
            let file = first_file(el.files());
            // Reset so choosing the same file again still fires `change`.
            el.set_value("");
            if let Some(file) = file {
                open_picked(&controller, signals, file);
            }
        }
    };

    let on_drag_over = move |e: web_sys::DragEvent| {
        e.prevent_default();
        drag_over.set(true);
    };
    let on_drag_leave = move |_: web_sys::DragEvent| drag_over.set(false);
    let on_drop = {
        let controller = controller.clone();
        move |e: web_sys::DragEvent| {
            e.prevent_default();
            drag_over.set(false);
            let file = first_file(e.data_transfer().and_then(|dt| dt.files()));
            if let Some(file) = file {
                open_picked(&controller, signals, file);
            }
        }
    };

    // Toolbar

    let on_back = {
        let controller = controller.clone();
        move |_: web_sys::MouseEvent| controller.close()
    };
    let on_previous = {
        let controller = controller.clone();
        move |_: web_sys::MouseEvent| controller.previous_page()
    };
    let on_next = {
        let controller = controller.clone();
        move |_: web_sys::MouseEvent| controller.next_page()
    };
    let on_zoom_in = {
        let controller = controller.clone();
        move |_: web_sys::MouseEvent| controller.zoom_in()
    };
    let on_zoom_out = {
        let controller = controller.clone();
        move |_: web_sys::MouseEvent| controller.zoom_out()
    };
    let on_fit_width = {
        let controller = controller.clone();
        move |_: web_sys::MouseEvent| controller.fit_to_width()
    };

    // Viewer container

    let on_mouse_down = {
        let controller = controller.clone();
        move |e: web_sys::MouseEvent| {
            forward(&controller, container_ref, &e, |el| input::mouse_down(el, &e))
        }
    };
    let on_mouse_move = {
        let controller = controller.clone();
        move |e: web_sys::MouseEvent| {
            forward(&controller, container_ref, &e, |el| input::mouse_move(el, &e))
        }
    };
    let on_mouse_up = {
        let controller = controller.clone();
        move |e: web_sys::MouseEvent| {
            forward(&controller, container_ref, &e, |_| {
                InputEvent::Pointer(folio_shared::PointerInput::MouseUp)
            })
        }
    };
    let on_mouse_leave = on_mouse_up.clone();
    let on_touch_start = {
        let controller = controller.clone();
        move |e: web_sys::TouchEvent| {
            forward(&controller, container_ref, &e, |el| input::touch_start(el, &e))
        }
    };
    let on_touch_move = {
        let controller = controller.clone();
        move |e: web_sys::TouchEvent| {
            forward(&controller, container_ref, &e, |el| input::touch_move(el, &e))
        }
    };
    let on_touch_end = {
        let controller = controller.clone();
        move |e: web_sys::TouchEvent| {
            forward(&controller, container_ref, &e, |el| input::touch_end(el, &e))
        }
    };
    let on_touch_cancel = on_touch_end.clone();
    let on_wheel = {
        let controller = controller.clone();
        move |e: web_sys::WheelEvent| forward(&controller, container_ref, &e, |_| input::wheel(&e))
    };
    let on_scroll = {
        let controller = controller.clone();
        move |e: Event| forward(&controller, container_ref, &e, input::scroll)
    };

    // Password prompt

    let on_password_submit = move |e: web_sys::SubmitEvent| {
        e.prevent_default();
        let Some(field) = password_ref.get_untracked() else {
            return;
        };
        let mut pending = None;
        signals.password.update(|slot| pending = slot.take());
        let Some(request) = pending else {
            return;
        };
        match request.submit(field.value()) {
            Ok(()) => field.set_value(""),
            Err(request) => {
                signals.password.set(Some(request));
                let _ = field.focus();
            }
        }
    };
    let on_password_cancel = move |_: web_sys::MouseEvent| {
        let mut pending = None;
        signals.password.update(|slot| pending = slot.take());
        if let Some(request) = pending {
            request.cancel();
        }
        if let Some(field) = password_ref.get_untracked() {
            field.set_value("");
        }
    };

    Effect::new(move || {
        if signals.password.with(|r| r.is_some())
            && let Some(field) = password_ref.get()
        {
            let _ = field.focus();
        }
    });

    view! {
        <div class="folio">
            <section class="file-screen" class:hidden=has_document>
                <h1>"Folio"</h1>
                <div
                    class="drop-zone"
                    class:drag-over=move || drag_over.get()
                    on:dragover=on_drag_over
                    on:dragleave=on_drag_leave
                    on:drop=on_drop
                >
                    <p>"Drop a PDF here"</p>
                    <button class="choose" on:click=on_choose>
                        "Choose file"
                    </button>
                    <input
                        node_ref=file_input_ref
                        type="file"
                        accept="application/pdf,.pdf"
                        class="hidden"
                        on:change=on_file_change
                    />
                </div>
                <div
                    class="loading"
                    class:hidden=move || signals.load_state.get() != LoadState::Loading
                >
                    "Opening…"
                </div>
                <div
                    class="recent"
                    class:hidden=move || signals.recent.with(|r| r.is_empty())
                >
                    <h2>"Recent"</h2>
                    <ul>
                        {move || {
                            signals
                                .recent
                                .with(|r| r.entries().to_vec())
                                .into_iter()
                                .map(|entry| {
                                    view! {
                                        <li on:click=on_choose title="Choose this file again">
                                            <span class="name">{entry.name}</span>
                                            <span class="date">{entry.date}</span>
                                        </li>
                                    }
                                })
                                .collect_view()
                        }}
                    </ul>
                </div>
            </section>

            <section class="viewer-screen" class:hidden=move || !has_document()>
                <header class="toolbar">
                    <button on:click=on_back title="Back">
                        "←"
                    </button>
                    <span class="title">
                        {move || signals.document.with(|d| d.as_ref().map(|d| d.title.clone()))}
                    </span>
                    <button
                        on:click=on_zoom_out
                        disabled=move || locked() || !controls.with(|c| c.zoom_out_enabled)
                        title="Zoom out"
                    >
                        "−"
                    </button>
                    <span class="zoom">{move || controls.with(|c| c.zoom_label.clone())}</span>
                    <button
                        on:click=on_zoom_in
                        disabled=move || locked() || !controls.with(|c| c.zoom_in_enabled)
                        title="Zoom in"
                    >
                        "+"
                    </button>
                    <button on:click=on_fit_width disabled=locked title="Fit width">
                        "↔"
                    </button>
                    <button
                        on:click=on_previous
                        disabled=move || locked() || !controls.with(|c| c.previous_enabled)
                        title="Previous page"
                    >
                        "‹"
                    </button>
                    <span class="page">{move || controls.with(|c| c.page_label.clone())}</span>
                    <button
                        on:click=on_next
                        disabled=move || locked() || !controls.with(|c| c.next_enabled)
                        title="Next page"
                    >
                        "›"
                    </button>
                </header>
                <div
                    node_ref=container_ref
                    class="page-container"
                    style:cursor=move || if signals.panning.get() { "grabbing" } else { "grab" }
                    style:touch-action="none"
                    on:mousedown=on_mouse_down
                    on:mousemove=on_mouse_move
                    on:mouseup=on_mouse_up
                    on:mouseleave=on_mouse_leave
                    on:touchstart=on_touch_start
                    on:touchmove=on_touch_move
                    on:touchend=on_touch_end
                    on:touchcancel=on_touch_cancel
                    on:wheel=on_wheel
                    on:scroll=on_scroll
                >
                    <canvas
                        node_ref=canvas_ref
                        class="page"
                        class:page-changing=move || signals.page_changing.get()
                    ></canvas>
                </div>
            </section>

            <div
                class="error-banner"
                class:hidden=move || signals.error.with(|e| e.is_none())
                on:click=move |_| signals.error.set(None)
            >
                {move || signals.error.with(|e| e.as_ref().map(|e| e.to_string()))}
            </div>

            <div class="modal" class:hidden=move || signals.password.with(|r| r.is_none())>
                <form class="password-dialog" on:submit=on_password_submit>
                    <p>
                        {move || {
                            signals.password.with(|r| r.as_ref().map(|r| r.reason().to_string()))
                        }}
                    </p>
                    <input node_ref=password_ref type="password" autocomplete="off" />
                    <div class="actions">
                        <button type="button" on:click=on_password_cancel>
                            "Cancel"
                        </button>
                        <button type="submit">"Open"</button>
                    </div>
                </form>
            </div>
        </div>
    }
}
