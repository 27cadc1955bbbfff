//! Bridges controller notifications into leptos signals.

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use gloo_timers::callback::Timeout;
use leptos::html::Div;
use leptos::prelude::*;

use folio_shared::{
    DocumentInfo, LoadState, PasswordRequest, RecentFiles, ViewerError, ViewerEvent, ViewerShell,
};

use crate::storage;

/// Runs controller tasks on the browser's microtask queue.
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// UI state the controller drives. Copyable so components can share it.
#[derive(Clone, Copy)]
pub struct ViewerSignals {
    pub page: RwSignal<u32>,
    pub page_count: RwSignal<u32>,
    pub scale: RwSignal<f64>,
    pub busy: RwSignal<bool>,
    pub load_state: RwSignal<LoadState>,
    pub error: RwSignal<Option<ViewerError>>,
    pub password: RwSignal<Option<PasswordRequest>>,
    pub document: RwSignal<Option<DocumentInfo>>,
    pub panning: RwSignal<bool>,
    pub page_changing: RwSignal<bool>,
    pub recent: RwSignal<RecentFiles>,
}

impl ViewerSignals {
    pub fn new(recent: RecentFiles) -> Self {
        Self {
            page: RwSignal::new(1),
            page_count: RwSignal::new(1),
            scale: RwSignal::new(1.0),
            busy: RwSignal::new(false),
            load_state: RwSignal::new(LoadState::Empty),
            error: RwSignal::new(None),
            password: RwSignal::new(None),
            document: RwSignal::new(None),
            panning: RwSignal::new(false),
            page_changing: RwSignal::new(false),
            recent: RwSignal::new(recent),
        }
    }
}

pub struct SignalShell {
    signals: ViewerSignals,
    container: NodeRef<Div>,
    transition_ms: u32,
}

impl SignalShell {
    pub fn new(signals: ViewerSignals, container: NodeRef<Div>, transition_ms: u32) -> Self {
        Self {
            signals,
            container,
            transition_ms,
        }
    }

    fn scroll_to(&self, x: f64, y: f64) {
        if let Some(container) = self.container.get_untracked() {
            container.set_scroll_left(x.round() as i32);
            container.set_scroll_top(y.round() as i32);
        }
    }
}

impl ViewerShell for SignalShell {
    fn notify(&self, event: ViewerEvent) {
        let s = self.signals;
        match event {
            ViewerEvent::PageChanged { page, page_count } => {
                s.page.set(page);
                s.page_count.set(page_count);
                s.document.update(|info| {
                    if let Some(info) = info {
                        info.current_page = page;
                    }
                });
            }
            ViewerEvent::ScaleChanged(scale) => {
                s.scale.set(scale);
                s.document.update(|info| {
                    if let Some(info) = info {
                        info.zoom_percent = folio_shared::view_state::zoom_percent(scale);
                    }
                });
            }
            ViewerEvent::OffsetChanged(offset) => self.scroll_to(offset.x, offset.y),
            ViewerEvent::Busy(busy) => s.busy.set(busy),
            ViewerEvent::LoadStateChanged(state) => s.load_state.set(state),
            ViewerEvent::RenderStarted => s.page_changing.set(true),
            ViewerEvent::RenderFinished => {
                let page_changing = s.page_changing;
                Timeout::new(self.transition_ms, move || page_changing.set(false)).forget();
            }
            ViewerEvent::Error(err) => s.error.set(Some(err)),
            ViewerEvent::PasswordRequired(request) => s.password.set(Some(request)),
            ViewerEvent::DocumentOpened(info) => {
                s.recent.update(|recent| {
                    recent.record(&info.title, &chrono::Local::now());
                    storage::save_recent(recent);
                });
                s.error.set(None);
                s.password.set(None);
                s.document.set(Some(info));
            }
            ViewerEvent::Closed => {
                s.document.set(None);
                s.password.set(None);
                s.panning.set(false);
            }
            ViewerEvent::Panning(panning) => s.panning.set(panning),
        }
    }
}
