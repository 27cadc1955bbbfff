//! The viewport controller.
//!
//! Owns the [`ViewState`], the gesture tracker and the render scheduler, and
//! is the only thing that mutates them. Input arrives through [`dispatch`]
//! and the command methods; the shell hears back through [`ViewerShell`].
//!
//! State lives behind a single `RefCell`. Notifications and render work
//! produced while it is borrowed are collected as [`Effects`] and delivered
//! after the borrow ends, so a shell callback may call straight back in.
//!
//! [`dispatch`]: ViewportController::dispatch

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::document::{Document, DocumentLoader, Page, RenderOutcome, SelectedFile, Surface};
use crate::error::ViewerError;
use crate::events::{DocumentInfo, ViewerEvent, ViewerShell};
use crate::geometry::{Offset, Size};
use crate::gesture::{GestureContext, GestureTracker, PointerInput, classify};
use crate::keys::{KeyCommand, wheel_zoom};
use crate::load::{LoadAbort, LoadState, open_document};
use crate::render::{RenderJob, RenderRequest, RenderScheduler, Scheduled};
use crate::view_state::{ControlsState, ViewState, ZoomDirection, zoom_percent};
use crate::zoom::{OffsetCorrection, fit_page_scale, fit_width_scale, view_center};

/// Raw input forwarded by the shell. Coordinates are container-local CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerInput),
    Wheel { delta_y: f64, zoom_modifier: bool },
    Key { key: String, command_modifier: bool },
    /// Debounced container resize.
    Resize { container: Size },
    /// Native scroll of the container.
    Scroll { offset: Offset },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventResponse {
    pub prevent_default: bool,
}

impl EventResponse {
    const HANDLED: Self = Self {
        prevent_default: true,
    };
}

#[derive(Default)]
struct Effects {
    events: Vec<ViewerEvent>,
    render: Option<RenderJob>,
}

impl Effects {
    fn emit(&mut self, event: ViewerEvent) {
        self.events.push(event);
    }
}

struct Inner<D, S> {
    config: ViewerConfig,
    view: ViewState,
    gestures: GestureTracker,
    scheduler: RenderScheduler,
    document: Option<Rc<D>>,
    title: String,
    surface: S,
    load_state: LoadState,
    load_generation: u64,
    active: bool,
    /// Offset moved by pans and scrolls since the pending correction captured its baseline.
    pan_drift: Offset,
}

pub struct ViewportController<L, S>
where
    L: DocumentLoader<S>,
    S: Surface,
{
    inner: Rc<RefCell<Inner<L::Document, S>>>,
    loader: Rc<L>,
    shell: Rc<dyn ViewerShell>,
    spawner: Rc<dyn LocalSpawn>,
}

impl<L, S> Clone for ViewportController<L, S>
where
    L: DocumentLoader<S>,
    S: Surface,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            loader: self.loader.clone(),
            shell: self.shell.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<L, S> ViewportController<L, S>
where
    L: DocumentLoader<S>,
    S: Surface,
{
    pub fn new(
        config: ViewerConfig,
        loader: L,
        surface: S,
        shell: Rc<dyn ViewerShell>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        let view = ViewState::new(config.bounds());
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                view,
                gestures: GestureTracker::default(),
                scheduler: RenderScheduler::new(),
                document: None,
                title: String::new(),
                surface,
                load_state: LoadState::Empty,
                load_generation: 0,
                active: false,
                pan_drift: Offset::ZERO,
            })),
            loader: Rc::new(loader),
            shell,
            spawner,
        }
    }

    pub fn dispatch(&self, event: InputEvent) -> EventResponse {
        match event {
            InputEvent::Pointer(input) => self.update(|inner, fx| inner.on_pointer(&input, fx)),
            InputEvent::Wheel {
                delta_y,
                zoom_modifier,
            } => self.update(|inner, fx| inner.on_wheel(delta_y, zoom_modifier, fx)),
            InputEvent::Key {
                key,
                command_modifier,
            } => self.update(|inner, fx| inner.on_key(&key, command_modifier, fx)),
            InputEvent::Resize { container } => {
                self.update(|inner, fx| inner.on_resize(container, fx));
                EventResponse::default()
            }
            InputEvent::Scroll { offset } => {
                self.update(|inner, fx| inner.pan_to(offset, false, fx));
                EventResponse::default()
            }
        }
    }

    pub fn next_page(&self) {
        self.update(|inner, fx| inner.go_to(inner.view.page() + 1, fx));
    }

    pub fn previous_page(&self) {
        self.update(|inner, fx| inner.go_to(inner.view.page().saturating_sub(1), fx));
    }

    pub fn go_to_page(&self, page: u32) {
        self.update(|inner, fx| inner.go_to(page, fx));
    }

    pub fn first_page(&self) {
        self.go_to_page(1);
    }

    pub fn last_page(&self) {
        self.update(|inner, fx| inner.go_to(inner.view.page_count(), fx));
    }

    pub fn zoom_in(&self) {
        self.update(|inner, fx| inner.zoom(ZoomDirection::In, fx));
    }

    pub fn zoom_out(&self) {
        self.update(|inner, fx| inner.zoom(ZoomDirection::Out, fx));
    }

    /// Scale the current page to fill the container width.
    pub fn fit_to_width(&self) {
        let (document, page_number) = {
            let inner = self.inner.borrow();
            if !inner.accepts_commands() {
                return;
            }
            (inner.document.clone(), inner.view.page())
        };
        let Some(document) = document else {
            return;
        };
        let this = self.clone();
        self.spawn(async move {
            match document.page(page_number).await {
                Ok(page) => {
                    let width = page.viewport(1.0).width;
                    this.update(|inner, fx| inner.fit_width(&document, width, fx));
                }
                Err(err) => {
                    warn!(page = page_number, error = %err, "page fetch failed");
                    this.update(|_, fx| fx.emit(ViewerError::RenderFailure(err).into()));
                }
            }
        });
    }

    /// Load `file`, replacing the open document once the load succeeds.
    pub fn open_file(&self, file: SelectedFile) {
        if !file.is_document() {
            debug!(name = %file.name, mime = %file.mime_type, "rejected non-document file");
            self.update(|_, fx| fx.emit(ViewerError::InvalidInput { name: file.name }.into()));
            return;
        }

        let generation = self.update(|inner, fx| {
            inner.load_generation += 1;
            inner.set_load_state(LoadState::Loading, fx);
            inner.load_generation
        });
        let this = self.clone();
        self.spawn(async move {
            let result = open_document::<S, L>(&this.loader, file.bytes.clone(), |request| {
                this.update(|inner, fx| {
                    if inner.load_generation == generation {
                        inner.set_load_state(LoadState::PasswordPending(request.prompt()), fx);
                        fx.emit(ViewerEvent::PasswordRequired(request));
                    }
                });
            })
            .await;
            this.update(|inner, fx| inner.finish_load(generation, file.name, result, fx));
        });
    }

    pub fn close(&self) {
        self.update(|inner, fx| inner.close(fx));
    }

    pub fn view(&self) -> ViewState {
        self.inner.borrow().view.clone()
    }

    pub fn controls(&self) -> ControlsState {
        self.inner.borrow().view.controls()
    }

    pub fn document_info(&self) -> Option<DocumentInfo> {
        let inner = self.inner.borrow();
        inner.document.as_ref().map(|_| inner.info())
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().active
    }

    pub fn is_busy(&self) -> bool {
        self.inner.borrow().scheduler.is_busy()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.borrow().load_state
    }

    pub fn config(&self) -> ViewerConfig {
        self.inner.borrow().config.clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut Inner<L::Document, S>, &mut Effects) -> R) -> R {
        let mut effects = Effects::default();
        let result = f(&mut self.inner.borrow_mut(), &mut effects);
        for event in effects.events {
            self.shell.notify(event);
        }
        if let Some(job) = effects.render {
            self.spawn(self.clone().drive(job));
        }
        result
    }

    fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.spawner.spawn_local(task) {
            warn!(error = %err, "failed to spawn viewer task");
        }
    }

    /// Run `job` and every job that supersedes it until the scheduler idles.
    async fn drive(self, mut job: RenderJob) {
        loop {
            let outcome = self.perform(&job).await;
            match self.update(|inner, fx| inner.settle(&job, outcome, fx)) {
                Some(next) => job = next,
                None => break,
            }
        }
    }

    /// Every call is paired with the `RenderFinished` emitted by `settle`.
    async fn perform(&self, job: &RenderJob) -> RenderOutcome {
        let (document, surface) = self.update(|inner, fx| {
            fx.emit(ViewerEvent::RenderStarted);
            (inner.document.clone(), inner.surface.clone())
        });
        let Some(document) = document else {
            return RenderOutcome::Cancelled;
        };
        let page = match document.page(job.request.page).await {
            Ok(page) => page,
            Err(err) => return RenderOutcome::Failed(err),
        };
        if job.token.is_cancelled() {
            return RenderOutcome::Cancelled;
        }

        let viewport = page.viewport(job.request.scale);
        surface.resize(viewport.size());
        self.update(|inner, fx| {
            if inner.view.set_surface(viewport.size()) {
                fx.emit(ViewerEvent::OffsetChanged(inner.view.offset()));
            }
        });
        page.render(&surface, viewport, job.token.clone()).await
    }
}

impl<D, S> Inner<D, S>
where
    D: Document<S>,
    S: Surface,
{
    /// Buttons, keys and the wheel wait for the current render to finish.
    fn accepts_commands(&self) -> bool {
        self.document.is_some() && !self.scheduler.is_busy()
    }

    fn info(&self) -> DocumentInfo {
        DocumentInfo {
            title: self.title.clone(),
            page_count: self.view.page_count(),
            current_page: self.view.page(),
            zoom_percent: zoom_percent(self.view.scale()),
        }
    }

    fn set_load_state(&mut self, state: LoadState, fx: &mut Effects) {
        if self.load_state != state {
            self.load_state = state;
            fx.emit(ViewerEvent::LoadStateChanged(state));
        }
    }

    /// Pans are measured from here until the next correction baseline.
    fn mark_baseline(&mut self) {
        self.pan_drift = Offset::ZERO;
    }

    fn request_render(&mut self, correction: OffsetCorrection, fx: &mut Effects) {
        let request = RenderRequest {
            page: self.view.page(),
            scale: self.view.scale(),
            correction,
        };
        if let Scheduled::Started(job) = self.scheduler.request(request) {
            fx.emit(ViewerEvent::Busy(true));
            fx.render = Some(job);
        }
    }

    fn settle(&mut self, job: &RenderJob, outcome: RenderOutcome, fx: &mut Effects) -> Option<RenderJob> {
        let settlement = self.scheduler.settle(job, outcome);
        if let Some(done) = settlement.completed
            && let Some(target) = done.correction.resolve(done.scale)
        {
            let target = target + self.pan_drift;
            if self.view.set_offset(target) {
                fx.emit(ViewerEvent::OffsetChanged(self.view.offset()));
            }
        }
        if let Some(err) = settlement.failure {
            warn!(page = job.request.page, scale = job.request.scale, error = %err, "render failed");
            fx.emit(ViewerError::RenderFailure(err).into());
        }
        fx.emit(ViewerEvent::RenderFinished);
        if settlement.next.is_none() {
            fx.emit(ViewerEvent::Busy(false));
        }
        settlement.next
    }

    fn go_to(&mut self, page: u32, fx: &mut Effects) {
        if !self.accepts_commands() {
            return;
        }
        if self.view.set_page(page) {
            fx.emit(ViewerEvent::PageChanged {
                page: self.view.page(),
                page_count: self.view.page_count(),
            });
            self.request_render(OffsetCorrection::None, fx);
        }
    }

    fn zoom(&mut self, direction: ZoomDirection, fx: &mut Effects) {
        if !self.accepts_commands() {
            return;
        }
        let container = self.view.container();
        let center = view_center(self.view.offset(), container);
        let from_scale = self.view.scale();
        if self.view.step_scale(direction, self.config.zoom_step) {
            self.mark_baseline();
            fx.emit(ViewerEvent::ScaleChanged(self.view.scale()));
            self.request_render(
                OffsetCorrection::Center {
                    center,
                    from_scale,
                    container,
                },
                fx,
            );
        }
    }

    fn fit_width(&mut self, document: &Rc<D>, page_width: f64, fx: &mut Effects) {
        let same_document = self.document.as_ref().is_some_and(|open| Rc::ptr_eq(open, document));
        if !same_document || !self.accepts_commands() {
            return;
        }
        let scale = fit_width_scale(
            self.view.container(),
            page_width,
            self.config.fit_padding,
            self.view.bounds(),
        );
        if self.view.set_scale(scale) {
            fx.emit(ViewerEvent::ScaleChanged(self.view.scale()));
            self.request_render(OffsetCorrection::None, fx);
        }
    }

    /// Move the view. `echo` is false when the shell is already at `target`.
    fn pan_to(&mut self, target: Offset, echo: bool, fx: &mut Effects) {
        let before = self.view.offset();
        let changed = self.view.set_offset(target);
        let offset = self.view.offset();
        if changed {
            self.pan_drift = self.pan_drift + (offset - before);
        }
        let notify = if echo { changed } else { offset != target };
        if notify {
            fx.emit(ViewerEvent::OffsetChanged(offset));
        }
    }

    fn on_pointer(&mut self, input: &PointerInput, fx: &mut Effects) -> EventResponse {
        if self.document.is_none() {
            return EventResponse::default();
        }
        let ctx = GestureContext {
            scale: self.view.scale(),
            offset: self.view.offset(),
            bounds: self.view.bounds(),
            double_tap_scale: self.config.double_tap_target(),
            double_tap_window_ms: self.config.double_tap_window_ms,
        };
        let step = classify(&self.gestures, input, &ctx);
        self.gestures = step.tracker;
        // A new pinch captures the offset its focal correction starts from.
        if matches!(input, PointerInput::TouchStart { .. }) && step.tracker.is_pinching() {
            self.mark_baseline();
        }

        if let Some(panning) = step.panning {
            fx.emit(ViewerEvent::Panning(panning));
        }
        if let Some(target) = step.pan_to {
            self.pan_to(target, true, fx);
        }
        if let Some(zoom) = step.zoom
            && self.view.set_scale(zoom.scale)
        {
            fx.emit(ViewerEvent::ScaleChanged(self.view.scale()));
            self.request_render(zoom.correction, fx);
        }
        EventResponse {
            prevent_default: step.prevent_default,
        }
    }

    fn on_wheel(&mut self, delta_y: f64, zoom_modifier: bool, fx: &mut Effects) -> EventResponse {
        if !self.active {
            return EventResponse::default();
        }
        match wheel_zoom(delta_y, zoom_modifier) {
            Some(direction) => {
                self.zoom(direction, fx);
                EventResponse::HANDLED
            }
            None if zoom_modifier => EventResponse::HANDLED,
            None => EventResponse::default(),
        }
    }

    fn on_key(&mut self, key: &str, command_modifier: bool, fx: &mut Effects) -> EventResponse {
        if !self.active {
            return EventResponse::default();
        }
        let Some(command) = KeyCommand::from_key(key, command_modifier) else {
            return EventResponse::default();
        };
        match command {
            KeyCommand::PreviousPage => self.go_to(self.view.page().saturating_sub(1), fx),
            KeyCommand::NextPage => self.go_to(self.view.page() + 1, fx),
            KeyCommand::ZoomIn => self.zoom(ZoomDirection::In, fx),
            KeyCommand::ZoomOut => self.zoom(ZoomDirection::Out, fx),
            KeyCommand::FirstPage => self.go_to(1, fx),
            KeyCommand::LastPage => self.go_to(self.view.page_count(), fx),
            KeyCommand::Exit => self.close(fx),
            KeyCommand::SuppressFind => {}
        }
        EventResponse::HANDLED
    }

    fn on_resize(&mut self, container: Size, fx: &mut Effects) {
        if self.view.container() == container {
            return;
        }
        if self.view.set_container(container) {
            fx.emit(ViewerEvent::OffsetChanged(self.view.offset()));
        }
        if self.accepts_commands() {
            self.request_render(OffsetCorrection::None, fx);
        }
    }

    fn finish_load(
        &mut self,
        generation: u64,
        name: String,
        result: Result<D, LoadAbort>,
        fx: &mut Effects,
    ) {
        if generation != self.load_generation {
            if let Ok(stale) = result {
                debug!(name = %name, "discarding superseded load");
                stale.destroy();
            }
            return;
        }
        match result {
            Ok(document) => self.install(name, document, fx),
            Err(LoadAbort::Cancelled) => {
                debug!(name = %name, "load cancelled at password prompt");
                let state = if self.document.is_some() {
                    LoadState::Loaded
                } else {
                    LoadState::Empty
                };
                self.set_load_state(state, fx);
            }
            Err(LoadAbort::Failed(err)) => {
                warn!(name = %name, error = %err, "load failed");
                self.set_load_state(LoadState::Failed, fx);
                fx.emit(err.into());
            }
        }
    }

    fn install(&mut self, title: String, document: D, fx: &mut Effects) {
        self.scheduler.cancel_all();
        if let Some(previous) = self.document.take() {
            previous.destroy();
        }

        let page_count = document.page_count().max(1);
        let scale = fit_page_scale(
            self.view.container(),
            self.config.reference_page,
            self.config.fit_padding,
            self.view.bounds(),
        );
        self.view.reset(page_count, scale);
        self.gestures.reset();
        self.document = Some(Rc::new(document));
        self.title = title;
        self.active = true;
        info!(title = %self.title, pages = page_count, scale = self.view.scale(), "document opened");

        self.set_load_state(LoadState::Loaded, fx);
        fx.emit(ViewerEvent::DocumentOpened(self.info()));
        fx.emit(ViewerEvent::PageChanged {
            page: self.view.page(),
            page_count,
        });
        fx.emit(ViewerEvent::ScaleChanged(self.view.scale()));
        fx.emit(ViewerEvent::OffsetChanged(self.view.offset()));
        self.request_render(OffsetCorrection::None, fx);
    }

    fn close(&mut self, fx: &mut Effects) {
        self.load_generation += 1;
        self.scheduler.cancel_all();
        if let Some(document) = self.document.take() {
            document.destroy();
            info!(title = %self.title, "document closed");
        }
        self.view.reset(1, 1.0);
        self.gestures.reset();
        self.title.clear();
        self.active = false;
        self.pan_drift = Offset::ZERO;
        self.set_load_state(LoadState::Empty, fx);
        fx.emit(ViewerEvent::Closed);
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::LocalPool;

    use super::*;
    use crate::document::PDF_MIME_TYPE;
    use crate::error::RenderError;
    use crate::geometry::Point;
    use crate::load::PasswordPrompt;
    use crate::render::RenderPhase;
    use crate::testing::{FakeControl, FakeLoader, FakeSurface, RecordingShell};

    struct Harness {
        pool: LocalPool,
        controller: ViewportController<FakeLoader, FakeSurface>,
        shell: Rc<RecordingShell>,
        control: Rc<FakeControl>,
        surface: FakeSurface,
    }

    impl Harness {
        fn new(page_count: u32) -> Self {
            Self::build(ViewerConfig::default(), Size::new(2000.0, 2000.0), |control| {
                FakeLoader::new(page_count, control)
            })
        }

        fn build(
            config: ViewerConfig,
            container: Size,
            loader: impl FnOnce(Rc<FakeControl>) -> FakeLoader,
        ) -> Self {
            let pool = LocalPool::new();
            let control = FakeControl::new();
            let shell = Rc::new(RecordingShell::default());
            let surface = FakeSurface::default();
            let controller = ViewportController::new(
                config,
                loader(control.clone()),
                surface.clone(),
                shell.clone(),
                Rc::new(pool.spawner()),
            );
            controller.dispatch(InputEvent::Resize { container });
            Self {
                pool,
                controller,
                shell,
                control,
                surface,
            }
        }

        fn open(&mut self) {
            self.controller.open_file(pdf("report.pdf"));
            self.run();
        }

        fn run(&mut self) {
            self.pool.run_until_stalled();
        }

        fn touch(&self, input: PointerInput) -> EventResponse {
            self.controller.dispatch(InputEvent::Pointer(input))
        }

        fn key(&self, key: &str) -> EventResponse {
            self.controller.dispatch(InputEvent::Key {
                key: key.to_string(),
                command_modifier: false,
            })
        }

        fn page(&self) -> u32 {
            self.controller.view().page()
        }

        fn scale(&self) -> f64 {
            self.controller.view().scale()
        }
    }

    fn pdf(name: &str) -> SelectedFile {
        SelectedFile::new(name, PDF_MIME_TYPE, Rc::from(&b"%PDF-1.7"[..]))
    }

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn opening_renders_first_page_at_fit_scale() {
        let mut h = Harness::new(3);
        h.open();

        assert_eq!(h.controller.load_state(), LoadState::Loaded);
        assert!(h.controller.is_active());
        assert!(!h.controller.is_busy());
        assert_eq!(h.surface.painted(), vec![(1, 1.0)]);
        assert_eq!(h.surface.size(), Size::new(600.0, 800.0));
        assert_eq!(
            h.controller.document_info(),
            Some(DocumentInfo {
                title: "report.pdf".to_string(),
                page_count: 3,
                current_page: 1,
                zoom_percent: 100,
            })
        );
    }

    #[test]
    fn small_container_fits_reference_page() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(400.0, 300.0), |control| {
            FakeLoader::new(1, control)
        });
        h.open();
        assert!((h.scale() - 280.0 / 792.0).abs() < 1e-9);
    }

    #[test]
    fn next_page_stops_at_last_page() {
        let mut h = Harness::new(10);
        h.open();
        for _ in 0..9 {
            h.controller.next_page();
            h.run();
        }
        assert_eq!(h.page(), 10);
        let renders = h.control.started.borrow().len();
        assert_eq!(renders, 10);

        h.controller.next_page();
        h.run();
        assert_eq!(h.page(), 10);
        assert_eq!(h.control.started.borrow().len(), renders);
    }

    #[test]
    fn previous_and_jump_commands() {
        let mut h = Harness::new(5);
        h.open();
        h.controller.previous_page();
        h.run();
        assert_eq!(h.page(), 1);

        h.controller.last_page();
        h.run();
        assert_eq!(h.page(), 5);
        h.controller.go_to_page(3);
        h.run();
        assert_eq!(h.page(), 3);
        h.controller.go_to_page(6);
        h.run();
        assert_eq!(h.page(), 3);
        h.controller.first_page();
        h.run();
        assert_eq!(h.page(), 1);
    }

    #[test]
    fn three_zoom_ins_reach_one_seventy_five() {
        let config = ViewerConfig {
            max_scale: 3.0,
            ..ViewerConfig::default()
        };
        let mut h = Harness::build(config, Size::new(2000.0, 2000.0), |control| {
            FakeLoader::new(1, control)
        });
        h.open();
        for _ in 0..3 {
            h.controller.zoom_in();
            h.run();
        }
        assert_eq!(h.scale(), 1.75);
        assert!(h.shell.errors().is_empty());
        assert_eq!(h.surface.painted().last(), Some(&(1, 1.75)));
        assert_eq!(h.controller.controls().zoom_label, "175%");
    }

    #[test]
    fn zoom_in_keeps_the_view_centre_fixed() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(400.0, 300.0), |control| {
            FakeLoader::new(1, control)
        });
        h.open();
        h.controller.zoom_in();
        h.run();
        h.controller.zoom_in();
        h.run();
        assert_eq!(h.scale(), 0.75);
        assert_eq!(h.surface.size(), Size::new(450.0, 600.0));

        h.controller.dispatch(InputEvent::Scroll {
            offset: Point::new(20.0, 100.0),
        });
        let before = h.controller.view().offset() + Point::new(200.0, 150.0);

        h.controller.zoom_in();
        h.run();
        assert_eq!(h.scale(), 1.0);
        let offset = h.controller.view().offset();
        let after = offset + Point::new(200.0, 150.0);
        assert!((after.x / 1.0 - before.x / 0.75).abs() < 1e-6, "{offset:?}");
        assert!((after.y / 1.0 - before.y / 0.75).abs() < 1e-6, "{offset:?}");

        // Back out from the top-left corner: the centred target goes negative
        // and is clamped.
        h.controller.dispatch(InputEvent::Scroll {
            offset: Point::new(0.0, 0.0),
        });
        h.controller.zoom_out();
        h.run();
        assert_eq!(h.scale(), 0.75);
        assert_eq!(h.controller.view().offset(), Point::new(0.0, 0.0));
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let config = ViewerConfig {
            min_scale: 3.0,
            max_scale: 1.0,
            ..ViewerConfig::default()
        };
        let mut h = Harness::build(config, Size::new(2000.0, 2000.0), |control| {
            FakeLoader::new(2, control)
        });
        h.open();
        assert_eq!(h.scale(), 1.0);
        h.controller.zoom_in();
        h.run();
        assert_eq!(h.scale(), 1.0);
        assert!(h.shell.errors().is_empty());
    }

    #[test]
    fn paging_is_refused_while_rendering() {
        let mut h = Harness::new(4);
        h.control.hold.set(true);
        h.open();
        assert_eq!(h.control.held_count(), 1);
        assert!(h.controller.is_busy());

        h.controller.next_page();
        h.controller.zoom_in();
        assert_eq!(h.page(), 1);
        assert_eq!(h.scale(), 1.0);

        h.control.release(RenderOutcome::Completed);
        h.run();
        assert!(!h.controller.is_busy());
        h.controller.next_page();
        assert_eq!(h.page(), 2);
    }

    fn start_pinch(h: &mut Harness) {
        h.touch(PointerInput::TouchStart {
            touches: points(&[(100.0, 100.0), (200.0, 100.0)]),
        });
        h.touch(PointerInput::TouchMove {
            touches: points(&[(50.0, 100.0), (250.0, 100.0)]),
        });
        h.run();
        h.touch(PointerInput::TouchMove {
            touches: points(&[(0.0, 100.0), (300.0, 100.0)]),
        });
    }

    #[test]
    fn superseding_render_wins() {
        let mut h = Harness::new(1);
        h.open();
        h.control.hold.set(true);
        h.shell.take();

        start_pinch(&mut h);
        h.run();
        h.control.release(RenderOutcome::Completed);
        h.run();

        assert_eq!(h.surface.painted(), vec![(1, 1.0), (1, 3.0)]);
        assert_eq!(h.control.started.borrow().as_slice(), &[(1, 1.0), (1, 2.0), (1, 3.0)]);
        assert_eq!(h.scale(), 3.0);
        assert_eq!(h.shell.count(|e| matches!(e, ViewerEvent::Busy(false))), 1);
        assert!(h.shell.errors().is_empty());
    }

    #[test]
    fn late_result_of_superseded_render_lands_before_newer_one() {
        let mut h = Harness::new(1);
        h.open();
        h.control.hold.set(true);
        h.control.ignore_cancel.set(true);

        start_pinch(&mut h);
        h.run();
        assert_eq!(h.control.held_count(), 1);

        h.control.release(RenderOutcome::Completed);
        h.run();
        assert_eq!(h.control.held_count(), 1);
        h.control.release(RenderOutcome::Completed);
        h.run();

        assert_eq!(h.surface.painted(), vec![(1, 1.0), (1, 2.0), (1, 3.0)]);
        assert!(!h.controller.is_busy());
    }

    #[test]
    fn pinch_correction_keeps_pans_made_during_render() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(400.0, 300.0), |control| {
            FakeLoader::new(1, control)
        });
        h.open();
        let start_scale = h.scale();
        h.control.hold.set(true);

        h.touch(PointerInput::TouchStart {
            touches: points(&[(100.0, 200.0), (100.0, 300.0)]),
        });
        h.touch(PointerInput::TouchMove {
            touches: points(&[(100.0, 50.0), (100.0, 450.0)]),
        });
        h.run();
        assert!((h.scale() - start_scale * 4.0).abs() < 1e-9);

        h.controller.dispatch(InputEvent::Scroll {
            offset: Point::new(10.0, 20.0),
        });
        assert_eq!(h.controller.view().offset(), Point::new(10.0, 20.0));

        h.control.release(RenderOutcome::Completed);
        h.run();
        let offset = h.controller.view().offset();
        assert!((offset.x - 310.0).abs() < 1e-6, "{offset:?}");
        assert!((offset.y - 770.0).abs() < 1e-6, "{offset:?}");
    }

    #[test]
    fn pans_survive_a_superseded_pinch_render() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(400.0, 300.0), |control| {
            FakeLoader::new(1, control)
        });
        h.open();
        let start_scale = h.scale();
        h.control.hold.set(true);

        h.touch(PointerInput::TouchStart {
            touches: points(&[(100.0, 200.0), (100.0, 300.0)]),
        });
        h.touch(PointerInput::TouchMove {
            touches: points(&[(100.0, 150.0), (100.0, 350.0)]),
        });
        h.run();
        assert!((h.scale() - start_scale * 2.0).abs() < 1e-9);

        h.controller.dispatch(InputEvent::Scroll {
            offset: Point::new(10.0, 20.0),
        });
        assert_eq!(h.controller.view().offset(), Point::new(10.0, 20.0));

        h.touch(PointerInput::TouchMove {
            touches: points(&[(100.0, 50.0), (100.0, 450.0)]),
        });
        h.run();
        assert!((h.scale() - start_scale * 4.0).abs() < 1e-9);

        h.control.release(RenderOutcome::Completed);
        h.run();
        assert_eq!(h.control.held_count(), 0);
        assert!(!h.controller.is_busy());
        let offset = h.controller.view().offset();
        assert!((offset.x - 310.0).abs() < 1e-6, "{offset:?}");
        assert!((offset.y - 770.0).abs() < 1e-6, "{offset:?}");
    }

    #[test]
    fn new_pinch_starts_from_the_current_offset() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(400.0, 300.0), |control| {
            FakeLoader::new(1, control)
        });
        h.open();
        let start_scale = h.scale();
        h.control.hold.set(true);

        // The scroll lands between the two pinches, so the second one's start
        // offset already includes it.
        h.touch(PointerInput::TouchStart {
            touches: points(&[(100.0, 200.0), (100.0, 300.0)]),
        });
        h.touch(PointerInput::TouchMove {
            touches: points(&[(100.0, 150.0), (100.0, 350.0)]),
        });
        h.run();
        h.controller.dispatch(InputEvent::Scroll {
            offset: Point::new(10.0, 20.0),
        });
        h.touch(PointerInput::TouchEnd {
            touches: Vec::new(),
            time_ms: 0.0,
        });
        h.touch(PointerInput::TouchStart {
            touches: points(&[(100.0, 200.0), (100.0, 300.0)]),
        });
        h.touch(PointerInput::TouchMove {
            touches: points(&[(100.0, 150.0), (100.0, 350.0)]),
        });
        h.run();
        assert!((h.scale() - start_scale * 4.0).abs() < 1e-9);

        h.control.release(RenderOutcome::Completed);
        h.run();
        let offset = h.controller.view().offset();
        // (10, 20) + (110, 270) * (4 / 2 - 1)
        assert!((offset.x - 120.0).abs() < 1e-6, "{offset:?}");
        assert!((offset.y - 290.0).abs() < 1e-6, "{offset:?}");
    }

    #[test]
    fn double_tap_toggles_between_levels() {
        let mut h = Harness::new(1);
        h.open();
        for time_ms in [0.0, 100.0] {
            h.touch(PointerInput::TouchStart {
                touches: points(&[(10.0, 10.0)]),
            });
            h.touch(PointerInput::TouchEnd {
                touches: Vec::new(),
                time_ms,
            });
        }
        h.run();
        assert_eq!(h.scale(), 2.0);
        assert_eq!(h.surface.painted().last(), Some(&(1, 2.0)));
    }

    #[test]
    fn mouse_drag_reports_cursor_state() {
        let mut h = Harness::new(1);
        h.open();
        h.shell.take();
        h.touch(PointerInput::MouseDown {
            position: Point::new(5.0, 5.0),
            button: crate::gesture::MouseButton::Primary,
        });
        h.touch(PointerInput::MouseUp);
        let events = h.shell.take();
        assert!(matches!(events.as_slice(), [ViewerEvent::Panning(true), ViewerEvent::Panning(false)]));
    }

    #[test]
    fn wheel_zooms_only_with_modifier() {
        let mut h = Harness::new(1);
        h.open();

        let response = h.controller.dispatch(InputEvent::Wheel {
            delta_y: -100.0,
            zoom_modifier: false,
        });
        assert!(!response.prevent_default);
        assert_eq!(h.scale(), 1.0);

        let response = h.controller.dispatch(InputEvent::Wheel {
            delta_y: -3.0,
            zoom_modifier: true,
        });
        assert!(response.prevent_default);
        assert_eq!(h.scale(), 1.25);
        h.run();

        h.controller.dispatch(InputEvent::Wheel {
            delta_y: 40.0,
            zoom_modifier: true,
        });
        assert_eq!(h.scale(), 1.0);
    }

    #[test]
    fn keys_are_inert_until_a_document_is_open() {
        let mut h = Harness::new(3);
        assert!(!h.key("ArrowRight").prevent_default);

        h.open();
        assert!(h.key("ArrowRight").prevent_default);
        h.run();
        assert_eq!(h.page(), 2);
        assert!(!h.key("q").prevent_default);

        let find = h.controller.dispatch(InputEvent::Key {
            key: "f".to_string(),
            command_modifier: true,
        });
        assert!(find.prevent_default);

        assert!(h.key("Escape").prevent_default);
        assert!(!h.controller.is_active());
        assert_eq!(h.control.destroyed.get(), 1);
        assert_eq!(h.controller.load_state(), LoadState::Empty);
        assert!(h.controller.document_info().is_none());
        assert!(!h.key("ArrowRight").prevent_default);
    }

    #[test]
    fn password_flow() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(2000.0, 2000.0), |control| {
            FakeLoader::new(3, control).with_password("open sesame")
        });
        h.open();
        assert_eq!(
            h.controller.load_state(),
            LoadState::PasswordPending(PasswordPrompt::Required)
        );
        assert!(h.controller.document_info().is_none());

        let request = h.shell.take_password_request().unwrap();
        request.submit("guess").unwrap();
        h.run();
        assert_eq!(
            h.controller.load_state(),
            LoadState::PasswordPending(PasswordPrompt::Retry)
        );

        let request = h.shell.take_password_request().unwrap();
        request.submit("open sesame").unwrap();
        h.run();
        assert_eq!(h.controller.load_state(), LoadState::Loaded);
        assert_eq!(h.controller.document_info().map(|info| info.page_count), Some(3));
    }

    #[test]
    fn cancelled_password_leaves_viewer_empty() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(2000.0, 2000.0), |control| {
            FakeLoader::new(3, control).with_password("pw")
        });
        h.open();
        h.shell.take_password_request().unwrap().cancel();
        h.run();
        assert_eq!(h.controller.load_state(), LoadState::Empty);
        assert!(h.shell.errors().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let mut h = Harness::build(ViewerConfig::default(), Size::new(800.0, 600.0), FakeLoader::corrupt);
        h.open();
        assert_eq!(
            h.shell.errors(),
            vec![ViewerError::LoadFailure("invalid xref table".to_string())]
        );
        assert_eq!(h.controller.load_state(), LoadState::Failed);
        assert!(h.controller.document_info().is_none());
    }

    #[test]
    fn non_pdf_is_rejected_before_loading() {
        let mut h = Harness::new(1);
        h.controller
            .open_file(SelectedFile::new("photo.png", "image/png", Rc::from(&b"\x89PNG"[..])));
        h.run();
        assert_eq!(
            h.shell.errors(),
            vec![ViewerError::InvalidInput {
                name: "photo.png".to_string()
            }]
        );
        assert_eq!(h.controller.load_state(), LoadState::Empty);
        assert!(h.control.started.borrow().is_empty());
    }

    #[test]
    fn render_failure_is_surfaced_and_recoverable() {
        let mut h = Harness::new(2);
        *h.control.fail_next_render.borrow_mut() = Some(RenderError::new("canvas lost"));
        h.open();
        assert_eq!(
            h.shell.errors(),
            vec![ViewerError::RenderFailure(RenderError::new("canvas lost"))]
        );
        assert!(!h.controller.is_busy());

        h.controller.next_page();
        h.run();
        assert_eq!(h.page(), 2);
        assert_eq!(h.surface.painted(), vec![(2, 1.0)]);
    }

    #[test]
    fn page_fetch_failure_keeps_state_intact() {
        let mut h = Harness::new(3);
        h.open();
        h.control.fail_page_fetch.set(true);
        h.controller.next_page();
        h.run();

        assert_eq!(
            h.shell.errors(),
            vec![ViewerError::RenderFailure(RenderError::new("page 2 unavailable"))]
        );
        assert!(!h.controller.is_busy());
        assert_eq!(h.surface.painted(), vec![(1, 1.0)]);

        h.control.fail_page_fetch.set(false);
        h.controller.next_page();
        h.run();
        assert_eq!(h.page(), 3);
        assert_eq!(
            h.shell.count(|e| matches!(e, ViewerEvent::RenderStarted)),
            h.shell.count(|e| matches!(e, ViewerEvent::RenderFinished))
        );
    }

    #[test]
    fn close_cancels_inflight_render() {
        let mut h = Harness::new(2);
        h.control.hold.set(true);
        h.open();
        h.controller.close();
        h.run();

        assert_eq!(h.control.destroyed.get(), 1);
        assert!(!h.controller.is_busy());
        assert!(h.surface.painted().is_empty());
        assert!(h.shell.errors().is_empty());
        assert_eq!(h.shell.count(|e| matches!(e, ViewerEvent::Closed)), 1);
    }

    #[test]
    fn reopening_destroys_previous_document() {
        let mut h = Harness::new(2);
        h.open();
        h.controller.next_page();
        h.run();
        h.open();
        assert_eq!(h.control.destroyed.get(), 1);
        assert_eq!(h.page(), 1);
    }

    #[test]
    fn resize_rerenders_when_idle() {
        let mut h = Harness::new(1);
        h.open();
        h.controller.dispatch(InputEvent::Resize {
            container: Size::new(900.0, 700.0),
        });
        h.run();
        assert_eq!(h.control.started.borrow().len(), 2);
    }

    #[test]
    fn fit_to_width_fills_container() {
        let mut h = Harness::new(1);
        h.open();
        h.controller.fit_to_width();
        h.run();
        assert!((h.scale() - 3.3).abs() < 1e-9);
        assert_eq!(h.controller.load_state(), LoadState::Loaded);
        assert!(matches!(
            h.controller.inner.borrow().scheduler.phase(),
            RenderPhase::Idle
        ));
    }
}
