//! In-memory stand-ins for the decoding library and the UI shell.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::cancel::CancelToken;
use crate::document::{Document, DocumentLoader, Page, PageViewport, RenderOutcome, Surface};
use crate::error::{OpenError, RenderError};
use crate::events::{ViewerEvent, ViewerShell};
use crate::geometry::Size;
use crate::load::PasswordRequest;

type OutcomeSlot = Rc<RefCell<Option<oneshot::Sender<RenderOutcome>>>>;

/// A render the test has not resolved yet.
pub struct HeldRender {
    pub page: u32,
    pub scale: f64,
    slot: OutcomeSlot,
}

impl HeldRender {
    fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn resolve(self, outcome: RenderOutcome) {
        if let Some(sender) = self.slot.borrow_mut().take() {
            let _ = sender.send(outcome);
        }
    }
}

/// Knobs shared by every fake created from the same loader.
#[derive(Default)]
pub struct FakeControl {
    /// Keep renders pending until the test resolves them.
    pub hold: Cell<bool>,
    /// Held renders ignore cancellation and wait to be resolved.
    pub ignore_cancel: Cell<bool>,
    pub fail_next_render: RefCell<Option<RenderError>>,
    pub fail_page_fetch: Cell<bool>,
    pub held: RefCell<VecDeque<HeldRender>>,
    pub started: RefCell<Vec<(u32, f64)>>,
    pub destroyed: Cell<u32>,
}

impl FakeControl {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Held renders that have not resolved, by the test or by cancellation.
    pub fn held_count(&self) -> usize {
        self.held.borrow().iter().filter(|render| render.is_pending()).count()
    }

    /// Resolve the oldest pending held render.
    pub fn release(&self, outcome: RenderOutcome) {
        loop {
            let next = self.held.borrow_mut().pop_front();
            match next {
                Some(render) if render.is_pending() => return render.resolve(outcome),
                Some(_) => continue,
                None => return,
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeSurface {
    state: Rc<RefCell<SurfaceState>>,
}

#[derive(Default)]
struct SurfaceState {
    size: Size,
    painted: Vec<(u32, f64)>,
}

impl FakeSurface {
    pub fn size(&self) -> Size {
        self.state.borrow().size
    }

    /// Completed paints in order, as `(page, scale)`.
    pub fn painted(&self) -> Vec<(u32, f64)> {
        self.state.borrow().painted.clone()
    }

    fn paint(&self, page: u32, scale: f64) {
        self.state.borrow_mut().painted.push((page, scale));
    }
}

impl Surface for FakeSurface {
    fn resize(&self, size: Size) {
        self.state.borrow_mut().size = size;
    }
}

pub struct FakePage {
    number: u32,
    size: Size,
    control: Rc<FakeControl>,
}

impl Page<FakeSurface> for FakePage {
    fn viewport(&self, scale: f64) -> PageViewport {
        PageViewport {
            width: self.size.width * scale,
            height: self.size.height * scale,
            scale,
        }
    }

    fn render(
        &self,
        surface: &FakeSurface,
        viewport: PageViewport,
        token: CancelToken,
    ) -> LocalBoxFuture<'static, RenderOutcome> {
        let (page, scale) = (self.number, viewport.scale);
        self.control.started.borrow_mut().push((page, scale));

        if let Some(err) = self.control.fail_next_render.borrow_mut().take() {
            return future::ready(RenderOutcome::Failed(err)).boxed_local();
        }

        let (sender, receiver) = oneshot::channel();
        let slot: OutcomeSlot = Rc::new(RefCell::new(Some(sender)));
        if self.control.hold.get() {
            if !self.control.ignore_cancel.get() {
                let on_cancel = slot.clone();
                token.on_cancel(move || {
                    if let Some(sender) = on_cancel.borrow_mut().take() {
                        let _ = sender.send(RenderOutcome::Cancelled);
                    }
                });
            }
            self.control.held.borrow_mut().push_back(HeldRender { page, scale, slot });
        } else {
            HeldRender { page, scale, slot }.resolve(RenderOutcome::Completed);
        }

        let surface = surface.clone();
        async move {
            let outcome = receiver.await.unwrap_or(RenderOutcome::Cancelled);
            if outcome == RenderOutcome::Completed {
                surface.paint(page, scale);
            }
            outcome
        }
        .boxed_local()
    }
}

pub struct FakeDocument {
    page_count: u32,
    page_size: Size,
    control: Rc<FakeControl>,
}

impl Document<FakeSurface> for FakeDocument {
    type Page = FakePage;

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page(&self, number: u32) -> LocalBoxFuture<'static, Result<FakePage, RenderError>> {
        let result = if self.control.fail_page_fetch.get() {
            Err(RenderError::new(format!("page {number} unavailable")))
        } else {
            Ok(FakePage {
                number,
                size: self.page_size,
                control: self.control.clone(),
            })
        };
        future::ready(result).boxed_local()
    }

    fn destroy(&self) {
        self.control.destroyed.set(self.control.destroyed.get() + 1);
    }
}

pub struct FakeLoader {
    page_count: u32,
    page_size: Size,
    password: Option<String>,
    corrupt: bool,
    control: Rc<FakeControl>,
}

impl FakeLoader {
    pub fn new(page_count: u32, control: Rc<FakeControl>) -> Self {
        Self {
            page_count,
            page_size: Size::new(600.0, 800.0),
            password: None,
            corrupt: false,
            control,
        }
    }

    pub fn corrupt(control: Rc<FakeControl>) -> Self {
        Self {
            corrupt: true,
            ..Self::new(1, control)
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }
}

impl DocumentLoader<FakeSurface> for FakeLoader {
    type Document = FakeDocument;

    fn open(
        &self,
        _bytes: Rc<[u8]>,
        password: Option<String>,
    ) -> LocalBoxFuture<'static, Result<FakeDocument, OpenError>> {
        let result = if self.corrupt {
            Err(OpenError::Corrupt("invalid xref table".to_string()))
        } else {
            match (&self.password, password) {
                (Some(_), None) => Err(OpenError::PasswordRequired),
                (Some(expected), Some(given)) if *expected != given => Err(OpenError::WrongPassword),
                _ => Ok(FakeDocument {
                    page_count: self.page_count,
                    page_size: self.page_size,
                    control: self.control.clone(),
                }),
            }
        };
        future::ready(result).boxed_local()
    }
}

/// Shell that keeps every event it is sent.
#[derive(Default)]
pub struct RecordingShell {
    events: RefCell<Vec<ViewerEvent>>,
}

impl RecordingShell {
    pub fn take(&self) -> Vec<ViewerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn take_password_request(&self) -> Option<PasswordRequest> {
        let mut events = self.events.borrow_mut();
        let index = events
            .iter()
            .position(|event| matches!(event, ViewerEvent::PasswordRequired(_)))?;
        match events.remove(index) {
            ViewerEvent::PasswordRequired(request) => Some(request),
            _ => None,
        }
    }

    pub fn errors(&self) -> Vec<crate::error::ViewerError> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ViewerEvent::Error(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&ViewerEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }
}

impl ViewerShell for RecordingShell {
    fn notify(&self, event: ViewerEvent) {
        self.events.borrow_mut().push(event);
    }
}
