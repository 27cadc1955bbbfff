//! Seams to the document decoding library.
//!
//! The viewer never parses document bytes. It drives these traits, which the
//! browser shell implements on top of pdf.js and the tests implement with
//! in-memory fakes. All futures are `!Send`: everything runs on the single
//! UI thread.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::cancel::CancelToken;
use crate::error::{OpenError, RenderError};
use crate::geometry::Size;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Scale-dependent pixel dimensions of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl PageViewport {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Result of one render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Cancelled,
    Failed(RenderError),
}

/// The raster target pages are drawn into. Implementations are cheap handles.
pub trait Surface: Clone + 'static {
    fn resize(&self, size: Size);
}

pub trait Page<S: Surface> {
    fn viewport(&self, scale: f64) -> PageViewport;

    /// Draw into `surface`. The task should resolve to `Cancelled` once
    /// `token` is cancelled, but may finish first.
    fn render(
        &self,
        surface: &S,
        viewport: PageViewport,
        token: CancelToken,
    ) -> LocalBoxFuture<'static, RenderOutcome>;
}

pub trait Document<S: Surface>: 'static {
    type Page: Page<S>;

    fn page_count(&self) -> u32;

    /// Fetch page `number` (1-based).
    fn page(&self, number: u32) -> LocalBoxFuture<'static, Result<Self::Page, RenderError>>;

    /// Release decoder resources. Called once, when the viewer closes or replaces the document.
    fn destroy(&self) {}
}

pub trait DocumentLoader<S: Surface>: 'static {
    type Document: Document<S>;

    fn open(
        &self,
        bytes: Rc<[u8]>,
        password: Option<String>,
    ) -> LocalBoxFuture<'static, Result<Self::Document, OpenError>>;
}

/// A file handed over by the shell's file chooser or drop zone.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Rc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Rc<[u8]>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn is_document(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}
