use serde::Serialize;

use crate::error::ViewerError;
use crate::geometry::Offset;
use crate::load::{LoadState, PasswordRequest};

/// Summary of the open document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub title: String,
    pub page_count: u32,
    pub current_page: u32,
    pub zoom_percent: u32,
}

/// Notifications from the controller to the UI shell.
#[derive(Debug)]
pub enum ViewerEvent {
    PageChanged { page: u32, page_count: u32 },
    ScaleChanged(f64),
    /// The shell should scroll its container to this offset.
    OffsetChanged(Offset),
    /// A render is in flight; paging controls should be disabled.
    Busy(bool),
    LoadStateChanged(LoadState),
    RenderStarted,
    RenderFinished,
    Error(ViewerError),
    /// The load is suspended until the request is answered.
    PasswordRequired(PasswordRequest),
    DocumentOpened(DocumentInfo),
    Closed,
    /// A mouse drag started or ended.
    Panning(bool),
}

impl From<ViewerError> for ViewerEvent {
    fn from(err: ViewerError) -> Self {
        ViewerEvent::Error(err)
    }
}

pub trait ViewerShell {
    fn notify(&self, event: ViewerEvent);
}
