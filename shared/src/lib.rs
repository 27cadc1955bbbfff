pub mod cancel;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod keys;
pub mod load;
pub mod recent;
pub mod render;
pub mod view_state;
pub mod zoom;

#[cfg(test)]
mod testing;

pub use cancel::CancelToken;
pub use config::{ScaleBounds, ViewerConfig};
pub use controller::{EventResponse, InputEvent, ViewportController};
pub use document::*;
pub use error::*;
pub use events::*;
pub use geometry::{Offset, Point, Size};
pub use gesture::{MouseButton, PointerInput};
pub use load::{LoadState, PasswordPrompt, PasswordRequest};
pub use recent::{RecentEntry, RecentFiles};
pub use view_state::{ControlsState, ViewState, ZoomDirection};
