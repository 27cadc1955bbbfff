use thiserror::Error;

/// Failure reported by the decoding collaborator while opening a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    #[error("document is password protected")]
    PasswordRequired,
    #[error("incorrect password")]
    WrongPassword,
    #[error("document is corrupt: {0}")]
    Corrupt(String),
}

/// A genuine page fetch or render failure. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    PasswordRequired,
    WrongPassword,
    LoadFailure,
    RenderFailure,
}

/// Errors surfaced to the UI shell. The `Display` text is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error("Please select a valid PDF file.")]
    InvalidInput { name: String },
    #[error("This document is password protected.")]
    PasswordRequired,
    #[error("Incorrect password. Please try again.")]
    WrongPassword,
    #[error("Error loading PDF file. The file might be corrupted.")]
    LoadFailure(String),
    #[error("Error rendering page. Please try again.")]
    RenderFailure(#[source] RenderError),
}

impl ViewerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::PasswordRequired => ErrorKind::PasswordRequired,
            Self::WrongPassword => ErrorKind::WrongPassword,
            Self::LoadFailure(_) => ErrorKind::LoadFailure,
            Self::RenderFailure(_) => ErrorKind::RenderFailure,
        }
    }
}

impl From<OpenError> for ViewerError {
    fn from(err: OpenError) -> Self {
        match err {
            OpenError::PasswordRequired => Self::PasswordRequired,
            OpenError::WrongPassword => Self::WrongPassword,
            OpenError::Corrupt(reason) => Self::LoadFailure(reason),
        }
    }
}
