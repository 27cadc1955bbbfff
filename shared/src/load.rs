//! Opening a document, including the password round-trip with the shell.

use std::fmt;
use std::rc::Rc;

use futures::channel::oneshot;
use tracing::{debug, warn};

use crate::document::{DocumentLoader, Surface};
use crate::error::{OpenError, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPrompt {
    /// First prompt for a protected document.
    Required,
    /// The previous password was rejected.
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Empty,
    Loading,
    PasswordPending(PasswordPrompt),
    Loaded,
    Failed,
}

impl LoadState {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::PasswordPending(_))
    }
}

/// Handed to the shell when a load needs a password. The load stays
/// suspended until the request is submitted, cancelled or dropped.
pub struct PasswordRequest {
    prompt: PasswordPrompt,
    reply: oneshot::Sender<String>,
}

impl PasswordRequest {
    fn new(prompt: PasswordPrompt) -> (Self, oneshot::Receiver<String>) {
        let (reply, receiver) = oneshot::channel();
        (Self { prompt, reply }, receiver)
    }

    pub fn prompt(&self) -> PasswordPrompt {
        self.prompt
    }

    /// Message to show next to the password field.
    pub fn reason(&self) -> ViewerError {
        match self.prompt {
            PasswordPrompt::Required => ViewerError::PasswordRequired,
            PasswordPrompt::Retry => ViewerError::WrongPassword,
        }
    }

    /// Resume the load with `password`. A blank password hands the request back.
    pub fn submit(self, password: impl Into<String>) -> Result<(), PasswordRequest> {
        let password = password.into();
        if password.trim().is_empty() {
            return Err(self);
        }
        if self.reply.send(password).is_err() {
            debug!("password submitted after the load was abandoned");
        }
        Ok(())
    }

    /// Abandon the load.
    pub fn cancel(self) {}
}

impl fmt::Debug for PasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRequest")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// Why a load ended without a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadAbort {
    /// The shell cancelled the password prompt.
    Cancelled,
    Failed(ViewerError),
}

/// Open `bytes`, asking for a password through `prompt` as often as the
/// decoder rejects one. There is no attempt limit.
pub async fn open_document<S, L>(
    loader: &L,
    bytes: Rc<[u8]>,
    mut prompt: impl FnMut(PasswordRequest),
) -> Result<L::Document, LoadAbort>
where
    S: Surface,
    L: DocumentLoader<S>,
{
    let mut password: Option<String> = None;
    loop {
        let supplied = password.is_some();
        let next_prompt = match loader.open(bytes.clone(), password.take()).await {
            Ok(document) => return Ok(document),
            Err(OpenError::Corrupt(reason)) => {
                warn!(error = %reason, "document failed to open");
                return Err(LoadAbort::Failed(ViewerError::LoadFailure(reason)));
            }
            Err(OpenError::WrongPassword) => PasswordPrompt::Retry,
            Err(OpenError::PasswordRequired) if supplied => PasswordPrompt::Retry,
            Err(OpenError::PasswordRequired) => PasswordPrompt::Required,
        };
        debug!(prompt = ?next_prompt, "waiting for password");

        let (request, receiver) = PasswordRequest::new(next_prompt);
        prompt(request);
        match receiver.await {
            Ok(entered) => password = Some(entered),
            Err(oneshot::Canceled) => return Err(LoadAbort::Cancelled),
        }
    }
}
