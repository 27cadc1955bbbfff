//! Render scheduling state machine.
//!
//! `Idle -> Rendering -> Idle` on success, `Idle -> Rendering -> Cancelling
//! -> Rendering/Idle` when a newer request supersedes the one in flight.
//! At most one job is live; while it runs, further requests collapse into a
//! single pending slot where the most recent request wins. The next job only
//! starts once the live one has settled, so two renders never write the
//! output surface at the same time.

use tracing::debug;

use crate::cancel::CancelToken;
use crate::document::RenderOutcome;
use crate::error::RenderError;
use crate::zoom::OffsetCorrection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Rendering,
    Cancelling,
}

/// Parameters captured when a render is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub page: u32,
    pub scale: f64,
    pub correction: OffsetCorrection,
}

/// A started render: the request plus the token that cancels it.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: u64,
    pub request: RenderRequest,
    pub token: CancelToken,
}

#[derive(Debug)]
pub enum Scheduled {
    /// Scheduler was idle; the caller must drive this job.
    Started(RenderJob),
    /// A job is in flight and has been asked to stop; the request waits in
    /// the pending slot.
    Superseding,
}

/// What happened when a job settled, and what to run next.
#[derive(Debug, Default)]
pub struct Settlement {
    /// Set when the job completed and nothing superseded it.
    pub completed: Option<RenderRequest>,
    /// Set when the job failed for real and nothing superseded it.
    pub failure: Option<RenderError>,
    pub next: Option<RenderJob>,
}

#[derive(Debug)]
pub struct RenderScheduler {
    phase: RenderPhase,
    next_id: u64,
    active: Option<(u64, CancelToken)>,
    pending: Option<RenderRequest>,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self {
            phase: RenderPhase::Idle,
            next_id: 0,
            active: None,
            pending: None,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != RenderPhase::Idle
    }

    pub fn request(&mut self, request: RenderRequest) -> Scheduled {
        match self.phase {
            RenderPhase::Idle => {
                let job = self.start(request);
                debug!(job = job.id, page = job.request.page, scale = job.request.scale, "render started");
                Scheduled::Started(job)
            }
            RenderPhase::Rendering | RenderPhase::Cancelling => {
                if let Some((id, token)) = &self.active {
                    if !token.is_cancelled() {
                        debug!(job = *id, "superseding in-flight render");
                    }
                    token.cancel();
                }
                if let Some(dropped) = self.pending.replace(request) {
                    debug!(page = dropped.page, scale = dropped.scale, "dropped intermediate render request");
                }
                self.phase = RenderPhase::Cancelling;
                Scheduled::Superseding
            }
        }
    }

    /// Record that `job` has finished with `outcome`.
    pub fn settle(&mut self, job: &RenderJob, outcome: RenderOutcome) -> Settlement {
        let is_active = matches!(&self.active, Some((id, _)) if *id == job.id);
        if !is_active {
            debug!(job = job.id, "ignoring settlement of unknown render");
            return Settlement::default();
        }
        self.active = None;

        let superseded = job.token.is_cancelled();
        let mut settlement = Settlement::default();
        match outcome {
            RenderOutcome::Completed if !superseded => {
                settlement.completed = Some(job.request.clone());
            }
            RenderOutcome::Failed(err) if !superseded => {
                settlement.failure = Some(err);
            }
            RenderOutcome::Failed(err) => {
                debug!(job = job.id, error = %err, "superseded render failed; discarding");
            }
            RenderOutcome::Completed | RenderOutcome::Cancelled => {
                debug!(job = job.id, "render cancelled");
            }
        }

        settlement.next = self.pending.take().map(|request| self.start(request));
        self.phase = match &settlement.next {
            Some(next) => {
                debug!(job = next.id, page = next.request.page, scale = next.request.scale, "render started");
                RenderPhase::Rendering
            }
            None => RenderPhase::Idle,
        };
        settlement
    }

    /// Cancel whatever is in flight and forget the pending request.
    pub fn cancel_all(&mut self) {
        self.pending = None;
        if let Some((_, token)) = &self.active {
            token.cancel();
            self.phase = RenderPhase::Cancelling;
        }
    }

    fn start(&mut self, request: RenderRequest) -> RenderJob {
        self.next_id += 1;
        let token = CancelToken::new();
        self.active = Some((self.next_id, token.clone()));
        self.phase = RenderPhase::Rendering;
        RenderJob {
            id: self.next_id,
            request,
            token,
        }
    }
}
