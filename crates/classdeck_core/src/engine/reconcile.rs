//! Reconciliation channel: persists optimistic changes to the order store.
//!
//! # Responsibility
//! - Carry move/reorder requests to an [`OrderStore`] without blocking the
//!   caller on the result.
//! - Report every request's terminal outcome exactly once.
//!
//! # Invariants
//! - Requests are applied in submission order.
//! - Failures are reported as [`ReconcileNotice`]s, never panics; nothing is
//!   retried automatically.
//! - Local snapshots are never touched here; rollback is the caller's call.

use crate::model::request::{MoveRequest, OrderRequest, ReorderRequest};
use crate::model::section::OwnerId;
use crate::repo::section_repo::{OrderStore, OrderStoreError};
use log::{info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Identifies one submitted request.
pub type Ticket = u64;

const USER_NOTICE: &str = "Your changes were not saved. Reload to see the latest order.";
const WORKER_THREAD_NAME: &str = "classdeck-reconcile";

/// User-visible description of one failed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileNotice {
    pub ticket: Ticket,
    /// `move` or `reorder`.
    pub request_kind: &'static str,
    /// Stable machine-readable error code.
    pub error_code: &'static str,
    /// Diagnostic detail; not meant for end users.
    pub detail: String,
}

impl ReconcileNotice {
    fn from_store_error(ticket: Ticket, request: &OrderRequest, err: &OrderStoreError) -> Self {
        Self {
            ticket,
            request_kind: request.label(),
            error_code: err.code(),
            detail: err.to_string(),
        }
    }

    /// Message the UI shows.
    pub fn user_message(&self) -> &'static str {
        USER_NOTICE
    }
}

/// Terminal outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Saved { ticket: Ticket },
    Failed(ReconcileNotice),
}

impl ReconcileOutcome {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Saved { ticket } => *ticket,
            Self::Failed(notice) => notice.ticket,
        }
    }
}

/// Errors from the channel itself, as opposed to store rejections.
#[derive(Debug)]
pub enum ReconcileError {
    /// Worker thread could not be started.
    Spawn(std::io::Error),
    /// Worker thread panicked; the store is lost.
    WorkerPanicked,
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to start reconciliation worker: {err}"),
            Self::WorkerPanicked => write!(f, "reconciliation worker panicked"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::WorkerPanicked => None,
        }
    }
}

/// Transport from the engine to the durable store.
pub trait Reconciler {
    /// Queues one request on behalf of `actor` and returns its ticket.
    fn submit(&mut self, actor: OwnerId, request: OrderRequest) -> Ticket;

    /// Drains outcomes that are ready, without blocking.
    fn poll(&mut self) -> Vec<ReconcileOutcome>;

    fn persist_move(&mut self, actor: OwnerId, request: MoveRequest) -> Ticket {
        self.submit(actor, OrderRequest::Move(request))
    }

    fn persist_reorder(&mut self, actor: OwnerId, request: ReorderRequest) -> Ticket {
        self.submit(actor, OrderRequest::Reorder(request))
    }
}

fn apply_request<S: OrderStore>(
    store: &mut S,
    ticket: Ticket,
    actor: OwnerId,
    request: &OrderRequest,
) -> ReconcileOutcome {
    let started_at = Instant::now();
    let result = match request {
        OrderRequest::Move(request) => store.apply_move(actor, request),
        OrderRequest::Reorder(request) => store.apply_reorder(actor, request),
    };

    match result {
        Ok(()) => {
            info!(
                "event=reconcile module=engine status=ok kind={} ticket={} duration_ms={}",
                request.label(),
                ticket,
                started_at.elapsed().as_millis()
            );
            ReconcileOutcome::Saved { ticket }
        }
        Err(err) => {
            warn!(
                "event=reconcile module=engine status=error kind={} ticket={} duration_ms={} error_code={} error={}",
                request.label(),
                ticket,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
            ReconcileOutcome::Failed(ReconcileNotice::from_store_error(ticket, request, &err))
        }
    }
}

/// Applies each request immediately on the caller's thread.
///
/// Outcomes are still delivered through [`Reconciler::poll`], so callers
/// handle both transports the same way.
pub struct InlineReconciler<S> {
    store: S,
    next_ticket: Ticket,
    outcomes: VecDeque<ReconcileOutcome>,
}

impl<S: OrderStore> InlineReconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            next_ticket: 1,
            outcomes: VecDeque::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: OrderStore> Reconciler for InlineReconciler<S> {
    fn submit(&mut self, actor: OwnerId, request: OrderRequest) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let outcome = apply_request(&mut self.store, ticket, actor, &request);
        self.outcomes.push_back(outcome);
        ticket
    }

    fn poll(&mut self) -> Vec<ReconcileOutcome> {
        self.outcomes.drain(..).collect()
    }
}

struct Envelope {
    ticket: Ticket,
    actor: OwnerId,
    request: OrderRequest,
}

/// Owns the store on a worker thread and applies requests FIFO.
///
/// A single worker serializes every order mutation it carries.
pub struct ThreadReconciler<S> {
    requests: Sender<Envelope>,
    outcomes: Receiver<ReconcileOutcome>,
    worker: JoinHandle<S>,
    next_ticket: Ticket,
    undelivered: VecDeque<ReconcileOutcome>,
}

impl<S: OrderStore + Send + 'static> ThreadReconciler<S> {
    /// Moves `store` onto a new worker thread.
    pub fn spawn(store: S) -> Result<Self, ReconcileError> {
        let (request_tx, request_rx) = mpsc::channel::<Envelope>();
        let (outcome_tx, outcome_rx) = mpsc::channel::<ReconcileOutcome>();

        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut store = store;
                while let Ok(envelope) = request_rx.recv() {
                    let outcome = apply_request(
                        &mut store,
                        envelope.ticket,
                        envelope.actor,
                        &envelope.request,
                    );
                    // Receiver gone means nobody listens; keep draining so
                    // queued writes still land.
                    let _ = outcome_tx.send(outcome);
                }
                store
            })
            .map_err(ReconcileError::Spawn)?;

        info!("event=reconcile_worker module=engine status=start");
        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
            worker,
            next_ticket: 1,
            undelivered: VecDeque::new(),
        })
    }

    /// Blocks until `count` outcomes are available or `timeout` elapses.
    pub fn wait_for_outcomes(&mut self, count: usize, timeout: Duration) -> Vec<ReconcileOutcome> {
        let deadline = Instant::now() + timeout;
        let mut collected: Vec<ReconcileOutcome> = self.undelivered.drain(..).collect();
        while collected.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.outcomes.recv_timeout(remaining) {
                Ok(outcome) => collected.push(outcome),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        collected
    }

    /// Stops accepting requests, waits for queued ones, and returns the store
    /// with any outcomes not yet polled.
    pub fn shutdown(self) -> Result<(S, Vec<ReconcileOutcome>), ReconcileError> {
        let Self {
            requests,
            outcomes,
            worker,
            mut undelivered,
            ..
        } = self;
        drop(requests);
        let store = worker.join().map_err(|_| ReconcileError::WorkerPanicked)?;
        undelivered.extend(outcomes.try_iter());
        info!("event=reconcile_worker module=engine status=stop");
        Ok((store, undelivered.into_iter().collect()))
    }
}

impl<S: OrderStore + Send + 'static> Reconciler for ThreadReconciler<S> {
    fn submit(&mut self, actor: OwnerId, request: OrderRequest) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let kind = request.label();
        let envelope = Envelope {
            ticket,
            actor,
            request,
        };
        if self.requests.send(envelope).is_err() {
            warn!(
                "event=reconcile module=engine status=error kind={} ticket={} error_code=worker_gone",
                kind, ticket
            );
            self.undelivered.push_back(ReconcileOutcome::Failed(ReconcileNotice {
                ticket,
                request_kind: kind,
                error_code: "worker_gone",
                detail: "reconciliation worker is no longer running".to_string(),
            }));
        }
        ticket
    }

    fn poll(&mut self) -> Vec<ReconcileOutcome> {
        let mut ready: Vec<ReconcileOutcome> = self.undelivered.drain(..).collect();
        ready.extend(self.outcomes.try_iter());
        ready
    }
}
