//! Assignment notifications.
//!
//! Every request gets one [`Subscription`] shared between the ledger and the
//! dispatcher, and the caller gets the matching [`Ticket`]. A subscription
//! resolves at most once. Closing it before the grant is delivered cancels
//! the grant: `on_assigned` is dropped unseen and the ticket reports why.
//! `on_released` only fires for a grant that was delivered.
//!
//! State transitions are decided under the pool lock; callbacks run later,
//! from a [`Batch`], with no pool lock held.

use crate::slot::SlotHandle;
use parking_lot::Mutex;
use reel_core::{PoolError, RequestId};
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome of a request as seen by its caller.
pub type Outcome = std::result::Result<SlotHandle, PoolError>;

pub type OnAssigned = Box<dyn FnOnce(Outcome) + Send>;
pub type OnReleased = Box<dyn FnOnce() + Send>;

/// Optional notification hooks supplied with a request.
#[derive(Default)]
pub struct Callbacks {
    on_assigned: Option<OnAssigned>,
    on_released: Option<OnReleased>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once with the granted slot, or with the reason the request
    /// could not be admitted. Never called after a release or supersession.
    pub fn on_assigned(mut self, f: impl FnOnce(Outcome) + Send + 'static) -> Self {
        self.on_assigned = Some(Box::new(f));
        self
    }

    /// Called once when a delivered grant ends, whatever the cause.
    pub fn on_released(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_released = Some(Box::new(f));
        self
    }
}

/// Why a request stopped waiting or lost its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reason {
    Released,
    Superseded,
    Evicted,
    Invalid(String),
    QueueFull(usize),
}

impl Reason {
    fn to_error(&self, id: &RequestId) -> PoolError {
        let id = id.clone();
        match self {
            Self::Released | Self::Evicted => PoolError::Cancelled { id },
            Self::Superseded => PoolError::Superseded { id },
            Self::Invalid(reason) => PoolError::InvalidRequest {
                id,
                reason: reason.clone(),
            },
            Self::QueueFull(limit) => PoolError::QueueFull { id, limit: *limit },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Delivered,
    Closed,
}

struct SubState {
    phase: Phase,
    on_assigned: Option<OnAssigned>,
    on_released: Option<OnReleased>,
    tx: Option<oneshot::Sender<Outcome>>,
}

/// Delivery state of one request.
pub(crate) struct Subscription {
    id: RequestId,
    state: Mutex<SubState>,
}

impl Subscription {
    pub(crate) fn new(id: RequestId, callbacks: Callbacks) -> (Arc<Self>, Ticket) {
        let (tx, rx) = oneshot::channel();
        let sub = Arc::new(Self {
            id: id.clone(),
            state: Mutex::new(SubState {
                phase: Phase::Waiting,
                on_assigned: callbacks.on_assigned,
                on_released: callbacks.on_released,
                tx: Some(tx),
            }),
        });
        let ticket = Ticket {
            id,
            rx,
            taken: false,
        };
        (sub, ticket)
    }

    /// End the subscription. Returns the notification to dispatch: the
    /// release hook for a delivered grant, or the cancellation of a pending one.
    pub(crate) fn close(&self, reason: Reason) -> Option<Dispatch> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut state.phase, Phase::Closed) {
            Phase::Delivered => state.on_released.take().map(Dispatch::Released),
            Phase::Waiting => {
                state.on_assigned = None;
                state.on_released = None;
                state.tx.take().map(|tx| Dispatch::Resolve {
                    tx,
                    outcome: Err(reason.to_error(&self.id)),
                })
            }
            Phase::Closed => None,
        }
    }

    fn deliver(&self, handle: SlotHandle) {
        let (callback, tx) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Waiting {
                return;
            }
            state.phase = Phase::Delivered;
            (state.on_assigned.take(), state.tx.take())
        };
        if let Some(tx) = tx {
            let _ = tx.send(Ok(handle.clone()));
        }
        if let Some(callback) = callback {
            callback(Ok(handle));
        }
    }

    fn fail(&self, reason: &Reason) {
        let (callback, tx) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Waiting {
                return;
            }
            state.phase = Phase::Closed;
            state.on_released = None;
            (state.on_assigned.take(), state.tx.take())
        };
        if let Some(tx) = tx {
            let _ = tx.send(Err(reason.to_error(&self.id)));
        }
        if let Some(callback) = callback {
            callback(Err(reason.to_error(&self.id)));
        }
    }
}

/// A deferred notification.
pub(crate) enum Dispatch {
    Deliver(Arc<Subscription>, SlotHandle),
    Fail(Arc<Subscription>, Reason),
    Released(OnReleased),
    Resolve {
        tx: oneshot::Sender<Outcome>,
        outcome: Outcome,
    },
}

/// Notifications in the order their state transitions happened.
#[derive(Default)]
pub(crate) struct Batch(SmallVec<[Dispatch; 4]>);

impl Batch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, dispatch: Dispatch) {
        self.0.push(dispatch);
    }

    pub(crate) fn extend(&mut self, dispatch: Option<Dispatch>) {
        if let Some(dispatch) = dispatch {
            self.0.push(dispatch);
        }
    }

    /// Fire everything. Must be called without the pool lock held.
    pub(crate) fn run(self) {
        for dispatch in self.0 {
            match dispatch {
                Dispatch::Deliver(sub, handle) => sub.deliver(handle),
                Dispatch::Fail(sub, reason) => sub.fail(&reason),
                Dispatch::Released(callback) => callback(),
                Dispatch::Resolve { tx, outcome } => {
                    let _ = tx.send(outcome);
                }
            }
        }
    }
}

/// The caller's side of a request: resolves once with the grant or the
/// reason there will be none.
#[derive(Debug)]
pub struct Ticket {
    id: RequestId,
    rx: oneshot::Receiver<Outcome>,
    taken: bool,
}

impl Ticket {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Poll without waiting. Yields the outcome exactly once; `None` while
    /// the request is still queued and after the outcome was taken.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        if self.taken {
            return None;
        }
        let outcome = match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(PoolError::Cancelled {
                id: self.id.clone(),
            }),
        };
        self.taken = true;
        Some(outcome)
    }

    /// Wait for the outcome. A pool dropped with the request still queued
    /// resolves as cancelled.
    pub async fn wait(self) -> Outcome {
        let id = self.id;
        self.rx
            .await
            .unwrap_or_else(|_| Err(PoolError::Cancelled { id }))
    }
}
