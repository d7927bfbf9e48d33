//! Read/write dispatch queue with a dedicated worker thread.
//!
//! Submissions land in one of two FIFO sequences depending on their kind.
//! The worker alternates between them: after running an operation of one
//! kind it tries the other kind first, falling back to whichever sequence is
//! non-empty, and sleeps only when both are empty. A burst of one kind can
//! therefore never starve the other.
//!
//! Every submission gets a ticket from a single counter. [`Dispatcher::drain`]
//! waits until no operation with a ticket at or below the last issued one is
//! queued or running, so work submitted after the drain started is not
//! waited for.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::error::{Error, Result};

/// Which sequence an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

impl OperationKind {
    fn other(self) -> Self {
        match self {
            Self::Read => Self::Write,
            Self::Write => Self::Read,
        }
    }
}

struct Ticketed<T> {
    ticket: u64,
    item: T,
}

struct QueueState<T> {
    reads: VecDeque<Ticketed<T>>,
    writes: VecDeque<Ticketed<T>>,
    in_flight: Option<u64>,
    next_ticket: u64,
    /// Callers currently blocked in `drain`.
    draining: usize,
    prefer: OperationKind,
    accepting: bool,
    stopped: bool,
}

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            in_flight: None,
            next_ticket: 1,
            draining: 0,
            prefer: OperationKind::Read,
            accepting: true,
            stopped: false,
        }
    }

    fn sequence(&mut self, kind: OperationKind) -> &mut VecDeque<Ticketed<T>> {
        match kind {
            OperationKind::Read => &mut self.reads,
            OperationKind::Write => &mut self.writes,
        }
    }

    /// Pop the next operation, preferring the kind that did not run last.
    fn pop_next(&mut self) -> Option<(OperationKind, T)> {
        let preferred = self.prefer;
        for kind in [preferred, preferred.other()] {
            if let Some(job) = self.sequence(kind).pop_front() {
                self.in_flight = Some(job.ticket);
                self.prefer = kind.other();
                return Some((kind, job.item));
            }
        }
        None
    }

    /// Lowest ticket still queued or running.
    fn min_pending(&self) -> Option<u64> {
        [
            self.reads.front().map(|j| j.ticket),
            self.writes.front().map(|j| j.ticket),
            self.in_flight,
        ]
        .into_iter()
        .flatten()
        .min()
    }
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    /// Signalled on submission and shutdown.
    work_ready: Condvar,
    /// Signalled whenever an operation finishes or the worker stops.
    progress: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the worker as stopped when it exits, including by panic.
struct StopGuard<'a, T>(&'a Shared<T>);

impl<T> Drop for StopGuard<'_, T> {
    fn drop(&mut self) {
        self.0.lock().stopped = true;
        self.0.progress.notify_all();
    }
}

/// Two-sequence dispatch queue drained by one worker thread.
pub struct Dispatcher<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Spawn the worker thread; `handler` runs every dispatched item in order.
    pub fn spawn<F>(name: &str, handler: F) -> Result<Self>
    where
        F: FnMut(OperationKind, T) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::new()),
            work_ready: Condvar::new(),
            progress: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(&worker_shared, handler))?;

        tracing::info!(worker = name, "Dispatch worker started");
        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Append an item to its sequence and return its ticket.
    pub fn submit(&self, kind: OperationKind, item: T) -> Result<u64> {
        let mut state = self.shared.lock();
        if !state.accepting || state.stopped {
            return Err(Error::Closed);
        }
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.sequence(kind).push_back(Ticketed { ticket, item });
        drop(state);

        self.shared.work_ready.notify_one();
        Ok(ticket)
    }

    /// Number of queued operations not yet started.
    pub fn len(&self) -> usize {
        let state = self.shared.lock();
        state.reads.len() + state.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until every operation submitted before this call has completed.
    ///
    /// Returns [`Error::WorkerStopped`] if the worker exited with such
    /// operations still pending.
    pub fn drain(&self) -> Result<()> {
        let mut state = self.shared.lock();
        let target = state.next_ticket - 1;
        state.draining += 1;
        tracing::trace!(target_ticket = target, drains = state.draining, "Draining dispatch queue");
        let result = loop {
            match state.min_pending() {
                None => break Ok(()),
                Some(ticket) if ticket > target => break Ok(()),
                Some(_) if state.stopped => break Err(Error::WorkerStopped),
                Some(_) => {}
            }
            state = self
                .shared
                .progress
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        };
        state.draining -= 1;
        result
    }

    /// Drop every queued, not yet started operation. Returns how many were dropped.
    pub fn discard(&self) -> usize {
        let mut state = self.shared.lock();
        let dropped = state.reads.len() + state.writes.len();
        state.reads.clear();
        state.writes.clear();
        drop(state);

        self.shared.progress.notify_all();
        dropped
    }

    /// Stop accepting work, let the worker finish what is queued, and join it.
    pub fn shutdown(&self) -> Result<()> {
        self.shared.lock().accepting = false;
        self.shared.work_ready.notify_all();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| Error::WorkerStopped)?;
            tracing::info!("Dispatch worker stopped");
        }
        Ok(())
    }
}

impl<T: Send + 'static> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "Dispatch worker did not shut down cleanly");
        }
    }
}

fn run_worker<T, F>(shared: &Shared<T>, mut handler: F)
where
    F: FnMut(OperationKind, T),
{
    let _guard = StopGuard(shared);
    loop {
        let (kind, item) = {
            let mut state = shared.lock();
            loop {
                if let Some(next) = state.pop_next() {
                    break next;
                }
                if !state.accepting {
                    return;
                }
                state = shared
                    .work_ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        handler(kind, item);

        shared.lock().in_flight = None;
        shared.progress.notify_all();
    }
}
