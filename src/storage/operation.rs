//! Pending operations and their outcomes.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::query::Statement;
use crate::value::Row;

use super::dispatch::OperationKind;

/// What the engine should do with a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Collect result rows; `first_only` stops after one row.
    Read { first_only: bool },
    /// Execute for its side effects.
    Write,
}

impl Action {
    pub fn kind(self) -> OperationKind {
        match self {
            Self::Read { .. } => OperationKind::Read,
            Self::Write => OperationKind::Write,
        }
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(Vec<Row>),
    Written { changes: usize, last_insert_rowid: i64 },
}

impl Outcome {
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Written { .. } => Vec::new(),
        }
    }

    pub fn changes(&self) -> usize {
        match self {
            Self::Written { changes, .. } => *changes,
            Self::Rows(_) => 0,
        }
    }

    pub fn last_insert_rowid(&self) -> Option<i64> {
        match self {
            Self::Written {
                last_insert_rowid, ..
            } => Some(*last_insert_rowid),
            Self::Rows(_) => None,
        }
    }
}

/// Sender half of an operation's completion signal.
pub type Completer = oneshot::Sender<Result<Outcome>>;

/// A compiled statement queued for the dispatch worker.
#[derive(Debug)]
pub struct Operation {
    pub id: Uuid,
    pub statement: Statement,
    pub action: Action,
    pub reply: Option<Completer>,
}

impl Operation {
    pub fn new(statement: Statement, action: Action) -> Self {
        Self {
            id: crate::generate_operation_id(),
            statement,
            action,
            reply: None,
        }
    }

    /// Attach a completion signal; the returned receiver yields the outcome.
    pub fn awaited(mut self) -> (Self, oneshot::Receiver<Result<Outcome>>) {
        let (tx, rx) = oneshot::channel();
        self.reply = Some(tx);
        (self, rx)
    }

    pub fn kind(&self) -> OperationKind {
        self.action.kind()
    }

    /// Hand the result to the waiting caller, or log it if nobody waits.
    pub fn complete(self, result: Result<Outcome>) {
        match self.reply {
            Some(reply) => {
                // The caller may have given up waiting; nothing else to do.
                let _ = reply.send(result);
            }
            None => {
                if let Err(e) = result {
                    tracing::warn!(
                        operation_id = %self.id,
                        sql = %self.statement.sql,
                        error = %e,
                        "Detached operation failed"
                    );
                }
            }
        }
    }
}

/// Wait on a completion signal from synchronous code.
///
/// Works both inside and outside an async runtime.
pub(crate) fn wait(rx: oneshot::Receiver<Result<Outcome>>) -> Result<Outcome> {
    futures::executor::block_on(rx).map_err(|_| Error::WorkerStopped)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awaited_operation_delivers_result() {
        let op = Operation::new(Statement::new("SELECT 1", vec![]), Action::Read { first_only: true });
        let (op, rx) = op.awaited();
        assert_eq!(op.kind(), OperationKind::Read);
        op.complete(Ok(Outcome::Rows(vec![])));
        assert_eq!(wait(rx).unwrap(), Outcome::Rows(vec![]));
    }

    #[test]
    fn test_dropped_operation_reports_worker_stopped() {
        let op = Operation::new(Statement::new("DELETE FROM t", vec![]), Action::Write);
        let (op, rx) = op.awaited();
        drop(op);
        assert!(matches!(wait(rx), Err(Error::WorkerStopped)));
    }

    #[test]
    fn test_detached_failure_is_swallowed() {
        let op = Operation::new(Statement::new("bogus", vec![]), Action::Write);
        op.complete(Err(Error::Closed));
    }
}
