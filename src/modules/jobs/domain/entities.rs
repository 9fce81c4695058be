/// Domain entities for the worker system
///
/// A stage's input is split up front into one `WorkSplit` per worker; each
/// worker returns a `Tally` and the stage folds them into a `StageReport`.
use crate::shared::tally::Tally;
use serde::Serialize;
use std::fmt;

/// Transient slice of input assigned to exactly one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkSplit<T> {
    /// 1-based worker id, used in progress logs.
    pub id: usize,
    pub items: Vec<T>,
    /// Sum of item costs for size-aware splits, item count otherwise.
    pub load: u64,
}

impl<T> WorkSplit<T> {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            items: Vec::new(),
            load: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of one worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerOutcome {
    pub worker_id: usize,
    pub tally: Tally,
    pub cancelled: bool,
}

impl WorkerOutcome {
    pub fn finished(worker_id: usize, tally: Tally) -> Self {
        Self {
            worker_id,
            tally,
            cancelled: false,
        }
    }

    pub fn cancelled(worker_id: usize, tally: Tally) -> Self {
        Self {
            worker_id,
            tally,
            cancelled: true,
        }
    }
}

/// Summary counters for one stage, merged over all its workers.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub tally: Tally,
    pub workers: usize,
    pub failed_workers: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            tally: Tally::new(),
            workers: 0,
            failed_workers: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    pub fn single(stage: &str, tally: Tally, cancelled: bool) -> Self {
        Self {
            tally,
            workers: 1,
            cancelled,
            ..Self::new(stage)
        }
    }

    pub fn absorb(&mut self, outcome: &WorkerOutcome) {
        self.tally.merge(&outcome.tally);
        self.workers += 1;
        self.cancelled |= outcome.cancelled;
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} workers, {} failed{}) in {:.1}s: {}",
            self.stage,
            self.workers,
            self.failed_workers,
            if self.cancelled { ", interrupted" } else { "" },
            self.elapsed_ms as f64 / 1000.0,
            self.tally
        )
    }
}
