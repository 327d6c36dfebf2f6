//! Page scheduler with bounded parallelism
//!
//! This module handles:
//! - Validating the page range and worker count before any work starts
//! - Distributing page numbers from a shared queue to a fixed set of executors
//! - Isolating panics to the page that caused them
//! - Collecting exactly one outcome per page and restoring ascending order

use crate::config::validate_workers;
use crate::state::{PageLedger, PageState};
use crate::{ConfigError, HarvestError};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// An inclusive range of catalog page numbers
///
/// Built through [`PageRange::new`] or [`PageRange::single`], so `from <= to`
/// holds outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub(crate) from: u32,
    pub(crate) to: u32,
}

impl PageRange {
    /// Creates a range, rejecting `from > to`
    pub fn new(from: u32, to: u32) -> Result<Self, ConfigError> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    /// Rejects an inverted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.from > self.to {
            return Err(ConfigError::Validation(format!(
                "Invalid page range: from ({}) is greater than to ({})",
                self.from, self.to
            )));
        }
        Ok(())
    }

    pub fn from(&self) -> u32 {
        self.from
    }

    pub fn to(&self) -> u32 {
        self.to
    }

    pub fn single(page: u32) -> Self {
        Self { from: page, to: page }
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.from..=self.to
    }

    pub fn len(&self) -> usize {
        match self.to.checked_sub(self.from) {
            Some(span) => span as usize + 1,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }
}

/// The single outcome collected for one page
#[derive(Debug)]
pub struct PageOutcome<T> {
    pub page: u32,
    pub result: Result<T, HarvestError>,
}

enum Event<T> {
    Dispatched(u32),
    Finished(PageOutcome<T>),
}

/// Runs a per-page task over a range with a fixed number of executors
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    workers: u32,
}

impl Scheduler {
    /// Creates a scheduler, rejecting worker counts outside `1..=MAX_WORKERS`
    pub fn new(workers: u32) -> Result<Self, ConfigError> {
        validate_workers(workers)?;
        Ok(Self { workers })
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    /// Runs `task` once for every page in `range`
    ///
    /// Exactly `workers` executors are spawned; each repeatedly takes the next
    /// page from a shared queue and exits once the queue is empty, so at most
    /// `workers` tasks are in flight. Every page yields exactly one outcome, a
    /// panicking task included, and outcomes are returned in ascending page
    /// order regardless of completion order.
    pub async fn dispatch<T, F, Fut>(&self, range: PageRange, task: F) -> Vec<PageOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HarvestError>> + Send + 'static,
    {
        let queue = Arc::new(Mutex::new(range.pages().collect::<VecDeque<u32>>()));
        let task = Arc::new(task);
        let (tx, mut rx) = mpsc::channel::<Event<T>>(self.workers as usize * 2);

        let mut executors = JoinSet::new();
        for executor in 0..self.workers {
            let queue = Arc::clone(&queue);
            let task = Arc::clone(&task);
            let tx = tx.clone();

            executors.spawn(async move {
                loop {
                    let Some(page) = queue.lock().await.pop_front() else {
                        break;
                    };
                    if tx.send(Event::Dispatched(page)).await.is_err() {
                        break;
                    }

                    let result = match tokio::spawn((*task)(page)).await {
                        Ok(result) => result,
                        Err(e) => Err(HarvestError::Worker {
                            page,
                            message: e.to_string(),
                        }),
                    };

                    if tx.send(Event::Finished(PageOutcome { page, result })).await.is_err() {
                        break;
                    }
                }
                tracing::trace!("Executor {} found the queue empty, exiting", executor);
            });
        }
        drop(tx);

        let mut ledger = PageLedger::new(range.from, range.to);
        let mut outcomes = BTreeMap::new();

        while let Some(event) = rx.recv().await {
            match event {
                Event::Dispatched(page) => {
                    if let Err(e) = ledger.transition(page, PageState::Dispatched) {
                        tracing::warn!("Ignoring illegal page transition: {}", e);
                    }
                }
                Event::Finished(outcome) => {
                    if let Err(e) = ledger.transition(outcome.page, PageState::Completed) {
                        tracing::warn!("Ignoring duplicate outcome: {}", e);
                        continue;
                    }
                    match &outcome.result {
                        Ok(_) => tracing::debug!("Page {} completed", outcome.page),
                        Err(e) => tracing::warn!("Page {} failed: {}", outcome.page, e),
                    }
                    outcomes.insert(outcome.page, outcome);
                }
            }
        }

        while let Some(joined) = executors.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Executor terminated abnormally: {}", e);
            }
        }

        for page in ledger.unfinished() {
            outcomes.insert(
                page,
                PageOutcome {
                    page,
                    result: Err(HarvestError::Worker {
                        page,
                        message: "no outcome was collected".to_string(),
                    }),
                },
            );
        }

        outcomes.into_values().collect()
    }
}
