/// Page state definitions for tracking a crawl run
///
/// Every page number in a run moves `Pending → Dispatched → Completed`, and the
/// run itself moves `Running → Finished`. There is no paused or cancelled state.
use std::collections::BTreeMap;
use std::fmt;

/// Represents the current state of one page number within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageState {
    /// Queued but not yet picked up by a worker
    Pending,

    /// Picked up by a worker, outcome not yet collected
    Dispatched,

    /// Exactly one outcome has been collected
    Completed,
}

impl PageState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Dispatched) | (Self::Dispatched, Self::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a whole crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Finished,
}

/// An illegal page transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub page: u32,
    pub from: Option<PageState>,
    pub to: PageState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.from {
            Some(from) => write!(f, "page {}: {} -> {}", self.page, from, self.to),
            None => write!(f, "page {}: untracked -> {}", self.page, self.to),
        }
    }
}

/// Tracks the state of every page number in a run
#[derive(Debug, Clone)]
pub struct PageLedger {
    pages: BTreeMap<u32, PageState>,
    run: RunState,
}

impl PageLedger {
    /// Creates a ledger with every page in `from..=to` pending
    pub fn new(from: u32, to: u32) -> Self {
        let pages = (from..=to).map(|page| (page, PageState::Pending)).collect();
        Self {
            pages,
            run: RunState::Running,
        }
    }

    /// Moves a page to `next`, rejecting illegal or unknown transitions
    pub fn transition(&mut self, page: u32, next: PageState) -> Result<(), InvalidTransition> {
        let Some(current) = self.pages.get_mut(&page) else {
            return Err(InvalidTransition {
                page,
                from: None,
                to: next,
            });
        };

        if !current.can_transition_to(next) {
            return Err(InvalidTransition {
                page,
                from: Some(*current),
                to: next,
            });
        }

        *current = next;
        if self.pages.values().all(PageState::is_terminal) {
            self.run = RunState::Finished;
        }
        Ok(())
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    /// Pages that have not reached `Completed`, in ascending order
    pub fn unfinished(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|(_, state)| !state.is_terminal())
            .map(|(page, _)| *page)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
