//! State module for tracking crawl progress
//!
//! - `PageState`: the state of one page number (pending, dispatched, completed)
//! - `PageLedger`: per-run bookkeeping that guarantees one outcome per page

mod page_state;

pub use page_state::{InvalidTransition, PageLedger, PageState, RunState};
