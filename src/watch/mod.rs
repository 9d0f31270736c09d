//! Waiting for elements to appear in a live document.
//!
//! [`watch_for_element`] is the primitive: it polls a document on a fixed
//! interval and runs a callback once, the first time the selector matches.
//! [`wait_for_element`] wraps it as a future with an optional timeout.

pub mod poller;
pub mod query;
pub mod registry;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};

pub use poller::{watch_for_element, WatchHandle, WatchId, MIN_INTERVAL};
pub use query::ElementQuery;
pub use registry::{WatchRegistry, WatchSummary};
pub use wait::{wait_for_element, wait_for_watch};

/// Lifecycle of a single watch. `Found` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WatchState {
    Polling,
    /// The selector first matched on this tick (1-based).
    Found { tick: u64 },
    Cancelled,
}

impl WatchState {
    pub fn is_polling(&self) -> bool {
        matches!(self, WatchState::Polling)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WatchError {
    #[error("Timed out after {timeout_ms}ms waiting for element: {selector}")]
    TimedOut { selector: String, timeout_ms: u64 },
    #[error("Watch {id} for {selector} was cancelled")]
    Cancelled { id: WatchId, selector: String },
}
