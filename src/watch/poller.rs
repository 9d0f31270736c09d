use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{ElementQuery, WatchState};
use crate::selectors::Selector;

/// Shortest polling interval; shorter requests are clamped up to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(4);

static NEXT_WATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Shared {
    id: WatchId,
    selector: Selector,
    interval: Duration,
    ticks: AtomicU64,
    state: watch::Sender<WatchState>,
}

/// Owned handle to a running watch.
///
/// Clones observe and control the same watch. Dropping every handle does not
/// stop polling; only a match or [`WatchHandle::cancel`] does.
#[derive(Clone)]
pub struct WatchHandle {
    shared: Arc<Shared>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.shared.id)
            .field("selector", &self.shared.selector)
            .field("interval", &self.shared.interval)
            .field("ticks", &self.ticks())
            .field("state", &self.state())
            .finish()
    }
}

impl WatchHandle {
    pub fn id(&self) -> WatchId {
        self.shared.id
    }

    pub fn selector(&self) -> &Selector {
        &self.shared.selector
    }

    /// Effective polling interval, after clamping.
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Number of ticks that have fired so far.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WatchState {
        *self.shared.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_polling()
    }

    /// Stop polling without running the callback.
    ///
    /// Returns `true` if this call stopped the watch, `false` if it had
    /// already found its element or been cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.state.send_if_modified(|state| {
            if state.is_polling() {
                *state = WatchState::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled {
            tracing::info!(
                "Cancelled watch {} for {} after {} ticks",
                self.shared.id,
                self.shared.selector,
                self.ticks()
            );
        }
        cancelled
    }

    /// Resolve once the watch reaches a terminal state.
    pub async fn stopped(&self) -> WatchState {
        let mut rx = self.shared.state.subscribe();
        let state = match rx.wait_for(|state| !state.is_polling()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }
}

/// Poll `query` every `interval` until `selector` matches, then call `on_found` once.
///
/// The first check happens one interval after this call. Must be called from
/// within a tokio runtime; the polling runs on a spawned task.
pub fn watch_for_element<Q, F>(
    query: Q,
    selector: Selector,
    on_found: F,
    interval: Duration,
) -> WatchHandle
where
    Q: ElementQuery + 'static,
    F: FnOnce() + Send + 'static,
{
    let interval = interval.max(MIN_INTERVAL);
    let (state, state_rx) = watch::channel(WatchState::Polling);
    let shared = Arc::new(Shared {
        id: WatchId(NEXT_WATCH_ID.fetch_add(1, Ordering::Relaxed)),
        selector,
        interval,
        ticks: AtomicU64::new(0),
        state,
    });

    tracing::info!(
        "Watch {} polling for {} every {}ms",
        shared.id,
        shared.selector,
        interval.as_millis()
    );

    tokio::spawn(poll(query, on_found, Arc::clone(&shared), state_rx));
    WatchHandle { shared }
}

async fn poll<Q, F>(query: Q, on_found: F, shared: Arc<Shared>, mut state_rx: watch::Receiver<WatchState>)
where
    Q: ElementQuery,
    F: FnOnce(),
{
    let period = shared.interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let found_at = loop {
        // Only cancel() changes the state while this loop runs. A cancel that
        // lands on a tick boundary must win over the tick.
        tokio::select! {
            biased;
            _ = state_rx.changed() => return,
            _ = ticker.tick() => {}
        }

        let tick = shared.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        match query.count(&shared.selector).await {
            Ok(0) => tracing::debug!("Watch {} tick {}: no match", shared.id, tick),
            Ok(count) => {
                tracing::debug!("Watch {} tick {}: {} matches", shared.id, tick, count);
                break tick;
            }
            Err(e) => tracing::warn!(
                "Watch {} tick {}: query for {} failed: {:#}",
                shared.id,
                tick,
                shared.selector,
                e
            ),
        }
    };

    let found = shared.state.send_if_modified(|state| {
        if state.is_polling() {
            *state = WatchState::Found { tick: found_at };
            true
        } else {
            false
        }
    });

    if found {
        tracing::info!("Watch {} found {} on tick {}", shared.id, shared.selector, found_at);
        on_found();
    }
}
