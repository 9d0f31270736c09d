use std::time::Duration;
use tokio::time;

use super::{watch_for_element, ElementQuery, WatchError, WatchHandle, WatchState};
use crate::selectors::Selector;

/// Cancels the watch when the waiting future is dropped early.
struct CancelOnDrop<'a>(&'a WatchHandle);

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Wait for an existing watch to find its element.
///
/// Returns the tick the element was first seen on. With a timeout, the watch
/// is cancelled when the limit passes. Dropping the returned future also
/// cancels the watch.
pub async fn wait_for_watch(handle: &WatchHandle, timeout: Option<Duration>) -> Result<u64, WatchError> {
    let _guard = CancelOnDrop(handle);

    let state = match timeout {
        Some(limit) => match time::timeout(limit, handle.stopped()).await {
            Ok(state) => state,
            Err(_) => {
                return Err(WatchError::TimedOut {
                    selector: handle.selector().to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        },
        None => handle.stopped().await,
    };

    match state {
        WatchState::Found { tick } => Ok(tick),
        WatchState::Polling | WatchState::Cancelled => Err(WatchError::Cancelled {
            id: handle.id(),
            selector: handle.selector().to_string(),
        }),
    }
}

/// Poll until `selector` matches, resolving with the tick it was first seen on.
pub async fn wait_for_element<Q>(
    query: Q,
    selector: Selector,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<u64, WatchError>
where
    Q: ElementQuery + 'static,
{
    let handle = watch_for_element(query, selector, || {}, interval);
    wait_for_watch(&handle, timeout).await
}
