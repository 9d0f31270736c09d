use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{WatchHandle, WatchId, WatchState};
use crate::selectors::SelectorType;

/// Point-in-time view of a registered watch.
#[derive(Debug, Clone, Serialize)]
pub struct WatchSummary {
    pub id: WatchId,
    pub selector: String,
    pub selector_type: SelectorType,
    pub interval_ms: u64,
    pub ticks: u64,
    #[serde(flatten)]
    pub state: WatchState,
}

impl From<&WatchHandle> for WatchSummary {
    fn from(handle: &WatchHandle) -> Self {
        Self {
            id: handle.id(),
            selector: handle.selector().value.clone(),
            selector_type: handle.selector().kind,
            interval_ms: handle.interval().as_millis() as u64,
            ticks: handle.ticks(),
            state: handle.state(),
        }
    }
}

/// Shared table of watches started on behalf of callers that only hold an id.
#[derive(Debug, Clone, Default)]
pub struct WatchRegistry {
    watches: Arc<Mutex<HashMap<WatchId, WatchHandle>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: WatchHandle) -> WatchId {
        let id = handle.id();
        self.watches.lock().await.insert(id, handle);
        id
    }

    /// Forget a watch without touching its state.
    pub async fn remove(&self, id: WatchId) -> Option<WatchHandle> {
        self.watches.lock().await.remove(&id)
    }

    /// Cancel a watch by id. `None` if the id is unknown, otherwise whether this call stopped it.
    pub async fn cancel(&self, id: WatchId) -> Option<bool> {
        self.watches.lock().await.get(&id).map(WatchHandle::cancel)
    }

    /// Summaries of every registered watch, oldest first.
    pub async fn list(&self) -> Vec<WatchSummary> {
        let watches = self.watches.lock().await;
        let mut summaries: Vec<WatchSummary> = watches.values().map(WatchSummary::from).collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }

    /// Forget watches that have stopped. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        let mut watches = self.watches.lock().await;
        let before = watches.len();
        watches.retain(|_, handle| handle.is_active());
        before - watches.len()
    }

    /// Cancel every active watch. Returns how many were still polling.
    pub async fn cancel_all(&self) -> usize {
        let watches = self.watches.lock().await;
        watches.values().filter(|handle| handle.cancel()).count()
    }

    pub async fn len(&self) -> usize {
        self.watches.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.watches.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::Selector;
    use crate::watch::testing::ScriptedDocument;
    use crate::watch::watch_for_element;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_list_and_cancel_by_id() {
        let registry = WatchRegistry::new();
        let a = registry
            .insert(watch_for_element(ScriptedDocument::never(), Selector::css(".a"), || {}, TICK))
            .await;
        let b = registry
            .insert(watch_for_element(ScriptedDocument::appearing_at(2), Selector::text("Done"), || {}, TICK))
            .await;

        tokio::time::sleep(TICK * 3 + TICK / 2).await;

        let list = registry.list().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a);
        assert_eq!(list[0].state, WatchState::Polling);
        assert_eq!(list[0].ticks, 3);
        assert_eq!(list[1].id, b);
        assert_eq!(list[1].selector_type, SelectorType::Text);
        assert_eq!(list[1].state, WatchState::Found { tick: 2 });

        assert_eq!(registry.cancel(a).await, Some(true));
        assert_eq!(registry.cancel(a).await, Some(false));
        assert_eq!(registry.cancel(WatchId(u64::MAX)).await, None);
        assert_eq!(registry.list().await[0].state, WatchState::Cancelled);

        let removed = registry.remove(a).await.unwrap();
        assert_eq!(removed.state(), WatchState::Cancelled);
        assert!(registry.remove(a).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_and_cancel_all() {
        let registry = WatchRegistry::new();
        registry
            .insert(watch_for_element(ScriptedDocument::appearing_at(1), Selector::css(".a"), || {}, TICK))
            .await;
        let live = registry
            .insert(watch_for_element(ScriptedDocument::never(), Selector::css(".b"), || {}, TICK))
            .await;
        registry
            .insert(watch_for_element(ScriptedDocument::never(), Selector::css(".c"), || {}, TICK))
            .await;

        tokio::time::sleep(TICK * 2).await;
        assert_eq!(registry.prune().await, 1);
        assert_eq!(registry.len().await, 2);

        registry.cancel(live).await;
        assert_eq!(registry.cancel_all().await, 1);
        assert_eq!(registry.prune().await, 2);
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_json_shape() {
        let handle = watch_for_element(ScriptedDocument::appearing_at(1), Selector::css(".ready"), || {}, TICK);
        handle.stopped().await;

        let json = serde_json::to_value(WatchSummary::from(&handle)).unwrap();
        assert_eq!(json["selector"], ".ready");
        assert_eq!(json["selector_type"], "css");
        assert_eq!(json["interval_ms"], 100);
        assert_eq!(json["state"], "found");
        assert_eq!(json["tick"], 1);
    }
}
