use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::ElementQuery;
use crate::selectors::Selector;

type Respond = Box<dyn Fn(usize) -> Result<usize> + Send + Sync>;

/// A document whose match count is a function of how many times it has been queried.
pub(crate) struct ScriptedDocument {
    calls: AtomicUsize,
    respond: Respond,
}

impl ScriptedDocument {
    pub fn new(respond: impl Fn(usize) -> Result<usize> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    pub fn never() -> Arc<Self> {
        Self::new(|_| Ok(0))
    }

    /// No matches until the `call`-th query, one match from then on.
    pub fn appearing_at(call: usize) -> Arc<Self> {
        Self::new(move |n| Ok(usize::from(n >= call)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ElementQuery for ScriptedDocument {
    fn count<'a>(&'a self, _selector: &'a Selector) -> BoxFuture<'a, Result<usize>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let result = (self.respond)(call);
        Box::pin(async move { result })
    }
}
