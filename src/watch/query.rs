use anyhow::Result;
use chromiumoxide::page::Page;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::selectors::{self, Selector};

/// The document-query capability a watch polls against.
///
/// Implementors report how many elements in their live document currently
/// match `selector`. A failed query is not fatal to a watch; it is treated as
/// "not present" for that tick.
pub trait ElementQuery: Send + Sync {
    fn count<'a>(&'a self, selector: &'a Selector) -> BoxFuture<'a, Result<usize>>;
}

impl ElementQuery for Page {
    fn count<'a>(&'a self, selector: &'a Selector) -> BoxFuture<'a, Result<usize>> {
        Box::pin(selectors::count_elements(self, selector))
    }
}

impl<Q: ElementQuery + ?Sized> ElementQuery for Arc<Q> {
    fn count<'a>(&'a self, selector: &'a Selector) -> BoxFuture<'a, Result<usize>> {
        (**self).count(selector)
    }
}
