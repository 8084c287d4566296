//! Bulk-load progress reporting.

use core::future::Future;

use async_trait::async_trait;

/// Receives progress while [`load_all`](crate::CatalogueRegistry::load_all)
/// works through stored documents.
///
/// `report` is awaited before the next document loads, so a slow reporter
/// throttles the load. Any `FnMut(usize, usize, Option<String>) -> Future`
/// closure is a reporter.
///
/// # Example
///
/// ```
/// use muster_registry::LoadProgress;
///
/// # async fn demo() {
/// let mut seen = Vec::new();
/// let mut reporter = |current: usize, total: usize, _message: Option<String>| {
///     seen.push((current, total));
///     async {}
/// };
/// reporter.report(0, 2, None).await;
/// # }
/// ```
#[async_trait]
pub trait LoadProgress: Send {
    /// Called once per document, before it loads.
    async fn report(&mut self, current: usize, total: usize, message: Option<String>);
}

#[async_trait]
impl<F, Fut> LoadProgress for F
where
    F: FnMut(usize, usize, Option<String>) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn report(&mut self, current: usize, total: usize, message: Option<String>) {
        self(current, total, message).await;
    }
}

/// Reporter that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl LoadProgress for NoProgress {
    async fn report(&mut self, _current: usize, _total: usize, _message: Option<String>) {}
}
