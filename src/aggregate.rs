//! Concurrent context gathering.
//!
//! [`Aggregator::gather`] spawns one task per registered
//! [`ContextSource`], bounds each with the configured timeout, and merges
//! whatever came back into a [`SourceContext`]. Total latency is that of
//! the slowest source, capped by the timeout. A failing, empty, or slow
//! source is logged and left out; gathering itself never fails.
//!
//! The tasks live in a [`JoinSet`]. If the caller stops polling `gather`
//! (request cancelled, outer timeout), dropping the set aborts every
//! in-flight fetch.

use std::sync::Arc;
use std::time::Duration;

use hub_core::context::{SourceContext, SourceKey};
use hub_core::source::ContextSource;
use tokio::task::JoinSet;

/// Registry of context sources plus the per-source time budget.
pub struct Aggregator {
    sources: Vec<Arc<dyn ContextSource>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            timeout,
        }
    }

    pub fn register(&mut self, source: Arc<dyn ContextSource>) {
        self.sources.push(source);
    }

    pub fn with_source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.register(source);
        self
    }

    /// Keys of the registered sources, in registration order.
    pub fn keys(&self) -> Vec<SourceKey> {
        self.sources.iter().map(|s| s.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch every source's summary concurrently and merge the successes.
    ///
    /// The source set does not depend on `query`; it is taken for logging.
    pub async fn gather(&self, query: &str) -> SourceContext {
        tracing::debug!(
            sources = self.sources.len(),
            query_chars = query.chars().count(),
            "gathering context"
        );

        let mut tasks = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let limit = self.timeout;
            tasks.spawn(async move {
                let key = source.key();
                (key, tokio::time::timeout(limit, source.summary()).await)
            });
        }

        let mut context = SourceContext::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Ok(Ok(Some(summary))))) => {
                    if context.insert(key, summary) {
                        tracing::debug!(source = %key, "source contributed context");
                    } else {
                        tracing::debug!(source = %key, "source summary empty; omitted");
                    }
                }
                Ok((key, Ok(Ok(None)))) => {
                    tracing::debug!(source = %key, "source had no data; omitted");
                }
                Ok((key, Ok(Err(err)))) => {
                    tracing::warn!(source = %key, kind = err.kind(), error = %err, "source failed; omitted");
                }
                Ok((key, Err(_elapsed))) => {
                    tracing::warn!(
                        source = %key,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "source timed out; omitted"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "source task did not complete; omitted");
                }
            }
        }

        tracing::debug!(present = ?context.keys().collect::<Vec<_>>(), "context gathered");
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hub_core::context::{LikedSummary, SourceSummary};
    use hub_core::models::LikedSong;
    use hub_core::source::{SourceError, SourceResult};
    use std::time::Instant;

    struct Slow {
        delay: Duration,
    }

    #[async_trait]
    impl ContextSource for Slow {
        fn key(&self) -> SourceKey {
            SourceKey::Ytmusic
        }

        async fn summary(&self) -> SourceResult<Option<SourceSummary>> {
            tokio::time::sleep(self.delay).await;
            Ok(Some(SourceSummary::LikedSongs(LikedSummary {
                liked_songs: vec![LikedSong {
                    title: "Late".into(),
                    artist: "X".into(),
                    url: None,
                    youtube_id: None,
                }],
            })))
        }
    }

    struct Broken;

    #[async_trait]
    impl ContextSource for Broken {
        fn key(&self) -> SourceKey {
            SourceKey::Github
        }

        async fn summary(&self) -> SourceResult<Option<SourceSummary>> {
            Err(SourceError::Transient("boom".into()))
        }
    }

    struct Panics;

    #[async_trait]
    impl ContextSource for Panics {
        fn key(&self) -> SourceKey {
            SourceKey::Steam
        }

        async fn summary(&self) -> SourceResult<Option<SourceSummary>> {
            panic!("source bug");
        }
    }

    #[tokio::test]
    async fn test_empty_aggregator_gives_empty_context() {
        let aggregator = Aggregator::new(Duration::from_millis(100));
        assert!(aggregator.gather("q").await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_omitted() {
        let aggregator = Aggregator::new(Duration::from_secs(1))
            .with_source(Arc::new(Broken))
            .with_source(Arc::new(Panics))
            .with_source(Arc::new(Slow {
                delay: Duration::from_millis(1),
            }));
        let context = aggregator.gather("q").await;
        assert_eq!(context.keys().collect::<Vec<_>>(), vec![SourceKey::Ytmusic]);
    }

    #[tokio::test]
    async fn test_timeout_bounds_latency() {
        let aggregator = Aggregator::new(Duration::from_millis(50)).with_source(Arc::new(Slow {
            delay: Duration::from_secs(5),
        }));
        let started = Instant::now();
        let context = aggregator.gather("q").await;
        assert!(context.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_sources_run_concurrently() {
        let mut aggregator = Aggregator::new(Duration::from_secs(2));
        for _ in 0..3 {
            aggregator.register(Arc::new(Slow {
                delay: Duration::from_millis(300),
            }));
        }
        let started = Instant::now();
        aggregator.gather("q").await;
        assert!(started.elapsed() < Duration::from_millis(800));
    }
}
