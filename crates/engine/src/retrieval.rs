//! Cheap snippet retrieval across search providers.

use sleuth_client::SearchProvider;
use sleuth_core::{AppConfig, QueryVariant, SearchResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Per-provider result cap.
    pub results_per_provider: usize,
    /// Timeout for a single provider call.
    pub provider_timeout: Duration,
    /// Variants searched at once.
    pub concurrency: usize,
}

impl From<&AppConfig> for RetrievalConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            results_per_provider: config.results_per_provider,
            provider_timeout: config.provider_timeout(),
            concurrency: config.retrieval_concurrency,
        }
    }
}

/// Runs variants against providers in priority order.
#[derive(Clone)]
pub struct RetrievalEngine {
    providers: Arc<[Arc<dyn SearchProvider>]>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>, config: RetrievalConfig) -> Self {
        Self { providers: providers.into(), config }
    }

    /// Results for one variant from the first provider that returns any.
    ///
    /// Providers are never mixed. An empty list means every provider
    /// failed, timed out, or found nothing.
    pub async fn retrieve(&self, variant: &QueryVariant) -> Vec<SearchResult> {
        let limit = self.config.results_per_provider;

        for provider in self.providers.iter() {
            let start = Instant::now();
            let outcome =
                tokio::time::timeout(self.config.provider_timeout, provider.search(&variant.text, limit)).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(Ok(mut results)) if !results.is_empty() => {
                    results.truncate(limit);
                    tracing::debug!(
                        variant = %variant.fingerprint,
                        provider = provider.name(),
                        count = results.len(),
                        elapsed_ms,
                        "provider returned results"
                    );
                    return results;
                }
                Ok(Ok(_)) => {
                    tracing::debug!(
                        variant = %variant.fingerprint,
                        provider = provider.name(),
                        elapsed_ms,
                        "provider returned nothing"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        variant = %variant.fingerprint,
                        provider = provider.name(),
                        error = %e,
                        elapsed_ms,
                        "provider failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        variant = %variant.fingerprint,
                        provider = provider.name(),
                        elapsed_ms,
                        "provider timed out"
                    );
                }
            }
        }

        tracing::warn!(variant = %variant.fingerprint, "all providers failed");
        Vec::new()
    }

    /// Retrieve every variant concurrently.
    ///
    /// Returns `(index, results)` pairs sorted by index for the variants
    /// that finished before `cancel` fired; unfinished ones are aborted.
    pub async fn retrieve_all(
        &self, variants: Vec<(usize, QueryVariant)>, cancel: &CancellationToken,
    ) -> Vec<(usize, Vec<SearchResult>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, variant) in variants {
            let engine = self.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (idx, Vec::new());
                };
                let results = engine.retrieve(&variant).await;
                (idx, results)
            });
        }

        let mut collected = Vec::new();
        loop {
            tokio::select! {
                biased;
                next = join_set.join_next() => match next {
                    Some(Ok(pair)) => collected.push(pair),
                    Some(Err(e)) => tracing::error!(error = %e, "retrieval task panicked"),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    tracing::warn!(pending = join_set.len(), "budget elapsed during retrieval");
                    join_set.abort_all();
                    break;
                }
            }
        }

        collected.sort_by_key(|(idx, _)| *idx);
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleuth_client::ProviderError;
    use sleuth_core::Query;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Hits(usize),
        Empty,
        Fail,
        Hang,
    }

    struct FakeProvider {
        name: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self { name, behavior, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait::async_trait]
    impl SearchProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Hits(n) => Ok((1..=n.min(limit + 5))
                    .map(|rank| SearchResult {
                        url: format!("https://{}.example/{query}/{rank}", self.name),
                        title: format!("{} {rank}", self.name),
                        snippet: "snippet".into(),
                        source: self.name.to_string(),
                        rank,
                    })
                    .collect()),
                Behavior::Empty => Ok(Vec::new()),
                Behavior::Fail => Err(ProviderError::Http { status: 500 }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn config() -> RetrievalConfig {
        RetrievalConfig { results_per_provider: 3, provider_timeout: Duration::from_millis(50), concurrency: 2 }
    }

    fn variant(text: &str) -> QueryVariant {
        QueryVariant::original(&Query::new(text))
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let a = FakeProvider::new("a", Behavior::Hits(2));
        let b = FakeProvider::new("b", Behavior::Hits(2));
        let engine = RetrievalEngine::new(vec![a.clone(), b.clone()], config());

        let results = engine.retrieve(&variant("q")).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.source == "a"));
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_on_error_empty_and_timeout() {
        let hang = FakeProvider::new("hang", Behavior::Hang);
        let fail = FakeProvider::new("fail", Behavior::Fail);
        let empty = FakeProvider::new("empty", Behavior::Empty);
        let good = FakeProvider::new("good", Behavior::Hits(10));
        let engine = RetrievalEngine::new(vec![hang, fail, empty, good.clone()], config());

        let results = engine.retrieve(&variant("q")).await;
        assert_eq!(results.len(), 3, "capped at results_per_provider");
        assert!(results.iter().all(|r| r.source == "good"));
        assert_eq!(results.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_all_providers_fail_yields_empty() {
        let engine = RetrievalEngine::new(
            vec![
                FakeProvider::new("a", Behavior::Fail),
                FakeProvider::new("b", Behavior::Fail),
                FakeProvider::new("c", Behavior::Fail),
            ],
            config(),
        );
        assert!(engine.retrieve(&variant("q")).await.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_all_sorted_by_index() {
        let engine = RetrievalEngine::new(vec![FakeProvider::new("a", Behavior::Hits(1))], config());
        let variants = vec![(2, variant("two")), (0, variant("zero")), (1, variant("one"))];

        let out = engine.retrieve_all(variants, &CancellationToken::new()).await;
        assert_eq!(out.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(out[0].1[0].url.contains("/zero/"));
    }

    #[tokio::test]
    async fn test_retrieve_all_stops_on_cancel() {
        let slow = RetrievalConfig { provider_timeout: Duration::from_secs(60), ..config() };
        let engine = RetrievalEngine::new(vec![FakeProvider::new("hang", Behavior::Hang)], slow);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let out = engine.retrieve_all(vec![(0, variant("a")), (1, variant("b"))], &token).await;
        assert!(out.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
