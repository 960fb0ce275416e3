//! # Provider Chain Dispatcher
//!
//! Tries a statically ordered adapter list and returns the first success.
//! When the whole list fails and the last error classifies as rate limiting,
//! the chain is retried with exponential backoff up to a configured attempt
//! ceiling. Retries are list-level: the full chain is walked again in the
//! same order, never one adapter repeatedly before advancing.
//!
//! Rationale: vendors intermittently return capacity errors that resolve
//! within seconds, while configuration and permanent errors should fail fast
//! without consuming backoff budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::provider::{Provider, ProviderError};
use crate::errors::{MediaError, MediaResult};

/// Bounded backoff-retry policy for rate-limited chain exhaustion.
///
/// The i-th retry sleeps `base_delay * 2^(i-1)`; no sleep happens before the
/// first attempt. `max_attempts` counts full-chain walks, so `3` means at
/// most three passes over the adapter list.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay slept after the given (1-based) failed attempt.
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Ordered adapter chain for one media type.
///
/// The list is built once at startup and injected, so provider order is
/// explicit and testable rather than ambient configuration read at call
/// time. Shared across requests as read-only state; attempts within one
/// dispatch are strictly sequential.
pub struct ProviderChain<R: Send + Sync> {
    providers: Vec<Arc<dyn Provider<R>>>,
    policy: RetryPolicy,
}

impl<R: Send + Sync> ProviderChain<R> {
    pub fn new(providers: Vec<Arc<dyn Provider<R>>>, policy: RetryPolicy) -> Self {
        Self { providers, policy }
    }

    /// Names of the configured adapters, in dispatch order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Dispatches the request through the chain.
    ///
    /// Returns the first successful adapter's bytes together with its name.
    /// Individual failures are logged and recorded but never escape until
    /// the chain is exhausted across all permitted attempts.
    pub async fn dispatch(&self, request: &R) -> MediaResult<(Vec<u8>, String)> {
        let mut attempted: Vec<String> = Vec::new();
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=self.policy.max_attempts.max(1) {
            for provider in &self.providers {
                debug!(provider = provider.name(), attempt, "dispatching to provider");
                match provider.generate(request).await {
                    Ok(bytes) => {
                        info!(
                            provider = provider.name(),
                            attempt,
                            bytes = bytes.len(),
                            "provider succeeded"
                        );
                        return Ok((bytes, provider.name().to_string()));
                    }
                    Err(err) => {
                        warn!(
                            provider = provider.name(),
                            attempt,
                            error = %err,
                            "provider failed, trying next in chain"
                        );
                        if attempt == 1 {
                            attempted.push(provider.name().to_string());
                        }
                        last_error = Some(err);
                    }
                }
            }

            let rate_limited = last_error.as_ref().is_some_and(ProviderError::is_rate_limited);
            if !rate_limited {
                // Configuration/permanent/transient exhaustion: fail fast,
                // backoff will not help.
                break;
            }
            if attempt < self.policy.max_attempts {
                let wait = self.policy.delay_after(attempt);
                info!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "chain exhausted on rate limits, backing off before retry"
                );
                tokio::time::sleep(wait).await;
            }
        }

        let last = last_error.unwrap_or_else(|| {
            ProviderError::configuration("provider-chain", "no providers configured")
        });
        Err(MediaError::AllProvidersFailed { attempted, last })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::{ImageRequest, ProviderResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Scripted adapter: fails with a fixed error until `succeed_after`
    /// calls have been made, then returns its payload.
    struct ScriptedProvider {
        name: &'static str,
        calls: AtomicUsize,
        failure: Option<ProviderError>,
        payload: Vec<u8>,
    }

    impl ScriptedProvider {
        fn succeeding(name: &'static str, payload: &[u8]) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
                failure: None,
                payload: payload.to_vec(),
            }
        }

        fn failing(name: &'static str, failure: ProviderError) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
                failure: Some(failure),
                payload: Vec::new(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider<ImageRequest> for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, _request: &ImageRequest) -> ProviderResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(self.payload.clone()),
            }
        }
    }

    fn request() -> ImageRequest {
        ImageRequest::new("a quiet meadow", "req-1", Vec::new())
    }

    fn chain(
        providers: Vec<Arc<ScriptedProvider>>,
        policy: RetryPolicy,
    ) -> (ProviderChain<ImageRequest>, Vec<Arc<ScriptedProvider>>) {
        let dyns: Vec<Arc<dyn Provider<ImageRequest>>> = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn Provider<ImageRequest>>)
            .collect();
        (ProviderChain::new(dyns, policy), providers)
    }

    #[tokio::test]
    async fn test_first_success_short_circuits_in_order() {
        let a = Arc::new(ScriptedProvider::failing(
            "a",
            ProviderError::transient("a", "down"),
        ));
        let b = Arc::new(ScriptedProvider::succeeding("b", b"payload-b"));
        let c = Arc::new(ScriptedProvider::succeeding("c", b"payload-c"));
        let (chain, providers) = chain(vec![a, b, c], RetryPolicy::default());

        let (bytes, name) = chain.dispatch(&request()).await.unwrap();
        assert_eq!(bytes, b"payload-b");
        assert_eq!(name, "b");
        // a tried exactly once, b succeeded, c never reached
        assert_eq!(providers[0].calls(), 1);
        assert_eq!(providers[1].calls(), 1);
        assert_eq!(providers[2].calls(), 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_falls_through_without_retry() {
        let a = Arc::new(ScriptedProvider::failing(
            "a",
            ProviderError::permanent("a", "empty response"),
        ));
        let b = Arc::new(ScriptedProvider::succeeding("b", b"ok"));
        let (chain, providers) = chain(vec![a, b], RetryPolicy::default());

        let (bytes, name) = chain.dispatch(&request()).await.unwrap();
        assert_eq!(bytes, b"ok");
        assert_eq!(name, "b");
        assert_eq!(providers[0].calls(), 1);
    }

    #[tokio::test]
    async fn test_non_rate_limited_exhaustion_fails_without_backoff() {
        let a = Arc::new(ScriptedProvider::failing(
            "a",
            ProviderError::transient("a", "down"),
        ));
        let b = Arc::new(ScriptedProvider::failing(
            "b",
            ProviderError::permanent("b", "broken"),
        ));
        let (chain, providers) = chain(vec![a, b], RetryPolicy::default());

        let err = chain.dispatch(&request()).await.unwrap_err();
        match err {
            MediaError::AllProvidersFailed { attempted, last } => {
                assert_eq!(attempted, vec!["a".to_string(), "b".to_string()]);
                assert!(matches!(last, ProviderError::Permanent { .. }));
            }
            other => panic!("expected AllProvidersFailed, got: {other:?}"),
        }
        // single pass only
        assert_eq!(providers[0].calls(), 1);
        assert_eq!(providers[1].calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_exhaustion_retries_with_exponential_backoff() {
        let a = Arc::new(ScriptedProvider::failing(
            "a",
            ProviderError::rate_limited("a", "429"),
        ));
        let b = Arc::new(ScriptedProvider::failing(
            "b",
            ProviderError::rate_limited("b", "429"),
        ));
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        };
        let (chain, providers) = chain(vec![a, b], policy);

        let started = Instant::now();
        let err = chain.dispatch(&request()).await.unwrap_err();

        // 3 full-chain attempts, sleeps of 2s then 4s between them
        assert_eq!(providers[0].calls(), 3);
        assert_eq!(providers[1].calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        match err {
            MediaError::AllProvidersFailed { attempted, last } => {
                assert_eq!(attempted, vec!["a".to_string(), "b".to_string()]);
                assert!(last.is_rate_limited());
            }
            other => panic!("expected AllProvidersFailed, got: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_before_first_attempt() {
        let a = Arc::new(ScriptedProvider::succeeding("a", b"fast"));
        let (chain, _) = chain(
            vec![a],
            RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_secs(60),
            },
        );

        let started = Instant::now();
        chain.dispatch(&request()).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limit_resolving_mid_retry_succeeds() {
        /// Fails rate-limited on the first call, succeeds afterwards.
        struct RecoveringProvider {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl Provider<ImageRequest> for RecoveringProvider {
            fn name(&self) -> &str {
                "recovering"
            }

            async fn generate(&self, _request: &ImageRequest) -> ProviderResult<Vec<u8>> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::rate_limited("recovering", "429"))
                } else {
                    Ok(b"recovered".to_vec())
                }
            }
        }

        let provider = Arc::new(RecoveringProvider {
            calls: AtomicUsize::new(0),
        });
        let providers: Vec<Arc<dyn Provider<ImageRequest>>> = vec![provider.clone()];
        let chain = ProviderChain::new(
            providers,
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        );

        let (bytes, _) = chain.dispatch(&request()).await.unwrap();
        assert_eq!(bytes, b"recovered");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_chain_fails_with_configuration_cause() {
        let chain: ProviderChain<ImageRequest> =
            ProviderChain::new(Vec::new(), RetryPolicy::default());
        let err = chain.dispatch(&request()).await.unwrap_err();
        match err {
            MediaError::AllProvidersFailed { attempted, last } => {
                assert!(attempted.is_empty());
                assert!(matches!(last, ProviderError::Configuration { .. }));
            }
            other => panic!("expected AllProvidersFailed, got: {other:?}"),
        }
    }
}
