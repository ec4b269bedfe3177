//! Failure-class-aware retry for a single logical search.
//!
//! Each failure is sorted into one of three recoverable classes, each with its
//! own wait condition:
//!
//! - rejected key: ask the user for a new one and wait until it arrives
//! - no network: wait until the connectivity signal reads `true`
//! - anything else: sleep `(n + 1) * backoff_step`
//!
//! After the wait the operation runs again with the attempt counter bumped.
//! The last permitted attempt's failure is returned as-is.

use std::{fmt, sync::Arc, time::Duration};

use crate::{
    config::RetryConfig,
    connectivity::ConnectivityMonitor,
    credentials::{CredentialStore, KeyPrompt},
    error::FetchError,
};

/// What the coordinator does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    AwaitingCredential,
    AwaitingConnectivity,
    AwaitingBackoff(Duration),
    Exhausted,
}

#[derive(Clone)]
pub struct RetryCoordinator {
    policy: RetryConfig,
    connectivity: ConnectivityMonitor,
    credentials: CredentialStore,
    prompt: Arc<dyn KeyPrompt>,
}

impl fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryCoordinator").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl RetryCoordinator {
    pub fn new(
        policy: RetryConfig,
        connectivity: ConnectivityMonitor,
        credentials: CredentialStore,
        prompt: Arc<dyn KeyPrompt>,
    ) -> Self {
        Self { policy, connectivity, credentials, prompt }
    }

    pub fn policy(&self) -> RetryConfig {
        self.policy
    }

    /// Pure policy: where a failure on 0-based `attempt` leads.
    pub fn next_state(&self, attempt: u32, err: &FetchError) -> RetryState {
        if attempt.saturating_add(1) >= self.policy.max_attempts {
            RetryState::Exhausted
        } else if err.is_invalid_key() {
            RetryState::AwaitingCredential
        } else if err.is_network_unavailable() {
            RetryState::AwaitingConnectivity
        } else {
            RetryState::AwaitingBackoff(self.policy.backoff_step() * (attempt + 1))
        }
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// `op` receives the 0-based attempt index. Waiting for a key or for the
    /// network does not consume extra attempts; the counter moves only when
    /// `op` is re-executed.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let state = self.next_state(attempt, &err);
            tracing::debug!(attempt, error = %err, ?state, "lookup attempt failed");

            let resumed = match state {
                RetryState::Exhausted => false,
                RetryState::AwaitingCredential => {
                    // Subscribe before prompting so a fast answer is not missed.
                    let key = self.credentials.await_valid_key();
                    self.prompt.request_key();
                    key.await.is_some()
                }
                RetryState::AwaitingConnectivity => self.connectivity.wait_for_connection().await,
                RetryState::AwaitingBackoff(delay) => {
                    tracing::info!("retrying after {} seconds", delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                    true
                }
            };

            if !resumed {
                tracing::warn!(attempts = attempt + 1, error = %err, "giving up on lookup");
                return Err(err);
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use tokio::time::Instant;

    use super::*;
    use crate::{connectivity::ReachabilityFlags, error::ApiError};

    fn coordinator(
        connectivity: &ConnectivityMonitor,
        credentials: &CredentialStore,
        prompts: Arc<AtomicU32>,
    ) -> RetryCoordinator {
        RetryCoordinator::new(
            RetryConfig::default(),
            connectivity.clone(),
            credentials.clone(),
            Arc::new(move || {
                prompts.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn quiet() -> RetryCoordinator {
        coordinator(&ConnectivityMonitor::new(), &CredentialStore::new(), Arc::default())
    }

    #[test]
    fn next_state_follows_failure_class() {
        let retry = quiet();
        let server: FetchError = ApiError::ServerFailure.into();
        let key: FetchError = ApiError::InvalidKey.into();

        assert_eq!(retry.next_state(0, &key), RetryState::AwaitingCredential);
        assert_eq!(
            retry.next_state(1, &FetchError::NetworkUnavailable),
            RetryState::AwaitingConnectivity
        );
        assert_eq!(
            retry.next_state(0, &ApiError::CityNotFound.into()),
            RetryState::AwaitingBackoff(Duration::from_secs(1))
        );
        assert_eq!(
            retry.next_state(2, &FetchError::Unclassified("eof".into())),
            RetryState::AwaitingBackoff(Duration::from_secs(3))
        );
        assert_eq!(retry.next_state(3, &server), RetryState::Exhausted);
        assert_eq!(retry.next_state(3, &key), RetryState::Exhausted);
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let mut retry = quiet();
        retry.policy.max_attempts = 1;
        assert_eq!(retry.next_state(0, &ApiError::ServerFailure.into()), RetryState::Exhausted);
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = quiet()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FetchError>(42) }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn linear_backoff_then_exhaustion() {
        let calls = Mutex::new(Vec::new());
        let result: Result<(), _> = quiet()
            .run(|attempt| {
                calls.lock().unwrap().push((attempt, Instant::now()));
                async { Err(ApiError::ServerFailure.into()) }
            })
            .await;

        assert_eq!(result, Err(FetchError::Api(ApiError::ServerFailure)));

        let calls = calls.into_inner().unwrap();
        let attempts: Vec<u32> = calls.iter().map(|(n, _)| *n).collect();
        assert_eq!(attempts, vec![0, 1, 2, 3]);

        for (i, pair) in calls.windows(2).enumerate() {
            let waited = pair[1].1 - pair[0].1;
            let expected = Duration::from_secs(i as u64 + 1);
            assert!(waited >= expected, "attempt {i} waited {waited:?}");
            assert!(waited < expected + Duration::from_millis(100), "attempt {i} waited {waited:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let result = quiet()
            .run(|attempt| async move {
                if attempt < 2 { Err(ApiError::ServerFailure.into()) } else { Ok(attempt) }
            })
            .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn invalid_key_waits_for_new_key_without_spending_attempts() {
        let connectivity = ConnectivityMonitor::new();
        let credentials = CredentialStore::with_key("stale");
        let prompts = Arc::new(AtomicU32::new(0));
        let retry = coordinator(&connectivity, &credentials, prompts.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn({
            let calls = calls.clone();
            let credentials = credentials.clone();
            async move {
                retry
                    .run(move |attempt| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let key = credentials.current();
                        async move {
                            if key == "fresh" {
                                Ok(attempt)
                            } else {
                                Err(ApiError::InvalidKey.into())
                            }
                        }
                    })
                    .await
            }
        });

        // Lots of wall-clock-free scheduling while nobody answers the prompt.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);

        credentials.set_key("");
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        credentials.set_key("fresh");
        assert_eq!(task.await.unwrap(), Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_loss_waits_for_connectivity() {
        let connectivity = ConnectivityMonitor::new();
        let retry = coordinator(&connectivity, &CredentialStore::new(), Arc::default());
        let calls = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn({
            let calls = calls.clone();
            async move {
                retry
                    .run(move |attempt| {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            if n == 0 { Err(FetchError::NetworkUnavailable) } else { Ok(attempt) }
                        }
                    })
                    .await
            }
        });

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        connectivity.publish(Some(ReachabilityFlags { reachable: true, ..Default::default() }));
        assert_eq!(task.await.unwrap(), Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_loss_while_flag_reads_online_retries_immediately() {
        let connectivity = ConnectivityMonitor::new();
        connectivity.publish(Some(ReachabilityFlags { reachable: true, ..Default::default() }));
        let retry = coordinator(&connectivity, &CredentialStore::new(), Arc::default());

        let result: Result<(), _> =
            tokio::time::timeout(Duration::from_secs(1), retry.run(|_| async {
                Err(FetchError::NetworkUnavailable)
            }))
            .await
            .expect("a stale online flag must not stall the chain");

        assert_eq!(result, Err(FetchError::NetworkUnavailable));
    }
}
