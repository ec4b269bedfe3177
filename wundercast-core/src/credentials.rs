use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::wrappers::BroadcastStream;

/// Publications a slow subscriber may fall behind by before it starts losing them.
const KEY_BACKLOG: usize = 64;

/// Holds the current API key and lets callers wait for a usable one.
///
/// Nothing here checks whether a key is *correct*; only the weather service
/// can tell, by rejecting it.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    current: Mutex<String>,
    tx: broadcast::Sender<String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::with_key(String::new())
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        let (tx, _rx) = broadcast::channel(KEY_BACKLOG);
        Self { inner: Arc::new(Inner { current: Mutex::new(key.into()), tx }) }
    }

    /// Replace the key and notify every subscriber, even if the value is the same.
    pub fn set_key(&self, key: impl Into<String>) {
        let key = key.into();
        tracing::debug!(empty = key.is_empty(), "api key updated");

        // Held across the send so a new subscriber sees each key exactly once.
        let mut current = self.inner.current.lock();
        current.clone_from(&key);
        // No subscribers is fine.
        let _ = self.inner.tx.send(key);
    }

    pub fn current(&self) -> String {
        self.inner.current.lock().clone()
    }

    /// Current value first, then every value set afterwards, in order.
    pub fn key_stream(&self) -> BoxStream<'static, String> {
        let (first, rx) = {
            let current = self.inner.current.lock();
            (current.clone(), self.inner.tx.subscribe())
        };

        futures::stream::once(futures::future::ready(first))
            .chain(BroadcastStream::new(rx).filter_map(|key| futures::future::ready(key.ok())))
            .boxed()
    }

    /// Resolves once, on the next publication of a non-empty key.
    ///
    /// The subscription is taken when this is called, so a key stored before
    /// the call does not count: the caller is usually waiting because that key
    /// was just rejected. `None` if the store is gone.
    pub fn await_valid_key(&self) -> impl Future<Output = Option<String>> + Send + use<> {
        let mut rx = self.inner.tx.subscribe();
        async move {
            loop {
                match rx.recv().await {
                    Ok(key) if !key.is_empty() => return Some(key),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "key waiter fell behind");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    }
}

/// Asks the user for a new key.
///
/// Must not block; the answer comes back through [`CredentialStore::set_key`].
pub trait KeyPrompt: Send + Sync {
    fn request_key(&self);
}

impl<F> KeyPrompt for F
where
    F: Fn() + Send + Sync,
{
    fn request_key(&self) {
        self()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
