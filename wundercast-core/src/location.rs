use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::{StreamExt, stream::BoxStream};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::LocationFix;

/// Source of device location fixes.
pub trait LocationProvider: Send + Sync {
    /// Ask the platform to begin producing fixes. Calling it again is harmless.
    fn start_updating(&self);

    /// Fixes as they arrive. Callers subscribe before [`start_updating`] so the
    /// first fix cannot slip past them.
    ///
    /// [`start_updating`]: LocationProvider::start_updating
    fn updates(&self) -> BoxStream<'static, LocationFix>;
}

/// A location source fed by hand: the latest pushed fix is replayed to new
/// subscribers, the way a platform hands out its last known location first.
#[derive(Debug, Clone)]
pub struct LocationFeed {
    tx: Arc<watch::Sender<Option<LocationFix>>>,
    updating: Arc<AtomicBool>,
}

impl LocationFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx), updating: Arc::new(AtomicBool::new(false)) }
    }

    pub fn push(&self, fix: LocationFix) {
        tracing::trace!(?fix, "location fix");
        self.tx.send_replace(Some(fix));
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for LocationFeed {
    fn start_updating(&self) {
        if !self.updating.swap(true, Ordering::SeqCst) {
            tracing::debug!("location updates started");
        }
    }

    fn updates(&self) -> BoxStream<'static, LocationFix> {
        WatchStream::new(self.tx.subscribe())
            .filter_map(futures::future::ready)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    #[tokio::test]
    async fn replays_latest_fix_to_new_subscriber() {
        let feed = LocationFeed::new();
        let fix = LocationFix::new(Coordinate::new(1.0, 2.0), 5.0);
        feed.push(fix);

        let mut updates = feed.updates();
        assert_eq!(updates.next().await, Some(fix));
    }

    #[tokio::test]
    async fn start_updating_is_sticky() {
        let feed = LocationFeed::new();
        assert!(!feed.is_updating());
        feed.start_updating();
        feed.start_updating();
        assert!(feed.is_updating());
    }
}
