//! Live connectivity signal derived from host reachability.
//!
//! The platform side is modelled as a stream of [`ReachabilityFlags`] changes
//! (`None` when reachability could not be resolved). The monitor folds each
//! change into a [`ConnectivityState`] and republishes it as a boolean with
//! behavior-subject semantics: new subscribers see the latest value first, and
//! re-announcing the same value wakes nobody.

use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use tokio::{net::TcpStream, sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityType {
    Wwan,
    WiFi,
}

impl fmt::Display for ReachabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityType::Wwan => f.write_str("WWAN"),
            ReachabilityType::WiFi => f.write_str("WiFi"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Offline,
    Online(ReachabilityType),
    Unknown,
}

impl ConnectivityState {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online(_))
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityState::Offline => f.write_str("Offline"),
            ConnectivityState::Online(kind) => write!(f, "Online ({kind})"),
            ConnectivityState::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Raw reachability bits reported for the monitored host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReachabilityFlags {
    pub reachable: bool,
    /// An explicit connection step (VPN dial, captive portal) is needed first.
    pub connection_required: bool,
    pub is_wwan: bool,
}

impl From<ReachabilityFlags> for ConnectivityState {
    fn from(flags: ReachabilityFlags) -> Self {
        if flags.reachable && !flags.connection_required {
            let kind = if flags.is_wwan { ReachabilityType::Wwan } else { ReachabilityType::WiFi };
            ConnectivityState::Online(kind)
        } else {
            ConnectivityState::Offline
        }
    }
}

impl From<Option<ReachabilityFlags>> for ConnectivityState {
    fn from(flags: Option<ReachabilityFlags>) -> Self {
        flags.map_or(ConnectivityState::Unknown, ConnectivityState::from)
    }
}

/// Process-wide connectivity signal. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Feed reachability changes into the monitor until `flags` ends.
    pub fn start<S>(&self, flags: S) -> JoinHandle<()>
    where
        S: Stream<Item = Option<ReachabilityFlags>> + Send + 'static,
    {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut flags = std::pin::pin!(flags);
            while let Some(change) = flags.next().await {
                monitor.publish(change);
            }
            tracing::debug!("reachability source ended");
        })
    }

    /// Reachability callback: recompute the state and publish it.
    pub fn publish(&self, flags: Option<ReachabilityFlags>) -> ConnectivityState {
        let state = ConnectivityState::from(flags);
        let online = state.is_online();

        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            tracing::info!(%state, connected = online, "connectivity changed");
        } else {
            tracing::trace!(%state, "connectivity unchanged");
        }

        state
    }

    /// Latest value first, then every change.
    pub fn connected(&self) -> WatchStream<bool> {
        WatchStream::new(self.tx.subscribe())
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves as soon as the signal reads `true`, including the replayed
    /// latest value. `false` if the monitor is gone before that happens.
    pub fn wait_for_connection(&self) -> impl Future<Output = bool> + Send + use<> {
        let mut rx = self.tx.subscribe();
        async move { rx.wait_for(|connected| *connected).await.is_ok() }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls a fixed host over TCP and reports what it finds as reachability flags.
#[derive(Debug, Clone)]
pub struct TcpReachability {
    host: String,
    interval: Duration,
    timeout: Duration,
}

impl TcpReachability {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `None` when the host name cannot be resolved.
    pub async fn probe(&self) -> Option<ReachabilityFlags> {
        let addr: SocketAddr = match tokio::net::lookup_host(self.host.as_str()).await {
            Ok(mut addrs) => addrs.next()?,
            Err(e) => {
                tracing::debug!(host = %self.host, error = %e, "reachability lookup failed");
                return None;
            }
        };

        let reachable =
            matches!(tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await, Ok(Ok(_)));

        Some(ReachabilityFlags { reachable, connection_required: false, is_wwan: false })
    }

    /// One probe immediately, then one per interval, forever.
    pub fn into_stream(self) -> impl Stream<Item = Option<ReachabilityFlags>> + Send + 'static {
        futures::stream::unfold((self, true), |(probe, first)| async move {
            if !first {
                tokio::time::sleep(probe.interval).await;
            }
            let flags = probe.probe().await;
            Some((flags, (probe, false)))
        })
    }
}
