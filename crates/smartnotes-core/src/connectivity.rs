//! Network reachability tracking and reconnect notifications

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::util::has_http_scheme;

/// Callback fired on every offline -> online transition
pub type ReconnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Answers "am I online now?" and announces reconnects.
///
/// Delivery is at-least-once per transition: subscribers must tolerate
/// redundant invocations.
pub trait Connectivity: Send + Sync {
    /// Best-effort snapshot, may lag the real network by one probe interval
    fn is_online(&self) -> bool;

    /// Register a reconnect callback; dropping the handle unsubscribes
    fn on_reconnect(&self, callback: ReconnectCallback) -> ReconnectSubscription;
}

/// Unsubscribe handle returned by [`Connectivity::on_reconnect`].
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct ReconnectSubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ReconnectSubscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving reconnect events
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ReconnectSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for ReconnectSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct MonitorState {
    online: AtomicBool,
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<u64, ReconnectCallback>>,
}

/// In-process connectivity state fed by [`ConnectivityMonitor::set_online`]
/// or by a polling task.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<MonitorState>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            state: Arc::new(MonitorState {
                online: AtomicBool::new(initially_online),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Record the current reachability.
    ///
    /// An offline -> online transition invokes every registered callback.
    pub fn set_online(&self, online: bool) {
        let was_online = self.state.online.swap(online, Ordering::SeqCst);
        if online == was_online {
            return;
        }

        if !online {
            tracing::info!("Connectivity lost");
            return;
        }

        // Snapshot so callbacks may (un)subscribe without deadlocking
        let callbacks: Vec<ReconnectCallback> =
            self.state.subscribers.lock().values().cloned().collect();
        tracing::info!(
            subscribers = callbacks.len(),
            "Connectivity restored"
        );
        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.lock().len()
    }

    /// Probe reachability every `interval` and feed the result into this
    /// monitor. Abort the returned handle to stop polling.
    pub fn spawn_polling(
        &self,
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reachable = probe.is_reachable().await;
                tracing::trace!(reachable, "Reachability probe finished");
                monitor.set_online(reachable);
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.state.online.load(Ordering::SeqCst)
    }

    fn on_reconnect(&self, callback: ReconnectCallback) -> ReconnectSubscription {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.subscribers.lock().insert(id, callback);

        let state: Weak<MonitorState> = Arc::downgrade(&self.state);
        ReconnectSubscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.subscribers.lock().remove(&id);
            }
        })
    }
}

/// Something that can tell whether the server is reachable
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes `GET /healthz` on the origin of the API base URL.
///
/// Any HTTP response counts as reachable; only transport failures do not.
#[derive(Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self> {
        let url = health_url(api_base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client setup failed: {error}")))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Health probe failed: {error}");
                false
            }
        }
    }
}

fn health_url(api_base_url: &str) -> Result<String> {
    let trimmed = api_base_url.trim();
    if !has_http_scheme(trimmed) {
        return Err(Error::InvalidInput(
            "API URL must include http:// or https://".to_string(),
        ));
    }
    let mut url = reqwest::Url::parse(trimmed)
        .map_err(|error| Error::InvalidInput(format!("invalid API URL: {error}")))?;
    url.set_path("/healthz");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}
