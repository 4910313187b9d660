//! Holds requests back until the network is reachable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[async_trait]
pub trait ConnectivityProbe: Send + Sync + 'static {
    async fn is_reachable(&self) -> bool;
}

/// Polls a probe before a request is issued. There is no timeout: a request
/// waits for as long as the network stays down.
#[derive(Clone)]
pub struct NetworkGate {
    probe: Option<Arc<dyn ConnectivityProbe>>,
    interval: Duration,
}

impl NetworkGate {
    pub fn open() -> Self {
        Self {
            probe: None,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn new(probe: Arc<dyn ConnectivityProbe>, interval: Duration) -> Self {
        Self {
            probe: Some(probe),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn wait_until_reachable(&self) {
        let Some(probe) = self.probe.as_ref() else {
            return;
        };
        let mut waits: u32 = 0;
        while !probe.is_reachable().await {
            waits += 1;
            debug!(
                waits,
                interval_ms = self.interval.as_millis() as u64,
                "network.unreachable"
            );
            tokio::time::sleep(self.interval).await;
        }
        if waits > 0 {
            info!(waits, "network.reachable");
        }
    }
}

impl Default for NetworkGate {
    fn default() -> Self {
        Self::open()
    }
}

/// Treats any HTTP response from `url` as proof of connectivity.
#[derive(Clone, Debug)]
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("probe failed: url='{}' error={}", self.url, e);
                false
            }
        }
    }
}
