use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::errors::Error;
use crate::gate::{ConnectivityProbe, DEFAULT_POLL_INTERVAL, NetworkGate};
use crate::request_context::{DefaultConfigProvider, RequestDispatchContext};
use crate::strategy::AuthStrategy;
use crate::transport::{ReqwestTransport, Transport};

use super::{Api, ApiInner, AuthFailureHandler};

pub struct ApiBuilder {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    strategy: AuthStrategy,
    on_auth_failure: Option<AuthFailureHandler>,
    debug_cookie: Option<String>,
    defaults: Option<Arc<dyn DefaultConfigProvider>>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    poll_interval: Duration,
    propagate_errors: bool,
}

impl ApiBuilder {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        strategy: impl Into<AuthStrategy>,
    ) -> Self {
        Self {
            transport,
            store,
            strategy: strategy.into(),
            on_auth_failure: None,
            debug_cookie: None,
            defaults: None,
            probe: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            propagate_errors: false,
        }
    }

    /// Builds a `reqwest` transport from `config` and applies its dispatcher settings.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        strategy: impl Into<AuthStrategy>,
    ) -> Result<Self, Error> {
        let transport = ReqwestTransport::from_config(config)?;
        let mut builder = Self::new(Arc::new(transport), store, strategy)
            .poll_interval(Duration::from_millis(config.network_poll_interval_ms))
            .propagate_errors(config.propagate_errors);
        builder.debug_cookie = config.debug_cookie.clone();
        Ok(builder)
    }

    pub fn on_auth_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_auth_failure = Some(Arc::new(handler));
        self
    }

    pub fn debug_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.debug_cookie = Some(cookie.into());
        self
    }

    pub fn default_config(mut self, provider: Arc<dyn DefaultConfigProvider>) -> Self {
        self.defaults = Some(provider);
        self
    }

    pub fn network_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Return ordinary failures as `Err` instead of failure outcomes.
    pub fn propagate_errors(mut self, propagate: bool) -> Self {
        self.propagate_errors = propagate;
        self
    }

    pub fn build(self) -> Api {
        let gate = match self.probe {
            Some(probe) => NetworkGate::new(probe, self.poll_interval),
            None => NetworkGate::open(),
        };
        Api {
            inner: Arc::new(ApiInner {
                context: RequestDispatchContext::build(
                    self.transport,
                    self.store,
                    self.defaults,
                    self.debug_cookie,
                ),
                strategy: self.strategy,
                queue: Mutex::new(Default::default()),
                gate,
                on_auth_failure: self.on_auth_failure,
                propagate_errors: self.propagate_errors,
            }),
        }
    }
}
