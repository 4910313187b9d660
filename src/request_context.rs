use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::credentials::CredentialStore;
use crate::errors::Error;
use crate::transport::{RawResponse, Transport};
use crate::types::{AUTHORIZATION, COOKIE, RequestDefaults, RequestDescriptor};

/// Computes defaults for the request about to be sent.
#[async_trait]
pub trait DefaultConfigProvider: Send + Sync + 'static {
    async fn defaults(&self, request: &RequestDescriptor) -> RequestDefaults;
}

/// The same defaults for every request.
#[derive(Clone, Debug, Default)]
pub struct StaticDefaults(pub RequestDefaults);

#[async_trait]
impl DefaultConfigProvider for StaticDefaults {
    async fn defaults(&self, _request: &RequestDescriptor) -> RequestDefaults {
        self.0.clone()
    }
}

/// Shared context for outbound requests ensuring consistent decoration.
#[derive(Clone)]
pub struct RequestDispatchContext {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    defaults: Option<Arc<dyn DefaultConfigProvider>>,
    debug_cookie: Option<String>,
}

impl RequestDispatchContext {
    pub fn build(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        defaults: Option<Arc<dyn DefaultConfigProvider>>,
        debug_cookie: Option<String>,
    ) -> Self {
        Self {
            transport,
            store,
            defaults,
            debug_cookie,
        }
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Attaches the current bearer token and debug cookie unless the request
    /// already carries them, then layers the per-call defaults underneath.
    /// Tokens are read from the store on every call.
    pub async fn decorate(&self, request: &RequestDescriptor) -> Result<RequestDescriptor, Error> {
        let tokens = self.store.get_tokens(request).await?;
        let mut decorated = request.clone();

        if let Some(tokens) = tokens.as_ref()
            && !tokens.access_token.is_empty()
        {
            decorated.set_header_if_absent(AUTHORIZATION, tokens.bearer());
        }
        if let Some(cookie) = self.debug_cookie.as_ref()
            && decorated.set_header_if_absent(COOKIE, cookie.clone())
        {
            decorated.with_credentials = true;
        }

        let defaults = match self.defaults.as_ref() {
            Some(provider) => provider.defaults(&decorated).await,
            None => RequestDefaults::default(),
        };
        Ok(defaults.apply_to(decorated))
    }

    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<RawResponse, Error> {
        let decorated = self.decorate(request).await?;
        debug!(
            "dispatch: method={} url='{}'",
            decorated.effective_method(),
            decorated.url
        );
        Ok(self.transport.perform(&decorated).await?)
    }
}
