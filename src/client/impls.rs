use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::credentials::CredentialStore;
use crate::errors::Error;
use crate::strategy::{AuthParams, AuthStrategy, TokenRequest};
use crate::telemetry::refresh::{DrainOutcome, RefreshTelemetry};
use crate::transport::Transport;
use crate::types::{AUTHORIZATION, ApiMethod, Outcome, Reply, RequestDescriptor, Tokens};

use super::queue::{QueuedRequest, Settled};
use super::{Api, ApiBuilder, ApiInner};

impl Api {
    pub fn builder(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        strategy: impl Into<AuthStrategy>,
    ) -> ApiBuilder {
        ApiBuilder::new(transport, store, strategy)
    }

    /// Sends a request, refreshing tokens and replaying it if it comes back 401.
    ///
    /// Resolves to a failure outcome rather than an error unless the dispatcher
    /// was built with `propagate_errors`.
    pub async fn request(&self, request: impl Into<RequestDescriptor>) -> Settled {
        let request = request.into();
        self.inner.gate.wait_until_reachable().await;
        self.inner.dispatch(request).await
    }

    pub async fn get(&self, request: impl Into<RequestDescriptor>) -> Settled {
        self.request(with_default_method(request.into(), ApiMethod::Get))
            .await
    }

    pub async fn post(&self, request: impl Into<RequestDescriptor>) -> Settled {
        self.request(with_default_method(request.into(), ApiMethod::Post))
            .await
    }

    pub async fn put(&self, request: impl Into<RequestDescriptor>) -> Settled {
        self.request(with_default_method(request.into(), ApiMethod::Put))
            .await
    }

    pub async fn delete(&self, request: impl Into<RequestDescriptor>) -> Settled {
        self.request(with_default_method(request.into(), ApiMethod::Delete))
            .await
    }

    /// Initial sign-in through the configured strategy. The JWT strategy takes
    /// its identity from its context provider and ignores `params`.
    pub async fn authenticate(
        &self,
        params: impl Into<AuthParams>,
    ) -> Result<Outcome<Tokens>, Error> {
        let inner = &self.inner;
        let result = match inner.strategy.authenticate_request(params.into()).await {
            Ok(token_request) => inner.execute_token_request(token_request).await,
            Err(err) => {
                inner.report_auth_failure(&err);
                Err(err)
            }
        };
        match result {
            Ok(reply) => {
                info!("authenticated: strategy={}", inner.strategy.name());
                Ok(Outcome::Success(reply))
            }
            Err(err) => inner.settle_error(err),
        }
    }

    pub fn strategy(&self) -> &AuthStrategy {
        &self.inner.strategy
    }

    pub async fn is_authenticating(&self) -> bool {
        self.inner.queue.lock().await.is_authenticating()
    }

    pub async fn pending_requests(&self) -> usize {
        self.inner.queue.lock().await.len()
    }
}

impl ApiInner {
    async fn dispatch(self: &Arc<Self>, request: RequestDescriptor) -> Settled {
        let request = {
            let mut queue = self.queue.lock().await;
            if queue.is_authenticating() {
                debug!("refresh in flight; queueing url='{}'", request.url);
                let receiver = queue.enqueue(request);
                drop(queue);
                return self.await_queued(receiver).await;
            }
            request
        };

        let result = self.context.dispatch(&request).await;
        match result {
            Ok(resp) => Ok(Outcome::Success(resp.into())),
            Err(err) if err.is_unauthorized() && !self.strategy.is_auth_request(&request) => {
                warn!(
                    "request unauthorized: method={} url='{}' status=401",
                    request.effective_method(),
                    request.url
                );
                let (receiver, claimed) = self.queue.lock().await.enqueue_and_claim(request);
                if claimed {
                    let inner = Arc::clone(self);
                    tokio::spawn(async move { inner.refresh_cycle().await });
                }
                self.await_queued(receiver).await
            }
            Err(err) => self.settle_error(err),
        }
    }

    async fn await_queued(&self, receiver: oneshot::Receiver<Settled>) -> Settled {
        match receiver.await {
            Ok(settled) => settled,
            Err(_) => {
                error!("refresh ended without resolving a queued request");
                if self.propagate_errors {
                    Err(Error::RefreshAborted)
                } else {
                    Ok(Outcome::cancelled())
                }
            }
        }
    }

    /// Runs one refresh and settles every caller queued behind it.
    async fn refresh_cycle(self: Arc<Self>) {
        let telemetry = RefreshTelemetry::new(self.strategy.name());
        telemetry.emit_start(self.queue.lock().await.len());

        // a panic in the store or the failure handler must still end the cycle
        let refreshed = match AssertUnwindSafe(self.refresh_tokens()).catch_unwind().await {
            Ok(result) => result.map(|_| ()),
            Err(_) => {
                error!("token refresh panicked; cancelling queued requests");
                Err(Error::RefreshAborted)
            }
        };
        match refreshed.as_ref() {
            Ok(_) => telemetry.emit_success(),
            Err(err) => telemetry.emit_failure(err),
        }

        let pending = self.queue.lock().await.finish();
        if refreshed.is_ok() {
            telemetry.emit_drain(DrainOutcome::Replayed, pending.len());
            self.replay(pending).await;
        } else {
            telemetry.emit_drain(DrainOutcome::Cancelled, pending.len());
            for queued in pending {
                queued.resolve(Ok(Outcome::cancelled()));
            }
        }
    }

    async fn replay(&self, pending: Vec<QueuedRequest>) {
        let replays = pending.into_iter().map(|queued| async move {
            let settled = match self.context.dispatch(queued.descriptor()).await {
                Ok(resp) => Ok(Outcome::Success(resp.into())),
                Err(err) => self.settle_error(err),
            };
            queued.resolve(settled);
        });
        join_all(replays).await;
    }

    async fn refresh_tokens(&self) -> Result<Reply<Tokens>, Error> {
        match self.strategy.refresh_request(self.context.store()).await {
            Ok(token_request) => self.execute_token_request(token_request).await,
            Err(err) => {
                self.report_auth_failure(&err);
                Err(err)
            }
        }
    }

    /// Posts to the auth endpoint and stores the issued tokens. Failures are
    /// reported to the failure handler and not retried.
    async fn execute_token_request(
        &self,
        token_request: TokenRequest,
    ) -> Result<Reply<Tokens>, Error> {
        let result = self.post_token_request(token_request).await;
        if let Err(err) = result.as_ref() {
            self.report_auth_failure(err);
        }
        result
    }

    async fn post_token_request(
        &self,
        token_request: TokenRequest,
    ) -> Result<Reply<Tokens>, Error> {
        let mut request =
            RequestDescriptor::post(self.strategy.auth_url()).json(token_request.body);
        if let Some(bearer) = token_request.bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {bearer}"));
        }

        let reply: Reply<Value> = self.context.dispatch(&request).await?.into();
        let tokens: Tokens = serde_json::from_value(reply.data.clone())?;
        self.context.store().set_tokens(tokens.clone()).await?;
        info!("tokens stored: strategy={}", self.strategy.name());
        Ok(reply.map(|_| tokens))
    }

    fn report_auth_failure(&self, err: &Error) {
        error!(
            "authentication failed: strategy={} error={}",
            self.strategy.name(),
            err
        );
        if let Some(handler) = self.on_auth_failure.as_ref() {
            handler(err);
        }
    }

    fn settle_error<T>(&self, err: Error) -> Result<Outcome<T>, Error> {
        if self.propagate_errors {
            Err(err)
        } else {
            Ok(Outcome::from_error(err))
        }
    }
}

fn with_default_method(mut request: RequestDescriptor, method: ApiMethod) -> RequestDescriptor {
    request.method.get_or_insert(method);
    request
}
