//! In-process transport for exercising code built on [`crate::Api`] without a
//! network.
//!
//! Rules are matched newest first; a rule with a use count stops matching once
//! it is spent. A request no rule matches is answered with `200 {}`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::types::{ApiMethod, RequestDescriptor};

use super::{RawResponse, Transport, TransportError};

#[derive(Clone, Debug)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    data: Value,
    network_error: Option<String>,
}

impl MockResponse {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            data: data.into(),
            network_error: None,
        }
    }

    /// A response with the given status and no body.
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            data: Value::Null,
            network_error: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::status(StatusCode::UNAUTHORIZED)
    }

    /// Fails without a response, like a dropped connection.
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            network_error: Some(message.into()),
            ..Self::status(StatusCode::SERVICE_UNAVAILABLE)
        }
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    fn into_result(self) -> Result<RawResponse, TransportError> {
        if let Some(message) = self.network_error {
            return Err(TransportError::Network(message));
        }
        let raw = RawResponse {
            status: self.status,
            headers: self.headers,
            data: self.data,
        };
        if raw.status.is_success() {
            Ok(raw)
        } else {
            Err(TransportError::Status(raw))
        }
    }
}

type ComputeFn = dyn Fn(&RequestDescriptor) -> MockResponse + Send + Sync;

#[derive(Clone)]
enum Responder {
    Fixed(MockResponse),
    Computed(Arc<ComputeFn>),
}

#[derive(Clone)]
pub struct MockRule {
    method: Option<ApiMethod>,
    url: Option<String>,
    responder: Responder,
    remaining: Option<usize>,
    delay: Option<Duration>,
}

impl MockRule {
    pub fn new(response: MockResponse) -> Self {
        Self {
            method: None,
            url: None,
            responder: Responder::Fixed(response),
            remaining: None,
            delay: None,
        }
    }

    /// Builds the response from the request as the transport saw it.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> MockResponse + Send + Sync + 'static,
    {
        Self {
            responder: Responder::Computed(Arc::new(f)),
            ..Self::new(MockResponse::ok(json!({})))
        }
    }

    pub fn method(mut self, method: ApiMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn times(mut self, times: usize) -> Self {
        self.remaining = Some(times);
        self
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn matches(&self, request: &RequestDescriptor) -> bool {
        self.remaining != Some(0)
            && self.url.as_ref().is_none_or(|url| *url == request.url)
            && self
                .method
                .is_none_or(|method| method == request.effective_method())
    }
}

#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<MockRule>>,
    calls: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&self, rule: MockRule) -> &Self {
        lock(&self.rules).insert(0, rule);
        self
    }

    pub fn respond(&self, method: ApiMethod, url: &str, response: MockResponse) -> &Self {
        self.mount(MockRule::new(response).method(method).url(url))
    }

    /// Every request performed so far, in dispatch order.
    pub fn calls(&self) -> Vec<RequestDescriptor> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<RequestDescriptor> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.url == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn perform(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        lock(&self.calls).push(request.clone());

        let selected = {
            let mut rules = lock(&self.rules);
            rules.iter_mut().find(|rule| rule.matches(request)).map(|rule| {
                if let Some(remaining) = rule.remaining.as_mut() {
                    *remaining -= 1;
                }
                (rule.responder.clone(), rule.delay)
            })
        };

        let Some((responder, delay)) = selected else {
            debug!("mock: no rule for {} '{}'", request.effective_method(), request.url);
            return MockResponse::ok(json!({})).into_result();
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let response = match responder {
            Responder::Fixed(response) => response,
            Responder::Computed(f) => f(request),
        };
        response.into_result()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
