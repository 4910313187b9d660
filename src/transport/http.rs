use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::Error;
use crate::types::RequestDescriptor;

use super::casing::{camelize_keys, decamelize_keys, to_snake_case};
use super::{RawResponse, Transport, TransportError};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20_000);
const SDK_USER_AGENT: &str = concat!("authenticated-api-rust/", env!("CARGO_PKG_VERSION"));

/// `reqwest`-backed transport rooted at a base URL.
///
/// Headers are sent exactly as the descriptor carries them, so a debug cookie
/// travels as a plain `Cookie` header and `with_credentials` is not consulted.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    accept: Option<String>,
    transform_keys: bool,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(client, base_url)
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let mut transport = Self::with_client(client, config.base_url.clone())?;
        transport.accept = config.accept.clone();
        transport.transform_keys = config.transform_keys;
        Ok(transport)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Result<Self, Error> {
        let base_url = base_url.into();
        let base_url = if base_url.starts_with("http") {
            base_url
        } else {
            format!("https://{}", base_url)
        };
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            accept: None,
            transform_keys: true,
        })
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Disables the camelCase/snake_case rewriting of bodies, params and responses.
    pub fn preserve_keys(mut self) -> Self {
        self.transform_keys = false;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &RequestDescriptor) -> String {
        let url = if request.url.contains("://") {
            request.url.clone()
        } else {
            format!("{}/{}", self.base_url, request.url.trim_start_matches('/'))
        };
        let query = serialize_params(&request.params, self.transform_keys);
        if query.is_empty() {
            url
        } else if url.contains('?') {
            format!("{url}&{query}")
        } else {
            format!("{url}?{query}")
        }
    }

    fn parse_body(&self, bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return Value::Null;
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) if self.transform_keys => camelize_keys(value),
            Ok(value) => value,
            Err(_) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        let method = request.effective_method();
        let url = self.url_for(request);

        let mut builder = self
            .client
            .request(method.as_reqwest(), &url)
            .header(USER_AGENT, SDK_USER_AGENT);
        if let Some(accept) = self.accept.as_ref()
            && !request.has_header(ACCEPT.as_str())
        {
            builder = builder.header(ACCEPT, accept);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.as_ref() {
            let body = if self.transform_keys {
                decamelize_keys(body.clone())
            } else {
                body.clone()
            };
            builder = builder.json(&body);
        }

        let resp = builder.send().await.map_err(|e| {
            warn!("request failed: method={} url='{}' error={}", method, url, e);
            TransportError::Network(e.to_string())
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let raw = RawResponse {
            status,
            headers,
            data: self.parse_body(&bytes),
        };

        if status.is_success() {
            debug!("request ok: method={} url='{}' status={}", method, url, status);
            Ok(raw)
        } else {
            warn!("request failed: method={} url='{}' status={}", method, url, status);
            Err(TransportError::Status(raw))
        }
    }
}

fn serialize_params(params: &Map<String, Value>, transform_keys: bool) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        let key = if transform_keys {
            to_snake_case(key)
        } else {
            key.clone()
        };
        let key = urlencoding::encode(&key);
        match value {
            Value::Null => continue,
            Value::Array(items) => {
                for item in items {
                    let item = param_value(item, transform_keys);
                    pairs.push(format!("{}[]={}", key, urlencoding::encode(&item)));
                }
            }
            other => {
                let value = param_value(other, transform_keys);
                pairs.push(format!("{}={}", key, urlencoding::encode(&value)));
            }
        }
    }
    pairs.join("&")
}

fn param_value(value: &Value, transform_keys: bool) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) if transform_keys => decamelize_keys(value.clone()).to_string(),
        other => other.to_string(),
    }
}
