use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;
use crate::transport::{RawResponse, TransportError};

pub const AUTHORIZATION: &str = "Authorization";
pub const COOKIE: &str = "Cookie";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ApiMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
            ApiMethod::Put => reqwest::Method::PUT,
            ApiMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiMethod::Get => write!(f, "get"),
            ApiMethod::Post => write!(f, "post"),
            ApiMethod::Put => write!(f, "put"),
            ApiMethod::Delete => write!(f, "delete"),
        }
    }
}

/// Everything needed to issue one request.
///
/// The URL is usually relative to the transport's base URL. A descriptor with
/// no method is sent as a GET.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Option<ApiMethod>,
    pub headers: BTreeMap<String, String>,
    pub params: Map<String, Value>,
    pub body: Option<Value>,
    /// Asks the transport to send ambient credentials such as cookies.
    /// [`crate::ReqwestTransport`] has no credentials mode and ignores it; the
    /// explicit `Cookie` header is what reaches the server there.
    pub with_credentials: bool,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method(ApiMethod::Get)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(ApiMethod::Post)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(url).method(ApiMethod::Put)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url).method(ApiMethod::Delete)
    }

    pub fn method(mut self, method: ApiMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn effective_method(&self) -> ApiMethod {
        self.method.unwrap_or(ApiMethod::Get)
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header_value(name).is_some()
    }

    /// Inserts the header unless one with the same name is already present.
    /// Returns whether the header was inserted.
    pub fn set_header_if_absent(&mut self, name: &str, value: impl Into<String>) -> bool {
        if self.has_header(name) {
            return false;
        }
        self.headers.insert(name.to_string(), value.into());
        true
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        RequestDescriptor::new(url)
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        RequestDescriptor::new(url)
    }
}

/// Per-call defaults layered underneath an outgoing descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestDefaults {
    pub method: Option<ApiMethod>,
    pub headers: BTreeMap<String, String>,
    pub params: Map<String, Value>,
    pub body: Option<Value>,
    pub with_credentials: Option<bool>,
}

impl RequestDefaults {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Merges these defaults under `explicit`; every field the descriptor sets wins.
    pub fn apply_to(self, explicit: RequestDescriptor) -> RequestDescriptor {
        let mut headers: BTreeMap<String, String> = self
            .headers
            .into_iter()
            .filter(|(name, _)| !explicit.has_header(name))
            .collect();
        headers.extend(explicit.headers);

        let mut params = self.params;
        params.extend(explicit.params);

        RequestDescriptor {
            url: explicit.url,
            method: explicit.method.or(self.method),
            headers,
            params,
            body: explicit.body.or(self.body),
            with_credentials: explicit.with_credentials || self.with_credentials.unwrap_or(false),
        }
    }
}

/// Token payload issued by the auth endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Tokens {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: None,
            expires_in: None,
            scope: None,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Reply<T> {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub data: T,
}

impl<T> Reply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            status: self.status,
            headers: self.headers,
            data: f(self.data),
        }
    }
}

impl From<RawResponse> for Reply<Value> {
    fn from(resp: RawResponse) -> Self {
        Reply {
            status: Some(resp.status),
            headers: resp.headers,
            data: resp.data,
        }
    }
}

/// Tagged result of every public dispatcher operation.
#[derive(Clone, Debug)]
pub enum Outcome<T = Value, E = Value> {
    Success(Reply<T>),
    Failure(Reply<E>),
}

impl<T, E> Outcome<T, E> {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Outcome::Success(reply) => reply.status,
            Outcome::Failure(reply) => reply.status,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Outcome::Success(reply) => &reply.headers,
            Outcome::Failure(reply) => &reply.headers,
        }
    }

    pub fn success(self) -> Option<Reply<T>> {
        match self {
            Outcome::Success(reply) => Some(reply),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(self) -> Option<Reply<E>> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(reply) => Some(reply),
        }
    }
}

impl<E> Outcome<Value, E> {
    /// Deserializes the success payload, leaving failures untouched.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<Outcome<T, E>, Error> {
        match self {
            Outcome::Success(reply) => {
                let data = serde_json::from_value(reply.data)?;
                Ok(Outcome::Success(Reply {
                    status: reply.status,
                    headers: reply.headers,
                    data,
                }))
            }
            Outcome::Failure(reply) => Ok(Outcome::Failure(reply)),
        }
    }
}

impl<T> Outcome<T, Value> {
    /// The bare failure handed to queued callers whose refresh did not succeed.
    pub fn cancelled() -> Self {
        Outcome::Failure(Reply {
            status: None,
            headers: HeaderMap::new(),
            data: Value::Null,
        })
    }

    pub(crate) fn from_error(err: Error) -> Self {
        match err {
            Error::Transport(TransportError::Status(resp)) => Outcome::Failure(resp.into()),
            other => Outcome::Failure(Reply {
                status: other.status(),
                headers: HeaderMap::new(),
                data: Value::String(other.to_string()),
            }),
        }
    }
}
