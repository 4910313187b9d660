//! The component that actually performs network I/O.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::types::RequestDescriptor;

pub mod casing;
pub mod http;
pub mod mock;

pub use http::ReqwestTransport;
pub use mock::{MockResponse, MockRule, MockTransport};

#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: Value,
}

#[derive(Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    Status(RawResponse),
    /// No response was received.
    Network(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status(resp) => write!(f, "request failed with status {}", resp.status),
            TransportError::Network(msg) => write!(f, "network failure: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn perform(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError>;
}
