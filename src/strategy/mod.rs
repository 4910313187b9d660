//! How initial sign-in and token refresh are performed.
//!
//! A strategy only shapes the token request; the dispatcher sends it,
//! stores the resulting tokens, and reports failures.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::credentials::CredentialStore;
use crate::errors::Error;
use crate::types::RequestDescriptor;

mod jwt;
mod oauth;

pub use jwt::{JWT_AUTH_URL, JwtAuthContext, JwtContextProvider, JwtStrategy, SharedJwtContext};
pub use oauth::{ClientCredentials, OAUTH_AUTH_URL, OAuthStrategy, PasswordCredentials};

/// A token request ready to post to the strategy's auth endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenRequest {
    pub body: Value,
    /// Sent as the Authorization header of the auth call itself.
    pub bearer: Option<String>,
}

/// Caller-supplied fields merged into the sign-in body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthParams(Map<String, Value>);

impl AuthParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Accepts anything that serializes to a JSON object.
    pub fn from_serialize<T: Serialize>(params: &T) -> Result<Self, Error> {
        match serde_json::to_value(params)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(Error::InvalidParams(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

#[derive(Clone)]
pub enum AuthStrategy {
    OAuth(OAuthStrategy),
    Jwt(JwtStrategy),
}

impl AuthStrategy {
    pub fn auth_url(&self) -> &'static str {
        match self {
            AuthStrategy::OAuth(_) => OAUTH_AUTH_URL,
            AuthStrategy::Jwt(_) => JWT_AUTH_URL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::OAuth(_) => "oauth",
            AuthStrategy::Jwt(_) => "jwt",
        }
    }

    /// Requests to the auth endpoint never trigger a refresh of their own.
    pub fn is_auth_request(&self, request: &RequestDescriptor) -> bool {
        request.url.contains(self.auth_url())
    }

    pub(crate) async fn authenticate_request(
        &self,
        params: AuthParams,
    ) -> Result<TokenRequest, Error> {
        match self {
            AuthStrategy::OAuth(oauth) => Ok(oauth.sign_in_request(params)),
            AuthStrategy::Jwt(jwt) => jwt.identify_request().await,
        }
    }

    pub(crate) async fn refresh_request(
        &self,
        store: &dyn CredentialStore,
    ) -> Result<TokenRequest, Error> {
        match self {
            AuthStrategy::OAuth(oauth) => oauth.refresh_request(store).await,
            // there is no refresh grant; re-identify with whatever context is current
            AuthStrategy::Jwt(jwt) => jwt.identify_request().await,
        }
    }
}

impl From<OAuthStrategy> for AuthStrategy {
    fn from(strategy: OAuthStrategy) -> Self {
        AuthStrategy::OAuth(strategy)
    }
}

impl From<JwtStrategy> for AuthStrategy {
    fn from(strategy: JwtStrategy) -> Self {
        AuthStrategy::Jwt(strategy)
    }
}
