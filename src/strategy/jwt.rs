use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::errors::Error;

use super::TokenRequest;

pub const JWT_AUTH_URL: &str = "internal/identity";

/// Identity presented to the identity endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwtAuthContext {
    pub auth_token: String,
    pub organization_key: String,
}

/// Supplies the JWT and organization on every (re-)identification, so a
/// refresh picks up whatever the application has rotated in since.
#[async_trait]
pub trait JwtContextProvider: Send + Sync + 'static {
    async fn jwt_context(&self) -> Result<JwtAuthContext, Error>;
}

/// A context the application can swap out at runtime.
#[derive(Debug)]
pub struct SharedJwtContext {
    context: RwLock<JwtAuthContext>,
}

impl SharedJwtContext {
    pub fn new(context: JwtAuthContext) -> Self {
        Self {
            context: RwLock::new(context),
        }
    }

    pub fn from_config(config: &Config, auth_token: impl Into<String>) -> Result<Self, Error> {
        let organization_key = config.organization_key.clone().ok_or_else(|| {
            Error::Config("JWT strategy requires organization_key".to_string())
        })?;
        Ok(Self::new(JwtAuthContext {
            auth_token: auth_token.into(),
            organization_key,
        }))
    }

    pub async fn update(&self, context: JwtAuthContext) {
        *self.context.write().await = context;
    }
}

#[async_trait]
impl JwtContextProvider for SharedJwtContext {
    async fn jwt_context(&self) -> Result<JwtAuthContext, Error> {
        Ok(self.context.read().await.clone())
    }
}

/// Exchanges an externally issued bearer JWT for API tokens.
#[derive(Clone)]
pub struct JwtStrategy {
    provider: Arc<dyn JwtContextProvider>,
}

impl JwtStrategy {
    pub fn new(provider: Arc<dyn JwtContextProvider>) -> Self {
        Self { provider }
    }

    pub(crate) async fn identify_request(&self) -> Result<TokenRequest, Error> {
        let context = self.provider.jwt_context().await?;
        Ok(TokenRequest {
            body: json!({ "organizationKey": context.organization_key }),
            bearer: Some(context.auth_token),
        })
    }
}
