use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::errors::Error;
use crate::types::RequestDescriptor;

use super::{AuthParams, TokenRequest};

pub const OAUTH_AUTH_URL: &str = "oauth/token";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Resource-owner password sign-in fields.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredentials {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
}

impl From<PasswordCredentials> for AuthParams {
    fn from(creds: PasswordCredentials) -> Self {
        let params = AuthParams::new()
            .insert("username", creds.username)
            .insert("password", creds.password);
        match creds.subdomain {
            Some(subdomain) => params.insert("subdomain", subdomain),
            None => params,
        }
    }
}

/// Password grant for sign-in, refresh-token grant for refresh.
#[derive(Clone, Debug)]
pub struct OAuthStrategy {
    credentials: ClientCredentials,
}

impl OAuthStrategy {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            credentials: ClientCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            },
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| Error::Config("OAuth strategy requires client_id".to_string()))?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| Error::Config("OAuth strategy requires client_secret".to_string()))?;
        Ok(Self::new(client_id, client_secret))
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub(crate) fn sign_in_request(&self, params: AuthParams) -> TokenRequest {
        let mut body = Map::new();
        body.insert("grantType".into(), json!("password"));
        body.extend(params.into_map());
        self.append_client_credentials(&mut body);
        TokenRequest {
            body: Value::Object(body),
            bearer: None,
        }
    }

    pub(crate) async fn refresh_request(
        &self,
        store: &dyn CredentialStore,
    ) -> Result<TokenRequest, Error> {
        let context = RequestDescriptor::post(OAUTH_AUTH_URL);
        let refresh_token = store
            .get_tokens(&context)
            .await?
            .and_then(|tokens| tokens.refresh_token)
            .ok_or_else(|| {
                debug!("no refresh token stored; cannot refresh");
                Error::MissingRefreshToken
            })?;

        let mut body = Map::new();
        body.insert("refreshToken".into(), json!(refresh_token));
        body.insert("grantType".into(), json!("refresh_token"));
        self.append_client_credentials(&mut body);
        Ok(TokenRequest {
            body: Value::Object(body),
            bearer: None,
        })
    }

    fn append_client_credentials(&self, body: &mut Map<String, Value>) {
        body.insert("clientId".into(), json!(self.credentials.client_id));
        body.insert("clientSecret".into(), json!(self.credentials.client_secret));
    }
}
