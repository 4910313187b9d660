//! read configuration from a file, the environment, or AWS Secrets Manager

use std::path::Path;

use aws_config::BehaviorVersion;

use crate::errors::Error;

pub enum ConfigLocation {
    File(String),
    Env,
    Secret,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub organization_key: Option<String>,
    #[serde(default)]
    pub debug_cookie: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub network_poll_interval_ms: u64,
    #[serde(default)]
    pub propagate_errors: bool,
    #[serde(default = "default_transform_keys")]
    pub transform_keys: bool,
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_transform_keys() -> bool {
    true
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: default_timeout_ms(),
            accept: None,
            client_id: None,
            client_secret: None,
            organization_key: None,
            debug_cookie: None,
            network_poll_interval_ms: default_poll_interval_ms(),
            propagate_errors: false,
            transform_keys: default_transform_keys(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// # ENV Vars
    /// * `API_BASE_URL` - required
    /// * `API_TIMEOUT_MS`, `API_ACCEPT`, `API_CLIENT_ID`, `API_CLIENT_SECRET`,
    ///   `API_ORGANIZATION_KEY`, `API_DEBUG_COOKIE`, `API_NETWORK_POLL_INTERVAL_MS`,
    ///   `API_PROPAGATE_ERRORS`, `API_TRANSFORM_KEYS` - optional
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same variables as [`Config::from_env`], read through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::new(
            lookup("API_BASE_URL")
                .ok_or_else(|| Error::Config("Missing API_BASE_URL env var".to_string()))?,
        );
        if let Some(timeout) = parsed(&lookup, "API_TIMEOUT_MS")? {
            config.timeout_ms = timeout;
        }
        if let Some(interval) = parsed(&lookup, "API_NETWORK_POLL_INTERVAL_MS")? {
            config.network_poll_interval_ms = interval;
        }
        if let Some(propagate) = parsed(&lookup, "API_PROPAGATE_ERRORS")? {
            config.propagate_errors = propagate;
        }
        if let Some(transform) = parsed(&lookup, "API_TRANSFORM_KEYS")? {
            config.transform_keys = transform;
        }
        config.accept = lookup("API_ACCEPT");
        config.client_id = lookup("API_CLIENT_ID");
        config.client_secret = lookup("API_CLIENT_SECRET");
        config.organization_key = lookup("API_ORGANIZATION_KEY");
        config.debug_cookie = lookup("API_DEBUG_COOKIE");
        Ok(config)
    }
}

fn parsed<T, F>(lookup: &F, name: &str) -> Result<Option<T>, Error>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {name}: '{raw}'"))),
        None => Ok(None),
    }
}

pub async fn read_config(loc: ConfigLocation) -> Result<Config, Error> {
    let config = match loc {
        ConfigLocation::File(path) => Config::from_file(path)?,
        ConfigLocation::Env => Config::from_env()?,
        ConfigLocation::Secret => read_config_from_secret().await?,
    };
    Ok(config)
}

async fn read_config_from_secret() -> Result<Config, Error> {
    let secret_arn = std::env::var("API_CONFIG_SECRET_ARN")
        .map_err(|_| Error::Config("Missing API_CONFIG_SECRET_ARN env var".to_string()))?;
    let client = aws_sdk_secretsmanager::Client::new(
        &aws_config::load_defaults(BehaviorVersion::latest()).await,
    );
    let resp = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Config(format!("Failed to get secret: {}", e)))?;
    let secret = match resp.secret_string() {
        Some(s) => Ok(s),
        None => Err(Error::Config(
            "Failed to get secret string, returned None".to_string(),
        )),
    }?;
    let config: Config = serde_json::from_str(secret)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn file_config_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "base_url": "https://api.example.com", "client_id": "id" }"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.network_poll_interval_ms, 2_000);
        assert!(config.transform_keys);
        assert!(!config.propagate_errors);
        assert_eq!(config.client_id.as_deref(), Some("id"));
        assert_eq!(config.client_secret, None);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn env_config_requires_base_url() {
        let err = Config::from_lookup(vars(&[("API_CLIENT_ID", "id")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("API_BASE_URL")));
    }

    #[test]
    fn env_config_parses_overrides() {
        let config = Config::from_lookup(vars(&[
            ("API_BASE_URL", "https://api.example.com"),
            ("API_TIMEOUT_MS", "500"),
            ("API_PROPAGATE_ERRORS", "true"),
            ("API_DEBUG_COOKIE", "XDEBUG_SESSION=1"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_ms, 500);
        assert!(config.propagate_errors);
        assert_eq!(config.network_poll_interval_ms, 2_000);
        assert_eq!(config.debug_cookie.as_deref(), Some("XDEBUG_SESSION=1"));
        assert_eq!(config.client_id, None);
    }

    #[test]
    fn env_config_rejects_unparsable_numbers() {
        let err = Config::from_lookup(vars(&[
            ("API_BASE_URL", "https://api.example.com"),
            ("API_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("API_TIMEOUT_MS")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::from_file("target/does-not-exist.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
