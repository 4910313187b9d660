//! Bearer-token request dispatch with single-flight token refresh.
//!
//! [`Api`] decorates every request with the access token from a
//! [`CredentialStore`], and when a request comes back `401` it parks that
//! request (and every request issued meanwhile), refreshes the tokens once
//! through the configured [`AuthStrategy`], then replays everything it parked.

mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod gate;
pub mod request_context;
pub mod strategy;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use client::{Api, ApiBuilder, AuthFailureHandler};
pub use config::{Config, ConfigLocation, read_config};
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use errors::Error;
pub use gate::{ConnectivityProbe, HttpProbe, NetworkGate};
pub use request_context::{DefaultConfigProvider, StaticDefaults};
pub use strategy::{
    AuthParams, AuthStrategy, JwtAuthContext, JwtContextProvider, JwtStrategy, OAuthStrategy,
    PasswordCredentials, SharedJwtContext,
};
pub use transport::{MockResponse, MockRule, MockTransport, ReqwestTransport, Transport};
pub use types::{ApiMethod, Outcome, Reply, RequestDefaults, RequestDescriptor, Tokens};

#[cfg(test)]
mod tests;
