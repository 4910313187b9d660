//! Where bearer and refresh tokens live between requests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::Error;
use crate::types::{RequestDescriptor, Tokens};

/// Single source of truth for tokens. The dispatcher reads it before every
/// request and writes it after every successful authentication.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// `context` is the request about to be decorated.
    async fn get_tokens(&self, context: &RequestDescriptor) -> Result<Option<Tokens>, Error>;

    async fn set_tokens(&self, tokens: Tokens) -> Result<(), Error>;
}

/// Keeps tokens in process memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<Option<Tokens>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }

    pub async fn snapshot(&self) -> Option<Tokens> {
        self.tokens.read().await.clone()
    }

    pub async fn clear(&self) {
        self.tokens.write().await.take();
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_tokens(&self, _context: &RequestDescriptor) -> Result<Option<Tokens>, Error> {
        Ok(self.tokens.read().await.clone())
    }

    async fn set_tokens(&self, tokens: Tokens) -> Result<(), Error> {
        *self.tokens.write().await = Some(tokens);
        Ok(())
    }
}
