//! Token access capability
//!
//! Environment-scoped plugin calls (provision, deploy, publish) receive a
//! token provider from the host. The engine never acquires tokens itself.

use crate::error::CoreError;
use async_trait::async_trait;

/// Supplies access tokens for cloud-facing plugin calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Access token for the given audience
    async fn access_token(&self, audience: &str) -> Result<String, CoreError>;
}

/// Token provider for flows that never reach a cloud API (tests, local-only
/// environments)
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousTokenProvider;

#[async_trait]
impl TokenProvider for AnonymousTokenProvider {
    async fn access_token(&self, _audience: &str) -> Result<String, CoreError> {
        Ok(String::new())
    }
}
