/// Remote module
///
/// The two RPCs of the order service, behind traits so the token lifecycle
/// and the orchestrator can run against fakes.
pub mod login;
pub mod order;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::auth::token::{Credential, Token};
use crate::errors::AuthError;
use crate::orders::outcome::FetchOutcome;

/// Exchanges the credential for a raw token value.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: &Credential) -> Result<String, AuthError>;
}

/// Looks up one order. Never fails as a whole: every problem is classified
/// into the returned outcome.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn fetch_one(&self, order_id: &str, token: &Token) -> FetchOutcome;
}

/// Shared reqwest client; the timeout bounds every single request.
pub fn build_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(request_timeout).build()
}
