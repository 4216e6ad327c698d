use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

/// Why a request could not be tied to an [`Identity`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credentials were presented.
    #[error("Authentication required")]
    NotAuthenticated,

    /// Credentials were presented but name no known user or role.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Authenticator misconfigured: {0}")]
    Misconfigured(String),
}

/// Resolves the caller of a request to a user, a role and optionally a clinic.
///
/// Implementations read request headers only; case ownership is checked later
/// by the lifecycle guards.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Short name used in startup logs.
    fn method_name(&self) -> &'static str;
}
