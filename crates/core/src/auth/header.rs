//! Gateway header authentication.

use async_trait::async_trait;

use super::{ActorRole, AuthError, AuthRequest, Authenticator, Identity};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const CLINIC_ID_HEADER: &str = "x-clinic-id";

/// Authenticator trusting identity headers set by an upstream gateway.
///
/// The gateway terminates sessions and forwards:
/// - `X-User-Id: <id>`
/// - `X-User-Role: customer | lab | milling | admin`
/// - `X-Clinic-Id: <id>` (optional)
///
/// Only deploy behind a proxy that strips these headers from client input.
pub struct HeaderAuthenticator;

impl HeaderAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeaderAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty<'a>(request: &'a AuthRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl Authenticator for HeaderAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let user_id = non_empty(request, USER_ID_HEADER).ok_or(AuthError::NotAuthenticated)?;
        let role = non_empty(request, USER_ROLE_HEADER)
            .ok_or(AuthError::NotAuthenticated)?
            .parse::<ActorRole>()
            .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;

        Ok(Identity {
            user_id: user_id.to_string(),
            role,
            clinic_id: non_empty(request, CLINIC_ID_HEADER).map(str::to_string),
            method: "header".to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "header"
    }
}
