//! API Key authentication.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::config::ApiKeyEntry;

/// Authenticator that maps configured API keys to identities.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
pub struct ApiKeyAuthenticator {
    keys: Vec<ApiKeyEntry>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: Vec<ApiKeyEntry>) -> Self {
        Self { keys }
    }

    /// Extract API key from request headers.
    /// Checks Authorization: Bearer and X-API-Key headers.
    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(auth_header) = request.headers.get("authorization") {
            if let Some(key) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        request.headers.get("x-api-key").map(String::as_str)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        // Compare against every entry so the match position doesn't leak through timing
        let mut matched: Option<&ApiKeyEntry> = None;
        for entry in &self.keys {
            if constant_time_eq(provided_key.as_bytes(), entry.key.as_bytes()) && matched.is_none() {
                matched = Some(entry);
            }
        }

        match matched {
            Some(entry) => Ok(Identity {
                user_id: entry.user_id.clone(),
                role: entry.role,
                clinic_id: entry.clinic_id.clone(),
                method: "api_key".to_string(),
            }),
            None => Err(AuthError::InvalidCredentials("Invalid API key".to_string())),
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ActorRole;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    fn authenticator() -> ApiKeyAuthenticator {
        ApiKeyAuthenticator::new(vec![
            ApiKeyEntry {
                key: "mill-key".to_string(),
                user_id: "mill-1".to_string(),
                role: ActorRole::Milling,
                clinic_id: None,
            },
            ApiKeyEntry {
                key: "doc-key".to_string(),
                user_id: "doctor-1".to_string(),
                role: ActorRole::Customer,
                clinic_id: Some("clinic-1".to_string()),
            },
        ])
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let request = make_request(vec![("Authorization", "Bearer mill-key")]);

        let identity = authenticator().authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "mill-1");
        assert_eq!(identity.role, ActorRole::Milling);
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_x_api_key_header_valid() {
        let request = make_request(vec![("X-API-Key", "doc-key")]);

        let identity = authenticator().authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "doctor-1");
        assert_eq!(identity.clinic_id.as_deref(), Some("clinic-1"));
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let request = make_request(vec![("Authorization", "Bearer wrong-key")]);

        let result = authenticator().authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let result = authenticator().authenticate(&make_request(vec![])).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_bearer_lowercase() {
        let request = make_request(vec![("Authorization", "bearer mill-key")]);

        let identity = authenticator().authenticate(&request).await.unwrap();
        assert_eq!(identity.user_id, "mill-1");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"", b"x"));
        assert!(constant_time_eq(b"", b""));
    }
}
