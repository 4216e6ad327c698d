mod api_key;
mod header;
mod traits;
mod types;

pub use api_key::*;
pub use header::*;
pub use traits::*;
pub use types::*;

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::Header => Ok(Box::new(HeaderAuthenticator::new())),
        AuthMethod::ApiKey => {
            if config.api_keys.is_empty() {
                return Err(AuthError::Misconfigured(
                    "api_keys must be set when using ApiKey auth method".to_string(),
                ));
            }
            Ok(Box::new(ApiKeyAuthenticator::new(config.api_keys.clone())))
        }
    }
}
