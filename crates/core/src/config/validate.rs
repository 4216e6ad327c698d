use rust_decimal::Decimal;

use super::{types::Config, AuthMethod, ConfigError, StorageBackend};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - API key auth has at least one non-empty key
/// - Server port is not 0
/// - The selected storage backend has its section
/// - Export fetch concurrency is at least 1
/// - Commission rate is within [0, 1]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.auth.method == AuthMethod::ApiKey {
        if config.auth.api_keys.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.api_keys must not be empty when auth.method = \"api_key\"".to_string(),
            ));
        }
        if config.auth.api_keys.iter().any(|k| k.key.is_empty()) {
            return Err(ConfigError::ValidationError(
                "auth.api_keys entries must have a non-empty key".to_string(),
            ));
        }
    }

    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    match config.storage.backend {
        StorageBackend::Fs if config.storage.fs.is_none() => {
            return Err(ConfigError::ValidationError(
                "storage.fs is required when storage.backend = \"fs\"".to_string(),
            ));
        }
        StorageBackend::Http => match &config.storage.http {
            None => {
                return Err(ConfigError::ValidationError(
                    "storage.http is required when storage.backend = \"http\"".to_string(),
                ));
            }
            Some(http) if http.base_url.trim().is_empty() => {
                return Err(ConfigError::ValidationError(
                    "storage.http.base_url cannot be empty".to_string(),
                ));
            }
            Some(_) => {}
        },
        StorageBackend::Fs => {}
    }

    if config.export.fetch_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "export.fetch_concurrency cannot be 0".to_string(),
        ));
    }

    let rate = config.pricing.commission_rate;
    if rate.is_sign_negative() || rate > Decimal::ONE {
        return Err(ConfigError::ValidationError(format!(
            "pricing.commission_rate must be between 0 and 1, got {}",
            rate
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config(toml: &str) -> Config {
        load_config_from_str(toml).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = config(
            r#"
[auth]
method = "header"
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = config(
            r#"
[auth]
method = "header"

[server]
port = 0
"#,
        );
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_api_key_without_keys_fails() {
        let config = config(
            r#"
[auth]
method = "api_key"
"#,
        );
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_http_backend_requires_section() {
        let config = config(
            r#"
[auth]
method = "header"

[storage]
backend = "http"
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("storage.http"));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let config = config(
            r#"
[auth]
method = "header"

[export]
fetch_concurrency = 0
"#,
        );
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_commission_out_of_range_fails() {
        let config = config(
            r#"
[auth]
method = "header"

[pricing]
commission_rate = "1.5"
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("commission_rate"));
    }
}
