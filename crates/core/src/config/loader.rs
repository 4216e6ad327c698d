use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "LABFLOW_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Resolve the configuration file path from `LABFLOW_CONFIG`, defaulting to `config.toml`.
pub fn config_path_from_env() -> PathBuf {
    resolve_config_path(std::env::var(CONFIG_PATH_ENV).ok())
}

fn resolve_config_path(value: Option<String>) -> PathBuf {
    match value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

/// Load configuration from file with `LABFLOW_*` environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("LABFLOW_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[auth]
method = "header"

[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_config_from_str_missing_auth() {
        let toml = r#"
[server]
port = 8080
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(resolve_config_path(None), PathBuf::from("config.toml"));
        assert_eq!(
            resolve_config_path(Some("  ".to_string())),
            PathBuf::from("config.toml")
        );
        assert_eq!(
            resolve_config_path(Some("/etc/labflow.toml".to_string())),
            PathBuf::from("/etc/labflow.toml")
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[auth]
method = "header"

[server]
host = "127.0.0.1"
port = 3000

[storage]
backend = "fs"

[storage.fs]
root = "/var/lib/labflow/objects"

[export]
fetch_concurrency = 8
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.export.fetch_concurrency, 8);
        assert_eq!(
            config.storage.fs.unwrap().root.to_str().unwrap(),
            "/var/lib/labflow/objects"
        );
    }
}
