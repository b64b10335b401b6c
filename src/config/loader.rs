//! Configuration loading: TOML file, then environment overrides, then validation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::config::config::AppConfig;

pub const CONFIG_PATH_ENV: &str = "POSTURE_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "posture_config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// find_config_file locates the config file, if any.
///
/// Search order:
/// 1. `POSTURE_CONFIG_PATH` environment variable
/// 2. `./posture_config.toml`
///
/// A path named by the environment variable is returned even if it does not
/// exist, so that a typo surfaces as a read error instead of silent defaults.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(env_path))
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local)
    }
    None
}

/// parse_config parses TOML text; absent fields take their defaults.
pub fn parse_config(content: &str) -> ConfigResult<AppConfig> {
    Ok(toml::from_str(content)?)
}

/// ConfigOverrides are values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_endpoint: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.to_owned();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(endpoint) = &self.model_endpoint {
            config.pose_model.endpoint = endpoint.to_owned();
        }
    }
}

/// read_config reads the config file, or returns defaults when there is none.
///
/// # Arguments
/// * `config_path` - explicit config file; when `None` the file is searched for
///
/// # Returns
/// * `ConfigResult<AppConfig>` - unvalidated file contents
pub fn read_config(config_path: Option<&Path>) -> ConfigResult<AppConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    match config_file {
        Some(path) => {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io { path: path.clone(), source })?;
            parse_config(&content)
        }
        None => Ok(AppConfig::default()),
    }
}

/// load_config builds the effective configuration.
///
/// Layers are applied in order: file, environment, command line. Validation
/// runs once on the merged result.
///
/// # Arguments
/// * `config_path` - explicit config file; when `None` the file is searched for
///   and built-in defaults are used if none is found
/// * `overrides` - command line values
///
/// # Returns
/// * `ConfigResult<AppConfig>` - validated config
pub fn load_config(config_path: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<AppConfig> {
    resolve_config(read_config(config_path)?, |key| env::var(key).ok(), overrides)
}

/// resolve_config layers environment and command line values over `config` and validates it.
pub fn resolve_config<F>(mut config: AppConfig, lookup: F, overrides: &ConfigOverrides) -> ConfigResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    apply_environment_overrides(&mut config, lookup)?;
    overrides.apply(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// apply_environment_overrides applies runtime overrides looked up through `lookup`.
///
/// Supported variables:
/// - `POSTURE_HOST` -> `server.host`
/// - `POSTURE_PORT` -> `server.port`
/// - `POSTURE_MODEL_ENDPOINT` -> `pose_model.endpoint`
/// - `POSTURE_MODEL_NAME` -> `pose_model.model_name`
/// - `POSTURE_LOG_FILTER` -> `logging.filter`
///
/// An unparsable `POSTURE_PORT` is an error rather than a silent fallback.
pub fn apply_environment_overrides<F>(config: &mut AppConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("POSTURE_HOST") {
        config.server.host = value;
    }
    if let Some(value) = lookup("POSTURE_PORT") {
        config.server.port = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("POSTURE_PORT is not a valid port: {:?}", value)))?;
    }
    if let Some(value) = lookup("POSTURE_MODEL_ENDPOINT") {
        config.pose_model.endpoint = value;
    }
    if let Some(value) = lookup("POSTURE_MODEL_NAME") {
        config.pose_model.model_name = value;
    }
    if let Some(value) = lookup("POSTURE_LOG_FILTER") {
        config.logging.filter = value;
    }
    Ok(())
}

pub fn validate_config(config: &AppConfig) -> ConfigResult<()> {
    let invalid = |message: &str| Err(ConfigError::Invalid(message.to_string()));

    if config.server.port == 0 {
        return invalid("server.port must be non-zero");
    }
    if config.server.request_timeout_ms == 0 {
        return invalid("server.request_timeout_ms must be greater than 0");
    }

    let model = &config.pose_model;
    if model.endpoint.trim().is_empty() {
        return invalid("pose_model.endpoint must not be empty");
    }
    if model.model_name.trim().is_empty() {
        return invalid("pose_model.model_name must not be empty");
    }
    if model.landmarks_output.trim().is_empty() {
        return invalid("pose_model.landmarks_output must not be empty");
    }
    if model.timeout_ms == 0 {
        return invalid("pose_model.timeout_ms must be greater than 0");
    }
    if model.values_per_landmark < 3 {
        return invalid("pose_model.values_per_landmark must be at least 3 (x, y, z)");
    }
    if !(0.0..=1.0).contains(&model.presence_threshold) {
        return invalid("pose_model.presence_threshold must be within [0, 1]");
    }
    if !model.scale.is_finite() || model.scale <= 0.0 {
        return invalid("pose_model.scale must be a positive finite number");
    }
    if !model.mean.is_finite() {
        return invalid("pose_model.mean must be finite");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use crate::config::config::AppConfig;
    use crate::config::loader::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.pose_model.values_per_landmark, 5);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 8080

            [pose_model]
            model_name = "blazepose_full"
            presence_is_logit = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.pose_model.model_name, "blazepose_full");
        assert!(config.pose_model.presence_is_logit);
        assert_eq!(config.pose_model.landmarks_output, "Identity");
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        assert!(matches!(parse_config("[server\nport = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("POSTURE_PORT", "7000"),
            ("POSTURE_MODEL_ENDPOINT", "http://triton:8001"),
            ("POSTURE_LOG_FILTER", "warn"),
        ]);
        let mut config = AppConfig::default();
        apply_environment_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.pose_model.endpoint, "http://triton:8001");
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_port_variable_is_rejected() {
        let mut config = AppConfig::default();
        let result = apply_environment_overrides(&mut config, |key| (key == "POSTURE_PORT").then(|| "50OO".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("POSTURE_PORT")));
    }

    #[test]
    fn test_command_line_overrides_win_before_validation() {
        let file_config = parse_config("[server]\nport = 0\nhost = \"10.0.0.1\"").unwrap();
        let overrides = ConfigOverrides {
            port: Some(8080),
            ..Default::default()
        };

        let config = resolve_config(file_config.clone(), |_| None, &overrides).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "10.0.0.1");

        let result = resolve_config(file_config, |_| None, &ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_command_line_beats_environment() {
        let overrides = ConfigOverrides {
            host: Some("127.0.0.1".to_string()),
            model_endpoint: Some("http://cli:8001".to_string()),
            ..Default::default()
        };
        let config = resolve_config(
            AppConfig::default(),
            |key| match key {
                "POSTURE_HOST" => Some("192.168.1.10".to_string()),
                "POSTURE_MODEL_ENDPOINT" => Some("http://env:8001".to_string()),
                "POSTURE_PORT" => Some("6000".to_string()),
                _ => None,
            },
            &overrides,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.pose_model.endpoint, "http://cli:8001");
        assert_eq!(config.server.port, 6000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.pose_model.presence_threshold = 1.5;
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.pose_model.values_per_landmark = 2;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.server.request_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_read_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\njson = true\n[server]\nrequest_timeout_ms = 2500").unwrap();

        let config = read_config(Some(file.path())).unwrap();
        assert!(config.logging.json);
        assert_eq!(config.server.request_timeout_ms, 2500);

        let config = resolve_config(config, |_| None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.server.request_timeout_ms, 2500);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(
            Some(std::path::Path::new("/nonexistent/posture_config.toml")),
            &ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
