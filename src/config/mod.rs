pub mod config;
pub mod loader;

pub use config::{AppConfig, LoggingConfig, PoseModelConfig, ServerConfig};
pub use loader::{ConfigError, ConfigOverrides, ConfigResult, load_config};
