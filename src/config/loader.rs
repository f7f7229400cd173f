//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery,
//! environment detection and layering of file and environment sources.

use super::error::{ConfigResult, ConfigurationError};
use super::OpsDeskConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "opsdesk";
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: OpsDeskConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let mut builder = Config::builder().add_source(Config::try_from(&OpsDeskConfig::default())?);

        let base_file = config_directory.join(format!("{CONFIG_FILE_STEM}.toml"));
        let env_file = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.toml"));
        for path in [&base_file, &env_file] {
            if let Some(contents) = Self::read_config_file_safely(path)? {
                debug!(file = %path.display(), "Applying configuration file");
                builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
            }
        }

        let config: OpsDeskConfig = builder
            .add_source(
                Environment::with_prefix("OPSDESK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override("environment", environment)?
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!(
            environment = environment,
            database_url = %Self::sanitize_database_url(&config.database.url),
            queue = %config.queue.name,
            worker_concurrency = config.worker.concurrency,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &OpsDeskConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the deployment environment from the process environment
    pub fn detect_environment() -> String {
        env::var("OPSDESK_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("OPSDESK_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    /// Read an optional configuration file; a missing file is not an error
    fn read_config_file_safely(path: &Path) -> ConfigResult<Option<String>> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigurationError::file_read_error(
                    path.display().to_string(),
                    e,
                ))
            }
        };

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                path.display().to_string(),
                "configuration path must point to a regular file",
            ));
        }

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                "configuration file exceeds 1MB",
            ));
        }

        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    /// Mask the password component of a connection URL for logging
    pub fn sanitize_database_url(url: &str) -> String {
        let Some((scheme, rest)) = url.split_once("://") else {
            return url.to_string();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return url.to_string();
        };
        match credentials.split_once(':') {
            Some((user, _password)) => format!("{scheme}://{user}:***@{host}"),
            None => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_defaults_when_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().environment, "test");
        assert_eq!(manager.config().queue.name, "process_change");
        assert_eq!(manager.config().worker.concurrency, 1);
    }

    #[test]
    fn test_environment_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "opsdesk.toml",
            "[worker]\nconcurrency = 2\n\n[queue]\nbatch_size = 5\n",
        );
        write_file(dir.path(), "opsdesk.staging.toml", "[worker]\nconcurrency = 8\n");

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging")
                .unwrap();

        assert_eq!(manager.config().worker.concurrency, 8);
        assert_eq!(manager.config().queue.batch_size, 5);
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "opsdesk.toml", "[worker]\nconcurrency = 0\n");

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");

        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "worker.concurrency"
        ));
    }

    #[test]
    fn test_sanitize_database_url_masks_password() {
        assert_eq!(
            ConfigManager::sanitize_database_url("postgresql://ops:secret@db:5432/opsdesk"),
            "postgresql://ops:***@db:5432/opsdesk"
        );
        assert_eq!(
            ConfigManager::sanitize_database_url("postgresql://db/opsdesk"),
            "postgresql://db/opsdesk"
        );
    }
}
