use super::types::StreamConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    ///
    /// An explicitly named file must exist; without one the standard
    /// locations are tried and may be absent.
    pub fn load_from_file(mut self, path: Option<&Path>) -> Self {
        self.config_file = path.map(Path::to_path_buf);
        self
    }

    /// Load configuration from `TXSTREAM_*` environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<StreamConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&StreamConfig::default())?);

        if let Some(config_path) = &self.config_file {
            builder = builder.add_source(File::from(config_path.as_path()).required(true));
        } else {
            // Try to load from standard locations
            builder = builder
                .add_source(File::with_name("txstream").required(false))
                .add_source(File::with_name("config/txstream").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("TXSTREAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: StreamConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate().context("Configuration rejected")?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a commented sample configuration file
pub fn write_sample_config(path: &Path) -> Result<()> {
    let body = toml::to_string_pretty(&StreamConfig::default())
        .context("Failed to serialize sample configuration")?;

    let content = format!(
        r#"# txstream configuration
#
# Every key is optional; omitted keys keep their defaults.
# Environment overrides use the TXSTREAM_ prefix, with "__" for nesting
# (e.g. TXSTREAM_RETRAIN_PERIOD=50, TXSTREAM_LOG__LEVEL=debug).
#
# seed             = fixed RNG seed for reproducible runs
# max_observations = stop after this many observations
# history_path     = CSV file used to pre-train the detector
# history_column   = column to read from history_path

{}"#,
        body
    );

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write sample configuration to {}", path.display()))?;
    Ok(())
}
