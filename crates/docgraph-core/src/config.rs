use crate::OnError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name looked up by [`ConfigManager::load`].
pub const CONFIG_FILE_NAME: &str = ".docgraph.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for docgraph
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocGraphConfig {
    /// Full generation settings
    #[serde(default)]
    pub generate: GenerateConfig,

    /// Test file generation; absent means test files are not documented
    #[serde(default)]
    pub test: Option<TestConfig>,

    /// Incremental regeneration settings
    #[serde(default)]
    pub regenerate: RegenerateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Project root; relative paths and include/exclude globs are computed against it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_includes")]
    pub includes: Vec<String>,

    #[serde(default)]
    pub excludes: Vec<String>,

    #[serde(default = "default_generate_on_error")]
    pub on_error: OnError,

    /// Keep raw source on admitted records
    #[serde(default = "default_true")]
    pub include_source: bool,

    /// Keep the AST back-reference on admitted records
    #[serde(default)]
    pub keep_ast: bool,

    /// Package name used to build import paths
    #[serde(default)]
    pub package_name: Option<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            includes: default_includes(),
            excludes: Vec::new(),
            on_error: default_generate_on_error(),
            include_source: true,
            keep_ast: false,
            package_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestConfig {
    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(default)]
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateConfig {
    #[serde(default = "default_regenerate_on_error")]
    pub on_error: OnError,

    /// Also rebuild files registered as dependents of the changed file
    #[serde(default = "default_true")]
    pub propagate_dependents: bool,

    /// Re-run the resolver over the replaced files
    #[serde(default = "default_true")]
    pub resolve: bool,
}

impl Default for RegenerateConfig {
    fn default() -> Self {
        Self {
            on_error: default_regenerate_on_error(),
            propagate_dependents: true,
            resolve: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error", or an EnvFilter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_includes() -> Vec<String> {
    vec!["**/*.js".to_string()]
}

fn default_generate_on_error() -> OnError {
    OnError::Log
}

fn default_regenerate_on_error() -> OnError {
    OnError::Throw
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Loads, overrides and validates [`DocGraphConfig`].
pub struct ConfigManager {
    config: DocGraphConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from `dir` with the following precedence:
    /// 1. Environment variables
    /// 2. `<dir>/.docgraph.toml`
    /// 3. Defaults
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        let (config, config_path) = if candidate.exists() {
            (Self::read_toml_file(&candidate)?, Some(candidate))
        } else {
            debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
            (DocGraphConfig::default(), None)
        };
        Self::finish(config, config_path)
    }

    /// Load an explicit config file. A missing file is an error here.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    /// Parse and validate TOML text without consulting the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DocGraphConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    fn finish(config: DocGraphConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;
        Self::validate_config(&config)?;

        info!(
            config = %config_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".to_string()),
            on_error = ?config.generate.on_error,
            regenerate_on_error = ?config.regenerate.on_error,
            "Configuration loaded"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    fn read_toml_file(path: &Path) -> Result<DocGraphConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides<F>(
        mut config: DocGraphConfig,
        lookup: F,
    ) -> Result<DocGraphConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("DOCGRAPH_ON_ERROR") {
            config.generate.on_error = policy
                .parse()
                .map_err(|e: String| ConfigError::ValidationError(e))?;
        }
        if let Some(policy) = lookup("DOCGRAPH_REGENERATE_ON_ERROR") {
            config.regenerate.on_error = policy
                .parse()
                .map_err(|e: String| ConfigError::ValidationError(e))?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            config.logging.level = level;
        }
        Ok(config)
    }

    pub fn validate_config(config: &DocGraphConfig) -> Result<(), ConfigError> {
        if config.generate.includes.is_empty() {
            return Err(ConfigError::ValidationError(
                "generate.includes must name at least one pattern".to_string(),
            ));
        }

        if let Some(name) = &config.generate.package_name {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid package name: {:?}",
                    name
                )));
            }
        }

        // RUST_LOG may carry a full directive such as "docgraph_store=debug"
        let level = config.logging.level.as_str();
        if !level.contains('=') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &DocGraphConfig {
        &self.config
    }

    pub fn into_config(self) -> DocGraphConfig {
        self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Write the default configuration to `path`
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = DocGraphConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
