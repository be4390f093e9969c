//! Converter configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! the stock behavior:
//!
//! ```toml
//! match_timeout_ms = 250
//! literal_placeholder = "STR_{n}"
//! subquery_placeholder = "(SUB_{n})"
//! error_marker = "[PARAMERROR]"
//!
//! [messages]
//! timeout = "Validation timed out."
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConvertError, ConvertResult};
use crate::messages::{DefaultCatalog, MessageKey};

/// File name looked up in the working directory by [`ConverterConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "dml-preview.toml";

/// Main converter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Budget for each bounded pattern match, in milliseconds
    pub match_timeout_ms: u64,

    /// Token for a held string literal; `{n}` is the 1-based sequence number
    pub literal_placeholder: String,

    /// Token for a held subquery; `{n}` is the 1-based sequence number
    pub subquery_placeholder: String,

    /// Token for a nested subquery that was already split out for validation
    pub resolved_placeholder: String,

    /// Prefix put in front of each offending predicate in a failed record
    pub error_marker: String,

    /// Name of the entity-id function the identifier is injected into
    pub entity_function: String,

    /// Bare token replaced by the entity-id call
    pub entity_token: String,

    /// Staging-table prefix removed from generated SQL
    pub temp_prefix: String,

    pub terminator: char,

    /// Characters that reject the whole batch
    pub disallowed_quotes: Vec<char>,

    /// Message template overrides, keyed by message key (`timeout`, `delete-invalid`, ...)
    pub messages: HashMap<String, String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            match_timeout_ms: 250,
            literal_placeholder: "STR_{n}".to_string(),
            subquery_placeholder: "(SUB_{n})".to_string(),
            resolved_placeholder: "(SUB_RESOLVED)".to_string(),
            error_marker: "[PARAMERROR]".to_string(),
            entity_function: "toentityid".to_string(),
            entity_token: ":entityid".to_string(),
            temp_prefix: "tmp_".to_string(),
            terminator: ';',
            disallowed_quotes: vec!['’'],
            messages: HashMap::new(),
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration builder
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> ConvertResult<Self> {
        let config: ConverterConfig =
            toml::from_str(content).map_err(|e| ConvertError::config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> ConvertResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `./dml-preview.toml`, then `<config dir>/dml-preview/config.toml`,
    /// falling back to defaults when neither exists.
    pub fn discover() -> ConvertResult<Self> {
        for path in Self::search_paths() {
            if path.is_file() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dml-preview").join("config.toml"));
        }
        paths
    }

    pub fn match_timeout(&self) -> Duration {
        Duration::from_millis(self.match_timeout_ms)
    }

    /// Message catalog with this configuration's overrides applied.
    pub fn catalog(&self) -> ConvertResult<DefaultCatalog> {
        let mut overrides = HashMap::new();
        for (key, template) in &self.messages {
            let key: MessageKey = key.parse().map_err(ConvertError::config)?;
            overrides.insert(key, template.clone());
        }
        Ok(DefaultCatalog::with_overrides(overrides))
    }

    /// Reject values the pipeline cannot work with.
    pub fn check(&self) -> ConvertResult<()> {
        for (name, format) in [
            ("literal_placeholder", &self.literal_placeholder),
            ("subquery_placeholder", &self.subquery_placeholder),
        ] {
            if !format.contains("{n}") {
                return Err(ConvertError::config(format!(
                    "{} must contain '{{n}}': '{}'",
                    name, format
                )));
            }
        }
        if self.literal_placeholder.contains('\'') {
            return Err(ConvertError::config(
                "literal_placeholder must not contain a single quote",
            ));
        }
        for (name, value) in [
            ("resolved_placeholder", &self.resolved_placeholder),
            ("entity_function", &self.entity_function),
            ("entity_token", &self.entity_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConvertError::config(format!("{} must not be empty", name)));
            }
        }
        self.catalog()?;
        Ok(())
    }
}

/// Builder for ConverterConfig
#[derive(Debug, Default)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    /// Set the match budget
    pub fn match_timeout(mut self, timeout: Duration) -> Self {
        self.config.match_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the error marker
    pub fn error_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.error_marker = marker.into();
        self
    }

    /// Set the entity-id function name
    pub fn entity_function(mut self, name: impl Into<String>) -> Self {
        self.config.entity_function = name.into();
        self
    }

    /// Set the bare entity-id token
    pub fn entity_token(mut self, token: impl Into<String>) -> Self {
        self.config.entity_token = token.into();
        self
    }

    /// Override one message template
    pub fn message(mut self, key: MessageKey, template: impl Into<String>) -> Self {
        self.config
            .messages
            .insert(key.as_str().to_string(), template.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConvertResult<ConverterConfig> {
        self.config.check()?;
        Ok(self.config)
    }
}
