//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. CLI arguments

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Registry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub docs: Docs,
}

/// What to do when a second function claims an already registered path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the registration.
    #[default]
    Reject,
    /// Swap the new function into the old one's slot.
    Replace,
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            other => Err(Error::Config(format!(
                "Unknown duplicate policy '{other}', expected 'reject' or 'replace'"
            ))),
        }
    }
}

/// Registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Joins namespace keys into paths.
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

fn default_separator() -> String {
    "/".to_string()
}

/// Filesystem loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// File extensions (without the dot) the loader considers.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string(), "toml".to_string()]
}

/// Top-level API info for generated documentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Docs {
    #[serde(default = "default_docs_title")]
    pub title: String,
    #[serde(default = "default_docs_version")]
    pub version: String,
}

impl Default for Docs {
    fn default() -> Self {
        Self {
            title: default_docs_title(),
            version: default_docs_version(),
        }
    }
}

fn default_docs_title() -> String {
    "Functions".to_string()
}

fn default_docs_version() -> String {
    "1.0.0".to_string()
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct Loader {
    /// Environment variable prefix (e.g., "MYAPP" -> MYAPP_SEPARATOR)
    pub env_prefix: String,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            env_prefix: "FUNCSET".to_string(),
        }
    }
}

impl Loader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
        }
    }

    /// Load configuration from file, environment, and CLI arguments.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `cli_separator` - CLI override for the namespace separator
    /// * `cli_duplicates` - CLI override for the duplicate path policy
    pub fn load(
        &self,
        config_path: Option<&Path>,
        cli_separator: Option<&str>,
        cli_duplicates: Option<DuplicatePolicy>,
    ) -> crate::Result<Config> {
        // Start with file config or defaults
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config::default()
        };

        // Override with environment variables
        let prefix = &self.env_prefix;

        if let Ok(separator) = std::env::var(format!("{prefix}_SEPARATOR")) {
            config.registry.separator = separator;
        }
        if let Ok(policy) = std::env::var(format!("{prefix}_DUPLICATES")) {
            config.registry.duplicates = policy.parse()?;
        }
        if let Ok(extensions) = std::env::var(format!("{prefix}_EXTENSIONS")) {
            config.loader.extensions = extensions
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }

        // Override with CLI arguments
        if let Some(separator) = cli_separator {
            config.registry.separator = separator.to_string();
        }
        if let Some(policy) = cli_duplicates {
            config.registry.duplicates = policy;
        }

        // Validate
        if config.registry.separator.is_empty() {
            return Err(Error::Config("registry separator must not be empty".into()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.registry.separator, "/");
        assert_eq!(config.registry.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.loader.extensions, ["json", "toml"]);
        assert_eq!(config.docs.version, "1.0.0");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[registry]
separator = "."
duplicates = "replace"

[loader]
extensions = ["json"]

[docs]
title = "Billing"
"#
        )
        .unwrap();

        let loader = Loader::new("TESTFILE");
        let config = loader.load(Some(file.path()), None, None).unwrap();

        assert_eq!(config.registry.separator, ".");
        assert_eq!(config.registry.duplicates, DuplicatePolicy::Replace);
        assert_eq!(config.loader.extensions, ["json"]);
        assert_eq!(config.docs.title, "Billing");
        assert_eq!(config.docs.version, "1.0.0");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[registry]
separator = "."
"#
        )
        .unwrap();

        let loader = Loader::new("TESTCLI");
        let config = loader
            .load(Some(file.path()), Some("::"), Some(DuplicatePolicy::Replace))
            .unwrap();

        assert_eq!(config.registry.separator, "::");
        assert_eq!(config.registry.duplicates, DuplicatePolicy::Replace);
    }

    #[test]
    fn test_empty_separator_fails() {
        let loader = Loader::new("TESTEMPTY");
        let err = loader.load(None, Some(""), None).unwrap_err();
        assert!(err.to_string().contains("separator must not be empty"));
    }

    #[test]
    fn test_unreadable_file_fails() {
        let loader = Loader::new("TESTMISSING");
        let err = loader
            .load(Some(Path::new("/nonexistent/funcset.toml")), None, None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_override() {
        // SAFETY: This is test code; the prefix is unique to this test
        unsafe {
            std::env::set_var("TESTENV_SEPARATOR", "-");
            std::env::set_var("TESTENV_DUPLICATES", "Replace");
            std::env::set_var("TESTENV_EXTENSIONS", ".json, yaml");
        }

        let loader = Loader::new("TESTENV");
        let config = loader.load(None, None, None);

        // SAFETY: This is test code; the prefix is unique to this test
        unsafe {
            std::env::remove_var("TESTENV_SEPARATOR");
            std::env::remove_var("TESTENV_DUPLICATES");
            std::env::remove_var("TESTENV_EXTENSIONS");
        }

        let config = config.unwrap();
        assert_eq!(config.registry.separator, "-");
        assert_eq!(config.registry.duplicates, DuplicatePolicy::Replace);
        assert_eq!(config.loader.extensions, ["json", "yaml"]);
    }

    #[test]
    fn test_bad_policy_string() {
        let err = "sometimes".parse::<DuplicatePolicy>().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }
}
