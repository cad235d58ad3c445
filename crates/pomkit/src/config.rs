//! TOML configuration for the ambient parts of pomkit: logging, the Maven
//! installation used by query strategies and the remote repository.
//!
//! ```toml
//! [logging]
//! level = "pomkit=debug"
//!
//! [maven]
//! timeout_secs = 300
//! offline = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use pomkit_build::{MavenConfig, MAVEN_CENTRAL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` quotes the offending source line.
        ConfigError::Toml(err.message().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PomkitConfig {
    pub logging: LoggingConfig,
    pub maven: MavenSettings,
    pub query: QuerySettings,
}

impl PomkitConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MavenSettings {
    /// Path or bare name of the Maven executable.
    pub executable: Option<PathBuf>,
    pub prefer_wrapper: bool,
    /// Wall-clock limit for each Maven run; unset or `0` means no limit.
    pub timeout_secs: Option<u64>,
    /// Local repository used when a request does not name one.
    pub local_repository: Option<PathBuf>,
    /// Force offline queries regardless of the request.
    pub offline: bool,
}

impl Default for MavenSettings {
    fn default() -> Self {
        Self {
            executable: None,
            prefer_wrapper: true,
            timeout_secs: None,
            local_repository: None,
            offline: false,
        }
    }
}

impl MavenSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn to_maven_config(&self) -> MavenConfig {
        MavenConfig {
            executable: self.executable.clone(),
            prefer_wrapper: self.prefer_wrapper,
            timeout: self.timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySettings {
    /// Maven 2 layout repository that missing POMs are downloaded from.
    pub remote_repository: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            remote_repository: MAVEN_CENTRAL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = PomkitConfig::from_toml_str("").unwrap();
        assert_eq!(config, PomkitConfig::default());
        assert_eq!(config.query.remote_repository, MAVEN_CENTRAL);
        assert!(config.maven.prefer_wrapper);
        assert_eq!(config.maven.timeout(), None);
    }

    #[test]
    fn parses_all_sections() {
        let config = PomkitConfig::from_toml_str(
            r#"
[logging]
level = "Warning"
json = true

[maven]
executable = "/opt/maven/bin/mvn"
prefer_wrapper = false
timeout_secs = 90
local_repository = "/cache/m2"
offline = true

[query]
remote_repository = "https://mirror.example/maven2"
"#,
        )
        .unwrap();
        assert!(config.logging.json);
        assert_eq!(
            LoggingConfig::normalize_level_directives(&config.logging.level),
            "warn"
        );
        let maven = config.maven.to_maven_config();
        assert_eq!(maven.executable, Some(PathBuf::from("/opt/maven/bin/mvn")));
        assert!(!maven.prefer_wrapper);
        assert_eq!(maven.timeout, Some(Duration::from_secs(90)));
        assert!(config.maven.offline);
        assert_eq!(config.query.remote_repository, "https://mirror.example/maven2");
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config = PomkitConfig::from_toml_str("[maven]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.maven.timeout(), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PomkitConfig::from_toml_str("[maven]\nexecutible = \"mvn\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = PomkitConfig::load(tmp.path().join("pomkit.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
