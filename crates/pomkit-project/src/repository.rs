use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Java system properties (`-Dkey=value`) visible to Maven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemProperties(BTreeMap<String, String>);

impl SystemProperties {
    /// Reads `-D` definitions from `MAVEN_OPTS` and `JAVA_TOOL_OPTIONS`.
    pub fn from_env() -> Self {
        let mut props = Self::default();
        for var in ["JAVA_TOOL_OPTIONS", "MAVEN_OPTS"] {
            if let Ok(value) = std::env::var(var) {
                props.extend_from_options(&value);
            }
        }
        props
    }

    /// Adds every `-Dkey=value` (or bare `-Dkey`) found in a JVM option string.
    pub fn extend_from_options(&mut self, options: &str) {
        for option in options.split_whitespace() {
            let Some(definition) = option.strip_prefix("-D") else {
                continue;
            };
            let (key, value) = definition.split_once('=').unwrap_or((definition, "true"));
            if key.is_empty() {
                continue;
            }
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// The parts of the process environment that decide where Maven keeps its
/// local repository.
#[derive(Debug, Clone, Default)]
pub struct MavenEnvironment {
    pub m2_repo: Option<PathBuf>,
    pub system_properties: SystemProperties,
    pub home: Option<PathBuf>,
}

impl MavenEnvironment {
    pub fn from_env() -> Self {
        Self {
            m2_repo: std::env::var_os("M2_REPO")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            system_properties: SystemProperties::from_env(),
            home: std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Local repository in precedence order: `explicit`, `M2_REPO`, the
    /// `maven.repo.local` system property, then `~/.m2/repository`.
    pub fn local_repository(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.m2_repo.clone())
            .or_else(|| {
                self.system_properties
                    .get("maven.repo.local")
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| self.home.as_ref().map(|home| home.join(".m2").join("repository")))
    }
}

/// Repository-relative path of an artifact file, using `/` separators.
pub fn artifact_path(
    group_id: &str,
    artifact_id: &str,
    version: &str,
    classifier: Option<&str>,
    extension: &str,
) -> String {
    let group_path = group_id.replace('.', "/");
    let file_name = match classifier {
        Some(classifier) => format!("{artifact_id}-{version}-{classifier}.{extension}"),
        None => format!("{artifact_id}-{version}.{extension}"),
    };
    format!("{group_path}/{artifact_id}/{version}/{file_name}")
}

pub fn pom_path(repo: &Path, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
    let relative = artifact_path(group_id, artifact_id, version, None, "pom");
    relative
        .split('/')
        .fold(repo.to_path_buf(), |path, segment| path.join(segment))
}
