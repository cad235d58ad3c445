use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProjectError;

/// A Maven dependency coordinate.
///
/// Two dependencies refer to the same artifact when their `group_id` and
/// `artifact_id` match; see [`Dependency::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub packaging: String,
    pub scope: String,
}

impl Dependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            classifier: None,
            packaging: "jar".to_string(),
            scope: "compile".to_string(),
        }
    }

    pub fn with_packaging(mut self, packaging: impl Into<String>) -> Self {
        self.packaging = packaging.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id && self.artifact_id == artifact_id
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.packaging)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

impl FromStr for Dependency {
    type Err = ProjectError;

    /// Accepts `g:a:v`, `g:a:packaging:v`, `g:a:packaging:classifier:v` and
    /// `g:a:packaging:classifier:v:scope`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ProjectError::InvalidCoordinate {
            value: value.to_string(),
            reason,
        };

        let parts: Vec<&str> = value.trim().split(':').map(str::trim).collect();
        if parts.len() < 3 {
            return Err(invalid("expected at least groupId:artifactId:version"));
        }
        if parts.len() > 6 {
            return Err(invalid("too many segments"));
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(invalid("groupId and artifactId must not be empty"));
        }

        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let mut dependency = Dependency::new(parts[0], parts[1], None);
        match parts.len() {
            3 => dependency.version = non_empty(parts[2]),
            4 => {
                dependency.packaging = parts[2].to_string();
                dependency.version = non_empty(parts[3]);
            }
            _ => {
                dependency.packaging = parts[2].to_string();
                dependency.classifier = non_empty(parts[3]);
                dependency.version = non_empty(parts[4]);
                if let Some(scope) = parts.get(5).and_then(|s| non_empty(s)) {
                    dependency.scope = scope;
                }
            }
        }
        if dependency.packaging.is_empty() {
            dependency.packaging = "jar".to_string();
        }
        Ok(dependency)
    }
}
