use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::{DocumentSource, PomDocument};
use crate::raw::ProfileSelection;
use crate::{Dependency, ProjectError, Result};

/// Which dependency query strategies a request may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Not a query: the request edits documents.
    #[default]
    None,
    /// Only strategies that never execute build logic from the project.
    Safe,
    /// All strategies, including running Maven.
    Unsafe,
}

/// Which ancestor receives managed dependency entries in a multi-module edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagedTarget {
    #[default]
    Farthest,
    Nearest,
}

/// An edit or query request over a target POM and its ancestors.
#[derive(Debug, Clone)]
pub struct ProjectModel {
    /// Target first, then ancestors from nearest to farthest.
    documents: Vec<PomDocument>,
    dependency: Option<Dependency>,
    skip_if_newer: bool,
    use_properties: bool,
    active_profiles: BTreeSet<String>,
    override_if_already_exists: bool,
    query_type: QueryType,
    repository_path: Option<PathBuf>,
    offline: bool,
    managed_target: ManagedTarget,
    modified_by_command: bool,
}

impl ProjectModel {
    pub fn target(&self) -> &PomDocument {
        &self.documents[0]
    }

    pub fn target_mut(&mut self) -> &mut PomDocument {
        &mut self.documents[0]
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> &[PomDocument] {
        &self.documents[1..]
    }

    pub fn has_ancestors(&self) -> bool {
        self.documents.len() > 1
    }

    /// Target followed by its ancestors.
    pub fn all_documents(&self) -> &[PomDocument] {
        &self.documents
    }

    pub fn all_documents_mut(&mut self) -> &mut [PomDocument] {
        &mut self.documents
    }

    pub fn document_mut(&mut self, index: usize) -> Option<&mut PomDocument> {
        self.documents.get_mut(index)
    }

    /// Index into [`ProjectModel::all_documents`] of the ancestor that holds
    /// managed dependency entries, if there are ancestors.
    pub fn managed_document_index(&self) -> Option<usize> {
        if !self.has_ancestors() {
            return None;
        }
        Some(match self.managed_target {
            ManagedTarget::Farthest => self.documents.len() - 1,
            ManagedTarget::Nearest => 1,
        })
    }

    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    pub fn skip_if_newer(&self) -> bool {
        self.skip_if_newer
    }

    pub fn use_properties(&self) -> bool {
        self.use_properties
    }

    pub fn active_profiles(&self) -> &BTreeSet<String> {
        &self.active_profiles
    }

    pub fn profile_selection(&self) -> ProfileSelection {
        ProfileSelection::new(&self.active_profiles)
    }

    pub fn override_if_already_exists(&self) -> bool {
        self.override_if_already_exists
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn is_mutation(&self) -> bool {
        self.query_type == QueryType::None
    }

    pub fn repository_path(&self) -> Option<&Path> {
        self.repository_path.as_deref()
    }

    pub fn offline(&self) -> bool {
        self.offline
    }

    pub fn managed_target(&self) -> ManagedTarget {
        self.managed_target
    }

    pub fn is_modified_by_command(&self) -> bool {
        self.modified_by_command
    }

    pub fn mark_modified_by_command(&mut self) {
        self.modified_by_command = true;
    }

    /// Properties visible to the target: every document's `<properties>` and
    /// those of its active profiles, merged so that nearer documents win, plus
    /// `project.*` / `pom.*` coordinates of the target.
    pub fn resolved_properties(&self) -> BTreeMap<String, String> {
        let selection = self.profile_selection();
        let mut properties = BTreeMap::new();
        for document in self.documents.iter().rev() {
            properties.extend(document.raw().active_properties(&selection));
        }

        let target = self.target().raw();
        for (key, value) in [
            ("groupId", target.effective_group_id()),
            ("artifactId", target.artifact_id.as_deref()),
            ("version", target.effective_version()),
        ] {
            if let Some(value) = value {
                properties.insert(format!("project.{key}"), value.to_string());
                properties.insert(format!("pom.{key}"), value.to_string());
            }
        }
        properties
    }
}

/// Builder for [`ProjectModel`].
#[derive(Debug, Clone)]
pub struct ProjectModelFactory {
    target: PomDocument,
    parents: Vec<PomDocument>,
    dependency: Option<Dependency>,
    skip_if_newer: bool,
    use_properties: bool,
    active_profiles: BTreeSet<String>,
    override_if_already_exists: bool,
    query_type: QueryType,
    repository_path: Option<PathBuf>,
    offline: bool,
    managed_target: ManagedTarget,
}

impl ProjectModelFactory {
    pub fn new(target: PomDocument) -> Self {
        Self {
            target,
            parents: Vec::new(),
            dependency: None,
            skip_if_newer: true,
            use_properties: false,
            active_profiles: BTreeSet::new(),
            override_if_already_exists: false,
            query_type: QueryType::None,
            repository_path: None,
            offline: false,
            managed_target: ManagedTarget::Farthest,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(PomDocument::load(path)?))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self::new(PomDocument::from_bytes(
            bytes.into(),
            DocumentSource::Memory,
        )?))
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ProjectError::Io {
                path: PathBuf::from("<reader>"),
                source,
            })?;
        Self::from_bytes(bytes)
    }

    /// Loads the target from a `file://` or `http(s)://` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        if let Some(path) = url.strip_prefix("file://") {
            return Self::load(path);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProjectError::Fetch {
                url: url.to_string(),
                message: "unsupported URL scheme".to_string(),
            });
        }

        let fetch_error = |message: String| ProjectError::Fetch {
            url: url.to_string(),
            message,
        };
        let response = ureq::get(url).call().map_err(|err| fetch_error(err.to_string()))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|err| fetch_error(err.to_string()))?;
        Ok(Self::new(PomDocument::from_bytes(
            bytes,
            DocumentSource::Url(url.to_string()),
        )?))
    }

    pub fn target(&self) -> &PomDocument {
        &self.target
    }

    pub fn parents(&self) -> &[PomDocument] {
        &self.parents
    }

    /// Ancestors of the target, nearest first.
    pub fn with_parent_poms(mut self, parents: Vec<PomDocument>) -> Self {
        self.parents = parents;
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn with_skip_if_newer(mut self, skip_if_newer: bool) -> Self {
        self.skip_if_newer = skip_if_newer;
        self
    }

    pub fn with_use_properties(mut self, use_properties: bool) -> Self {
        self.use_properties = use_properties;
        self
    }

    pub fn with_active_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_override_if_already_exists(mut self, override_existing: bool) -> Self {
        self.override_if_already_exists = override_existing;
        self
    }

    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    pub fn with_repository_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repository_path = Some(path.into());
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_managed_target(mut self, managed_target: ManagedTarget) -> Self {
        self.managed_target = managed_target;
        self
    }

    pub fn build(self) -> ProjectModel {
        let mut documents = Vec::with_capacity(1 + self.parents.len());
        documents.push(self.target);
        documents.extend(self.parents);
        ProjectModel {
            documents,
            dependency: self.dependency,
            skip_if_newer: self.skip_if_newer,
            use_properties: self.use_properties,
            active_profiles: self.active_profiles,
            override_if_already_exists: self.override_if_already_exists,
            query_type: self.query_type,
            repository_path: self.repository_path,
            offline: self.offline,
            managed_target: self.managed_target,
            modified_by_command: false,
        }
    }
}
