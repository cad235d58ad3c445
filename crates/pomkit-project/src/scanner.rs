use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use crate::document::PomDocument;
use crate::model::ProjectModelFactory;
use crate::raw::{ParentRef, RelativePath};
use crate::{InvalidPathKind, ProjectError, Result};

/// Locates the on-disk ancestors of a POM inside a project directory.
#[derive(Debug, Clone)]
pub struct PomScanner {
    boundary: PathBuf,
}

impl PomScanner {
    pub fn new(top_level_directory: impl AsRef<Path>) -> Result<Self> {
        let dir = top_level_directory.as_ref();
        let boundary = std::fs::canonicalize(dir).map_err(|source| ProjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self { boundary })
    }

    /// Loads `path` and its ancestors below `top_level_directory`.
    pub fn scan_from(
        path: impl AsRef<Path>,
        top_level_directory: impl AsRef<Path>,
    ) -> Result<ProjectModelFactory> {
        let scanner = Self::new(top_level_directory)?;
        let (target_path, target) = scanner.load_target(path.as_ref())?;

        match scanner.resolve_by_model(&target_path, &target) {
            Ok(parents) => Ok(ProjectModelFactory::new(target).with_parent_poms(parents)),
            Err(err) => {
                tracing::debug!(
                    target: "pomkit.scanner",
                    path = %target_path.display(),
                    error = %err,
                    "model-based parent resolution failed; following relativePath references"
                );
                let parents = scanner.resolve_by_relative_paths(&target_path, &target)?;
                Ok(ProjectModelFactory::new(target).with_parent_poms(parents))
            }
        }
    }

    /// Follows `relativePath` references only, without checking coordinates.
    pub fn legacy_scan_from(
        path: impl AsRef<Path>,
        top_level_directory: impl AsRef<Path>,
    ) -> Result<ProjectModelFactory> {
        let scanner = Self::new(top_level_directory)?;
        let (target_path, target) = scanner.load_target(path.as_ref())?;
        let parents = scanner.resolve_by_relative_paths(&target_path, &target)?;
        Ok(ProjectModelFactory::new(target).with_parent_poms(parents))
    }

    fn load_target(&self, path: &Path) -> Result<(PathBuf, PomDocument)> {
        let canonical = std::fs::canonicalize(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = PomDocument::load(&canonical)?;
        Ok((canonical, document))
    }

    /// Walks `<parent>` links, accepting a parent file only when it declares
    /// the coordinates the child asks for. Stops at the first parent that is
    /// not on disk.
    fn resolve_by_model(&self, target_path: &Path, target: &PomDocument) -> Result<Vec<PomDocument>> {
        let mut visited = HashSet::from([target_path.to_path_buf()]);
        let mut parents = Vec::new();
        let mut current_path = target_path.to_path_buf();
        let mut parent_ref = target.raw().parent.clone();

        while let Some(parent) = parent_ref {
            let explicit = matches!(parent.relative_path, RelativePath::Explicit(_));
            let Some(candidate) = self.candidate_path(&current_path, &parent)? else {
                break;
            };
            if !self.is_inside_boundary(&candidate) {
                if explicit {
                    return Err(invalid_path(candidate, InvalidPathKind::EscapesBoundary));
                }
                break;
            }
            if !candidate.is_file() {
                break;
            }
            let candidate = canonicalize(&candidate)?;
            if !visited.insert(candidate.clone()) {
                return Err(invalid_path(candidate, InvalidPathKind::Loop));
            }

            let document = PomDocument::load(&candidate)?;
            if !document.raw().is_referenced_by(&parent) {
                if explicit {
                    return Err(ProjectError::Model {
                        message: format!(
                            "{} does not declare parent {}:{}",
                            candidate.display(),
                            parent.group_id,
                            parent.artifact_id
                        ),
                    });
                }
                // Default location holds some other project; the parent lives
                // in a repository.
                break;
            }

            parent_ref = document.raw().parent.clone();
            current_path = candidate;
            parents.push(document);
        }

        Ok(parents)
    }

    /// Breadth-first walk over `relativePath` references.
    fn resolve_by_relative_paths(
        &self,
        target_path: &Path,
        target: &PomDocument,
    ) -> Result<Vec<PomDocument>> {
        let mut visited = HashSet::from([target_path.to_path_buf()]);
        let mut parents = Vec::new();
        let mut queue = VecDeque::new();
        if let Some(parent) = target.raw().parent.clone() {
            queue.push_back((target_path.to_path_buf(), parent));
        }

        while let Some((referrer, parent)) = queue.pop_front() {
            let explicit = matches!(parent.relative_path, RelativePath::Explicit(_));
            let Some(candidate) = self.candidate_path(&referrer, &parent)? else {
                continue;
            };
            if !self.is_inside_boundary(&candidate) {
                if explicit {
                    return Err(invalid_path(candidate, InvalidPathKind::EscapesBoundary));
                }
                continue;
            }
            if !candidate.is_file() {
                tracing::debug!(
                    target: "pomkit.scanner",
                    path = %candidate.display(),
                    "parent POM not found on disk"
                );
                continue;
            }
            let candidate = canonicalize(&candidate)?;
            if !visited.insert(candidate.clone()) {
                return Err(invalid_path(candidate, InvalidPathKind::Loop));
            }

            let document = PomDocument::load(&candidate)?;
            if let Some(next) = document.raw().parent.clone() {
                queue.push_back((candidate.clone(), next));
            }
            parents.push(document);
        }

        Ok(parents)
    }

    /// Where `parent` points relative to the POM at `referrer`, lexically
    /// normalized. `None` when the reference disables on-disk lookup.
    fn candidate_path(&self, referrer: &Path, parent: &ParentRef) -> Result<Option<PathBuf>> {
        let relative = match &parent.relative_path {
            RelativePath::Disabled => return Ok(None),
            RelativePath::Default => "../pom.xml",
            RelativePath::Explicit(path) => path.as_str(),
        };

        if is_absolute_reference(relative) {
            return Err(invalid_path(PathBuf::from(relative), InvalidPathKind::Absolute));
        }

        let dir = referrer.parent().unwrap_or(Path::new("."));
        let mut candidate = normalize(&dir.join(relative));
        if candidate.is_dir() {
            candidate = candidate.join("pom.xml");
        }
        Ok(Some(candidate))
    }

    fn is_inside_boundary(&self, path: &Path) -> bool {
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| normalize(path));
        resolved.starts_with(&self.boundary)
    }
}

fn is_absolute_reference(path: &str) -> bool {
    path.starts_with('~')
        || path.starts_with('/')
        || path.starts_with('\\')
        || Path::new(path).is_absolute()
        || path.as_bytes().get(1) == Some(&b':')
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid_path(path: PathBuf, kind: InvalidPathKind) -> ProjectError {
    ProjectError::InvalidPath { path, kind }
}
