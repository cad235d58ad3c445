use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};

use pomkit_project::{
    artifact_path, pom_path, DeclaredDependency, Dependency, EffectiveModel, ProfileSelection,
    RawPom,
};

use crate::fetch::ArtifactFetcher;
use crate::{BuildError, Result};

const MAX_IMPORT_DEPTH: usize = 16;

/// In-process dependency resolution against a local Maven repository.
///
/// POMs missing from the repository are downloaded through the fetcher and
/// stored in the repository; without a fetcher (offline) they are errors.
#[derive(Debug)]
pub struct Resolver<'a> {
    repository: PathBuf,
    fetcher: Option<&'a dyn ArtifactFetcher>,
    profiles: ProfileSelection,
    poms: HashMap<(String, String, String), RawPom>,
}

/// A dependency waiting to be visited. Its `exclusions` hold everything
/// excluded along the path from the root.
#[derive(Debug)]
struct Pending {
    dependency: DeclaredDependency,
    scope: String,
}

impl<'a> Resolver<'a> {
    pub fn new(
        repository: impl Into<PathBuf>,
        fetcher: Option<&'a dyn ArtifactFetcher>,
        profiles: ProfileSelection,
    ) -> Self {
        Self {
            repository: repository.into(),
            fetcher,
            profiles,
            poms: HashMap::new(),
        }
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Loads `group:artifact:version`'s POM from the local repository,
    /// downloading it first when possible.
    pub fn load_pom(&mut self, group_id: &str, artifact_id: &str, version: &str) -> Result<RawPom> {
        let key = (group_id.to_string(), artifact_id.to_string(), version.to_string());
        if let Some(pom) = self.poms.get(&key) {
            return Ok(pom.clone());
        }

        let coordinate = format!("{group_id}:{artifact_id}:{version}");
        if version.starts_with(['[', '(']) || version.contains("${") {
            return Err(BuildError::Model {
                coordinate,
                problems: vec![format!("cannot resolve version `{version}`")],
            });
        }

        let path = pom_path(&self.repository, group_id, artifact_id, version);
        let bytes = if path.is_file() {
            std::fs::read(&path)?
        } else {
            let Some(fetcher) = self.fetcher else {
                return Err(BuildError::ArtifactMissing {
                    coordinate,
                    reason: "not in the local repository and offline",
                });
            };
            let relative = artifact_path(group_id, artifact_id, version, None, "pom");
            let Some(bytes) = fetcher.fetch(&relative)? else {
                return Err(BuildError::ArtifactMissing {
                    coordinate,
                    reason: "not found in the remote repository",
                });
            };
            store(&path, &bytes)?;
            bytes
        };

        let pom = RawPom::parse(&String::from_utf8_lossy(&bytes), &coordinate)?;
        self.poms.insert(key, pom.clone());
        Ok(pom)
    }

    /// Effective model of the last POM in `lineage` (farthest ancestor first).
    /// Ancestors missing from `lineage` and imported BOMs come from the
    /// repository.
    pub fn effective_model(&mut self, lineage: Vec<RawPom>) -> Result<EffectiveModel> {
        self.effective_model_at_depth(lineage, 0)
    }

    fn effective_model_at_depth(&mut self, mut lineage: Vec<RawPom>, depth: usize) -> Result<EffectiveModel> {
        let mut visited = HashSet::new();
        while let Some(parent) = lineage.first().and_then(|pom| pom.parent.clone()) {
            let coordinate = format!("{}:{}", parent.group_id, parent.artifact_id);
            let Some(version) = parent.version.clone() else {
                return Err(BuildError::Model {
                    coordinate,
                    problems: vec!["parent has no version".to_string()],
                });
            };
            if !visited.insert((parent.group_id.clone(), parent.artifact_id.clone())) {
                return Err(BuildError::Model {
                    coordinate,
                    problems: vec!["parent hierarchy contains a cycle".to_string()],
                });
            }
            let pom = self.load_pom(&parent.group_id, &parent.artifact_id, &version)?;
            lineage.insert(0, pom);
        }

        let refs: Vec<&RawPom> = lineage.iter().collect();
        let mut model = EffectiveModel::build(&refs, &self.profiles);

        if !model.imports.is_empty() {
            if depth >= MAX_IMPORT_DEPTH {
                return Err(BuildError::Model {
                    coordinate: model_coordinate(&model),
                    problems: vec!["import-scoped BOMs nest too deeply".to_string()],
                });
            }
            for import in model.imports.clone() {
                let (Some(group_id), Some(artifact_id), Some(version)) =
                    (&import.group_id, &import.artifact_id, &import.version)
                else {
                    return Err(BuildError::Model {
                        coordinate: model_coordinate(&model),
                        problems: vec!["import-scoped dependency lacks coordinates".to_string()],
                    });
                };
                let bom = self.load_pom(group_id, artifact_id, version)?;
                let bom = self.effective_model_at_depth(vec![bom], depth + 1)?;
                model.import_managed(&bom);
            }
        }

        Ok(model)
    }

    /// Transitive dependencies of `root`, nearest declaration winning per
    /// `groupId:artifactId`.
    ///
    /// Optional, `test` and `provided` dependencies of dependencies are not
    /// followed, exclusions apply to the whole subtree below the declaring
    /// dependency, and the root's `dependencyManagement` pins transitive
    /// versions.
    pub fn resolve(&mut self, root: &EffectiveModel) -> Result<Vec<Dependency>> {
        let problems = root.problems();
        if !problems.is_empty() {
            return Err(BuildError::Model {
                coordinate: model_coordinate(root),
                problems,
            });
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        if let (Some(g), Some(a)) = (&root.group_id, &root.artifact_id) {
            seen.insert((g.clone(), a.clone()));
        }

        let mut queue: VecDeque<Pending> = root
            .dependencies
            .iter()
            .map(|dep| Pending {
                scope: dep.scope().to_string(),
                dependency: dep.clone(),
            })
            .collect();

        let mut resolved = Vec::new();
        while let Some(pending) = queue.pop_front() {
            let dep = &pending.dependency;
            let (Some(group_id), Some(artifact_id), Some(version)) =
                (&dep.group_id, &dep.artifact_id, &dep.version)
            else {
                continue;
            };
            if !seen.insert((group_id.clone(), artifact_id.clone())) {
                continue;
            }

            let mut out = Dependency::new(group_id.clone(), artifact_id.clone(), Some(version.clone()))
                .with_packaging(dep.type_())
                .with_scope(pending.scope.clone());
            out.classifier = dep.classifier.clone();
            resolved.push(out);

            if pending.scope == "system" {
                continue;
            }

            let pom = self.load_pom(group_id, artifact_id, version)?;
            let model = self.effective_model(vec![pom])?;
            for child in &model.dependencies {
                if child.optional || matches!(child.scope(), "test" | "provided" | "system" | "import") {
                    continue;
                }
                let Some((child_group, child_artifact)) = child.key() else {
                    continue;
                };
                if dep.excludes(&child_group, &child_artifact) {
                    continue;
                }
                let Some(scope) = mediate_scope(&pending.scope, child.scope()) else {
                    continue;
                };

                let mut child = child.clone();
                if let Some(pinned) = root
                    .managed
                    .get(&(child_group.clone(), child_artifact.clone()))
                    .and_then(|managed| managed.version.clone())
                {
                    child.version = Some(pinned);
                }
                if child.version.is_none() {
                    return Err(BuildError::Model {
                        coordinate: format!("{child_group}:{child_artifact}"),
                        problems: vec![format!(
                            "no version for dependency of {group_id}:{artifact_id}:{version}"
                        )],
                    });
                }

                child.exclusions.extend(dep.exclusions.iter().cloned());
                queue.push_back(Pending {
                    dependency: child,
                    scope: scope.to_string(),
                });
            }
        }

        Ok(resolved)
    }
}

/// Scope of a transitive dependency given the scope its parent was pulled in
/// with. `None` drops the dependency.
fn mediate_scope(parent: &str, child: &str) -> Option<&'static str> {
    let child = match child {
        "compile" => "compile",
        "runtime" => "runtime",
        _ => return None,
    };
    match parent {
        "compile" => Some(child),
        "runtime" => Some("runtime"),
        "provided" => Some("provided"),
        "test" => Some("test"),
        _ => None,
    }
}

fn model_coordinate(model: &EffectiveModel) -> String {
    format!(
        "{}:{}:{}",
        model.group_id.as_deref().unwrap_or("?"),
        model.artifact_id.as_deref().unwrap_or("?"),
        model.version.as_deref().unwrap_or("?")
    )
}

fn store(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("repository path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|err| BuildError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_mediation_follows_maven_table() {
        assert_eq!(mediate_scope("compile", "compile"), Some("compile"));
        assert_eq!(mediate_scope("compile", "runtime"), Some("runtime"));
        assert_eq!(mediate_scope("runtime", "compile"), Some("runtime"));
        assert_eq!(mediate_scope("test", "compile"), Some("test"));
        assert_eq!(mediate_scope("provided", "runtime"), Some("provided"));
        assert_eq!(mediate_scope("compile", "test"), None);
    }
}
