use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::raw::{DeclaredDependency, ProfileSelection, RawPom};
use crate::Dependency;

/// Placeholder for versions whose property references cannot be resolved.
pub const UNKNOWN_VERSION: &str = "UNKNOWN";

const MAX_INTERPOLATION_DEPTH: usize = 16;

/// POM content after parent inheritance, profile activation and property
/// interpolation.
#[derive(Debug, Clone, Default)]
pub struct EffectiveModel {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: String,
    pub properties: BTreeMap<String, String>,
    pub managed: BTreeMap<(String, String), DeclaredDependency>,
    /// `import`-scoped entries of `dependencyManagement`, still to be merged
    /// with [`EffectiveModel::import_managed`].
    pub imports: Vec<DeclaredDependency>,
    pub dependencies: Vec<DeclaredDependency>,
}

impl EffectiveModel {
    /// Builds the effective model of the last POM in `lineage`, which lists
    /// the hierarchy farthest ancestor first.
    pub fn build(lineage: &[&RawPom], profiles: &ProfileSelection) -> Self {
        let mut model = EffectiveModel {
            packaging: "jar".to_string(),
            ..EffectiveModel::default()
        };

        for pom in lineage {
            model.group_id = pom
                .effective_group_id()
                .map(str::to_string)
                .or(model.group_id.take());
            model.artifact_id = pom.artifact_id.clone().or(model.artifact_id.take());
            model.version = pom
                .effective_version()
                .map(str::to_string)
                .or(model.version.take());
            model.packaging = pom.packaging().to_string();
            model.properties.extend(pom.active_properties(profiles));
        }

        for (key, value) in [
            ("groupId", model.group_id.clone()),
            ("artifactId", model.artifact_id.clone()),
            ("version", model.version.clone()),
        ] {
            if let Some(value) = value {
                model.properties.insert(format!("project.{key}"), value.clone());
                model.properties.insert(format!("pom.{key}"), value);
            }
        }

        let mut dependencies: Vec<DeclaredDependency> = Vec::new();
        for pom in lineage {
            let managed = pom.dependency_management.iter().chain(
                pom.active_profiles(profiles)
                    .flat_map(|p| p.dependency_management.iter()),
            );
            for dep in managed {
                let dep = model.interpolate_dependency(dep);
                if dep.scope() == "import" {
                    model.imports.retain(|existing| existing.key() != dep.key());
                    model.imports.push(dep);
                } else if let Some(key) = dep.key() {
                    model.managed.insert(key, dep);
                }
            }

            let declared = pom.dependencies.iter().chain(
                pom.active_profiles(profiles)
                    .flat_map(|p| p.dependencies.iter()),
            );
            for dep in declared {
                let dep = model.interpolate_dependency(dep);
                match dependencies
                    .iter_mut()
                    .find(|existing| dep.key().is_some() && existing.key() == dep.key())
                {
                    Some(existing) => *existing = dep,
                    None => dependencies.push(dep),
                }
            }
        }

        model.dependencies = dependencies;
        model.apply_managed();
        model
    }

    /// Merges the managed entries of an imported BOM. Entries already managed
    /// here take precedence.
    pub fn import_managed(&mut self, bom: &EffectiveModel) {
        for (key, dep) in &bom.managed {
            self.managed.entry(key.clone()).or_insert_with(|| dep.clone());
        }
        self.apply_managed();
    }

    fn apply_managed(&mut self) {
        for dep in &mut self.dependencies {
            let Some(key) = dep.key() else { continue };
            let Some(managed) = self.managed.get(&key) else {
                continue;
            };
            if dep.version.is_none() {
                dep.version = managed.version.clone();
            }
            if dep.scope.is_none() {
                dep.scope = managed.scope.clone();
            }
            if dep.exclusions.is_empty() {
                dep.exclusions = managed.exclusions.clone();
            }
        }
    }

    /// Substitutes `${name}` references; unknown names are left in place.
    pub fn interpolate(&self, text: &str) -> String {
        interpolate(text, &self.properties)
    }

    fn interpolate_dependency(&self, dep: &DeclaredDependency) -> DeclaredDependency {
        let field = |value: &Option<String>| value.as_deref().map(|v| self.interpolate(v));
        DeclaredDependency {
            group_id: field(&dep.group_id),
            artifact_id: field(&dep.artifact_id),
            version: field(&dep.version),
            classifier: field(&dep.classifier),
            type_: field(&dep.type_),
            scope: field(&dep.scope),
            optional: dep.optional,
            exclusions: dep
                .exclusions
                .iter()
                .map(|(g, a)| (self.interpolate(g), self.interpolate(a)))
                .collect(),
        }
    }

    /// Reasons this model cannot be used to resolve dependencies, if any.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (index, dep) in self.dependencies.iter().enumerate() {
            let (Some(group_id), Some(artifact_id)) = (&dep.group_id, &dep.artifact_id) else {
                problems.push(format!("dependency #{index} is missing groupId or artifactId"));
                continue;
            };
            match dep.version.as_deref() {
                None => problems.push(format!(
                    "{group_id}:{artifact_id} has no version and no managed version"
                )),
                Some(version) if has_placeholder(version) => problems.push(format!(
                    "{group_id}:{artifact_id} has unresolved version `{version}`"
                )),
                Some(_) => {}
            }
        }
        problems
    }

    /// Declared dependencies as coordinates. Unresolved property references
    /// in versions become [`UNKNOWN_VERSION`]; entries without coordinates are
    /// skipped.
    pub fn to_dependencies(&self) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .filter_map(|dep| {
                let mut out = Dependency::new(
                    dep.group_id.clone()?,
                    dep.artifact_id.clone()?,
                    dep.version.as_deref().map(|version| {
                        if has_placeholder(version) {
                            UNKNOWN_VERSION.to_string()
                        } else {
                            version.to_string()
                        }
                    }),
                )
                .with_packaging(dep.type_())
                .with_scope(dep.scope());
                out.classifier = dep.classifier.clone();
                Some(out)
            })
            .collect()
    }
}

pub(crate) fn has_placeholder(text: &str) -> bool {
    placeholder_regex().is_match(text)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"))
}

/// Substitutes `${name}` references from `props`, following references inside
/// property values. Unknown names and cycles are left unexpanded.
pub fn interpolate(text: &str, props: &BTreeMap<String, String>) -> String {
    let re = placeholder_regex();
    let mut current = text.to_string();
    for _ in 0..MAX_INTERPOLATION_DEPTH {
        if !re.is_match(&current) {
            break;
        }
        let next = re
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                props
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
