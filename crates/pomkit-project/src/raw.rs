use std::collections::{BTreeMap, BTreeSet};

use crate::{ProjectError, Result};

/// Where a `<parent>` declaration says the parent POM lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelativePath {
    /// No `<relativePath>` element: Maven looks at `../pom.xml`.
    Default,
    Explicit(String),
    /// `<relativePath/>`: the parent is only looked up in repositories.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub relative_path: RelativePath,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<(String, String)>,
}

impl DeclaredDependency {
    pub fn key(&self) -> Option<(String, String)> {
        Some((self.group_id.clone()?, self.artifact_id.clone()?))
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or("compile")
    }

    pub fn type_(&self) -> &str {
        self.type_.as_deref().unwrap_or("jar")
    }

    /// Whether `group_id:artifact_id` is excluded; `*` matches anything.
    pub fn excludes(&self, group_id: &str, artifact_id: &str) -> bool {
        self.exclusions.iter().any(|(g, a)| {
            (g == "*" || g == group_id) && (a == "*" || a == artifact_id)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProfile {
    pub id: String,
    pub active_by_default: bool,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<DeclaredDependency>,
    pub dependency_management: Vec<DeclaredDependency>,
}

/// The content of a single POM file, before inheritance or interpolation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<DeclaredDependency>,
    pub dependency_management: Vec<DeclaredDependency>,
    pub profiles: Vec<RawProfile>,
}

impl RawPom {
    /// Parses POM text. `location` only feeds error messages.
    pub fn parse(text: &str, location: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(text).map_err(|source| ProjectError::Pom {
            location: location.to_string(),
            source,
        })?;
        let project = doc.root_element();

        let mut pom = RawPom {
            group_id: child_text(&project, "groupId"),
            artifact_id: child_text(&project, "artifactId"),
            version: child_text(&project, "version"),
            packaging: child_text(&project, "packaging"),
            ..RawPom::default()
        };

        if let Some(parent) = child_element(&project, "parent") {
            let relative_path = match child_element(&parent, "relativePath") {
                None => RelativePath::Default,
                Some(node) => match node.text().map(str::trim).filter(|t| !t.is_empty()) {
                    Some(path) => RelativePath::Explicit(path.to_string()),
                    None => RelativePath::Disabled,
                },
            };
            pom.parent = Some(ParentRef {
                group_id: child_text(&parent, "groupId").unwrap_or_default(),
                artifact_id: child_text(&parent, "artifactId").unwrap_or_default(),
                version: child_text(&parent, "version"),
                relative_path,
            });
        }

        pom.properties = parse_properties(&project);
        pom.dependencies = child_element(&project, "dependencies")
            .map(|deps| parse_dependencies(&deps))
            .unwrap_or_default();
        pom.dependency_management = parse_dependency_management(&project);

        if let Some(profiles) = child_element(&project, "profiles") {
            pom.profiles = profiles
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "profile")
                .map(|profile| parse_profile(&profile))
                .collect();
        }

        Ok(pom)
    }

    /// `groupId`, falling back to the parent's.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
            .filter(|g| !g.is_empty())
    }

    /// `version`, falling back to the parent's.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or("jar")
    }

    /// Whether this POM is the one a `<parent>` declaration points at.
    pub fn is_referenced_by(&self, parent: &ParentRef) -> bool {
        self.effective_group_id() == Some(parent.group_id.as_str())
            && self.artifact_id.as_deref() == Some(parent.artifact_id.as_str())
            && match (&parent.version, self.effective_version()) {
                (Some(wanted), Some(actual)) => wanted == actual || wanted.contains("${"),
                _ => true,
            }
    }

    /// Properties of this POM with those of active profiles layered on top.
    pub fn active_properties(&self, selection: &ProfileSelection) -> BTreeMap<String, String> {
        let mut properties = self.properties.clone();
        for profile in self.active_profiles(selection) {
            properties.extend(profile.properties.clone());
        }
        properties
    }

    /// Profiles of this POM that apply under `selection`. `activeByDefault`
    /// profiles drop out once any other profile of the same POM is activated
    /// explicitly.
    pub fn active_profiles<'a>(
        &'a self,
        selection: &'a ProfileSelection,
    ) -> impl Iterator<Item = &'a RawProfile> + 'a {
        let any_explicit = self.profiles.iter().any(|p| selection.activates(p));
        self.profiles.iter().filter(move |p| {
            !selection.deactivates(p)
                && (selection.activates(p) || (p.active_by_default && !any_explicit))
        })
    }
}

/// Profiles requested for a build; `!id` deactivates a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSelection {
    active: BTreeSet<String>,
    inactive: BTreeSet<String>,
}

impl ProfileSelection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::default();
        for name in names {
            let name = name.as_ref().trim();
            match name.strip_prefix('!').or_else(|| name.strip_prefix('-')) {
                Some(id) if !id.is_empty() => {
                    selection.inactive.insert(id.to_string());
                }
                Some(_) => {}
                None if !name.is_empty() => {
                    selection.active.insert(name.to_string());
                }
                None => {}
            }
        }
        selection
    }

    fn activates(&self, profile: &RawProfile) -> bool {
        self.active.contains(&profile.id) && !self.deactivates(profile)
    }

    fn deactivates(&self, profile: &RawProfile) -> bool {
        self.inactive.contains(&profile.id)
    }

    /// Names in `mvn -P` syntax.
    pub fn to_cli_argument(&self) -> Option<String> {
        let names: Vec<String> = self
            .active
            .iter()
            .cloned()
            .chain(self.inactive.iter().map(|id| format!("!{id}")))
            .collect();
        (!names.is_empty()).then(|| names.join(","))
    }
}

fn parse_profile(node: &roxmltree::Node<'_, '_>) -> RawProfile {
    let active_by_default = child_element(node, "activation")
        .and_then(|activation| child_text(&activation, "activeByDefault"))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    RawProfile {
        id: child_text(node, "id").unwrap_or_default(),
        active_by_default,
        properties: parse_properties(node),
        dependencies: child_element(node, "dependencies")
            .map(|deps| parse_dependencies(&deps))
            .unwrap_or_default(),
        dependency_management: parse_dependency_management(node),
    }
}

fn parse_properties(node: &roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    if let Some(props) = child_element(node, "properties") {
        for child in props.children().filter(|n| n.is_element()) {
            let key = child.tag_name().name().to_string();
            let value = child.text().map(str::trim).unwrap_or_default();
            properties.insert(key, value.to_string());
        }
    }
    properties
}

fn parse_dependency_management(node: &roxmltree::Node<'_, '_>) -> Vec<DeclaredDependency> {
    child_element(node, "dependencyManagement")
        .and_then(|dm| child_element(&dm, "dependencies"))
        .map(|deps| parse_dependencies(&deps))
        .unwrap_or_default()
}

fn parse_dependencies(deps: &roxmltree::Node<'_, '_>) -> Vec<DeclaredDependency> {
    deps.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "dependency")
        .map(|dep| {
            let exclusions = child_element(&dep, "exclusions")
                .map(|ex| {
                    ex.children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "exclusion")
                        .filter_map(|n| {
                            Some((child_text(&n, "groupId")?, child_text(&n, "artifactId")?))
                        })
                        .collect()
                })
                .unwrap_or_default();

            DeclaredDependency {
                group_id: child_text(&dep, "groupId"),
                artifact_id: child_text(&dep, "artifactId"),
                version: child_text(&dep, "version"),
                classifier: child_text(&dep, "classifier"),
                type_: child_text(&dep, "type"),
                scope: child_text(&dep, "scope"),
                optional: child_text(&dep, "optional").is_some_and(|v| v == "true"),
                exclusions,
            }
        })
        .collect()
}

fn child_element<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <parent>
    <groupId>com.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.0</version>
    <relativePath/>
  </parent>
  <artifactId>child</artifactId>
  <properties>
    <slf4j.version>2.0.3</slf4j.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
      <version>${slf4j.version}</version>
      <exclusions>
        <exclusion><groupId>*</groupId><artifactId>*</artifactId></exclusion>
      </exclusions>
    </dependency>
  </dependencies>
  <profiles>
    <profile>
      <id>fast</id>
      <activation><activeByDefault>true</activeByDefault></activation>
      <properties><slf4j.version>2.0.4</slf4j.version></properties>
    </profile>
    <profile>
      <id>release</id>
      <properties><gpg.skip>false</gpg.skip></properties>
    </profile>
  </profiles>
</project>
"#;

    #[test]
    fn parses_coordinates_with_parent_inheritance() {
        let pom = RawPom::parse(POM, "pom.xml").unwrap();
        assert_eq!(pom.effective_group_id(), Some("com.example"));
        assert_eq!(pom.effective_version(), Some("1.0"));
        assert_eq!(pom.packaging(), "jar");
        let parent = pom.parent.as_ref().unwrap();
        assert_eq!(parent.relative_path, RelativePath::Disabled);
    }

    #[test]
    fn parses_dependencies_and_exclusions() {
        let pom = RawPom::parse(POM, "pom.xml").unwrap();
        let dep = &pom.dependencies[0];
        assert_eq!(dep.version.as_deref(), Some("${slf4j.version}"));
        assert!(dep.excludes("anything", "at-all"));
        assert_eq!(dep.scope(), "compile");
    }

    #[test]
    fn default_profiles_apply_unless_deactivated() {
        let pom = RawPom::parse(POM, "pom.xml").unwrap();
        let on = pom.active_properties(&ProfileSelection::default());
        assert_eq!(on["slf4j.version"], "2.0.4");

        let off = pom.active_properties(&ProfileSelection::new(["!fast"]));
        assert_eq!(off["slf4j.version"], "2.0.3");
    }

    #[test]
    fn explicit_activation_turns_default_profiles_off() {
        let pom = RawPom::parse(POM, "pom.xml").unwrap();
        let selection = ProfileSelection::new(["release"]);
        let ids: Vec<&str> = pom.active_profiles(&selection).map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["release"]);
        assert_eq!(pom.active_properties(&selection)["slf4j.version"], "2.0.3");

        // Naming a profile this POM lacks leaves its defaults alone.
        let elsewhere = ProfileSelection::new(["ci"]);
        assert_eq!(pom.active_properties(&elsewhere)["slf4j.version"], "2.0.4");
    }

    #[test]
    fn profile_selection_renders_cli_argument() {
        let selection = ProfileSelection::new(["a", "!b", ""]);
        assert_eq!(selection.to_cli_argument().as_deref(), Some("a,!b"));
        assert_eq!(ProfileSelection::default().to_cli_argument(), None);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(RawPom::parse("<project>", "broken.xml").is_err());
    }
}
