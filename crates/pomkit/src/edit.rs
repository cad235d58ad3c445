use pomkit_project::{Dependency, PomDocument, PomView};
use pomkit_xml::{IndentStyle, NodeId, XmlTree};

/// Order of the top-level POM elements, used to place new containers.
pub(crate) const PROJECT_ELEMENT_ORDER: &[&str] = &[
    "modelVersion",
    "parent",
    "groupId",
    "artifactId",
    "version",
    "packaging",
    "name",
    "description",
    "url",
    "inceptionYear",
    "organization",
    "licenses",
    "developers",
    "contributors",
    "mailingLists",
    "prerequisites",
    "modules",
    "scm",
    "issueManagement",
    "ciManagement",
    "distributionManagement",
    "properties",
    "dependencyManagement",
    "dependencies",
    "repositories",
    "pluginRepositories",
    "build",
    "reporting",
    "profiles",
];

pub(crate) const DEPENDENCY_ELEMENT_ORDER: &[&str] = &[
    "groupId",
    "artifactId",
    "version",
    "type",
    "classifier",
    "scope",
    "systemPath",
    "exclusions",
    "optional",
];

const PROFILE_ELEMENT_ORDER: &[&str] = &[
    "id",
    "activation",
    "build",
    "modules",
    "distributionManagement",
    "properties",
    "dependencyManagement",
    "dependencies",
    "repositories",
    "pluginRepositories",
    "reporting",
];

pub(crate) const DEPENDENCIES: &[&str] = &["dependencies"];
pub(crate) const MANAGED_DEPENDENCIES: &[&str] = &["dependencyManagement", "dependencies"];

/// The `<properties>` block a property lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PropertyScope {
    Project,
    /// The profile with this `<id>`.
    Profile(String),
}

/// Edits the result tree of one POM. Every change marks the document dirty.
pub(crate) struct PomEditor<'a> {
    doc: &'a mut PomDocument,
    namespace: Option<String>,
    root: NodeId,
    style: IndentStyle,
}

impl<'a> PomEditor<'a> {
    pub(crate) fn new(doc: &'a mut PomDocument) -> Option<Self> {
        let (root, namespace) = {
            let view = doc.pom()?;
            (view.root(), view.namespace().map(str::to_string))
        };
        let style = doc.indent_style();
        Some(Self {
            doc,
            namespace,
            root,
            style,
        })
    }

    fn tree(&self) -> &XmlTree {
        self.doc.result_tree()
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub(crate) fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.tree().child_named(node, self.namespace(), name)
    }

    pub(crate) fn find_dependency(
        &self,
        container: &[&str],
        group_id: &str,
        artifact_id: &str,
    ) -> Option<NodeId> {
        PomView::new(self.tree())?
            .find_dependencies(container, group_id, artifact_id)
            .into_iter()
            .next()
    }

    /// The `<version>` child, when there is exactly one.
    pub(crate) fn version_slot(&self, dependency: NodeId) -> Option<NodeId> {
        let mut slots = self
            .tree()
            .children_named(dependency, self.namespace(), "version");
        let first = slots.next()?;
        slots.next().is_none().then_some(first)
    }

    pub(crate) fn text(&self, node: NodeId) -> String {
        self.tree().text(node).trim().to_string()
    }

    /// Returns the `name` child of `parent`, creating it before the first
    /// sibling that `order` places after it.
    pub(crate) fn ensure_child(&mut self, parent: NodeId, name: &str, order: &[&str]) -> NodeId {
        if let Some(existing) = self.child(parent, name) {
            return existing;
        }

        let successor = self.successor(parent, name, order);
        let style = self.style.clone();
        let tree = self.doc.result_tree_mut();
        let node = match successor {
            Some(before) => tree.insert_element_before(parent, before, name, &style),
            None => tree.append_element(parent, name, &style),
        };
        self.doc.mark_dirty();
        node
    }

    fn successor(&self, parent: NodeId, name: &str, order: &[&str]) -> Option<NodeId> {
        let rank = |local: &str| order.iter().position(|n| *n == local);
        let wanted = rank(name)?;
        let tree = self.tree();
        tree.child_elements(parent).find(|child| {
            tree.element(*child)
                .and_then(|e| rank(e.local_name()))
                .is_some_and(|r| r > wanted)
        })
    }

    /// Creates (or returns) the container at `path` below the root.
    pub(crate) fn ensure_path(&mut self, path: &[&str]) -> NodeId {
        let mut node = self.root;
        for (depth, step) in path.iter().enumerate() {
            let order: &[&str] = if depth == 0 { PROJECT_ELEMENT_ORDER } else { &[] };
            node = self.ensure_child(node, step, order);
        }
        node
    }

    /// Sets the text of `node`; returns whether anything changed.
    pub(crate) fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        if self.text(node) == text {
            return false;
        }
        self.doc.result_tree_mut().set_text(node, text);
        self.doc.mark_dirty();
        true
    }

    /// Adds a `<version>` to an existing dependency that lacks one.
    pub(crate) fn add_version(&mut self, dependency: NodeId, version: &str) {
        let node = self.ensure_child(dependency, "version", DEPENDENCY_ELEMENT_ORDER);
        self.set_text(node, version);
    }

    pub(crate) fn append_dependency(
        &mut self,
        container: NodeId,
        dependency: &Dependency,
        version: Option<&str>,
    ) -> NodeId {
        let style = self.style.clone();
        let tree = self.doc.result_tree_mut();
        let node = tree.append_element(container, "dependency", &style);
        tree.append_text_element(node, "groupId", &dependency.group_id, &style);
        tree.append_text_element(node, "artifactId", &dependency.artifact_id, &style);
        if let Some(version) = version {
            tree.append_text_element(node, "version", version, &style);
        }
        if dependency.packaging != "jar" {
            tree.append_text_element(node, "type", &dependency.packaging, &style);
        }
        if let Some(classifier) = &dependency.classifier {
            tree.append_text_element(node, "classifier", classifier, &style);
        }
        if dependency.scope != "compile" {
            tree.append_text_element(node, "scope", &dependency.scope, &style);
        }
        self.doc.mark_dirty();
        node
    }

    fn profile(&self, id: &str) -> Option<NodeId> {
        let profiles = self.child(self.root, "profiles")?;
        self.tree()
            .children_named(profiles, self.namespace(), "profile")
            .find(|profile| self.child(*profile, "id").is_some_and(|node| self.text(node) == id))
    }

    fn scope_owner(&self, scope: &PropertyScope) -> Option<NodeId> {
        match scope {
            PropertyScope::Project => Some(self.root),
            PropertyScope::Profile(id) => self.profile(id),
        }
    }

    pub(crate) fn property(&self, scope: &PropertyScope, name: &str) -> Option<String> {
        let properties = self.child(self.scope_owner(scope)?, "properties")?;
        let node = self.child(properties, name)?;
        Some(self.text(node))
    }

    /// Writes `name` into the `<properties>` of `scope`, creating the block
    /// when needed. Returns `false` when the scope's profile does not exist.
    pub(crate) fn set_property(&mut self, scope: &PropertyScope, name: &str, value: &str) -> bool {
        let Some(owner) = self.scope_owner(scope) else {
            return false;
        };
        let order = match scope {
            PropertyScope::Project => PROJECT_ELEMENT_ORDER,
            PropertyScope::Profile(_) => PROFILE_ELEMENT_ORDER,
        };
        let properties = self.ensure_child(owner, "properties", order);
        let node = self.ensure_child(properties, name, &[]);
        self.set_text(node, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use pomkit_project::DocumentSource;

    use super::*;

    fn doc(text: &str) -> PomDocument {
        PomDocument::from_bytes(text.as_bytes().to_vec(), DocumentSource::Memory).unwrap()
    }

    #[test]
    fn new_containers_follow_canonical_order() {
        let mut doc = doc("<project>\n  <artifactId>a</artifactId>\n  <build/>\n</project>\n");
        let mut editor = PomEditor::new(&mut doc).unwrap();
        editor.ensure_path(DEPENDENCIES);
        editor.set_property(&PropertyScope::Project, "x", "1");
        assert!(doc.is_dirty());
        assert_eq!(
            doc.serialize_result(),
            "<project>\n  <artifactId>a</artifactId>\n  <properties>\n    <x>1</x>\n  </properties>\n  <dependencies/>\n  <build/>\n</project>\n"
        );
    }

    #[test]
    fn appended_dependencies_are_indented() {
        let mut doc = doc("<project>\n    <dependencies>\n    </dependencies>\n</project>\n");
        doc.capture_format().unwrap();
        let mut editor = PomEditor::new(&mut doc).unwrap();
        let container = editor.ensure_path(DEPENDENCIES);
        let dep = Dependency::new("g", "a", None).with_scope("test");
        editor.append_dependency(container, &dep, Some("1.0"));
        assert_eq!(
            doc.serialize_result(),
            "<project>\n    <dependencies>\n        <dependency>\n            <groupId>g</groupId>\n            <artifactId>a</artifactId>\n            <version>1.0</version>\n            <scope>test</scope>\n        </dependency>\n    </dependencies>\n</project>\n"
        );
    }

    #[test]
    fn version_is_added_after_artifact_id() {
        let mut doc = doc("<project><dependencies><dependency><groupId>g</groupId><artifactId>a</artifactId><scope>test</scope></dependency></dependencies></project>");
        let mut editor = PomEditor::new(&mut doc).unwrap();
        let dep = editor.find_dependency(DEPENDENCIES, "g", "a").unwrap();
        assert_eq!(editor.version_slot(dep), None);
        editor.add_version(dep, "2.0");
        let slot = editor.version_slot(dep).unwrap();
        assert_eq!(editor.text(slot), "2.0");
        let text = doc.serialize_result();
        assert!(text.find("<version>").unwrap() < text.find("<scope>").unwrap());
    }

    #[test]
    fn unchanged_text_is_not_an_edit() {
        let mut doc = doc("<project><properties><v>1</v></properties></project>");
        let mut editor = PomEditor::new(&mut doc).unwrap();
        assert_eq!(editor.property(&PropertyScope::Project, "v").as_deref(), Some("1"));
        editor.set_property(&PropertyScope::Project, "v", "1");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn profile_properties_are_created_in_profile_order() {
        let mut doc = doc(
            "<project>\n  <profiles>\n    <profile>\n      <id>p</id>\n      <dependencies/>\n    </profile>\n  </profiles>\n</project>\n",
        );
        let mut editor = PomEditor::new(&mut doc).unwrap();
        let scope = PropertyScope::Profile("p".to_string());
        assert_eq!(editor.property(&scope, "v"), None);
        assert!(editor.set_property(&scope, "v", "2"));
        assert!(!editor.set_property(&PropertyScope::Profile("missing".to_string()), "v", "2"));
        assert_eq!(editor.property(&scope, "v").as_deref(), Some("2"));
        assert_eq!(editor.property(&PropertyScope::Project, "v"), None);
        assert_eq!(
            doc.serialize_result(),
            "<project>\n  <profiles>\n    <profile>\n      <id>p</id>\n      <properties>\n        <v>2</v>\n      </properties>\n      <dependencies/>\n    </profile>\n  </profiles>\n</project>\n"
        );
    }
}
