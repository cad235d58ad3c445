use pomkit_xml::{NodeId, XmlTree};

pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";

/// Read-only navigation over a POM tree.
///
/// Elements are matched by local name within the root element's namespace, so
/// `<project xmlns="...POM/4.0.0">` and prefixed or unqualified documents are
/// navigated the same way.
#[derive(Debug, Clone, Copy)]
pub struct PomView<'a> {
    tree: &'a XmlTree,
    root: NodeId,
    namespace: Option<&'a str>,
}

impl<'a> PomView<'a> {
    pub fn new(tree: &'a XmlTree) -> Option<Self> {
        let root = tree.root_element()?;
        Some(Self {
            tree,
            root,
            namespace: tree.namespace_uri(root),
        })
    }

    pub fn tree(&self) -> &'a XmlTree {
        self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.namespace
    }

    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.tree.child_named(node, self.namespace, name)
    }

    pub fn child_text(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree.child_text(node, self.namespace, name)
    }

    pub fn children(&self, node: NodeId, name: &str) -> Vec<NodeId> {
        self.tree.children_named(node, self.namespace, name).collect()
    }

    /// Elements at `path` below the root element.
    pub fn select(&self, path: &[&str]) -> Vec<NodeId> {
        self.tree.select(self.root, self.namespace, path)
    }

    /// `<dependency>` elements below `container` (`dependencies` or
    /// `dependencyManagement/dependencies`) whose coordinates match.
    pub fn find_dependencies(
        &self,
        container: &[&str],
        group_id: &str,
        artifact_id: &str,
    ) -> Vec<NodeId> {
        let mut path = container.to_vec();
        path.push("dependency");
        self.select(&path)
            .into_iter()
            .filter(|dep| {
                self.child_text(*dep, "groupId").as_deref() == Some(group_id)
                    && self.child_text(*dep, "artifactId").as_deref() == Some(artifact_id)
            })
            .collect()
    }

    /// The `<properties>/<name>` element, if declared.
    pub fn property(&self, name: &str) -> Option<NodeId> {
        let properties = self.child(self.root, "properties")?;
        self.child(properties, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_dependencies_in_both_containers() {
        let tree = XmlTree::parse(
            r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
  <properties><v>1</v></properties>
  <dependencyManagement><dependencies>
    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>${v}</version></dependency>
  </dependencies></dependencyManagement>
  <dependencies>
    <dependency><groupId>g</groupId><artifactId>a</artifactId></dependency>
    <dependency><groupId>g</groupId><artifactId>b</artifactId></dependency>
  </dependencies>
</project>"#,
        )
        .unwrap();
        let pom = PomView::new(&tree).unwrap();
        assert_eq!(pom.namespace(), Some(POM_NAMESPACE));
        assert_eq!(pom.find_dependencies(&["dependencies"], "g", "a").len(), 1);
        assert_eq!(
            pom.find_dependencies(&["dependencyManagement", "dependencies"], "g", "a").len(),
            1
        );
        let v = pom.property("v").unwrap();
        assert_eq!(tree.text(v), "1");
    }

    #[test]
    fn unqualified_documents_are_navigable() {
        let tree = XmlTree::parse("<project><packaging>pom</packaging></project>").unwrap();
        let pom = PomView::new(&tree).unwrap();
        assert_eq!(pom.child_text(pom.root(), "packaging").as_deref(), Some("pom"));
    }
}
