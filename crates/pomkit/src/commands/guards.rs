use pomkit_project::ProjectModel;

use crate::chain::{Command, Outcome};
use crate::{PomError, Result};

/// Rejects modification requests without a dependency.
#[derive(Debug, Default)]
pub struct CheckDependencyPresent;

impl Command<ProjectModel> for CheckDependencyPresent {
    fn name(&self) -> &'static str {
        "check-dependency-present"
    }

    fn is_support(&self) -> bool {
        true
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        if model.is_mutation() && model.dependency().is_none() {
            return Err(PomError::MissingDependency);
        }
        Ok(Outcome::NotApplicable)
    }
}

/// For multi-module requests: ancestors must be `pom` packaged and each
/// document must name the next one as its `<parent>`.
#[derive(Debug, Default)]
pub struct CheckParentPackaging;

impl Command<ProjectModel> for CheckParentPackaging {
    fn name(&self) -> &'static str {
        "check-parent-packaging"
    }

    fn is_support(&self) -> bool {
        true
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        let documents = model.all_documents();
        for ancestor in model.ancestors() {
            let packaging = ancestor.raw().packaging();
            if packaging != "pom" {
                return Err(PomError::WrongDependencyType {
                    location: ancestor.source().to_string(),
                    packaging: packaging.to_string(),
                });
            }
        }

        for pair in documents.windows(2) {
            let (child, parent) = (&pair[0], pair[1].raw());
            let expected = format!(
                "{}:{}",
                parent.effective_group_id().unwrap_or("?"),
                parent.artifact_id.as_deref().unwrap_or("?")
            );
            let linked = child.raw().parent.as_ref().is_some_and(|declared| {
                parent.effective_group_id() == Some(declared.group_id.as_str())
                    && parent.artifact_id.as_deref() == Some(declared.artifact_id.as_str())
            });
            if !linked {
                return Err(PomError::InvalidParent {
                    location: child.source().to_string(),
                    expected,
                });
            }
        }
        Ok(Outcome::NotApplicable)
    }
}

#[cfg(test)]
mod tests {
    use pomkit_project::{Dependency, DocumentSource, PomDocument, ProjectModelFactory};

    use super::*;

    fn doc(text: &str) -> PomDocument {
        PomDocument::from_bytes(text.as_bytes().to_vec(), DocumentSource::Memory).unwrap()
    }

    const PARENT: &str = "<project><groupId>g</groupId><artifactId>parent</artifactId><version>1</version><packaging>pom</packaging></project>";
    const CHILD: &str = "<project><parent><groupId>g</groupId><artifactId>parent</artifactId><version>1</version></parent><artifactId>child</artifactId></project>";

    #[test]
    fn mutations_need_a_dependency() {
        let mut model = ProjectModelFactory::new(doc(CHILD)).build();
        assert!(matches!(
            CheckDependencyPresent.execute(&mut model),
            Err(PomError::MissingDependency)
        ));

        let mut model = ProjectModelFactory::new(doc(CHILD))
            .with_dependency(Dependency::new("g", "a", Some("1".into())))
            .build();
        assert_eq!(
            CheckDependencyPresent.execute(&mut model).unwrap(),
            Outcome::NotApplicable
        );
    }

    #[test]
    fn accepts_linked_pom_parents() {
        let mut model = ProjectModelFactory::new(doc(CHILD))
            .with_parent_poms(vec![doc(PARENT)])
            .build();
        assert_eq!(
            CheckParentPackaging.execute(&mut model).unwrap(),
            Outcome::NotApplicable
        );
    }

    #[test]
    fn rejects_jar_ancestors() {
        let jar_parent = PARENT.replace("<packaging>pom</packaging>", "");
        let mut model = ProjectModelFactory::new(doc(CHILD))
            .with_parent_poms(vec![doc(&jar_parent)])
            .build();
        assert!(matches!(
            CheckParentPackaging.execute(&mut model),
            Err(PomError::WrongDependencyType { packaging, .. }) if packaging == "jar"
        ));
    }

    #[test]
    fn rejects_unrelated_ancestors() {
        let other = PARENT.replace("<artifactId>parent</artifactId>", "<artifactId>other</artifactId>");
        let mut model = ProjectModelFactory::new(doc(CHILD))
            .with_parent_poms(vec![doc(&other)])
            .build();
        assert!(matches!(
            CheckParentPackaging.execute(&mut model),
            Err(PomError::InvalidParent { expected, .. }) if expected == "g:other"
        ));
    }
}
