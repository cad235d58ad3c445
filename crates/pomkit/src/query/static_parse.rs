use pomkit_project::{EffectiveModel, RawPom};

use super::{QueryState, QueryStrategy, QueryStrategyKind, StrategyOutcome};
use crate::Result;

/// Reads the direct dependencies out of the request's POMs without any build
/// tool. Unresolvable property references become `UNKNOWN`.
#[derive(Debug, Default)]
pub struct StaticParseStrategy;

impl QueryStrategy for StaticParseStrategy {
    fn kind(&self) -> QueryStrategyKind {
        QueryStrategyKind::StaticParse
    }

    fn query(&self, state: &QueryState<'_>) -> Result<StrategyOutcome> {
        let lineage: Vec<&RawPom> = state
            .model
            .all_documents()
            .iter()
            .rev()
            .map(|doc| doc.raw())
            .collect();
        let model = EffectiveModel::build(&lineage, &state.model.profile_selection());

        for dependency in &model.dependencies {
            let (Some(group_id), Some(artifact_id)) = (&dependency.group_id, &dependency.artifact_id)
            else {
                return Ok(StrategyOutcome::Unavailable(
                    "a dependency is missing groupId or artifactId".to_string(),
                ));
            };
            if dependency.version.is_none() {
                return Ok(StrategyOutcome::Unavailable(format!(
                    "{group_id}:{artifact_id} has no version and no managed version"
                )));
            }
        }

        Ok(StrategyOutcome::Resolved(model.to_dependencies()))
    }
}
