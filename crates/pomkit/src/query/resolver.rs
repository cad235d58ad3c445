use pomkit_build::{ArtifactFetcher, Resolver};
use pomkit_project::RawPom;

use super::{QueryState, QueryStrategy, QueryStrategyKind, StrategyOutcome};
use crate::Result;

/// Resolves the transitive graph in process against the local repository,
/// downloading missing POMs unless offline.
#[derive(Debug, Default)]
pub struct ResolverStrategy;

impl QueryStrategy for ResolverStrategy {
    fn kind(&self) -> QueryStrategyKind {
        QueryStrategyKind::Resolver
    }

    fn query(&self, state: &QueryState<'_>) -> Result<StrategyOutcome> {
        let Some(repository) = &state.local_repository else {
            return Ok(StrategyOutcome::Unavailable(
                "no local repository could be determined".to_string(),
            ));
        };

        let fetcher: Option<&dyn ArtifactFetcher> =
            (!state.offline).then(|| state.env.fetcher.as_ref());
        let mut resolver = Resolver::new(repository, fetcher, state.model.profile_selection());

        let lineage: Vec<RawPom> = state
            .model
            .all_documents()
            .iter()
            .rev()
            .map(|doc| doc.raw().clone())
            .collect();

        let outcome = resolver
            .effective_model(lineage)
            .and_then(|model| resolver.resolve(&model));
        Ok(match outcome {
            Ok(dependencies) => StrategyOutcome::Resolved(dependencies),
            Err(err) => StrategyOutcome::Unavailable(err.to_string()),
        })
    }
}
