use pomkit_build::{
    parse_dependency_tree, BuildError, DependencyTreeRequest, InvocationMode, MavenBuild,
};

use super::{QueryState, QueryStrategy, QueryStrategyKind, StrategyOutcome};
use crate::{PomError, Result};

/// Exit code of a Maven run that failed before producing a tree (unresolvable
/// model, missing plugin offline, ...).
const BUILD_FAILURE_EXIT_CODE: i32 = 1;

/// Runs `dependency:tree` with the project's Maven installation.
#[derive(Debug)]
pub struct MavenTreeStrategy {
    mode: InvocationMode,
}

impl MavenTreeStrategy {
    /// Quiet run writing the tree to a file. A failed run without output
    /// makes the strategy unavailable.
    pub fn embedder() -> Self {
        Self {
            mode: InvocationMode::Embedded,
        }
    }

    /// Regular run scraping the tree from the log. Any failed run is fatal.
    pub fn invoker() -> Self {
        Self {
            mode: InvocationMode::External,
        }
    }

    fn failed(&self, source: BuildError) -> PomError {
        PomError::StrategyFailed {
            strategy: self.kind().name(),
            source,
        }
    }
}

impl QueryStrategy for MavenTreeStrategy {
    fn kind(&self) -> QueryStrategyKind {
        match self.mode {
            InvocationMode::Embedded => QueryStrategyKind::Embedder,
            InvocationMode::External => QueryStrategyKind::Invoker,
        }
    }

    fn query(&self, state: &QueryState<'_>) -> Result<StrategyOutcome> {
        let Some(pom) = state.model.target().path() else {
            return Ok(StrategyOutcome::Unavailable(
                "target POM is not a file on disk".to_string(),
            ));
        };

        let build = MavenBuild::with_runner(state.env.maven.clone(), state.env.runner.clone());
        let request = DependencyTreeRequest {
            pom: pom.to_path_buf(),
            local_repository: state.local_repository.clone(),
            offline: state.offline,
            profiles: state.model.profile_selection().to_cli_argument(),
        };

        let run = match build.dependency_tree(&request, self.mode) {
            Ok(run) => run,
            Err(BuildError::ExecutableNotFound { name }) => {
                return Ok(StrategyOutcome::Unavailable(format!(
                    "Maven executable `{name}` not found"
                )))
            }
            Err(err) => return Err(self.failed(err)),
        };

        let parsed = if run.tree.trim().is_empty() {
            Err(BuildError::Parse("empty dependency tree output".to_string()))
        } else {
            parse_dependency_tree(&run.tree)
        };

        if !run.success() {
            if self.mode == InvocationMode::Embedded
                && run.exit_code() == Some(BUILD_FAILURE_EXIT_CODE)
                && parsed.is_err()
            {
                return Ok(StrategyOutcome::Unavailable(format!(
                    "`{}` exited with code {BUILD_FAILURE_EXIT_CODE} without a dependency tree",
                    run.command
                )));
            }
            return Err(self.failed(run.into_error()));
        }

        let nodes = parsed.map_err(|err| self.failed(err))?;
        Ok(StrategyOutcome::Resolved(
            nodes.into_iter().map(|node| node.dependency).collect(),
        ))
    }
}
