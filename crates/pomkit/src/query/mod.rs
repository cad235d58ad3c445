//! Dependency queries: interchangeable strategies tried in priority order
//! until one produces a dependency list.

mod maven;
mod resolver;
mod static_parse;

use std::path::PathBuf;
use std::sync::Arc;

use pomkit_build::{
    ArtifactFetcher, CommandRunner, DefaultCommandRunner, HttpFetcher, MavenConfig,
};
use pomkit_project::{Dependency, MavenEnvironment, ProjectError, ProjectModel, QueryType};

use crate::chain::{Chain, ChainContext, Command, Outcome};
use crate::config::PomkitConfig;
use crate::Result;

pub use maven::MavenTreeStrategy;
pub use resolver::ResolverStrategy;
pub use static_parse::StaticParseStrategy;

/// What a strategy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Resolved(Vec<Dependency>),
    /// The strategy cannot answer here; the next one is tried.
    Unavailable(String),
}

pub trait QueryStrategy {
    fn kind(&self) -> QueryStrategyKind;

    /// Expected inability to answer is [`StrategyOutcome::Unavailable`];
    /// errors abort the query.
    fn query(&self, state: &QueryState<'_>) -> Result<StrategyOutcome>;
}

/// Registry of query strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStrategyKind {
    Resolver,
    Embedder,
    Invoker,
    StaticParse,
}

impl QueryStrategyKind {
    pub const ALL: [QueryStrategyKind; 4] = [
        QueryStrategyKind::Resolver,
        QueryStrategyKind::Embedder,
        QueryStrategyKind::Invoker,
        QueryStrategyKind::StaticParse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            QueryStrategyKind::Resolver => "resolver",
            QueryStrategyKind::Embedder => "embedder",
            QueryStrategyKind::Invoker => "invoker",
            QueryStrategyKind::StaticParse => "static-parse",
        }
    }

    /// Safe strategies never run build logic from the project.
    pub fn is_safe(self) -> bool {
        matches!(self, QueryStrategyKind::Resolver | QueryStrategyKind::StaticParse)
    }

    pub fn create(self) -> Box<dyn QueryStrategy> {
        match self {
            QueryStrategyKind::Resolver => Box::new(ResolverStrategy),
            QueryStrategyKind::Embedder => Box::new(MavenTreeStrategy::embedder()),
            QueryStrategyKind::Invoker => Box::new(MavenTreeStrategy::invoker()),
            QueryStrategyKind::StaticParse => Box::new(StaticParseStrategy),
        }
    }

    pub fn selected(query_type: QueryType) -> Vec<QueryStrategyKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| match query_type {
                QueryType::None => false,
                QueryType::Safe => kind.is_safe(),
                QueryType::Unsafe => true,
            })
            .collect()
    }
}

/// Collaborators the query strategies run with.
#[derive(Debug, Clone)]
pub struct QueryEnvironment {
    pub runner: Arc<dyn CommandRunner>,
    pub maven: MavenConfig,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub maven_environment: MavenEnvironment,
    /// Used when the request does not name a local repository.
    pub local_repository: Option<PathBuf>,
    /// Forces offline queries.
    pub offline: bool,
}

impl Default for QueryEnvironment {
    fn default() -> Self {
        Self::from_config(&PomkitConfig::default())
    }
}

impl QueryEnvironment {
    pub fn from_config(config: &PomkitConfig) -> Self {
        let maven = config.maven.to_maven_config();
        Self {
            runner: Arc::new(DefaultCommandRunner::new(maven.timeout)),
            fetcher: Arc::new(
                HttpFetcher::new(config.query.remote_repository.clone()).with_timeout(maven.timeout),
            ),
            maven,
            maven_environment: MavenEnvironment::from_env(),
            local_repository: config.maven.local_repository.clone(),
            offline: config.maven.offline,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_maven(mut self, maven: MavenConfig) -> Self {
        self.maven = maven;
        self
    }

    pub fn with_maven_environment(mut self, environment: MavenEnvironment) -> Self {
        self.maven_environment = environment;
        self
    }
}

/// Context of one query run. The strategy that answers stores its result
/// here.
#[derive(Debug)]
pub struct QueryState<'a> {
    pub model: &'a ProjectModel,
    pub env: &'a QueryEnvironment,
    pub local_repository: Option<PathBuf>,
    pub offline: bool,
    pub result: Option<Vec<Dependency>>,
    pub answered_by: Option<QueryStrategyKind>,
}

impl<'a> QueryState<'a> {
    pub fn new(model: &'a ProjectModel, env: &'a QueryEnvironment) -> Self {
        let explicit = model.repository_path().or(env.local_repository.as_deref());
        Self {
            model,
            env,
            local_repository: env.maven_environment.local_repository(explicit),
            offline: model.offline() || env.offline,
            result: None,
            answered_by: None,
        }
    }
}

impl ChainContext for QueryState<'_> {
    fn is_mutation(&self) -> bool {
        self.model.is_mutation()
    }

    fn mark_modified_by_command(&mut self) {}
}

/// Creates the local repository before any strategy runs.
#[derive(Debug, Default)]
pub struct CheckLocalRepository;

impl<'a> Command<QueryState<'a>> for CheckLocalRepository {
    fn name(&self) -> &'static str {
        "check-local-repository"
    }

    fn is_support(&self) -> bool {
        true
    }

    fn execute(&mut self, state: &mut QueryState<'a>) -> Result<Outcome> {
        if let Some(repository) = &state.local_repository {
            std::fs::create_dir_all(repository).map_err(|source| ProjectError::Io {
                path: repository.clone(),
                source,
            })?;
        }
        Ok(Outcome::NotApplicable)
    }
}

struct StrategyCommand {
    strategy: Box<dyn QueryStrategy>,
}

impl<'a> Command<QueryState<'a>> for StrategyCommand {
    fn name(&self) -> &'static str {
        self.strategy.kind().name()
    }

    fn execute(&mut self, state: &mut QueryState<'a>) -> Result<Outcome> {
        let kind = self.strategy.kind();
        match self.strategy.query(state)? {
            StrategyOutcome::Resolved(dependencies) => {
                tracing::info!(
                    target: "pomkit.query",
                    strategy = kind.name(),
                    dependencies = dependencies.len(),
                    "query answered"
                );
                state.result = Some(dependencies);
                state.answered_by = Some(kind);
                Ok(Outcome::Handled)
            }
            StrategyOutcome::Unavailable(reason) => {
                tracing::warn!(
                    target: "pomkit.query",
                    strategy = kind.name(),
                    reason = %reason,
                    "strategy unavailable"
                );
                Ok(Outcome::NotApplicable)
            }
        }
    }
}

/// Builds a fresh query chain for `query_type`.
pub fn query_chain<'a>(query_type: QueryType) -> Chain<QueryState<'a>> {
    let mut commands: Vec<Box<dyn Command<QueryState<'a>>>> = vec![Box::new(CheckLocalRepository)];
    for kind in QueryStrategyKind::selected(query_type) {
        commands.push(Box::new(StrategyCommand {
            strategy: kind.create(),
        }));
    }
    Chain::new(commands)
}
