//! Formatting-preserving edits and dependency queries for Maven POMs.
//!
//! Build a [`ProjectModel`] with [`ProjectModelFactory`] (or
//! [`PomScanner`] to pick up parent POMs), then either
//!
//! - [`modify`] it to add or upgrade the requested dependency; each
//!   document's result bytes keep the original layout, encoding and
//!   empty-element spelling, or
//! - [`query_dependency`] it to list the project's dependencies through the
//!   strategies its [`QueryType`] allows.

pub mod chain;
pub mod commands;
pub mod config;
mod edit;
mod error;
pub mod logging;
pub mod query;
mod version_policy;

pub use config::{ConfigError, LoggingConfig, MavenSettings, PomkitConfig, QuerySettings};
pub use error::{PomError, Result};
pub use logging::init_tracing;
pub use pomkit_project::{
    Dependency, DocumentSource, ManagedTarget, PomDocument, PomScanner, ProjectModel,
    ProjectModelFactory, QueryType,
};
pub use query::{QueryEnvironment, QueryStrategyKind};

/// Adds or upgrades the request's dependency.
///
/// Returns whether a command handled the request. Afterwards every document
/// has result bytes: the edited content, or the original bytes verbatim when
/// nothing changed semantically.
pub fn modify(model: &mut ProjectModel) -> Result<bool> {
    let handled = commands::modify_chain().run(model)?;
    tracing::debug!(
        target: "pomkit",
        handled,
        dirty = model.all_documents().iter().filter(|doc| doc.is_dirty()).count(),
        "modification finished"
    );
    Ok(handled)
}

/// Lists the dependencies of the request's target using the default
/// environment (Maven from `PATH`, Maven Central).
pub fn query_dependency(model: &ProjectModel) -> Result<Vec<Dependency>> {
    query_dependency_with(model, &QueryEnvironment::default())
}

/// Like [`query_dependency`] with explicit collaborators.
///
/// Strategies that cannot answer are skipped; when none answers the result
/// is empty.
pub fn query_dependency_with(
    model: &ProjectModel,
    env: &QueryEnvironment,
) -> Result<Vec<Dependency>> {
    if model.query_type() == QueryType::None {
        return Ok(Vec::new());
    }

    let mut state = query::QueryState::new(model, env);
    query::query_chain(model.query_type()).run(&mut state)?;
    if state.answered_by.is_none() {
        tracing::warn!(target: "pomkit.query", "no query strategy could answer");
    }
    Ok(state.result.unwrap_or_default())
}
