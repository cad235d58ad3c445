//! Maven integration for dependency queries.
//!
//! Two families of backends live here:
//! - running Maven's `dependency:tree` goal through a [`CommandRunner`], and
//! - an in-process [`Resolver`] that walks POMs in the local repository,
//!   downloading missing ones through an [`ArtifactFetcher`].

mod command;
mod fetch;
mod maven;
mod resolve;
mod tree;

pub use command::{CommandOutput, CommandRunner, DefaultCommandRunner};
pub use fetch::{ArtifactFetcher, HttpFetcher, MAVEN_CENTRAL};
pub use maven::{DependencyTreeRequest, DependencyTreeRun, InvocationMode, MavenBuild, MavenConfig};
pub use resolve::Resolver;
pub use tree::{parse_dependency_tree, DependencyNode};

use pomkit_project::ProjectError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `errors` holds the `[ERROR]` messages of the run; the full streams are
    /// kept for callers that want to show them.
    #[error(
        "{tool} command `{command}` failed with exit code {code:?}{}",
        render_errors(.errors)
    )]
    CommandFailed {
        tool: &'static str,
        command: String,
        code: Option<i32>,
        errors: Vec<String>,
        stdout: String,
        stderr: String,
    },

    #[error("could not find a `{name}` executable")]
    ExecutableNotFound { name: String },

    #[error("failed to parse build output: {0}")]
    Parse(String),

    #[error("HTTP request for {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("artifact {coordinate} is not available: {reason}")]
    ArtifactMissing {
        coordinate: String,
        reason: &'static str,
    },

    #[error("invalid model for {coordinate}: {}", .problems.join("; "))]
    Model {
        coordinate: String,
        problems: Vec<String>,
    },

    #[error(transparent)]
    Project(#[from] ProjectError),
}

pub type Result<T> = std::result::Result<T, BuildError>;

fn render_errors(errors: &[String]) -> String {
    match errors {
        [] => String::new(),
        [only] => format!(": {only}"),
        many => format!(":\n  {}", many.join("\n  ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failures_show_maven_errors() {
        let err = BuildError::CommandFailed {
            tool: "maven",
            command: "mvn -B -q".to_string(),
            code: Some(1),
            errors: vec!["Failed to execute goal".to_string()],
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "maven command `mvn -B -q` failed with exit code Some(1): Failed to execute goal"
        );
    }
}
