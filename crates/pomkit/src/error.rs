use pomkit_build::BuildError;
use pomkit_project::ProjectError;
use pomkit_xml::XmlError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum PomError {
    #[error("no dependency given for a modification request")]
    MissingDependency,

    #[error("{location} has packaging `{packaging}`; ancestor POMs must use `pom`")]
    WrongDependencyType { location: String, packaging: String },

    #[error("{location} does not declare {expected} as its parent")]
    InvalidParent { location: String, expected: String },

    #[error(
        "property `{property}` is shared and holds `{existing}`; refusing to change it to `{requested}` without override"
    )]
    AmbiguousProperty {
        property: String,
        existing: String,
        requested: String,
    },

    #[error("query strategy {strategy} failed")]
    StrategyFailed {
        strategy: &'static str,
        #[source]
        source: BuildError,
    },

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, PomError>;
