//! POM documents, edit requests and the project hierarchy.
//!
//! - [`PomDocument`]: one POM file, its original bytes and an editable copy of its tree.
//! - [`ProjectModel`]: an edit or query request over a target POM and its ancestors, built by
//!   [`ProjectModelFactory`] (directly, or through [`PomScanner`]).
//! - [`RawPom`] / [`EffectiveModel`]: a read-only view of POM content with inheritance,
//!   profiles and property interpolation applied.

mod dependency;
mod document;
mod effective;
mod model;
mod pom;
mod raw;
mod repository;
mod scanner;
pub mod version;

pub use dependency::Dependency;
pub use document::{DocumentSource, PomDocument};
pub use effective::{interpolate, EffectiveModel, UNKNOWN_VERSION};
pub use model::{ManagedTarget, ProjectModel, ProjectModelFactory, QueryType};
pub use pom::{PomView, POM_NAMESPACE};
pub use raw::{DeclaredDependency, ParentRef, ProfileSelection, RawPom, RawProfile, RelativePath};
pub use repository::{artifact_path, pom_path, MavenEnvironment, SystemProperties};
pub use scanner::PomScanner;

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPathKind {
    /// The file was already part of the hierarchy.
    Loop,
    /// The path resolves outside the top-level project directory.
    EscapesBoundary,
    /// Absolute or home-relative paths are never followed.
    Absolute,
}

impl fmt::Display for InvalidPathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidPathKind::Loop => "parent hierarchy loops back to an already loaded POM",
            InvalidPathKind::EscapesBoundary => "path escapes the top-level project directory",
            InvalidPathKind::Absolute => "absolute parent paths are not allowed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse XML in {location}: {source}")]
    Xml {
        location: String,
        #[source]
        source: pomkit_xml::XmlError,
    },

    #[error("failed to parse POM {location}: {source}")]
    Pom {
        location: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("invalid parent path {path}: {kind}")]
    InvalidPath { path: PathBuf, kind: InvalidPathKind },

    #[error("invalid dependency coordinate `{value}`: {reason}")]
    InvalidCoordinate { value: String, reason: &'static str },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("invalid project model: {message}")]
    Model { message: String },
}

pub type Result<T> = std::result::Result<T, ProjectError>;
