//! Formatting-preserving XML documents for POM editing.
//!
//! The crate keeps two concerns apart:
//! - [`XmlTree`]: an arena tree that retains the raw text of every node, so an
//!   untouched region serializes back to the same characters it was parsed from.
//! - [`FormatInfo`]: the per-document formatting facts (preamble, suffix,
//!   indentation, charset) captured before editing and re-applied to the
//!   serialized text afterwards.
//!
//! Nothing here knows about Maven; the POM vocabulary lives in `pomkit-project`.

mod charset;
mod format;
mod semantic;
mod tree;

pub use charset::Charset;
pub use format::{empty_elements, root_start_tag_span, EmptyElement, FormatInfo, IndentStyle, LineEnding};
pub use semantic::semantically_equal;
pub use tree::{Element, NodeId, NodeKind, XmlTree};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {source}")]
    Parse {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed attribute at byte {position}: {message}")]
    Attribute { position: usize, message: String },

    #[error("unclosed element `{name}` at end of document")]
    Unclosed { name: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("bytes are not valid {charset}")]
    Decode { charset: &'static str },

    #[error("unsupported encoding `{label}`")]
    UnsupportedEncoding { label: String },
}

pub type Result<T> = std::result::Result<T, XmlError>;
