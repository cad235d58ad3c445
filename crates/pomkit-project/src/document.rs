use std::fmt;
use std::path::{Path, PathBuf};

use pomkit_xml::{semantically_equal, Charset, FormatInfo, IndentStyle, XmlTree};

use crate::pom::PomView;
use crate::raw::RawPom;
use crate::{ProjectError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
    /// Bytes handed over directly by the caller.
    Memory,
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
            DocumentSource::Url(url) => f.write_str(url),
            DocumentSource::Memory => f.write_str("<memory>"),
        }
    }
}

/// One POM file: its original bytes, a read-only parse of them and an
/// editable copy of the tree.
///
/// Edits only ever touch the result tree. `original_bytes` are kept so an
/// unchanged document can be handed back exactly as it was read.
#[derive(Debug, Clone)]
pub struct PomDocument {
    source: DocumentSource,
    original_bytes: Vec<u8>,
    original_text: String,
    charset: Charset,
    original: XmlTree,
    result: XmlTree,
    raw: RawPom,
    format: Option<FormatInfo>,
    result_bytes: Option<Vec<u8>>,
    dirty: bool,
}

impl PomDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes, DocumentSource::Path(path.to_path_buf()))
    }

    pub fn from_bytes(bytes: Vec<u8>, source: DocumentSource) -> Result<Self> {
        let xml_error = |source_err| ProjectError::Xml {
            location: source.to_string(),
            source: source_err,
        };
        let charset = Charset::detect(&bytes).map_err(xml_error)?;
        let text = charset.decode(&bytes).map_err(xml_error)?;
        let original = XmlTree::parse(&text).map_err(xml_error)?;
        let raw = RawPom::parse(&text, &source.to_string())?;

        Ok(Self {
            result: original.clone(),
            source,
            original_bytes: bytes,
            original_text: text,
            charset,
            original,
            raw,
            format: None,
            result_bytes: None,
            dirty: false,
        })
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            DocumentSource::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Content of the document as it was read.
    pub fn raw(&self) -> &RawPom {
        &self.raw
    }

    pub fn result_tree(&self) -> &XmlTree {
        &self.result
    }

    /// Mutable access to the result tree. Callers that change it structurally
    /// must also call [`PomDocument::mark_dirty`].
    pub fn result_tree_mut(&mut self) -> &mut XmlTree {
        &mut self.result
    }

    pub fn pom(&self) -> Option<PomView<'_>> {
        PomView::new(&self.result)
    }

    /// Captures formatting facts from the original text. Idempotent.
    pub fn capture_format(&mut self) -> Result<&FormatInfo> {
        let info = match self.format.take() {
            Some(info) => info,
            None => FormatInfo::capture(&self.original_text, self.charset).map_err(|source| {
                ProjectError::Xml {
                    location: self.source.to_string(),
                    source,
                }
            })?,
        };
        Ok(self.format.insert(info))
    }

    pub fn format(&self) -> Option<&FormatInfo> {
        self.format.as_ref()
    }

    /// Indentation for inserted elements; two spaces until formatting has been
    /// captured.
    pub fn indent_style(&self) -> IndentStyle {
        self.format
            .as_ref()
            .map(|f| f.indent().clone())
            .unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the result tree differs in content from the original.
    pub fn has_semantic_changes(&self) -> bool {
        !semantically_equal(&self.original, &self.result)
    }

    /// Declares the document unchanged: the result is the original bytes.
    pub fn discard_changes(&mut self) {
        self.dirty = false;
        self.result_bytes = Some(self.original_bytes.clone());
    }

    pub fn serialize_result(&self) -> String {
        self.result.to_xml_string()
    }

    pub fn result_bytes(&self) -> Option<&[u8]> {
        self.result_bytes.as_deref()
    }

    pub fn set_result_bytes(&mut self, bytes: Vec<u8>) {
        self.result_bytes = Some(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_tree_starts_as_copy_of_original() {
        let doc = PomDocument::from_bytes(
            b"<project><artifactId>a</artifactId></project>".to_vec(),
            DocumentSource::Memory,
        )
        .unwrap();
        assert!(!doc.is_dirty());
        assert!(!doc.has_semantic_changes());
        assert_eq!(doc.serialize_result(), doc.original_text());
        assert_eq!(doc.raw().artifact_id.as_deref(), Some("a"));
    }

    #[test]
    fn malformed_documents_fail_to_load() {
        let err = PomDocument::from_bytes(b"<project>".to_vec(), DocumentSource::Memory).unwrap_err();
        assert!(matches!(err, ProjectError::Xml { .. }));
    }

    #[test]
    fn discard_restores_original_bytes() {
        let bytes = b"<project>\n  <x></x>\n</project>\n".to_vec();
        let mut doc = PomDocument::from_bytes(bytes.clone(), DocumentSource::Memory).unwrap();
        doc.mark_dirty();
        doc.discard_changes();
        assert!(!doc.is_dirty());
        assert_eq!(doc.result_bytes(), Some(bytes.as_slice()));
    }
}
