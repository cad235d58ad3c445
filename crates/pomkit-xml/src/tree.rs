use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::format::IndentStyle;
use crate::{Result, XmlError};

/// Index of a node inside an [`XmlTree`] arena.
///
/// Ids stay valid for the lifetime of the tree they came from, and for any
/// clone of it: cloning copies the arena, so the same id addresses the same
/// node in both copies until one of them is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    /// Character data exactly as written, entity references included.
    Text(String),
    CData(String),
    Comment(String),
    /// Content of `<?xml ...?>` without the delimiters.
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    /// Verbatim text between the tag name and `>` (or `/>`), leading
    /// whitespace included.
    raw_attributes: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_attributes: String::new(),
            attributes: Vec::new(),
        }
    }

    /// Qualified name as written (`dependency`, `pom:dependency`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed XML document.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
}

impl XmlTree {
    /// Parses `text` with quick-xml's streaming reader, keeping whitespace,
    /// comments and the raw spelling of text and attributes.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut tree = Self::empty();
        let mut stack = vec![tree.document()];

        loop {
            let position = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|source| XmlError::Parse {
                position: reader.error_position() as usize,
                source,
            })?;
            let parent = *stack.last().unwrap_or(&NodeId(0));

            match event {
                Event::Start(start) => {
                    let element = element_from_start(&start, position)?;
                    let id = tree.push_child(parent, NodeKind::Element(element));
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, position)?;
                    tree.push_child(parent, NodeKind::Element(element));
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Text(text) => {
                    tree.push_child(parent, NodeKind::Text(lossy(&text)));
                }
                Event::CData(data) => {
                    tree.push_child(parent, NodeKind::CData(lossy(&data)));
                }
                Event::Comment(comment) => {
                    tree.push_child(parent, NodeKind::Comment(lossy(&comment)));
                }
                Event::Decl(decl) => {
                    tree.push_child(parent, NodeKind::Declaration(lossy(&decl)));
                }
                Event::PI(pi) => {
                    tree.push_child(parent, NodeKind::ProcessingInstruction(lossy(&pi)));
                }
                Event::DocType(doctype) => {
                    tree.push_child(parent, NodeKind::DocType(lossy(&doctype)));
                }
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            let name = stack
                .last()
                .and_then(|id| tree.element(*id))
                .map(|e| e.name.clone())
                .unwrap_or_default();
            return Err(XmlError::Unclosed { name });
        }
        if tree.root_element().is_none() {
            return Err(XmlError::NoRootElement);
        }

        Ok(tree)
    }

    fn empty() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind);
        self.attach(parent, None, id);
        id
    }

    fn attach(&mut self, parent: NodeId, index: Option<usize>, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        let children = &mut self.nodes[parent.index()].children;
        match index {
            Some(index) if index <= children.len() => children.insert(index, child),
            _ => children.push(child),
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document())
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.is_element(*child))
    }

    /// Number of element ancestors; the root element has depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if self.is_element(parent) {
                depth += 1;
            }
            current = self.parent(parent);
        }
        depth
    }

    /// Namespace URI bound to the element's prefix (or the default namespace),
    /// looked up through `xmlns` declarations on the element and its ancestors.
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let element = self.element(id)?;
        let key: Cow<'_, str> = match element.prefix() {
            Some(prefix) => Cow::Owned(format!("xmlns:{prefix}")),
            None => Cow::Borrowed("xmlns"),
        };

        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = self.element(node).and_then(|e| e.attribute(&key)) {
                return (!value.is_empty()).then_some(value);
            }
            current = self.parent(node);
        }
        None
    }

    /// Child elements of `id` with the given local name that live in `namespace`.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        namespace: Option<&'a str>,
        local_name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id).filter(move |child| {
            self.element(*child)
                .is_some_and(|e| e.local_name() == local_name)
                && self.namespace_uri(*child) == namespace
        })
    }

    pub fn child_named(&self, id: NodeId, namespace: Option<&str>, local_name: &str) -> Option<NodeId> {
        self.children_named(id, namespace, local_name).next()
    }

    /// All elements reached by following `path` (local names) from `id`.
    pub fn select(&self, id: NodeId, namespace: Option<&str>, path: &[&str]) -> Vec<NodeId> {
        let mut current = vec![id];
        for step in path {
            current = current
                .into_iter()
                .flat_map(|node| self.children_named(node, namespace, step).collect::<Vec<_>>())
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// Unescaped character content of the direct text and CDATA children.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            match self.kind(*child) {
                NodeKind::Text(raw) => match quick_xml::escape::unescape(raw) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(raw),
                },
                NodeKind::CData(data) => out.push_str(data),
                _ => {}
            }
        }
        out
    }

    /// Trimmed text of the first matching child element, if non-empty.
    pub fn child_text(&self, id: NodeId, namespace: Option<&str>, local_name: &str) -> Option<String> {
        let child = self.child_named(id, namespace, local_name)?;
        let text = self.text(child);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Replaces all children of `id` with a single escaped text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let removed = std::mem::take(&mut self.nodes[id.index()].children);
        for child in removed {
            self.nodes[child.index()].parent = None;
        }
        let escaped = quick_xml::escape::partial_escape(text).into_owned();
        self.push_child(id, NodeKind::Text(escaped));
    }

    /// Appends a new element as the last element child of `parent`, indented
    /// one level deeper than `parent`.
    ///
    /// The new element inherits `parent`'s namespace prefix so it stays in the
    /// same namespace.
    pub fn append_element(&mut self, parent: NodeId, local_name: &str, style: &IndentStyle) -> NodeId {
        let depth = self.depth(parent) + 1;
        let element = self.new_element_for(parent, local_name);
        let children = self.children(parent);
        let trailing_whitespace = children
            .last()
            .is_some_and(|last| self.is_whitespace_text(*last));

        match trailing_whitespace.then(|| children.len() - 1) {
            Some(index) => {
                let indent = self.alloc(NodeKind::Text(style.newline_indent(depth)));
                self.attach(parent, Some(index), indent);
                self.attach(parent, Some(index + 1), element);
            }
            None => {
                let indent = self.alloc(NodeKind::Text(style.newline_indent(depth)));
                self.attach(parent, None, indent);
                self.attach(parent, None, element);
                let closing = self.alloc(NodeKind::Text(style.newline_indent(depth - 1)));
                self.attach(parent, None, closing);
            }
        }
        element
    }

    /// Inserts a new element directly before the sibling element `before`,
    /// reusing the whitespace that precedes `before` for the new element.
    pub fn insert_element_before(
        &mut self,
        parent: NodeId,
        before: NodeId,
        local_name: &str,
        style: &IndentStyle,
    ) -> NodeId {
        let Some(index) = self.children(parent).iter().position(|c| *c == before) else {
            return self.append_element(parent, local_name, style);
        };
        let depth = self.depth(parent) + 1;
        let element = self.new_element_for(parent, local_name);
        let indent = self.alloc(NodeKind::Text(style.newline_indent(depth)));
        self.attach(parent, Some(index), element);
        self.attach(parent, Some(index + 1), indent);
        element
    }

    /// Appends `<local_name>text</local_name>` to `parent`.
    pub fn append_text_element(
        &mut self,
        parent: NodeId,
        local_name: &str,
        text: &str,
        style: &IndentStyle,
    ) -> NodeId {
        let element = self.append_element(parent, local_name, style);
        self.set_text(element, text);
        element
    }

    fn new_element_for(&mut self, parent: NodeId, local_name: &str) -> NodeId {
        let name = match self.element(parent).and_then(Element::prefix) {
            Some(prefix) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        };
        self.alloc(NodeKind::Element(Element::new(name)))
    }

    fn is_whitespace_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(text) if text.trim().is_empty())
    }

    /// Serializes the document.
    ///
    /// Elements without children are written in the `<name/>` form; the
    /// original spelling of empty elements is put back by
    /// [`FormatInfo::restore`](crate::FormatInfo::restore).
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.document()) {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str(element.raw_attributes.trim_end());
                    out.push_str("/>");
                    return;
                }
                out.push_str(&element.raw_attributes);
                out.push('>');
                for child in children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(data);
                out.push_str("]]>");
            }
            NodeKind::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            NodeKind::Declaration(content) | NodeKind::ProcessingInstruction(content) => {
                out.push_str("<?");
                out.push_str(content);
                out.push_str("?>");
            }
            NodeKind::DocType(content) => {
                out.push_str("<!DOCTYPE");
                if !content.starts_with(char::is_whitespace) {
                    out.push(' ');
                }
                out.push_str(content);
                out.push('>');
            }
        }
    }
}

fn element_from_start(start: &BytesStart<'_>, position: usize) -> Result<Element> {
    let mut element = Element::new(lossy(start.name().as_ref()));
    element.raw_attributes = lossy(start.attributes_raw());

    let mut attributes = start.attributes();
    attributes.with_checks(false);
    for attribute in attributes {
        let attribute = attribute.map_err(|err| XmlError::Attribute {
            position,
            message: err.to_string(),
        })?;
        let key = lossy(attribute.key.as_ref());
        let value = attribute
            .unescape_value()
            .map_err(|err| XmlError::Attribute {
                position,
                message: err.to_string(),
            })?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
