use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::charset::Charset;
use crate::{Result, XmlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Majority vote between `\r\n` and bare `\n`.
    pub fn detect(text: &str) -> Self {
        let crlf = text.matches("\r\n").count();
        let lf = text.matches('\n').count() - crlf;
        if crlf > lf {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }
}

/// Indentation used for elements inserted into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentStyle {
    unit: String,
    line_ending: LineEnding,
}

impl Default for IndentStyle {
    fn default() -> Self {
        Self::new("  ", LineEnding::Lf)
    }
}

impl IndentStyle {
    pub fn new(unit: impl Into<String>, line_ending: LineEnding) -> Self {
        Self {
            unit: unit.into(),
            line_ending,
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// A line break followed by `depth` indent units.
    pub fn newline_indent(&self, depth: usize) -> String {
        let mut out = String::from(self.line_ending.as_str());
        for _ in 0..depth {
            out.push_str(&self.unit);
        }
        out
    }
}

/// One occurrence of an element without content, in any of its spellings
/// (`<a></a>`, `<a/>`, `<a />`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyElement {
    pub name: String,
    /// `/name[n]` steps from the document root, `n` counting earlier siblings
    /// of the same name. Edits elsewhere in the document leave it unchanged.
    pub path: String,
    /// Attributes as `key="value"` pairs, used to check that two occurrences
    /// describe the same element.
    pub attributes: String,
    pub span: Range<usize>,
}

/// Formatting facts captured from a document before it is edited.
#[derive(Debug, Clone)]
pub struct FormatInfo {
    charset: Charset,
    /// Verbatim text from the start of the document through the end of the
    /// root element's start tag.
    preamble: String,
    /// Offset where the root element's start tag begins inside `preamble`.
    root_start: usize,
    root_self_closing: bool,
    suffix: String,
    indent: IndentStyle,
    empty_elements: Vec<(EmptyElement, String)>,
}

impl FormatInfo {
    pub fn capture(text: &str, charset: Charset) -> Result<Self> {
        let root = root_start_tag_span(text)?;
        let line_ending = LineEnding::detect(text);
        let unit = infer_indent_unit(text).unwrap_or_else(|| "  ".to_string());

        let empty_elements = empty_elements(text)
            .into_iter()
            .map(|element| {
                let raw = text[element.span.clone()].to_string();
                (element, raw)
            })
            .collect();

        Ok(Self {
            charset,
            preamble: text[..root.end].to_string(),
            root_start: root.start,
            root_self_closing: text[..root.end].ends_with("/>"),
            suffix: text[text.trim_end().len()..].to_string(),
            indent: IndentStyle::new(unit, line_ending),
            empty_elements,
        })
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn indent(&self) -> &IndentStyle {
        &self.indent
    }

    /// Re-applies the captured formatting to a freshly serialized document.
    pub fn restore_text(&self, serialized: &str) -> Result<String> {
        let text = self.restore_empty_elements(serialized);
        let root = root_start_tag_span(&text)?;
        let new_self_closing = text[..root.end].ends_with("/>");

        let mut out = String::with_capacity(text.len() + self.preamble.len());
        if new_self_closing == self.root_self_closing {
            out.push_str(&self.preamble);
            out.push_str(text[root.end..].trim_end());
        } else {
            // The root gained or lost all of its children; only the prolog
            // before the root tag can be kept verbatim.
            out.push_str(&self.preamble[..self.root_start]);
            out.push_str(text[root.start..].trim_end());
        }
        out.push_str(&self.suffix);
        Ok(out)
    }

    pub fn restore(&self, serialized: &str) -> Result<Vec<u8>> {
        let text = self.restore_text(serialized)?;
        Ok(self.charset.encode(&text))
    }

    /// Replaces each empty element in `serialized` with the original spelling
    /// of the empty element at the same structural path.
    fn restore_empty_elements(&self, serialized: &str) -> String {
        let originals: HashMap<&str, &(EmptyElement, String)> = self
            .empty_elements
            .iter()
            .map(|entry| (entry.0.path.as_str(), entry))
            .collect();

        let mut out = String::with_capacity(serialized.len());
        let mut last = 0;
        for element in empty_elements(serialized) {
            let Some((original, raw)) = originals.get(element.path.as_str()) else {
                continue;
            };
            if original.attributes != element.attributes {
                continue;
            }
            out.push_str(&serialized[last..element.span.start]);
            out.push_str(raw);
            last = element.span.end;
        }
        out.push_str(&serialized[last..]);
        out
    }
}

/// Byte range of the root element's start tag.
pub fn root_start_tag_span(text: &str) -> Result<Range<usize>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|source| XmlError::Parse {
            position: reader.error_position() as usize,
            source,
        })?;
        match event {
            Event::Start(_) | Event::Empty(_) => {
                return Ok(start..reader.buffer_position() as usize);
            }
            Event::Eof => return Err(XmlError::NoRootElement),
            _ => {}
        }
    }
}

/// All empty elements of `text` in document order. Markup inside comments,
/// CDATA sections and processing instructions is not looked at. Stops at the
/// first syntax error.
pub fn empty_elements(text: &str) -> Vec<EmptyElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut found = Vec::new();
    // Path of each open element and how many children of each name it has.
    let mut frames: Vec<(String, HashMap<String, usize>)> = vec![(String::new(), HashMap::new())];
    let mut open: Option<EmptyElement> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let Ok(event) = reader.read_event() else {
            break;
        };
        let end = reader.buffer_position() as usize;
        let pending = open.take();

        match event {
            Event::Start(tag) => {
                let element = locate(&mut frames, &tag, start..end);
                frames.push((element.path.clone(), HashMap::new()));
                open = Some(element);
            }
            Event::Empty(tag) => found.push(locate(&mut frames, &tag, start..end)),
            Event::End(_) => {
                if frames.len() > 1 {
                    frames.pop();
                }
                if let Some(mut element) = pending {
                    element.span.end = end;
                    found.push(element);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    found
}

fn locate(
    frames: &mut [(String, HashMap<String, usize>)],
    tag: &BytesStart<'_>,
    span: Range<usize>,
) -> EmptyElement {
    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
    let attributes = tag
        .attributes()
        .filter_map(|attr| attr.ok())
        .map(|attr| {
            format!(
                "{}=\"{}\"",
                String::from_utf8_lossy(attr.key.as_ref()),
                String::from_utf8_lossy(&attr.value)
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    let (parent, ordinal) = match frames.last_mut() {
        Some((parent, seen)) => {
            let count = seen.entry(name.clone()).or_insert(0);
            let ordinal = *count;
            *count += 1;
            (parent.clone(), ordinal)
        }
        None => (String::new(), 0),
    };

    EmptyElement {
        path: format!("{parent}/{name}[{ordinal}]"),
        name,
        attributes,
        span,
    }
}

/// Most common indent unit, measured from the whitespace before each tag and
/// divided by the tag's nesting depth.
fn infer_indent_unit(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut depth = 0usize;
    let mut pending: Option<String> = None;
    let mut counts: BTreeMap<(char, usize), usize> = BTreeMap::new();

    loop {
        let Ok(event) = reader.read_event() else {
            break;
        };
        let level = match &event {
            Event::Start(_) | Event::Empty(_) | Event::Comment(_) => Some(depth),
            Event::End(_) => Some(depth.saturating_sub(1)),
            _ => None,
        };
        if let (Some(indent), Some(level)) = (pending.take(), level) {
            if let Some(key) = unit_for(&indent, level) {
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(raw) => {
                let raw = String::from_utf8_lossy(&raw);
                if raw.trim().is_empty() {
                    if let Some((_, indent)) = raw.rsplit_once('\n') {
                        pending = Some(indent.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    counts
        .into_iter()
        .max_by(|(a_key, a_count), (b_key, b_count)| {
            a_count.cmp(b_count).then_with(|| b_key.1.cmp(&a_key.1))
        })
        .map(|((ch, len), _)| std::iter::repeat(ch).take(len).collect())
}

fn unit_for(indent: &str, level: usize) -> Option<(char, usize)> {
    let first = indent.chars().next()?;
    if level == 0 || !matches!(first, ' ' | '\t') || indent.chars().any(|c| c != first) {
        return None;
    }
    let len = indent.chars().count();
    (len % level == 0).then_some((first, len / level))
}
