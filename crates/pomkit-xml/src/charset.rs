use std::sync::OnceLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;

use crate::{Result, XmlError};

/// Character set of a document, plus whether it started with a byte order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
    bom: bool,
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl Charset {
    pub fn utf8() -> Self {
        Self {
            encoding: UTF_8,
            bom: false,
        }
    }

    /// Detects the charset of raw document bytes.
    ///
    /// A byte order mark wins. Otherwise the `encoding` pseudo-attribute of the
    /// XML declaration is honored; without one the bytes are UTF-8 if they
    /// decode as such, and otherwise whatever legacy encoding `chardetng`
    /// finds most plausible.
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return Ok(Self {
                encoding,
                bom: true,
            });
        }

        if let Some(label) = declared_encoding(bytes) {
            let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                XmlError::UnsupportedEncoding {
                    label: label.clone(),
                }
            })?;
            // A UTF-16 declaration on bytes we could read as ASCII is a lie.
            if encoding != UTF_16LE && encoding != UTF_16BE {
                return Ok(Self {
                    encoding,
                    bom: false,
                });
            }
            tracing::debug!(
                target: "pomkit.xml",
                label = %label,
                "ignoring UTF-16 declaration on a document without a byte order mark"
            );
        }

        let encoding = if std::str::from_utf8(bytes).is_ok() {
            UTF_8
        } else {
            guess_legacy_encoding(bytes)
        };
        Ok(Self {
            encoding,
            bom: false,
        })
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Decodes `bytes`, dropping the byte order mark if there is one.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let body = if self.bom {
            let len = Encoding::for_bom(bytes).map_or(0, |(_, len)| len);
            &bytes[len..]
        } else {
            bytes
        };
        self.encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|text| text.into_owned())
            .ok_or(XmlError::Decode {
                charset: self.encoding.name(),
            })
    }

    /// Encodes `text`, restoring the byte order mark if the source had one.
    ///
    /// Characters the target charset cannot represent are written as numeric
    /// character references, which XML readers decode transparently.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + 3);
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let little = self.encoding == UTF_16LE;
            if self.bom {
                out.extend_from_slice(if little { &[0xFF, 0xFE] } else { &[0xFE, 0xFF] });
            }
            for unit in text.encode_utf16() {
                let bytes = if little {
                    unit.to_le_bytes()
                } else {
                    unit.to_be_bytes()
                };
                out.extend_from_slice(&bytes);
            }
            return out;
        }

        if self.bom && self.encoding == UTF_8 {
            out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
        }
        let (encoded, _, _) = self.encoding.encode(text);
        out.extend_from_slice(&encoded);
        out
    }
}

fn guess_legacy_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, false);
    // windows-1252 maps every byte, so it always decodes.
    if guess
        .decode_without_bom_handling_and_without_replacement(bytes)
        .is_none()
    {
        return WINDOWS_1252;
    }
    tracing::debug!(target: "pomkit.xml", encoding = guess.name(), "guessed undeclared encoding");
    guess
}

fn declared_encoding(bytes: &[u8]) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"^\s*<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
            .expect("declared encoding regex must compile")
    });

    let head = &bytes[..bytes.len().min(1024)];
    let caps = re.captures(head)?;
    let label = caps.get(1)?;
    Some(String::from_utf8_lossy(label.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_is_utf8() {
        let charset = Charset::detect(b"<project/>").unwrap();
        assert_eq!(charset.name(), "UTF-8");
        assert!(!charset.has_bom());
    }

    #[test]
    fn utf8_bom_survives_round_trip() {
        let bytes = b"\xEF\xBB\xBF<project>\xC3\xA9</project>".to_vec();
        let charset = Charset::detect(&bytes).unwrap();
        assert!(charset.has_bom());
        let text = charset.decode(&bytes).unwrap();
        assert_eq!(text, "<project>\u{e9}</project>");
        assert_eq!(charset.encode(&text), bytes);
    }

    #[test]
    fn declared_latin1_round_trips() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<a>\xE9</a>".to_vec();
        let charset = Charset::detect(&bytes).unwrap();
        assert_eq!(charset.name(), "windows-1252");
        let text = charset.decode(&bytes).unwrap();
        assert!(text.ends_with("<a>\u{e9}</a>"));
        assert_eq!(charset.encode(&text), bytes);
    }

    #[test]
    fn undeclared_western_text_is_windows_1252() {
        let text = "<project>\n  <name>Caf\u{e9} cr\u{e8}me br\u{fb}l\u{e9}e</name>\n  \
                    <description>Biblioth\u{e8}que de la soci\u{e9}t\u{e9} g\u{e9}n\u{e9}rale</description>\n</project>\n";
        let (bytes, _, _) = WINDOWS_1252.encode(text);
        let charset = Charset::detect(&bytes).unwrap();
        assert_eq!(charset.name(), "windows-1252");
        assert_eq!(charset.decode(&bytes).unwrap(), text);
    }

    #[test]
    fn undeclared_shift_jis_is_detected() {
        let text = "<project>\n  <name>\u{65e5}\u{672c}\u{8a9e}\u{306e}\u{30d7}\u{30ed}\u{30b8}\u{30a7}\u{30af}\u{30c8}</name>\n  \
                    <description>\u{3053}\u{308c}\u{306f}\u{4f9d}\u{5b58}\u{95a2}\u{4fc2}\u{3092}\u{66f4}\u{65b0}\u{3059}\u{308b}\u{305f}\u{3081}\u{306e}\u{30c6}\u{30b9}\u{30c8}\u{3067}\u{3059}\u{3002}\
                    \u{6587}\u{5b57}\u{30b3}\u{30fc}\u{30c9}\u{306f}\u{5ba3}\u{8a00}\u{3055}\u{308c}\u{3066}\u{3044}\u{307e}\u{305b}\u{3093}\u{3002}</description>\n</project>\n";
        let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
        assert!(!had_errors);

        let charset = Charset::detect(&bytes).unwrap();
        assert_eq!(charset.name(), "Shift_JIS");
        assert!(!charset.has_bom());
        assert_eq!(charset.decode(&bytes).unwrap(), text);
        assert_eq!(charset.encode(text), bytes.into_owned());
    }

    #[test]
    fn utf16_with_bom_is_encoded_by_hand() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let charset = Charset::detect(&bytes).unwrap();
        assert_eq!(charset.name(), "UTF-16LE");
        let text = charset.decode(&bytes).unwrap();
        assert_eq!(text, "<a/>");
        assert_eq!(charset.encode(&text), bytes);
    }

    #[test]
    fn unknown_declared_encoding_is_an_error() {
        let err = Charset::detect(b"<?xml version=\"1.0\" encoding=\"klingon\"?><a/>").unwrap_err();
        assert!(matches!(err, XmlError::UnsupportedEncoding { .. }));
    }
}
