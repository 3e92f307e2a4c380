//! XML parser implementation

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Pos, Result};
use crate::lexer::Cursor;
use crate::xml::model::{Content, Document, Element};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Safety limits for the XML parser
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// XML parser
///
/// Comments and CDATA sections inside the root element are kept as nodes.
/// Doctype declarations and processing instructions are skipped and never
/// expanded, so documents relying on internal-subset entities fail with
/// [`ErrorKind::InvalidEntity`].
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
}

impl<'a> Parser<'a> {
    /// Create a new XML parser with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new XML parser with custom limits
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        let input = input.strip_prefix(BOM).unwrap_or(input);
        Self {
            cursor: Cursor::new(input),
            config,
        }
    }

    /// Parse an XML document
    pub fn parse(&mut self) -> Result<Document> {
        if self.config.max_size > 0 && self.cursor.remaining().len() > self.config.max_size {
            return Err(Error::at(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                self.cursor.position(),
            ));
        }

        self.cursor.skip_whitespace();
        let declaration = if self.at_declaration() {
            Some(self.parse_declaration()?)
        } else {
            None
        };

        self.skip_misc()?;
        if self.cursor.is_eof() {
            return Err(Error::at(ErrorKind::EmptyDocument, self.cursor.position()));
        }

        let root = self.parse_element(1)?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(Error::at(ErrorKind::TrailingContent, self.cursor.position()));
        }

        Ok(Document { declaration, root })
    }

    fn at_declaration(&self) -> bool {
        self.cursor.starts_with(b"<?xml")
            && matches!(self.cursor.peek(5), Some(b' ' | b'\t' | b'\r' | b'\n' | b'?'))
    }

    fn parse_declaration(&mut self) -> Result<IndexMap<String, String>> {
        self.cursor.eat(b"<?xml");
        let mut pseudo = IndexMap::new();
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat(b"?>") {
                return Ok(pseudo);
            }
            if self.cursor.is_eof() {
                return Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position()));
            }
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;
            pseudo.insert(name, value);
        }
    }

    /// Skip whitespace, comments, processing instructions and doctype outside the root
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat(b"<!--") {
                self.take_until(b"-->")?;
            } else if self.cursor.eat(b"<?") {
                self.take_until(b"?>")?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_doctype(&mut self) -> Result<()> {
        // internal subsets may contain '>' inside declarations
        let mut in_subset = false;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => in_subset = true,
                b']' => in_subset = false,
                b'>' if !in_subset => return Ok(()),
                _ => {}
            }
        }
        Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position()))
    }

    fn parse_element(&mut self, depth: u16) -> Result<Element> {
        if self.config.max_depth > 0 && depth > self.config.max_depth {
            return Err(Error::at(
                ErrorKind::MaxDepthExceeded {
                    max: self.config.max_depth,
                },
                self.cursor.position(),
            ));
        }

        self.expect_byte(b'<')?;
        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        if self.cursor.eat(b"/") {
            self.expect_byte(b'>')?;
            return Ok(Element {
                name,
                attributes,
                children: Vec::new(),
            });
        }
        self.expect_byte(b'>')?;

        let mut children = Vec::new();
        loop {
            if self.cursor.eat(b"</") {
                let close_pos = self.cursor.position();
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(Error::at(
                        ErrorKind::MismatchedTag {
                            expected: name,
                            found: close_name,
                        },
                        close_pos,
                    ));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.eat(b"<!--") {
                children.push(Content::Comment(self.take_until(b"-->")?));
            } else if self.cursor.eat(b"<![CDATA[") {
                children.push(Content::CData(self.take_until(b"]]>")?));
            } else if self.cursor.eat(b"<?") {
                self.take_until(b"?>")?;
            } else if self.cursor.starts_with(b"<!") {
                return Err(self.unexpected("element or text", "markup declaration"));
            } else if self.cursor.current() == Some(b'<') {
                let child = self.parse_element(depth.saturating_add(1))?;
                children.push(Content::Element(child));
            } else if self.cursor.is_eof() {
                return Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position()));
            } else {
                children.push(Content::Text(self.parse_text()?));
            }
        }

        Ok(Element {
            name,
            attributes,
            children,
        })
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => break,
                Some(_) => {}
                None => return Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position())),
            }

            let name_pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(Error::at(ErrorKind::DuplicateAttribute { name }, name_pos));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.unexpected("quoted attribute value", "unquoted value")),
        };
        self.cursor.advance();

        let start = self.cursor.position();
        let raw = self.cursor.take_while(|b| b != quote && b != b'<');
        match self.cursor.current() {
            Some(b'<') => Err(self.unexpected("attribute value", "'<'")),
            Some(_) => {
                self.cursor.advance();
                decode(raw, start)
            }
            None => Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position())),
        }
    }

    fn parse_text(&mut self) -> Result<String> {
        let start = self.cursor.position();
        let raw = self.cursor.take_while(|b| b != b'<');
        decode(raw, start)
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.cursor.position();
        if !self.cursor.current().is_some_and(is_name_start) {
            return Err(Error::at(ErrorKind::InvalidName, start));
        }
        let name = self.cursor.take_while(is_name_char);
        utf8(name, start).map(str::to_string)
    }

    /// Consume through `terminator`, returning the text before it
    fn take_until(&mut self, terminator: &[u8]) -> Result<String> {
        let start = self.cursor.position();
        match self.cursor.take_until(terminator) {
            Some(body) => utf8(body, start).map(str::to_string),
            None => Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position())),
        }
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.eat(&[expected]) {
            Ok(())
        } else {
            let found = match self.cursor.current() {
                Some(b) => format!("'{}'", char::from(b)),
                None => "end of input".to_string(),
            };
            Err(self.unexpected(&format!("'{}'", char::from(expected)), &found))
        }
    }

    fn unexpected(&self, expected: &str, found: &str) -> Error {
        Error::at(
            ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            self.cursor.position(),
        )
    }
}

fn utf8(bytes: &[u8], start: Pos) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::at(ErrorKind::InvalidUtf8, start))
}

/// Decode text or an attribute value that began at `start`
fn decode(raw: &[u8], start: Pos) -> Result<String> {
    decode_entities(utf8(raw, start)?).map_err(|kind| Error::at(kind, start))
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_entities(input: &str) -> std::result::Result<String, ErrorKind> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);
        let after = after.get(1..).unwrap_or_default();
        let Some(semi) = after.find(';') else {
            return Err(invalid_entity(after));
        };
        let (entity, tail) = after.split_at(semi);
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };
        match decoded {
            Some(ch) => result.push(ch),
            None => return Err(invalid_entity(entity)),
        }
        rest = tail.get(1..).unwrap_or_default();
    }
    result.push_str(rest);

    Ok(result)
}

fn invalid_entity(entity: &str) -> ErrorKind {
    ErrorKind::InvalidEntity {
        entity: entity.chars().take(16).collect(),
    }
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Document> {
        Parser::new(input.as_bytes()).parse()
    }

    #[test]
    fn test_parse_simple_element() -> Result<()> {
        let doc = parse("<svg></svg>")?;
        assert_eq!(doc.root.name, "svg");
        assert!(doc.root.children.is_empty());
        assert!(doc.declaration.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_with_attributes() -> Result<()> {
        let doc = parse("<svg width=\"10\" height='20'></svg>")?;
        assert_eq!(doc.root.attribute("width"), Some("10"));
        assert_eq!(doc.root.attribute("height"), Some("20"));
        Ok(())
    }

    #[test]
    fn test_parse_declaration_pseudo_attributes() -> Result<()> {
        let doc = parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?> <svg/>")?;
        let decl = doc.declaration.unwrap_or_default();
        assert_eq!(decl.get("version").map(String::as_str), Some("1.0"));
        assert_eq!(decl.get("encoding").map(String::as_str), Some("UTF-8"));
        Ok(())
    }

    #[test]
    fn test_parse_keeps_comments_cdata_and_whitespace() -> Result<()> {
        let doc = parse("<svg> <!-- hi --><style><![CDATA[a>b]]></style></svg>")?;
        assert_eq!(doc.root.children.len(), 3);
        assert_eq!(doc.root.children.first(), Some(&Content::Text(" ".to_string())));
        assert_eq!(
            doc.root.children.get(1),
            Some(&Content::Comment(" hi ".to_string()))
        );
        let style = doc.root.elements().next().map(|el| el.children.clone());
        assert_eq!(style, Some(vec![Content::CData("a>b".to_string())]));
        Ok(())
    }

    #[test]
    fn test_parse_skips_doctype_with_internal_subset() -> Result<()> {
        let doc = parse(
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" [<!ENTITY ns \"x\">]><svg/>",
        )?;
        assert_eq!(doc.root.name, "svg");
        Ok(())
    }

    #[test]
    fn test_undeclared_entity_is_rejected() {
        let err = parse("<svg>&ns_svg;</svg>").err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::InvalidEntity { .. })
        ));
    }

    #[test]
    fn test_entities_decoded() -> Result<()> {
        let doc = parse("<text a=\"&quot;x&#x41;\">&lt;&amp;&#66;</text>")?;
        assert_eq!(doc.root.attribute("a"), Some("\"xA"));
        assert_eq!(doc.root.children, vec![Content::Text("<&B".to_string())]);
        Ok(())
    }

    #[test]
    fn test_mismatched_tag() {
        let err = parse("<svg><g></svg>").err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::MismatchedTag { .. })
        ));
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse("<svg a=\"1\" a=\"2\"/>").err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::DuplicateAttribute {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_trailing_content_and_empty_document() {
        assert_eq!(
            parse("<svg/><svg/>").err().map(|e| e.kind().clone()),
            Some(ErrorKind::TrailingContent)
        );
        assert_eq!(
            parse("  <!-- only -->").err().map(|e| e.kind().clone()),
            Some(ErrorKind::EmptyDocument)
        );
    }

    #[test]
    fn test_depth_limit() {
        let input = "<a><a><a><a/></a></a></a>";
        let mut parser = Parser::with_config(input.as_bytes(), Config::new(3, 0));
        assert_eq!(
            parser.parse().err().map(|e| e.kind().clone()),
            Some(ErrorKind::MaxDepthExceeded { max: 3 })
        );
        let mut parser = Parser::with_config(input.as_bytes(), Config::new(4, 0));
        assert!(parser.parse().is_ok());

        let deep = format!("{}{}", "<g>".repeat(400), "</g>".repeat(400));
        assert!(Parser::new(deep.as_bytes()).parse().is_err());
        assert!(Parser::with_config(deep.as_bytes(), Config::unlimited())
            .parse()
            .is_ok());
    }

    #[test]
    fn test_size_limit() {
        let mut parser = Parser::with_config(b"<svg></svg>", Config::new(0, 4));
        assert_eq!(
            parser.parse().err().map(|e| e.kind().clone()),
            Some(ErrorKind::MaxSizeExceeded { max: 4 })
        );
    }

    #[test]
    fn test_bom_is_ignored() -> Result<()> {
        let doc = Parser::new(b"\xEF\xBB\xBF<svg/>").parse()?;
        assert_eq!(doc.root.name, "svg");
        Ok(())
    }
}
