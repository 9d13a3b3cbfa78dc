//! A small, strict markup parser.
//!
//! Good enough for authored templates: elements, attributes (any name that is
//! not whitespace or markup punctuation, so `@click`, `:value` and `?hidden`
//! are fine), text, comments, void and self-closing elements, raw-text
//! `script`/`style` and the common character references. Unlike a browser it
//! never repairs structure: unclosed or mismatched tags are errors.

use crate::serialize::{is_raw_text, is_void};
use crate::{Document, NodeId, ParseError};

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn eof_error(&self) -> ParseError {
        ParseError::UnexpectedEof {
            offset: self.src.len(),
        }
    }

    fn expect_close_bracket(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('>') => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(ParseError::UnexpectedChar {
                found,
                offset: self.pos,
            }),
            None => Err(self.eof_error()),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn is_attr_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '/' | '>' | '=' | '"' | '\'' | '<')
}

fn starts_markup(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<')
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?')
}

struct OpenElement {
    node: NodeId,
    tag: String,
    offset: usize,
}

pub(crate) fn parse_into(doc: &Document, root: NodeId, markup: &str) -> Result<(), ParseError> {
    let mut s = Scanner {
        src: markup,
        pos: 0,
    };
    let mut open: Vec<OpenElement> = Vec::new();

    while !s.eof() {
        let parent = open.last().map_or(root, |o| o.node);

        if s.starts_with("<!--") {
            s.pos += 4;
            let end = s.rest().find("-->").ok_or_else(|| s.eof_error())?;
            let comment = doc.create_comment(&s.rest()[..end]);
            doc.append_child(parent, comment);
            s.pos += end + 3;
        } else if s.starts_with("</") {
            let offset = s.pos;
            s.pos += 2;
            let name = s.take_while(is_name_char);
            if name.is_empty() {
                return Err(ParseError::InvalidTagName { offset });
            }
            s.expect_close_bracket()?;
            match open.pop() {
                Some(o) if o.tag.eq_ignore_ascii_case(name) => {}
                Some(o) => {
                    return Err(ParseError::MismatchedClose {
                        expected: o.tag,
                        found: name.to_string(),
                        offset,
                    });
                }
                None => {
                    return Err(ParseError::StrayClose {
                        tag: name.to_string(),
                        offset,
                    });
                }
            }
        } else if s.starts_with("<!") || s.starts_with("<?") {
            // Doctype or processing instruction.
            let end = s.rest().find('>').ok_or_else(|| s.eof_error())?;
            s.pos += end + 1;
        } else if s.starts_with("<") && s.peek_second().is_some_and(|c| c.is_ascii_alphabetic()) {
            let offset = s.pos;
            let (node, tag, self_closing) = open_tag(doc, &mut s, parent)?;
            if self_closing || is_void(&tag) {
                continue;
            }
            if is_raw_text(&tag) {
                raw_text(doc, &mut s, node, &tag, offset)?;
            } else {
                open.push(OpenElement { node, tag, offset });
            }
        } else {
            let text = take_text(&mut s);
            let node = doc.create_text(&decode_entities(text));
            doc.append_child(parent, node);
        }
    }

    match open.pop() {
        Some(o) => Err(ParseError::Unclosed {
            tag: o.tag,
            offset: o.offset,
        }),
        None => Ok(()),
    }
}

fn take_text<'a>(s: &mut Scanner<'a>) -> &'a str {
    let start = s.pos;
    // The first character is text even when it is a lone '<'.
    let mut search = start + s.peek().map_or(0, char::len_utf8);
    while let Some(rel) = s.src[search..].find('<') {
        let at = search + rel;
        if starts_markup(&s.src[at..]) {
            s.pos = at;
            return &s.src[start..at];
        }
        search = at + 1;
    }
    s.pos = s.src.len();
    &s.src[start..]
}

fn open_tag(
    doc: &Document,
    s: &mut Scanner<'_>,
    parent: NodeId,
) -> Result<(NodeId, String, bool), ParseError> {
    s.pos += 1;
    let tag = s.take_while(is_name_char);
    let node = doc.create_element(tag);
    doc.append_child(parent, node);

    loop {
        s.skip_whitespace();
        match s.peek() {
            None => return Err(s.eof_error()),
            Some('>') => {
                s.pos += 1;
                return Ok((node, tag.to_string(), false));
            }
            Some('/') => {
                s.pos += 1;
                if s.peek() == Some('>') {
                    s.pos += 1;
                    return Ok((node, tag.to_string(), true));
                }
            }
            Some(found) if !is_attr_name_char(found) => {
                return Err(ParseError::UnexpectedChar {
                    found,
                    offset: s.pos,
                });
            }
            Some(_) => {
                let name = s.take_while(is_attr_name_char);
                s.skip_whitespace();
                let value = if s.peek() == Some('=') {
                    s.pos += 1;
                    s.skip_whitespace();
                    decode_entities(attribute_value(s)?)
                } else {
                    String::new()
                };
                // First occurrence wins.
                if !doc.has_attribute(node, name) {
                    doc.set_attribute(node, name, &value);
                }
            }
        }
    }
}

fn attribute_value<'a>(s: &mut Scanner<'a>) -> Result<&'a str, ParseError> {
    match s.peek() {
        Some(quote @ ('"' | '\'')) => {
            s.pos += 1;
            let rest = s.rest();
            let end = rest.find(quote).ok_or_else(|| s.eof_error())?;
            s.pos += end + 1;
            Ok(&rest[..end])
        }
        Some(_) => Ok(s.take_while(|c| !c.is_whitespace() && c != '>')),
        None => Err(s.eof_error()),
    }
}

fn raw_text(
    doc: &Document,
    s: &mut Scanner<'_>,
    node: NodeId,
    tag: &str,
    offset: usize,
) -> Result<(), ParseError> {
    let needle = format!("</{}", tag.to_ascii_lowercase());
    let Some(end) = s.rest().to_ascii_lowercase().find(&needle) else {
        return Err(ParseError::Unclosed {
            tag: tag.to_string(),
            offset,
        });
    };
    let text = &s.rest()[..end];
    if !text.is_empty() {
        let child = doc.create_text(text);
        doc.append_child(node, child);
    }
    s.pos += end + needle.len();
    s.expect_close_bracket()
}

/// Replace character references. Unknown ones are kept verbatim.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let doc = Document::new();
        let fragment = doc.parse_fragment("1 < 2 <b>yes</b>").unwrap();
        assert_eq!(doc.children(fragment).len(), 2);
        assert_eq!(doc.text_content(fragment), "1 < 2 yes");
    }
}
