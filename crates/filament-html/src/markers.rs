//! Placeholder encodings shared by the template builder and the compiler.
//!
//! A binding inside text or an attribute value is written as an interpolation,
//! `{marker}{N}{marker}`. A directive that owns a region of the tree (repeat,
//! when) is written as a block comment `<!--{marker}:N-->`. The marker is
//! random per process so it cannot collide with authored content.

use std::sync::OnceLock;

use smallvec::SmallVec;

static MARKER: OnceLock<String> = OnceLock::new();

pub fn marker() -> &'static str {
    MARKER.get_or_init(|| format!("filament-{:06x}", fastrand::u32(..0x100_0000)))
}

fn interpolation_start() -> String {
    format!("{}{{", marker())
}

fn interpolation_end() -> String {
    format!("}}{}", marker())
}

pub fn interpolation(index: usize) -> String {
    format!("{}{index}{}", interpolation_start(), interpolation_end())
}

pub fn block_placeholder(index: usize) -> String {
    format!("<!--{}:{index}-->", marker())
}

/// An attribute carrying an interpolation, for directives attached to an element.
pub fn attribute_placeholder(name: &str, index: usize) -> String {
    format!("{name}=\"{}\"", interpolation(index))
}

/// Directive index encoded in a block comment, if `data` is one.
pub fn block_index(data: &str) -> Option<usize> {
    data.strip_prefix(marker())?.strip_prefix(':')?.parse().ok()
}

pub fn is_block_marker(data: &str) -> bool {
    block_index(data).is_some()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Part<'a> {
    Literal(&'a str),
    Directive(usize),
}

/// Split `value` into literal and directive parts. `None` when it holds no
/// interpolation. Empty literals are dropped.
pub fn parse_interpolation(value: &str) -> Option<SmallVec<[Part<'_>; 4]>> {
    let start = interpolation_start();
    let end = interpolation_end();
    let mut pieces = value.split(start.as_str());
    let first = pieces.next()?;
    let mut parts: SmallVec<[Part<'_>; 4]> = SmallVec::new();
    if !first.is_empty() {
        parts.push(Part::Literal(first));
    }

    let mut interpolated = false;
    for piece in pieces {
        interpolated = true;
        let literal = match piece.find(end.as_str()) {
            Some(at) => match piece[..at].parse() {
                Ok(index) => {
                    parts.push(Part::Directive(index));
                    &piece[at + end.len()..]
                }
                Err(_) => piece,
            },
            None => piece,
        };
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
    }
    interpolated.then_some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_stable() {
        assert!(marker().starts_with("filament-"));
        assert_eq!(marker().len(), "filament-".len() + 6);
        assert!(marker()["filament-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(marker(), marker());
    }

    #[test]
    fn test_parse_interpolation() {
        assert_eq!(parse_interpolation("plain"), None);

        let value = format!("a {} b{}", interpolation(0), interpolation(12));
        let parts = parse_interpolation(&value).unwrap();
        assert_eq!(
            parts.as_slice(),
            [
                Part::Literal("a "),
                Part::Directive(0),
                Part::Literal(" b"),
                Part::Directive(12)
            ]
        );
    }

    #[test]
    fn test_block_index() {
        let placeholder = block_placeholder(7);
        let data = placeholder
            .strip_prefix("<!--")
            .and_then(|p| p.strip_suffix("-->"))
            .unwrap();
        assert_eq!(block_index(data), Some(7));
        assert_eq!(block_index("just a comment"), None);
    }
}
