use thiserror::Error;

/// Malformed markup. Offsets are byte positions in the parsed string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of markup at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("invalid tag name at byte {offset}")]
    InvalidTagName { offset: usize },
    #[error("unexpected character {found:?} at byte {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("expected </{expected}> but found </{found}> at byte {offset}")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },
    #[error("closing tag </{tag}> at byte {offset} has no open element")]
    StrayClose { tag: String, offset: usize },
    #[error("element <{tag}> opened at byte {offset} is never closed")]
    Unclosed { tag: String, offset: usize },
}
