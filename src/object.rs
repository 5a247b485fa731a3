//! The composite object model produced by the stack parser (§3.2), plus the
//! small helpers §4.3 describes: `literal_name`, `keyword_name`, and `chop`.

use crate::error::{debug_render_bytes, ParserError, Result};
use crate::intern::{Name, Operator};
use crate::token::Token;

/// An object recognized by the stack parser: a plain token value, or one of
/// the three composite shapes `[ ]`, `<< >>`, `{ }` build, or a slot for
/// higher layers to extend with their own values (e.g. indirect references).
#[derive(Clone, Debug, PartialEq)]
pub enum Object<Ext = std::convert::Infallible> {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Name(Name),
    ByteString(Vec<u8>),
    /// Produced by `[ … ]`.
    List(Vec<Object<Ext>>),
    /// Produced by `<< … >>`. Keys are the UTF-8 (lossy) textual rendering
    /// of the Name that introduced them; entries whose value resolved to
    /// the configured null marker are dropped at construction time.
    Dict(Vec<(String, Object<Ext>)>),
    /// Produced by `{ … }`; structurally a sequence like `List` but
    /// distinct in origin.
    Proc(Vec<Object<Ext>>),
    /// Caller-supplied extension slot, unused by this crate directly.
    Extension(Ext),
}

impl<Ext> From<Token> for Object<Ext> {
    fn from(token: Token) -> Self {
        match token {
            Token::Integer(n) => Object::Integer(n),
            Token::Real(n) => Object::Real(n),
            Token::Boolean(b) => Object::Boolean(b),
            Token::Name(n) => Object::Name(n),
            Token::ByteString(b) => Object::ByteString(b),
            Token::Operator(op) => {
                // Structural operators are consumed by the stack parser
                // before a plain value ever reaches this conversion; any
                // other operator is not representable as a value-bearing
                // Object and has no business being converted.
                unreachable!("operator token {:?} is not a pushable object", op.as_bytes())
            }
        }
    }
}

/// Group `seq` into consecutive, non-overlapping windows of length `n`.
/// A trailing partial window (when `seq.len()` is not a multiple of `n`) is
/// dropped, matching the source's `choplist`.
pub fn chop<T: Clone>(n: usize, seq: &[T]) -> Vec<Vec<T>> {
    assert!(n > 0, "chop window size must be positive");
    seq.chunks_exact(n).map(|w| w.to_vec()).collect()
}

/// Coerce `x` to the textual form of a literal name (§4.3).
///
/// A `Name` decodes as UTF-8 when possible, falling back to a lossless
/// debug rendering (`b'...'`-style) on decode failure. Any other object is
/// a type error in strict mode; in lenient mode it is rendered via `Debug`.
pub fn literal_name<Ext: std::fmt::Debug>(x: &Object<Ext>, strict: bool, pos: u64) -> Result<String> {
    match x {
        Object::Name(name) => Ok(match name.as_str() {
            Some(s) => s.to_string(),
            None => debug_render_bytes(name.as_bytes()),
        }),
        other => {
            if strict {
                Err(ParserError::TypeError {
                    position: pos,
                    message: format!("literal name required: {other:?}"),
                })
            } else {
                Ok(format!("{other:?}"))
            }
        }
    }
}

/// Coerce `op` to the textual form of an operator/keyword (§4.3), decoding
/// its payload as UTF-8 with replacement for invalid sequences.
pub fn keyword_name(op: &Operator) -> String {
    String::from_utf8_lossy(op.as_bytes()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chop_drops_a_trailing_partial_window() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(chop(2, &items), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn chop_of_an_exact_multiple_keeps_every_item() {
        let items = vec![1, 2, 3, 4];
        assert_eq!(chop(2, &items), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn literal_name_decodes_a_utf8_payload() {
        let name = crate::intern::NAMES.intern("Widths");
        let obj: Object = Object::Name(name);
        assert_eq!(literal_name(&obj, true, 0).unwrap(), "Widths");
    }

    #[test]
    fn literal_name_on_a_non_name_is_fatal_in_strict_mode() {
        let obj: Object = Object::Integer(3);
        assert!(matches!(
            literal_name(&obj, true, 12),
            Err(ParserError::TypeError { position: 12, .. })
        ));
    }

    #[test]
    fn literal_name_on_a_non_name_coerces_in_lenient_mode() {
        let obj: Object = Object::Integer(3);
        assert_eq!(literal_name(&obj, false, 0).unwrap(), "Integer(3)");
    }

    #[test]
    fn keyword_name_decodes_operator_bytes_as_utf8() {
        let op = crate::intern::OPERATORS.intern(b"endobj");
        assert_eq!(keyword_name(&op), "endobj");
    }
}
