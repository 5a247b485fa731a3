//! Error taxonomy shared by the tokenizer and the stack parser.
//!
//! The set of kinds is closed and mirrors the source parser's exception
//! hierarchy: `UnexpectedEof`, `SyntaxError`, `TypeError`, `ValueError` and a
//! catch-all `GenericParserError`. `ValueError` is reserved for higher layers
//! built on top of this crate (indirect references, streams) — the tokenizer
//! never raises it, since malformed numbers are dropped silently rather than
//! reported (see [`crate::token`]).

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ParserError>;

/// The closed set of error kinds this crate can raise.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    /// Ran out of bytes while a token or object was still expected.
    #[error("unexpected end of file at byte {position}")]
    UnexpectedEof {
        /// Absolute offset at which the stream was exhausted.
        position: u64,
    },

    /// Structurally malformed input, e.g. an odd-length dictionary body.
    #[error("syntax error at byte {position}: {message}")]
    SyntaxError {
        /// Absolute offset of the offending construct.
        position: u64,
        /// Human-readable description.
        message: String,
    },

    /// Wrong kind of value in context, e.g. `]` closing a dict builder.
    #[error("type error at byte {position}: {message}")]
    TypeError {
        /// Absolute offset of the offending construct.
        position: u64,
        /// Human-readable description.
        message: String,
    },

    /// Reserved for higher-layer use; never raised by this crate directly.
    #[error("value error at byte {position}: {message}")]
    ValueError {
        /// Absolute offset of the offending construct.
        position: u64,
        /// Human-readable description.
        message: String,
    },

    /// Catch-all for a token shape the stack parser does not recognize.
    #[error("unrecognized token at byte {position}")]
    GenericParserError {
        /// Absolute offset of the offending token.
        position: u64,
    },

    /// A read/seek on the underlying stream failed.
    #[error("i/o error at byte {position}: {source}")]
    Io {
        /// Absolute offset at which the failing read was attempted.
        position: u64,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl ParserError {
    /// The absolute byte offset this error is anchored to, where known.
    pub fn position(&self) -> u64 {
        match self {
            ParserError::UnexpectedEof { position }
            | ParserError::SyntaxError { position, .. }
            | ParserError::TypeError { position, .. }
            | ParserError::ValueError { position, .. }
            | ParserError::GenericParserError { position }
            | ParserError::Io { position, .. } => *position,
        }
    }
}

/// Lossless debug rendering used when a name's payload is not valid UTF-8.
/// Mirrors the source's fallback to `str(x.name)`, which for `bytes`
/// produces a `b'...'` literal.
pub(crate) fn debug_render_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push_str("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_extracted_for_every_variant() {
        assert_eq!(ParserError::UnexpectedEof { position: 3 }.position(), 3);
        assert_eq!(
            ParserError::SyntaxError { position: 7, message: "x".into() }.position(),
            7
        );
        assert_eq!(ParserError::GenericParserError { position: 9 }.position(), 9);
    }

    #[test]
    fn debug_render_escapes_non_printable_bytes() {
        assert_eq!(debug_render_bytes(b"hi"), "b'hi'");
        assert_eq!(debug_render_bytes(b"\xff"), "b'\\xff'");
        assert_eq!(debug_render_bytes(b"a'b"), "b'a\\'b'");
    }
}
