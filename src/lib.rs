//! A low-level PostScript/PDF object parser.
//!
//! This crate implements the lexical and syntactic rules of the PDF/
//! PostScript object grammar (PDF Reference §3.2): a resumable byte
//! tokenizer paired with a stack-based parser that assembles composite
//! objects (arrays, dictionaries, procedures) from the resulting token
//! stream. It is meant as the foundation a higher PDF layer (cross-
//! reference resolution, stream decoding, content interpretation) builds
//! on, not a complete PDF reader by itself.
//!
//! ```text
//! Bytes -> BufferCursor -> Tokenizer -> StackParser -> Object stream
//! ```
//!
//! Entry points: [`parser::StackParser::next_object`] for the composite
//! layer, or [`token::Tokenizer::next_token`] directly if only the token
//! stream is needed.

pub mod buffer;
pub mod error;
pub mod intern;
pub mod object;
pub mod parser;
pub mod token;

pub use error::{ParserError, Result};
pub use object::Object;
pub use parser::{ParserConfig, StackParser};
pub use token::{Token, Tokenizer};
