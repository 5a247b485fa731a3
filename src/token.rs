//! The resumable byte tokenizer (§4.4): turns a [`BufferCursor`] into a
//! stream of `(position, Token)` pairs.
//!
//! The state machine is expressed as a [`TokenizerState`] enum plus a
//! per-state handler taking a buffer slice and a start index and returning
//! the next index to resume from. Accumulators live on `Tokenizer` itself so
//! a handler can be re-entered after a `fillbuf` without losing partial
//! progress — the same discipline the source's `_parse_main`/`_parse_*`
//! method-pointer dance uses, just dispatched through `match` instead of a
//! bound method reference.

use std::collections::VecDeque;
use std::io::{Read, Seek};

use tracing::trace;

use crate::buffer::BufferCursor;
use crate::error::{ParserError, Result};
use crate::intern::{Name, Operator, NAMES, OPERATORS, STRUCTURAL};

/// A lexical token produced by the tokenizer.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Name(Name),
    Operator(Operator),
    ByteString(Vec<u8>),
}

/// Tokenizer states, one per §4.4 transition table row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenizerState {
    Main,
    Comment,
    Name,
    NameHex,
    Number,
    Real,
    Operator,
    String,
    StringEscape,
    AngleOpen,
    AngleClose,
    HexString,
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'#' | b'/' | b'%' | b'[' | b']' | b'(' | b')' | b'<' | b'>' | b'{' | b'}'
    ) || is_whitespace(b)
}

/// Matches the ground truth's POSIX-style `\s` (`SPC = re.compile(rb"\s")`),
/// which includes `\x0b` (vertical tab) — unlike `u8::is_ascii_whitespace`,
/// which Rust deliberately limits to `{SPACE, TAB, LF, FF, CR}`.
fn is_whitespace(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0x0b
}

fn is_eol(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

/// A resumable tokenizer over a [`BufferCursor`].
pub struct Tokenizer<S> {
    cursor: BufferCursor<S>,
    state: TokenizerState,
    current_token: Vec<u8>,
    current_token_pos: u64,
    pending: VecDeque<(u64, Token)>,
    eof: bool,

    // State-specific scratch accumulators.
    paren_depth: u32,
    hex_accum: Vec<u8>,
    octal_accum: Vec<u8>,
}

impl<S: Read + Seek> Tokenizer<S> {
    /// Wrap a stream, positioning the cursor at offset 0.
    pub fn new(stream: S) -> Result<Self> {
        Ok(Self {
            cursor: BufferCursor::new(stream)?,
            state: TokenizerState::Main,
            current_token: Vec::new(),
            current_token_pos: 0,
            pending: VecDeque::new(),
            eof: false,
            paren_depth: 0,
            hex_accum: Vec::new(),
            octal_accum: Vec::new(),
        })
    }

    /// Absolute offset of the read cursor.
    pub fn tell(&self) -> u64 {
        self.cursor.tell()
    }

    /// Jump to `pos`, discarding all tokenizer state (buffer, accumulators,
    /// pending tokens) and clearing the sticky EOF flag. The sole supported
    /// way to move around the stream.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.cursor.seek(pos)?;
        self.state = TokenizerState::Main;
        self.current_token.clear();
        self.current_token_pos = 0;
        self.pending.clear();
        self.eof = false;
        self.paren_depth = 0;
        self.hex_accum.clear();
        self.octal_accum.clear();
        Ok(())
    }

    /// Expose the underlying cursor for callers that need `reverse_lines`
    /// or `next_line` (trailer location sits above this layer).
    pub fn cursor_mut(&mut self) -> &mut BufferCursor<S> {
        &mut self.cursor
    }

    fn emit(&mut self, token: Token) {
        trace!(pos = self.current_token_pos, ?token, "tokenizer: emit");
        self.pending.push_back((self.current_token_pos, token));
    }

    /// Return the next token and its absolute start offset.
    pub fn next_token(&mut self) -> Result<(u64, Token)> {
        if self.eof && self.pending.is_empty() {
            return Err(ParserError::UnexpectedEof { position: self.cursor.tell() });
        }
        while self.pending.is_empty() {
            match self.cursor.fillbuf() {
                Ok(()) => {
                    let buf = self.cursor.remaining().to_vec();
                    let consumed = self.drive(&buf)?;
                    self.cursor.advance(consumed);
                }
                Err(ParserError::UnexpectedEof { .. }) => {
                    // Flush with a synthetic newline, then mark EOF sticky.
                    self.drive(b"\n")?;
                    self.eof = true;
                    if self.pending.is_empty() {
                        return Err(ParserError::UnexpectedEof { position: self.cursor.tell() });
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.pending.pop_front().unwrap())
    }

    /// Run the current state's handler across `buf`, returning how many
    /// bytes of `buf` were consumed. A handler may re-dispatch the very
    /// byte that triggered a state transition, so this loop keeps calling
    /// handlers until the whole slice is accounted for.
    fn drive(&mut self, buf: &[u8]) -> Result<usize> {
        let mut i = 0;
        while i < buf.len() {
            let next = match self.state {
                TokenizerState::Main => self.step_main(buf, i),
                TokenizerState::Comment => self.step_comment(buf, i),
                TokenizerState::Name => self.step_name(buf, i),
                TokenizerState::NameHex => self.step_name_hex(buf, i),
                TokenizerState::Number => self.step_number(buf, i),
                TokenizerState::Real => self.step_real(buf, i),
                TokenizerState::Operator => self.step_operator(buf, i),
                TokenizerState::String => self.step_string(buf, i),
                TokenizerState::StringEscape => self.step_string_escape(buf, i),
                TokenizerState::AngleOpen => self.step_angle_open(buf, i),
                TokenizerState::AngleClose => self.step_angle_close(buf, i),
                TokenizerState::HexString => self.step_hex_string(buf, i),
            };
            i = next;
        }
        Ok(i)
    }

    fn enter(&mut self, state: TokenizerState, pos_base: u64, j: usize) {
        self.current_token_pos = pos_base + j as u64;
        self.state = state;
    }

    fn step_main(&mut self, buf: &[u8], i: usize) -> usize {
        let base = self.cursor_window_origin(buf);
        let Some(j) = (i..buf.len()).find(|&k| !is_whitespace(buf[k])) else {
            return buf.len();
        };
        let c = buf[j];
        match c {
            b'%' => {
                self.current_token.clear();
                self.current_token.push(b'%');
                self.enter(TokenizerState::Comment, base, j);
                j + 1
            }
            b'/' => {
                self.current_token.clear();
                self.enter(TokenizerState::Name, base, j);
                j + 1
            }
            b'-' | b'+' | b'0'..=b'9' => {
                self.current_token.clear();
                self.current_token.push(c);
                self.enter(TokenizerState::Number, base, j);
                j + 1
            }
            b'.' => {
                self.current_token.clear();
                self.current_token.push(c);
                self.enter(TokenizerState::Real, base, j);
                j + 1
            }
            b'(' => {
                self.current_token.clear();
                self.paren_depth = 1;
                self.enter(TokenizerState::String, base, j);
                j + 1
            }
            b'<' => {
                self.current_token.clear();
                self.enter(TokenizerState::AngleOpen, base, j);
                j + 1
            }
            b'>' => {
                self.current_token.clear();
                self.enter(TokenizerState::AngleClose, base, j);
                j + 1
            }
            b'\x00' => j + 1,
            c if c.is_ascii_alphabetic() => {
                self.current_token.clear();
                self.current_token.push(c);
                self.enter(TokenizerState::Operator, base, j);
                j + 1
            }
            c => {
                self.current_token_pos = base + j as u64;
                self.emit(Token::Operator(OPERATORS.intern(&[c])));
                j + 1
            }
        }
    }

    /// Absolute offset of `buf[0]`. `drive` is always called with `buf` set
    /// to exactly `cursor.remaining()`, before any of it has been consumed
    /// via `advance`, so the cursor's own `tell()` already names `buf[0]`.
    fn cursor_window_origin(&self, _buf: &[u8]) -> u64 {
        self.cursor.tell()
    }

    fn step_comment(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| is_eol(buf[k])) {
            Some(j) => {
                // Comments are discarded; no token emitted.
                self.state = TokenizerState::Main;
                j
            }
            None => buf.len(),
        }
    }

    fn step_name(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| is_delimiter(buf[k])) {
            Some(j) => {
                self.current_token.extend_from_slice(&buf[i..j]);
                let c = buf[j];
                if c == b'#' {
                    self.hex_accum.clear();
                    self.state = TokenizerState::NameHex;
                    return j + 1;
                }
                let payload = std::mem::take(&mut self.current_token);
                let name = match std::str::from_utf8(&payload) {
                    Ok(s) => NAMES.intern(s),
                    Err(_) => NAMES.intern(payload.as_slice()),
                };
                self.emit(Token::Name(name));
                self.state = TokenizerState::Main;
                j
            }
            None => {
                self.current_token.extend_from_slice(&buf[i..]);
                buf.len()
            }
        }
    }

    fn step_name_hex(&mut self, buf: &[u8], i: usize) -> usize {
        let c = buf[i];
        if is_hex_digit(c) && self.hex_accum.len() < 2 {
            self.hex_accum.push(c);
            return i + 1;
        }
        if !self.hex_accum.is_empty() {
            let text = std::str::from_utf8(&self.hex_accum).unwrap();
            let byte = u8::from_str_radix(text, 16).unwrap_or(0);
            self.current_token.push(byte);
        }
        self.state = TokenizerState::Name;
        i
    }

    fn step_number(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| !buf[k].is_ascii_digit()) {
            Some(j) => {
                self.current_token.extend_from_slice(&buf[i..j]);
                let c = buf[j];
                if c == b'.' {
                    self.current_token.push(c);
                    self.state = TokenizerState::Real;
                    return j + 1;
                }
                if let Ok(text) = std::str::from_utf8(&self.current_token) {
                    if let Ok(n) = text.parse::<i64>() {
                        self.emit(Token::Integer(n));
                    }
                    // Parse failure: silently dropped, per §4.4.
                }
                self.current_token.clear();
                self.state = TokenizerState::Main;
                j
            }
            None => {
                self.current_token.extend_from_slice(&buf[i..]);
                buf.len()
            }
        }
    }

    fn step_real(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| !buf[k].is_ascii_digit()) {
            Some(j) => {
                self.current_token.extend_from_slice(&buf[i..j]);
                if let Ok(text) = std::str::from_utf8(&self.current_token) {
                    if let Ok(n) = text.parse::<f64>() {
                        self.emit(Token::Real(n));
                    }
                }
                self.current_token.clear();
                self.state = TokenizerState::Main;
                j
            }
            None => {
                self.current_token.extend_from_slice(&buf[i..]);
                buf.len()
            }
        }
    }

    fn step_operator(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| is_delimiter(buf[k])) {
            Some(j) => {
                self.current_token.extend_from_slice(&buf[i..j]);
                match self.current_token.as_slice() {
                    b"true" => self.emit(Token::Boolean(true)),
                    b"false" => self.emit(Token::Boolean(false)),
                    _ => {
                        let op = OPERATORS.intern(&self.current_token);
                        self.emit(Token::Operator(op));
                    }
                }
                self.current_token.clear();
                self.state = TokenizerState::Main;
                j
            }
            None => {
                self.current_token.extend_from_slice(&buf[i..]);
                buf.len()
            }
        }
    }

    fn step_string(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| matches!(buf[k], b'(' | b')' | b'\\')) {
            Some(j) => {
                self.current_token.extend_from_slice(&buf[i..j]);
                let c = buf[j];
                match c {
                    b'(' => {
                        self.paren_depth += 1;
                        self.current_token.push(c);
                        j + 1
                    }
                    b')' => {
                        self.paren_depth -= 1;
                        if self.paren_depth == 0 {
                            let payload = std::mem::take(&mut self.current_token);
                            self.emit(Token::ByteString(payload));
                            self.state = TokenizerState::Main;
                        } else {
                            self.current_token.push(c);
                        }
                        j + 1
                    }
                    b'\\' => {
                        self.octal_accum.clear();
                        self.state = TokenizerState::StringEscape;
                        j + 1
                    }
                    _ => unreachable!(),
                }
            }
            None => {
                self.current_token.extend_from_slice(&buf[i..]);
                buf.len()
            }
        }
    }

    fn step_string_escape(&mut self, buf: &[u8], i: usize) -> usize {
        let c = buf[i];
        if c.is_ascii_digit() && c <= b'7' && self.octal_accum.len() < 3 {
            self.octal_accum.push(c);
            return i + 1;
        }
        if !self.octal_accum.is_empty() {
            let text = std::str::from_utf8(&self.octal_accum).unwrap();
            let code = u32::from_str_radix(text, 8).unwrap_or(0);
            self.current_token.push(code as u8);
            self.state = TokenizerState::String;
            return i;
        }
        match c {
            b'b' => self.current_token.push(0x08),
            b't' => self.current_token.push(0x09),
            b'n' => self.current_token.push(0x0a),
            b'f' => self.current_token.push(0x0c),
            b'r' => self.current_token.push(0x0d),
            b'(' => self.current_token.push(0x28),
            b')' => self.current_token.push(0x29),
            b'\\' => self.current_token.push(0x5c),
            b'\r' if buf.get(i + 1) == Some(&b'\n') => {
                self.state = TokenizerState::String;
                return i + 2;
            }
            _ => {
                // Unrecognized escape: dropped silently.
            }
        }
        self.state = TokenizerState::String;
        i + 1
    }

    fn step_angle_open(&mut self, buf: &[u8], i: usize) -> usize {
        let c = buf[i];
        if c == b'<' {
            self.emit(Token::Operator(STRUCTURAL.dict_begin.clone()));
            self.state = TokenizerState::Main;
            i + 1
        } else {
            self.state = TokenizerState::HexString;
            i
        }
    }

    fn step_angle_close(&mut self, buf: &[u8], i: usize) -> usize {
        let c = buf[i];
        if c == b'>' {
            self.emit(Token::Operator(STRUCTURAL.dict_end.clone()));
            self.state = TokenizerState::Main;
            i + 1
        } else {
            self.state = TokenizerState::Main;
            i
        }
    }

    fn step_hex_string(&mut self, buf: &[u8], i: usize) -> usize {
        match (i..buf.len()).find(|&k| !(is_whitespace(buf[k]) || is_hex_digit(buf[k]))) {
            Some(j) => {
                self.current_token.extend_from_slice(&buf[i..j]);
                let payload = std::mem::take(&mut self.current_token);
                let decoded = decode_hex_pairs(&payload);
                self.emit(Token::ByteString(decoded));
                self.state = TokenizerState::Main;
                j
            }
            None => {
                self.current_token.extend_from_slice(&buf[i..]);
                buf.len()
            }
        }
    }
}

/// Strips whitespace, then decodes consecutive 2-hex-digit pairs into
/// bytes; a trailing lone hex digit is treated as if followed by `0`.
fn decode_hex_pairs(raw: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = raw.iter().copied().filter(|b| !is_whitespace(*b)).collect();
    let mut out = Vec::with_capacity(digits.len().div_ceil(2));
    let mut chunks = digits.chunks(2);
    for chunk in &mut chunks {
        let hi = (chunk[0] as char).to_digit(16).unwrap_or(0);
        let lo = if chunk.len() == 2 {
            (chunk[1] as char).to_digit(16).unwrap_or(0)
        } else {
            0
        };
        out.push(((hi << 4) | lo) as u8);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tokens_of(input: &[u8]) -> Vec<Token> {
        let mut tok = Tokenizer::new(Cursor::new(input.to_vec())).unwrap();
        let mut out = Vec::new();
        loop {
            match tok.next_token() {
                Ok((_, t)) => out.push(t),
                Err(ParserError::UnexpectedEof { .. }) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        out
    }

    #[test]
    fn scenario_one_mixed_tokens() {
        let tokens = tokens_of(b"123 3.14 true /Name (hi) <4869> [1 2]");
        assert_eq!(
            tokens,
            vec![
                Token::Integer(123),
                Token::Real(3.14),
                Token::Boolean(true),
                Token::Name(NAMES.intern("Name")),
                Token::ByteString(b"hi".to_vec()),
                Token::ByteString(b"Hi".to_vec()),
                Token::Operator(STRUCTURAL.array_begin.clone()),
                Token::Integer(1),
                Token::Integer(2),
                Token::Operator(STRUCTURAL.array_end.clone()),
            ]
        );
    }

    #[test]
    fn dict_begin_and_end_are_structural_operators() {
        let tokens = tokens_of(b"<< /Key 1 >>");
        assert_eq!(
            tokens,
            vec![
                Token::Operator(STRUCTURAL.dict_begin.clone()),
                Token::Name(NAMES.intern("Key")),
                Token::Integer(1),
                Token::Operator(STRUCTURAL.dict_end.clone()),
            ]
        );
    }

    #[test]
    fn hex_escape_inside_name_decodes_to_a_space() {
        let tokens = tokens_of(b"/A#20B");
        assert_eq!(tokens, vec![Token::Name(NAMES.intern("A B"))]);
    }

    #[test]
    fn balanced_parens_are_preserved_inside_a_literal_string() {
        let tokens = tokens_of(b"( a ( b ) c )");
        assert_eq!(tokens, vec![Token::ByteString(b" a ( b ) c ".to_vec())]);
    }

    #[test]
    fn line_continuation_inside_a_literal_string_is_swallowed() {
        let tokens = tokens_of(b"(foo\\\r\nbar)");
        assert_eq!(tokens, vec![Token::ByteString(b"foobar".to_vec())]);
    }

    #[test]
    fn odd_length_hex_string_is_padded_with_a_trailing_zero() {
        let tokens = tokens_of(b"<4a7>");
        assert_eq!(tokens, vec![Token::ByteString(vec![0x4a, 0x70])]);
    }

    #[test]
    fn a_lone_dot_is_dropped_silently_at_eof() {
        let tokens = tokens_of(b".");
        assert!(tokens.is_empty());
    }

    #[test]
    fn malformed_number_overflow_is_dropped_silently() {
        let tokens = tokens_of(b"99999999999999999999999999 1");
        assert_eq!(tokens, vec![Token::Integer(1)]);
    }

    #[test]
    fn seek_resets_tokenizer_state_for_deterministic_reread() {
        let mut tok = Tokenizer::new(Cursor::new(b"123 456".to_vec())).unwrap();
        let first = tok.next_token().unwrap();
        tok.seek(0).unwrap();
        let replay = tok.next_token().unwrap();
        assert_eq!(first, replay);
    }

    #[test]
    fn single_byte_operator_is_emitted_for_unrecognized_punctuation() {
        let tokens = tokens_of(b")");
        assert_eq!(tokens, vec![Token::Operator(OPERATORS.intern(b")"))]);
    }

    #[test]
    fn vertical_tab_is_skipped_as_whitespace_like_the_posix_s_class() {
        let tokens = tokens_of(b"\x0bfoo");
        assert_eq!(tokens, vec![Token::Operator(OPERATORS.intern(b"foo"))]);
    }

    // ------------------------------------------------------------------
    // Property tests (§8 round-trip and boundary laws)
    // ------------------------------------------------------------------

    #[test]
    fn property_reseeking_to_zero_reproduces_the_same_token_sequence() {
        use proptest::prelude::*;

        proptest!(|(input in "[0-9 /a-zA-Z()\\[\\]{}<>]{0,120}")| {
            let mut tok = Tokenizer::new(Cursor::new(input.clone().into_bytes())).unwrap();
            let mut first_pass = Vec::new();
            loop {
                match tok.next_token() {
                    Ok(pair) => first_pass.push(pair),
                    Err(ParserError::UnexpectedEof { .. }) => break,
                    Err(_) => break,
                }
            }
            tok.seek(0).unwrap();
            let mut second_pass = Vec::new();
            loop {
                match tok.next_token() {
                    Ok(pair) => second_pass.push(pair),
                    Err(ParserError::UnexpectedEof { .. }) => break,
                    Err(_) => break,
                }
            }
            prop_assert_eq!(first_pass, second_pass);
        });
    }

    #[test]
    fn property_odd_length_hex_string_matches_zero_padded_even_length() {
        use proptest::prelude::*;

        proptest!(|(digits in "[0-9a-fA-F]{1,40}")| {
            let odd = digits.len() % 2 == 1;
            prop_assume!(odd);
            let with_odd = format!("<{digits}>");
            let with_pad = format!("<{digits}0>");
            let a = tokens_of(with_odd.as_bytes());
            let b = tokens_of(with_pad.as_bytes());
            prop_assert_eq!(a, b);
        });
    }

    #[test]
    fn property_balanced_inner_parens_survive_a_literal_string_verbatim() {
        use proptest::prelude::*;

        proptest!(|(prefix in "[a-z ]{0,10}", inner in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}")| {
            let source = format!("({prefix}({inner}){suffix})");
            let tokens = tokens_of(source.as_bytes());
            let expected = format!("{prefix}({inner}){suffix}");
            prop_assert_eq!(tokens, vec![Token::ByteString(expected.into_bytes())]);
        });
    }

    #[test]
    fn property_equal_name_payloads_intern_to_the_identical_instance() {
        use proptest::prelude::*;

        proptest!(|(ident in "[A-Za-z][A-Za-z0-9]{0,30}")| {
            let source = format!("/{ident} /{ident}");
            let tokens = tokens_of(source.as_bytes());
            match tokens.as_slice() {
                [Token::Name(a), Token::Name(b)] => prop_assert_eq!(a, b),
                other => prop_assert!(false, "expected two Name tokens, got {:?}", other),
            }
        });
    }
}
