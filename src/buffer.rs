//! Windowed, position-tracked access to a seekable byte stream.
//!
//! `BufferCursor` is the sole point of contact between this crate and the
//! external stream (§6.1 of the object-parser spec): the caller owns and
//! closes the stream, `BufferCursor` only ever borrows it. It refills a
//! fixed-size window on demand, tracks the absolute offset of that window,
//! and exposes forward line scanning (`next_line`) and backward line
//! scanning (`reverse_lines`), the latter used by higher layers to locate a
//! trailer dictionary at the end of a PDF file.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use crate::error::{ParserError, Result};

/// Number of bytes fetched per refill.
pub const BUFSIZ: usize = 4096;

/// Wraps a `Read + Seek` stream with a refillable read window.
pub struct BufferCursor<S> {
    stream: S,
    buffer: Vec<u8>,
    buffer_origin: u64,
    char_pos: usize,
}

impl<S: Read + Seek> BufferCursor<S> {
    /// Create a cursor positioned at the start of `stream`.
    pub fn new(mut stream: S) -> Result<Self> {
        stream.seek(SeekFrom::Start(0)).map_err(|source| ParserError::Io {
            position: 0,
            source,
        })?;
        Ok(Self {
            stream,
            buffer: Vec::new(),
            buffer_origin: 0,
            char_pos: 0,
        })
    }

    /// Absolute offset of the read cursor.
    pub fn tell(&self) -> u64 {
        self.buffer_origin + self.char_pos as u64
    }

    /// Position the underlying stream and empty the buffer.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        trace!(pos, "buffer: seek");
        self.stream
            .seek(SeekFrom::Start(pos))
            .map_err(|source| ParserError::Io { position: pos, source })?;
        self.buffer_origin = pos;
        self.buffer.clear();
        self.char_pos = 0;
        Ok(())
    }

    /// Ensure at least one unread byte is available in `buffer`, refilling
    /// from the stream if necessary. Fails with [`ParserError::UnexpectedEof`]
    /// if the underlying stream has nothing left to give.
    pub fn fillbuf(&mut self) -> Result<()> {
        if self.char_pos < self.buffer.len() {
            return Ok(());
        }
        let pos = self
            .stream
            .stream_position()
            .map_err(|source| ParserError::Io { position: self.tell(), source })?;
        self.buffer_origin = pos;
        self.buffer.resize(BUFSIZ, 0);
        let mut total = 0;
        loop {
            let n = self
                .stream
                .read(&mut self.buffer[total..])
                .map_err(|source| ParserError::Io { position: pos, source })?;
            if n == 0 {
                break;
            }
            total += n;
            if total == self.buffer.len() {
                break;
            }
        }
        self.buffer.truncate(total);
        self.char_pos = 0;
        if total == 0 {
            trace!(pos, "buffer: eof on fillbuf");
            return Err(ParserError::UnexpectedEof { position: pos });
        }
        trace!(pos, len = total, "buffer: refilled");
        Ok(())
    }

    /// The current unread slice of the buffer (may be empty right after a
    /// refill boundary; call [`Self::fillbuf`] first to guarantee non-empty).
    pub fn remaining(&self) -> &[u8] {
        &self.buffer[self.char_pos..]
    }

    /// Advance the read cursor by `n` bytes within the current buffer.
    pub fn advance(&mut self, n: usize) {
        self.char_pos += n;
    }

    /// Read and discard a single byte, refilling as needed. Used by the
    /// tokenizer's end-of-stream flush, which synthesizes a final `\n`.
    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        match self.fillbuf() {
            Ok(()) => Ok(self.buffer.get(self.char_pos).copied()),
            Err(ParserError::UnexpectedEof { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch the next line, ending with the first `CR`, `LF`, or `CRLF`
    /// encountered; the terminator bytes are included in the result. An
    /// `LF` that lands in a freshly refilled buffer immediately after a
    /// `CR` that ended the previous buffer is still folded into the same
    /// line (the `eol` flag below carries that fact across a `fillbuf`).
    pub fn next_line(&mut self) -> Result<(u64, Vec<u8>)> {
        let mut line = Vec::new();
        let line_pos = self.tell();
        let mut pending_cr = false;
        loop {
            self.fillbuf()?;
            if pending_cr {
                if self.buffer.get(self.char_pos) == Some(&b'\n') {
                    line.push(b'\n');
                    self.char_pos += 1;
                }
                break;
            }
            match self.remaining().iter().position(|&b| b == b'\r' || b == b'\n') {
                Some(rel) => {
                    let end = self.char_pos + rel + 1;
                    line.extend_from_slice(&self.buffer[self.char_pos..end]);
                    self.char_pos = end;
                    if line.last() == Some(&b'\r') {
                        pending_cr = true;
                    } else {
                        break;
                    }
                }
                None => {
                    line.extend_from_slice(self.remaining());
                    self.char_pos = self.buffer.len();
                }
            }
        }
        Ok((line_pos, line))
    }

    /// Lazily yield chunks from the end of the stream toward the beginning.
    /// Each chunk starts immediately after a line terminator (or at offset
    /// 0, for the first line in the file) and extends up to, but not past,
    /// the next terminator to its right; terminator bytes themselves are
    /// not part of the yielded chunk. Used only for trailer location;
    /// leaves the stream's cursor wherever the scan ended, callers must
    /// reseek afterward.
    ///
    /// A terminator is conservatively any run of `\r`, `\n`, or `\r\n`,
    /// matched within a single refill window — a `\r\n` split exactly
    /// across a window boundary is treated as two separate terminators,
    /// mirroring the one-chunk-at-a-time scan of the source this is
    /// grounded on.
    pub fn reverse_lines(&mut self) -> Result<ReverseLines<'_, S>> {
        let end = self
            .stream
            .seek(SeekFrom::End(0))
            .map_err(|source| ParserError::Io { position: 0, source })?;
        Ok(ReverseLines {
            stream: &mut self.stream,
            pos: end,
            working: Vec::new(),
            tail: Vec::new(),
            done: false,
        })
    }
}

/// Finite, non-restartable backward line iterator produced by
/// [`BufferCursor::reverse_lines`].
///
/// `working` holds the most recently read (and not yet fully scanned)
/// chunk; `tail` accumulates trailing content whenever a read chunk turns
/// out to contain no terminator at all. This mirrors the source's own
/// `s`/`buf` pair one to one.
pub struct ReverseLines<'a, S> {
    stream: &'a mut S,
    /// Exclusive upper bound of the region not yet read from the stream.
    pos: u64,
    working: Vec<u8>,
    tail: Vec<u8>,
    done: bool,
}

/// Finds the rightmost terminator run in `s`, returning `(start, end)` byte
/// indices of the terminator itself (end exclusive).
fn rfind_terminator(s: &[u8]) -> Option<(usize, usize)> {
    let idx = s.iter().rposition(|&b| b == b'\r' || b == b'\n')?;
    if s[idx] == b'\n' && idx > 0 && s[idx - 1] == b'\r' {
        Some((idx - 1, idx + 1))
    } else {
        Some((idx, idx + 1))
    }
}

impl<'a, S: Read + Seek> Iterator for ReverseLines<'a, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some((term_start, term_end)) = rfind_terminator(&self.working) {
                let mut line = self.working.split_off(term_end);
                line.append(&mut self.tail);
                self.working.truncate(term_start);
                return Some(Ok(line));
            }

            if self.pos == 0 {
                self.done = true;
                let mut line = std::mem::take(&mut self.working);
                line.append(&mut self.tail);
                if line.is_empty() {
                    return None;
                }
                return Some(Ok(line));
            }

            // No terminator in the current window: fold it into `tail` and
            // read the next (further back) chunk into `working`.
            let mut folded = std::mem::take(&mut self.working);
            folded.append(&mut self.tail);
            self.tail = folded;

            let chunk_start = self.pos.saturating_sub(BUFSIZ as u64);
            if let Err(source) = self.stream.seek(SeekFrom::Start(chunk_start)) {
                self.done = true;
                return Some(Err(ParserError::Io { position: chunk_start, source }));
            }
            let to_read = (self.pos - chunk_start) as usize;
            let mut buf = vec![0u8; to_read];
            let mut filled = 0;
            while filled < to_read {
                match self.stream.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(source) => {
                        self.done = true;
                        return Some(Err(ParserError::Io { position: chunk_start, source }));
                    }
                }
            }
            buf.truncate(filled);
            self.working = buf;
            self.pos = chunk_start;
        }
    }
}
