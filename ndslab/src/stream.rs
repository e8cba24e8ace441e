/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::any::type_name;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::str::FromStr;

/// Errors that can occur while reading tokens from a stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream error: expected '{expected}' but got end of input")]
    UnexpectedEndOfInput { expected: &'static str },

    #[error("stream error: token '{actual}' is not a '{expected_type}'")]
    WrongTokenType {
        expected_type: &'static str,
        actual: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The capabilities a slab reader needs from its input: line
/// skipping, positioning, and scalar parsing.
///
/// Positions are byte offsets from the start of the input, as
/// reported by [`TokenStream::tell`]; they are only meaningful to
/// the stream that produced them.
pub trait TokenStream {
    /// Consume input up to and including the next newline. Fails if
    /// the input is already exhausted.
    fn skip_line(&mut self) -> Result<(), StreamError>;

    /// The current position.
    fn tell(&self) -> u64;

    /// Move to a position previously returned by [`TokenStream::tell`].
    fn seek(&mut self, pos: u64) -> Result<(), StreamError>;

    /// Consume the next token as an integer.
    fn read_int(&mut self) -> Result<i32, StreamError>;

    /// Consume the next token as a floating point number.
    fn read_double(&mut self) -> Result<f64, StreamError>;

    /// Returns true if no input remains.
    fn is_eof(&mut self) -> Result<bool, StreamError>;
}

/// Tokens are separated by ASCII whitespace and commas.
fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b','
}

/// A tokenizer over any buffered, seekable byte source.
///
/// The source is assumed to be positioned at its start when the
/// stream is created.
pub struct TextStream<R> {
    inner: R,
    pos: u64,
}

impl<R: BufRead + Seek> TextStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    fn consume(&mut self, amount: usize) {
        self.inner.consume(amount);
        self.pos += amount as u64;
    }

    fn skip_separators(&mut self) -> Result<(), StreamError> {
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let skip = buf.iter().position(|&b| !is_separator(b));
            let amount = skip.unwrap_or(buf.len());
            self.consume(amount);
            if skip.is_some() {
                return Ok(());
            }
        }
    }

    /// Returns the next token, or `None` if only separators remain.
    fn next_token(&mut self) -> Result<Option<String>, StreamError> {
        self.skip_separators()?;
        let mut token = Vec::new();
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let end = buf.iter().position(|&b| is_separator(b));
            let amount = end.unwrap_or(buf.len());
            token.extend_from_slice(&buf[..amount]);
            self.consume(amount);
            if end.is_some() {
                break;
            }
        }
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&token).into_owned()))
        }
    }

    /// Parse the next token as a `T`. The token is consumed whether or
    /// not it parses.
    pub fn try_parse<T: FromStr>(&mut self) -> Result<T, StreamError> {
        let expected = type_name::<T>();
        let token = self
            .next_token()?
            .ok_or(StreamError::UnexpectedEndOfInput { expected })?;
        token.parse().map_err(|_| StreamError::WrongTokenType {
            expected_type: expected,
            actual: token,
        })
    }
}

impl<R: BufRead + Seek> TokenStream for TextStream<R> {
    fn skip_line(&mut self) -> Result<(), StreamError> {
        let mut consumed = false;
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return if consumed {
                    Ok(())
                } else {
                    Err(StreamError::UnexpectedEndOfInput { expected: "a line" })
                };
            }
            let newline = buf.iter().position(|&b| b == b'\n');
            let available = buf.len();
            match newline {
                Some(newline) => {
                    self.consume(newline + 1);
                    return Ok(());
                }
                None => {
                    self.consume(available);
                    consumed = true;
                }
            }
        }
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<(), StreamError> {
        self.pos = self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_int(&mut self) -> Result<i32, StreamError> {
        self.try_parse()
    }

    fn read_double(&mut self) -> Result<f64, StreamError> {
        self.try_parse()
    }

    fn is_eof(&mut self) -> Result<bool, StreamError> {
        Ok(self.inner.fill_buf()?.is_empty())
    }
}

/// The streams a reader can be built over, chosen once when the
/// reader is created.
pub enum InputStream {
    File(TextStream<BufReader<File>>),
    Inline(TextStream<Cursor<Vec<u8>>>),
}

impl InputStream {
    /// Open a file-backed stream.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(InputStream::File(TextStream::new(BufReader::new(file))))
    }

    /// A stream over an in-memory copy of `text`.
    pub fn from_string(text: impl Into<String>) -> Self {
        InputStream::Inline(TextStream::new(Cursor::new(text.into().into_bytes())))
    }
}

macro_rules! delegate {
    ($self:ident, $stream:ident => $body:expr) => {
        match $self {
            InputStream::File($stream) => $body,
            InputStream::Inline($stream) => $body,
        }
    };
}

impl TokenStream for InputStream {
    fn skip_line(&mut self) -> Result<(), StreamError> {
        delegate!(self, s => s.skip_line())
    }

    fn tell(&self) -> u64 {
        delegate!(self, s => s.tell())
    }

    fn seek(&mut self, pos: u64) -> Result<(), StreamError> {
        delegate!(self, s => s.seek(pos))
    }

    fn read_int(&mut self) -> Result<i32, StreamError> {
        delegate!(self, s => s.read_int())
    }

    fn read_double(&mut self) -> Result<f64, StreamError> {
        delegate!(self, s => s.read_double())
    }

    fn is_eof(&mut self) -> Result<bool, StreamError> {
        delegate!(self, s => s.is_eof())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_basic() {
        let mut s = InputStream::from_string("1 2.5,-3\n\t4e2  x");
        assert_eq!(s.read_int().unwrap(), 1);
        assert_eq!(s.read_double().unwrap(), 2.5);
        assert_eq!(s.read_int().unwrap(), -3);
        assert_eq!(s.read_double().unwrap(), 400.0);
        assert!(matches!(
            s.read_double(),
            Err(StreamError::WrongTokenType {
                expected_type: "f64",
                ..
            })
        ));
        assert!(s.is_eof().unwrap());
        assert!(matches!(
            s.read_int(),
            Err(StreamError::UnexpectedEndOfInput { expected: "i32" })
        ));
    }

    #[test]
    fn test_int_rejects_float_token() {
        let mut s = InputStream::from_string("1.5");
        assert!(matches!(
            s.read_int(),
            Err(StreamError::WrongTokenType {
                expected_type: "i32",
                actual,
            }) if actual == "1.5"
        ));
    }

    #[test]
    fn test_trailing_separators_are_end_of_input() {
        let mut s = InputStream::from_string("7 , \n\n ");
        assert_eq!(s.read_int().unwrap(), 7);
        assert!(!s.is_eof().unwrap());
        assert!(matches!(
            s.read_double(),
            Err(StreamError::UnexpectedEndOfInput { .. })
        ));
        assert!(s.is_eof().unwrap());
    }

    #[test]
    fn test_skip_line_and_tell() {
        let mut s = InputStream::from_string("header\nsecond line\n1 2\n");
        assert_eq!(s.tell(), 0);
        s.skip_line().unwrap();
        assert_eq!(s.tell(), 7);
        s.skip_line().unwrap();
        assert_eq!(s.tell(), 19);
        assert_eq!(s.read_int().unwrap(), 1);
        s.skip_line().unwrap();
        assert!(s.is_eof().unwrap());
        assert!(matches!(
            s.skip_line(),
            Err(StreamError::UnexpectedEndOfInput { expected: "a line" })
        ));
    }

    #[test]
    fn test_skip_last_line_without_newline() {
        let mut s = InputStream::from_string("only");
        s.skip_line().unwrap();
        assert!(s.is_eof().unwrap());
        assert_eq!(s.tell(), 4);
    }

    #[test]
    fn test_seek_rewinds() {
        let mut s = InputStream::from_string("# preamble\n10 20 30\n");
        s.skip_line().unwrap();
        let start = s.tell();
        assert_eq!(s.read_int().unwrap(), 10);
        assert_eq!(s.read_int().unwrap(), 20);
        s.seek(start).unwrap();
        assert_eq!(s.tell(), start);
        assert_eq!(s.read_int().unwrap(), 10);
    }

    #[test]
    fn test_small_buffer_tokens_span_refills() {
        let text = "123456 7.25\nskip me\n-42";
        let mut s = TextStream::new(BufReader::with_capacity(2, Cursor::new(text.as_bytes())));
        assert_eq!(s.read_int().unwrap(), 123456);
        assert_eq!(s.read_double().unwrap(), 7.25);
        s.skip_line().unwrap();
        s.skip_line().unwrap();
        let pos = s.tell();
        assert_eq!(s.read_int().unwrap(), -42);
        s.seek(pos).unwrap();
        assert_eq!(s.read_int().unwrap(), -42);
    }

    #[test]
    fn test_file_stream() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "skip\n1 2 3\n").unwrap();
        let mut s = InputStream::open(file.path()).unwrap();
        assert!(matches!(s, InputStream::File(_)));
        s.skip_line().unwrap();
        let start = s.tell();
        assert_eq!(s.read_double().unwrap(), 1.0);
        assert_eq!(s.read_int().unwrap(), 2);
        s.seek(start).unwrap();
        assert_eq!(s.read_int().unwrap(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InputStream::open(dir.path().join("missing.txt")).is_err());
    }
}
