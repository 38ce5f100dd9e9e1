//! Pull-based reader for a JSON array nested under a key path.
//!
//! Given `{"meta": {...}, "data": {"items": [...]}}` and the path
//! `["data", "items"]`, the reader walks into the document, skipping every
//! value whose key is not on the path, and then yields the array elements one
//! at a time. Only the element being decoded is buffered.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;

enum State {
    Start,
    InArray { first: bool },
    Done,
}

/// Iterator over the elements of a JSON array found at `path`.
///
/// The reader is single-use: once it has returned `None` or an error it stays
/// exhausted. Navigation errors (missing key, wrong delimiter, bad JSON) are
/// reported on the first call to `next`.
pub struct JsonArrayReader<R: Read, T> {
    input: BufReader<R>,
    path: Vec<String>,
    state: State,
    offset: u64,
    element: Vec<u8>,
    _marker: PhantomData<T>,
}

impl<R: Read, T: DeserializeOwned> JsonArrayReader<R, T> {
    /// An empty `path` reads a top-level array.
    pub fn new(input: R, path: &[&str]) -> Self {
        JsonArrayReader {
            input: BufReader::new(input),
            path: path.iter().map(|s| s.to_string()).collect(),
            state: State::Start,
            offset: 0,
            element: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, CodecError> {
        let buf = self.input.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self, capture: &mut Option<&mut Vec<u8>>, b: u8) {
        self.input.consume(1);
        self.offset += 1;
        if let Some(buf) = capture.as_mut() {
            buf.push(b);
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, CodecError> {
        let b = self.peek()?;
        if let Some(b) = b {
            self.bump(&mut None, b);
        }
        Ok(b)
    }

    fn skip_ws(&mut self) -> Result<(), CodecError> {
        while let Some(b) = self.peek()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.bump(&mut None, b);
        }
        Ok(())
    }

    fn unexpected(&self, expected: &'static str, found: u8) -> CodecError {
        CodecError::Unexpected {
            expected,
            found: char::from(found),
            offset: self.offset.saturating_sub(1),
        }
    }

    fn expect(&mut self, want: u8, expected: &'static str) -> Result<(), CodecError> {
        self.skip_ws()?;
        match self.next_byte()? {
            Some(b) if b == want => Ok(()),
            Some(b) => Err(self.unexpected(expected, b)),
            None => Err(CodecError::UnexpectedEof(expected)),
        }
    }

    /// Copy the rest of a string whose opening quote was already consumed.
    fn scan_string(&mut self, capture: &mut Option<&mut Vec<u8>>) -> Result<(), CodecError> {
        loop {
            let b = self.peek()?.ok_or(CodecError::UnexpectedEof("end of string"))?;
            self.bump(capture, b);
            match b {
                b'"' => return Ok(()),
                b'\\' => {
                    let escaped = self.peek()?.ok_or(CodecError::UnexpectedEof("escape"))?;
                    self.bump(capture, escaped);
                }
                _ => {}
            }
        }
    }

    /// Consume one complete value, optionally copying its bytes.
    ///
    /// Nesting is tracked with an explicit stack so deep documents do not
    /// recurse; mismatched brackets are rejected.
    fn scan_value(&mut self, mut capture: Option<&mut Vec<u8>>) -> Result<(), CodecError> {
        self.skip_ws()?;
        let mut closers: Vec<u8> = Vec::new();
        loop {
            let b = match self.peek()? {
                Some(b) => b,
                None => return Err(CodecError::UnexpectedEof("value")),
            };
            match b {
                b'"' => {
                    self.bump(&mut capture, b);
                    self.scan_string(&mut capture)?;
                }
                b'{' => {
                    self.bump(&mut capture, b);
                    closers.push(b'}');
                }
                b'[' => {
                    self.bump(&mut capture, b);
                    closers.push(b']');
                }
                b'}' | b']' => {
                    self.bump(&mut capture, b);
                    if closers.pop() != Some(b) {
                        return Err(self.unexpected("matching bracket", b));
                    }
                }
                b',' | b':' if closers.is_empty() => {
                    self.bump(&mut None, b);
                    return Err(self.unexpected("value", b));
                }
                _ if closers.is_empty() => {
                    // bare scalar: number, true, false, null
                    while let Some(c) = self.peek()? {
                        if c.is_ascii_whitespace() || matches!(c, b',' | b'}' | b']') {
                            break;
                        }
                        self.bump(&mut capture, c);
                    }
                }
                _ => self.bump(&mut capture, b),
            }
            if closers.is_empty() {
                return Ok(());
            }
        }
    }

    fn read_key(&mut self) -> Result<String, CodecError> {
        self.expect(b'"', "object key")?;
        let mut raw = vec![b'"'];
        self.scan_string(&mut Some(&mut raw))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Walk the key path and stop just inside the target array.
    fn descend(&mut self) -> Result<(), CodecError> {
        let path = std::mem::take(&mut self.path);
        for segment in &path {
            self.expect(b'{', "object")?;
            loop {
                self.skip_ws()?;
                match self.peek()? {
                    Some(b'"') => {}
                    Some(b'}') => return Err(CodecError::MissingKey(segment.clone())),
                    Some(b) => {
                        self.bump(&mut None, b);
                        return Err(self.unexpected("object key", b));
                    }
                    None => return Err(CodecError::UnexpectedEof("object key")),
                }
                let key = self.read_key()?;
                self.expect(b':', "':'")?;
                if key == *segment {
                    break;
                }
                log::trace!("json reader: skipping key {key:?}");
                self.scan_value(None)?;
                self.skip_ws()?;
                match self.next_byte()? {
                    Some(b',') => {}
                    Some(b'}') => return Err(CodecError::MissingKey(segment.clone())),
                    Some(b) => return Err(self.unexpected("',' or '}'", b)),
                    None => return Err(CodecError::UnexpectedEof("',' or '}'")),
                }
            }
        }
        self.path = path;
        self.expect(b'[', "array")
    }

    fn read_element(&mut self) -> Result<T, CodecError> {
        let mut element = std::mem::take(&mut self.element);
        element.clear();
        let decoded = match self.scan_value(Some(&mut element)) {
            Ok(()) => serde_json::from_slice(&element).map_err(CodecError::from),
            Err(e) => Err(e),
        };
        self.element = element;
        decoded
    }

    fn advance(&mut self) -> Result<Option<T>, CodecError> {
        if let State::Start = self.state {
            self.descend()?;
            self.state = State::InArray { first: true };
        }
        let first = match self.state {
            State::InArray { first } => first,
            _ => return Ok(None),
        };

        self.skip_ws()?;
        if first {
            if self.peek()? == Some(b']') {
                self.next_byte()?;
                self.state = State::Done;
                return Ok(None);
            }
        } else {
            match self.next_byte()? {
                Some(b',') => {}
                Some(b']') => {
                    self.state = State::Done;
                    return Ok(None);
                }
                Some(b) => return Err(self.unexpected("',' or ']'", b)),
                None => return Err(CodecError::UnexpectedEof("',' or ']'")),
            }
        }

        let value = self.read_element()?;
        self.state = State::InArray { first: false };
        Ok(Some(value))
    }
}

impl<R: Read, T: DeserializeOwned> Iterator for JsonArrayReader<R, T> {
    type Item = Result<T, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}
