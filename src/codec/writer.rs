//! Incremental JSON array writer.

use crate::error::CodecError;
use serde::Serialize;
use std::io::Write;

/// Writes a JSON array one element at a time.
///
/// `[` goes out with the first element (or on [`close`](Self::close) when
/// nothing was written, so an empty stream is still `[]`). A failed write
/// leaves a partial element behind, so every later call returns
/// [`CodecError::Failed`].
pub struct JsonArrayWriter<W: Write> {
    out: W,
    count: usize,
    closed: bool,
    failed: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(out: W) -> Self {
        JsonArrayWriter {
            out,
            count: 0,
            closed: false,
            failed: false,
        }
    }

    /// Serialize `value` as the next array element.
    pub fn encode<T: Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        if self.closed {
            return Err(CodecError::Closed);
        }
        if self.failed {
            return Err(CodecError::Failed);
        }
        let separator: &[u8] = if self.count == 0 { b"[" } else { b"," };
        let written = self
            .out
            .write_all(separator)
            .map_err(CodecError::from)
            .and_then(|_| serde_json::to_writer(&mut self.out, value).map_err(CodecError::from));
        if written.is_err() {
            self.failed = true;
            return written;
        }
        self.count += 1;
        Ok(())
    }

    /// Write the closing `]` and flush. Calling again does nothing.
    pub fn close(&mut self) -> Result<(), CodecError> {
        if self.closed {
            return Ok(());
        }
        if self.failed {
            return Err(CodecError::Failed);
        }
        if self.count == 0 {
            self.out.write_all(b"[")?;
        }
        self.out.write_all(b"]")?;
        self.out.flush()?;
        self.closed = true;
        log::debug!("json array closed after {} elements", self.count);
        Ok(())
    }

    /// Number of elements encoded so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Give back the sink. The array is left as-is, closed or not.
    pub fn into_inner(self) -> W {
        self.out
    }
}
