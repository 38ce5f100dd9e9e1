//! Streaming JSON array codec.
//!
//! - [`JsonArrayWriter`] - writes records as they are produced
//! - [`JsonArrayReader`] - yields array elements found under a key path

mod reader;
mod writer;

pub use reader::JsonArrayReader;
pub use writer::JsonArrayWriter;
