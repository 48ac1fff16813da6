//! Wire protocol: the fixed message header and its encoding.
//!
//! Only the header crosses this crate's boundary; payload encoding is the
//! caller's concern and travels as opaque bytes.

mod wire_format;

pub use wire_format::{Header, HEADER_SIZE};
