//! Wire format encoding and decoding.
//!
//! Implements the 9-byte message header:
//! ```text
//! ┌──────────┬───────────────┬─────────┬──────────────┐
//! │ Category │ Type / Error  │ Request │ Payload Size │
//! │ 2 bytes  │ 4 bytes       │ 1 byte  │ 2 bytes      │
//! │ uint16 BE│ int32 BE      │ 0 or 1  │ uint16 BE    │
//! └──────────┴───────────────┴─────────┴──────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.
//!
//! The type/error field is a single storage location: it carries the
//! dispatch-matching type on requests and the error code on responses.
//! Dispatch always compares this field as-is against registered types.

use crate::error::{DispatchError, Result};
use crate::registry::MAX_CATEGORY_ID;

/// Header size in bytes (fixed, exactly 9).
pub const HEADER_SIZE: usize = 9;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Dispatch category id (valid range `[0, MAX_CATEGORY_ID)`).
    pub category: u32,
    /// Message type on requests, error code on responses.
    pub type_or_error: i32,
    /// Direction flag: request (true) or response (false).
    pub request: bool,
    /// Payload length in bytes. The header-only response path forces this
    /// to 0 on the wire without touching the in-memory value.
    pub payload_size: u16,
}

impl Header {
    /// Create a new request header.
    pub fn new(category: u32, type_or_error: i32, payload_size: u16) -> Self {
        Self {
            category,
            type_or_error,
            request: true,
            payload_size,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use rpcdispatch::protocol::Header;
    ///
    /// let header = Header::new(2, 5, 100);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 9);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (9 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        // A header that passed validate() has category < MAX_CATEGORY_ID,
        // which fits in u16; the send path never encodes an unvalidated one.
        buf[0..2].copy_from_slice(&(self.category as u16).to_be_bytes());
        buf[2..6].copy_from_slice(&self.type_or_error.to_be_bytes());
        buf[6] = u8::from(self.request);
        buf[7..9].copy_from_slice(&self.payload_size.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use rpcdispatch::protocol::Header;
    ///
    /// let bytes = [0, 2, 0, 0, 0, 5, 1, 0, 100];
    /// let header = Header::decode(&bytes).unwrap();
    /// assert_eq!(header.category, 2);
    /// assert_eq!(header.type_or_error, 5);
    /// assert_eq!(header.payload_size, 100);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            category: u32::from(u16::from_be_bytes([buf[0], buf[1]])),
            type_or_error: i32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]),
            request: buf[6] != 0,
            payload_size: u16::from_be_bytes([buf[7], buf[8]]),
        })
    }

    /// Validate the header for dispatch.
    ///
    /// Checks that the category id is within the valid range.
    pub fn validate(&self) -> Result<()> {
        if self.category >= MAX_CATEGORY_ID {
            return Err(DispatchError::InvalidCategory(self.category));
        }
        Ok(())
    }

    /// Check if this is a request.
    #[inline]
    pub fn is_request(&self) -> bool {
        self.request
    }

    /// Check if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        !self.request
    }

    /// Copy of this header with `payload_size` forced to 0, as written by
    /// the header-only response path.
    #[inline]
    pub fn without_payload(&self) -> Self {
        Self {
            payload_size: 0,
            ..*self
        }
    }
}
