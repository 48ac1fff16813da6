//! The reference-counted unit of dispatch.
//!
//! An [`Envelope`] carries the fixed header, an opaque payload and an
//! optional socket handle for the header-only response path. Envelopes are
//! shared as [`Message`] (`Arc<Envelope>`): clone to retain, drop to
//! release. The atomic refcount guarantees the envelope outlives every
//! outstanding clone, which is what the send path relies on while handlers
//! run.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::protocol::Header;
use crate::transport::SocketHandle;

/// Reference-counted handle to an [`Envelope`].
pub type Message = Arc<Envelope>;

/// A dispatchable message: header, payload, optional response socket.
pub struct Envelope {
    /// Header, mutated in place by the send path (request flag, error code).
    header: Mutex<Header>,
    /// Socket to receive the header-only wire response, if any.
    socket: Option<SocketHandle>,
    /// Opaque payload. Never written to the wire by this crate.
    payload: Bytes,
}

impl Envelope {
    /// Create a local-only message with no response socket.
    ///
    /// The header's payload size field is 16-bit: payloads longer than
    /// `u16::MAX` bytes are carried in full but advertised as `u16::MAX`.
    pub fn new(category: u32, type_or_error: i32, payload: Bytes) -> Message {
        Self::build(category, type_or_error, None, payload)
    }

    /// Create a message whose response header can be written to `socket`.
    ///
    /// The same payload size saturation as [`Envelope::new`] applies.
    pub fn with_socket(
        category: u32,
        type_or_error: i32,
        socket: SocketHandle,
        payload: Bytes,
    ) -> Message {
        Self::build(category, type_or_error, Some(socket), payload)
    }

    fn build(
        category: u32,
        type_or_error: i32,
        socket: Option<SocketHandle>,
        payload: Bytes,
    ) -> Message {
        let payload_size = payload.len().min(usize::from(u16::MAX)) as u16;
        Arc::new(Self {
            header: Mutex::new(Header::new(category, type_or_error, payload_size)),
            socket,
            payload,
        })
    }

    /// Snapshot of the current header.
    pub fn header(&self) -> Header {
        *self.header.lock()
    }

    /// The payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The response socket handle, if the producer attached one.
    pub fn socket(&self) -> Option<SocketHandle> {
        self.socket
    }

    /// Mark the message as a request.
    pub fn set_request(&self, request: bool) {
        self.header.lock().request = request;
    }

    /// Mark the message as a response carrying `error` in the overloaded
    /// type/error field.
    pub fn set_response(&self, error: i32) {
        let mut header = self.header.lock();
        header.type_or_error = error;
        header.request = false;
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = self.header();
        f.debug_struct("Envelope")
            .field("header", &header)
            .field("socket", &self.socket)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
