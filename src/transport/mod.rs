//! Socket write collaborator.
//!
//! The dispatch core never owns a connection; it hands header bytes to a
//! [`SocketWriter`] keyed by the envelope's [`SocketHandle`]. The write is
//! blocking and one-way. [`TcpSocketWriter`] adapts std TCP streams;
//! [`NullWriter`] discards everything for hosts with no remote peer.

mod tcp;

pub use tcp::TcpSocketWriter;

use std::io;

/// Opaque handle naming a peer connection. Valid handles are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(i32);

impl SocketHandle {
    /// Wrap a raw handle. Returns `None` unless `raw > 0`.
    pub fn new(raw: i32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// The raw handle value.
    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Blocking, one-way byte sink keyed by socket handle.
///
/// Implementations must be callable from multiple threads at once.
pub trait SocketWriter: Send + Sync {
    /// Write all of `buf` to the connection behind `handle`.
    ///
    /// Returns the number of bytes written (always `buf.len()` on success).
    fn write(&self, handle: SocketHandle, buf: &[u8]) -> io::Result<usize>;
}

/// Writer that discards everything, for hosts with no remote peer.
#[derive(Debug, Default)]
pub struct NullWriter;

impl SocketWriter for NullWriter {
    fn write(&self, _handle: SocketHandle, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}
