//! TCP adapter for the socket write collaborator.

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::TcpStream;

use parking_lot::Mutex;
use tracing::debug;

use super::{SocketHandle, SocketWriter};

/// Handle table over std TCP streams.
///
/// The host registers a stream per connected peer and attaches the returned
/// handle to envelopes whose response header should go out on that
/// connection. Writes are serialized per table, not per stream; header
/// writes are small enough that this has not been worth splitting.
pub struct TcpSocketWriter {
    streams: Mutex<HashMap<SocketHandle, TcpStream>>,
    next_handle: Mutex<i32>,
}

impl TcpSocketWriter {
    /// Create an empty handle table.
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            next_handle: Mutex::new(1),
        }
    }

    /// Register a stream and return its handle.
    pub fn insert(&self, stream: TcpStream) -> SocketHandle {
        let mut next = self.next_handle.lock();
        let handle = SocketHandle(*next);
        *next += 1;
        self.streams.lock().insert(handle, stream);
        debug!(handle = handle.raw(), "socket registered");
        handle
    }

    /// Drop the stream behind `handle`, closing the connection.
    /// Returns whether the handle was known.
    pub fn remove(&self, handle: SocketHandle) -> bool {
        let removed = self.streams.lock().remove(&handle).is_some();
        if removed {
            debug!(handle = handle.raw(), "socket removed");
        }
        removed
    }

    /// Number of registered streams.
    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    /// Whether no streams are registered.
    pub fn is_empty(&self) -> bool {
        self.streams.lock().is_empty()
    }
}

impl Default for TcpSocketWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketWriter for TcpSocketWriter {
    fn write(&self, handle: SocketHandle, buf: &[u8]) -> io::Result<usize> {
        let mut streams = self.streams.lock();
        let stream = streams.get_mut(&handle).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown socket handle: {handle}"),
            )
        })?;
        stream.write_all(buf)?;
        Ok(buf.len())
    }
}
