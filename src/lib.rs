//! # rpcdispatch
//!
//! In-process message dispatch core for a long-running privileged host.
//!
//! Messages carry a two-level key (category, type); handlers register
//! against that key and are invoked synchronously, on the sending thread,
//! for every matching message. Responses can additionally be announced to a
//! remote peer with a header-only socket write; requests never take the
//! wire.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rpcdispatch::{handler_fn, Dispatcher, Envelope, Registry};
//! use rpcdispatch::transport::NullWriter;
//!
//! let registry = Arc::new(Registry::new());
//! let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::new(NullWriter));
//!
//! registry
//!     .register_callback(2, 5, handler_fn(|msg| {
//!         println!("got {} payload bytes", msg.payload().len());
//!     }))
//!     .unwrap();
//!
//! let msg = Envelope::new(2, 5, bytes::Bytes::from_static(b"hello"));
//! dispatcher.send_request(&msg);
//! ```

pub mod error;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod transport;

mod dispatch;
mod envelope;

pub use dispatch::Dispatcher;
pub use envelope::{Envelope, Message};
pub use error::DispatchError;
pub use handler::{handler_fn, HandlerRef, MessageHandler};
pub use registry::{Registry, MAX_CALLBACKS, MAX_CATEGORIES, MAX_CATEGORY_ID};
