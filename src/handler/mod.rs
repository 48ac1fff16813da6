//! Message handler trait and helpers.
//!
//! Handlers are invoked synchronously on the dispatching thread. The core
//! does not own handler lifetime beyond the registration: a handler stays
//! registered until the exact `(type, handler)` pair is unregistered.

use std::sync::Arc;

use crate::envelope::Message;

/// Trait for message handlers.
///
/// Implemented automatically for any `Fn(&Message) + Send + Sync` closure.
pub trait MessageHandler: Send + Sync {
    /// Handle a dispatched message.
    ///
    /// The message stays alive for at least the duration of this call;
    /// clone it to retain it longer.
    fn handle(&self, msg: &Message);
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) + Send + Sync,
{
    fn handle(&self, msg: &Message) {
        self(msg)
    }
}

/// Shared reference to a registered handler.
///
/// Unregistration matches on pointer identity: pass a clone of the same
/// `HandlerRef` that was registered.
pub type HandlerRef = Arc<dyn MessageHandler>;

/// Wrap a closure as a [`HandlerRef`].
///
/// # Example
///
/// ```
/// use rpcdispatch::handler::handler_fn;
///
/// let handler = handler_fn(|msg| {
///     println!("category {}", msg.header().category);
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerRef
where
    F: Fn(&Message) + Send + Sync + 'static,
{
    Arc::new(f)
}
