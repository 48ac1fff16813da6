//! Dispatch categories and their callback records.

use std::sync::Arc;

use crate::handler::HandlerRef;

/// Maximum distinct categories alive at once.
pub const MAX_CATEGORIES: usize = 16;

/// Valid category id range for registration and dispatch: `[0, MAX_CATEGORY_ID)`.
///
/// Wider than [`MAX_CATEGORIES`]: the id space is sparse, the table is not.
pub const MAX_CATEGORY_ID: u32 = 32;

/// Per-category callback capacity.
pub const MAX_CALLBACKS: usize = 32;

/// A registered `(type, handler)` pair.
///
/// Duplicates may coexist within a category and are all invoked on a
/// matching dispatch. Uniqueness is enforced only at unregister time, by
/// exact match on the type and the handler's pointer identity.
#[derive(Clone)]
pub struct CallbackRecord {
    msg_type: i32,
    handler: HandlerRef,
}

impl CallbackRecord {
    pub(crate) fn new(msg_type: i32, handler: HandlerRef) -> Self {
        Self { msg_type, handler }
    }

    /// The message type this record matches against.
    pub fn msg_type(&self) -> i32 {
        self.msg_type
    }

    /// The registered handler.
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Exact-match test used by unregistration.
    pub(crate) fn matches(&self, msg_type: i32, handler: &HandlerRef) -> bool {
        self.msg_type == msg_type && Arc::ptr_eq(&self.handler, handler)
    }
}

impl std::fmt::Debug for CallbackRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRecord")
            .field("msg_type", &self.msg_type)
            .field("handler", &Arc::as_ptr(&self.handler))
            .finish()
    }
}

/// A dispatch bucket keyed by an integer id, holding a bounded set of
/// callback registrations.
///
/// The id is immutable after creation. Cloning produces a point-in-time
/// snapshot; the records inside share their handlers by `Arc`, so a
/// snapshot keeps every captured handler alive for as long as it exists.
#[derive(Clone)]
pub struct Category {
    id: u32,
    callbacks: [Option<CallbackRecord>; MAX_CALLBACKS],
}

impl Category {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            callbacks: std::array::from_fn(|_| None),
        }
    }

    /// The category id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// First free callback slot, or `None` when the category is full.
    pub(crate) fn find_free_callback_index(&self) -> Option<usize> {
        self.callbacks.iter().position(Option::is_none)
    }

    pub(crate) fn install(&mut self, index: usize, record: CallbackRecord) {
        debug_assert!(self.callbacks[index].is_none());
        self.callbacks[index] = Some(record);
    }

    /// Clear the first slot matching `(msg_type, handler)` exactly.
    /// Returns whether a match was found.
    pub(crate) fn remove(&mut self, msg_type: i32, handler: &HandlerRef) -> bool {
        for slot in &mut self.callbacks {
            let matched = slot
                .as_ref()
                .is_some_and(|record| record.matches(msg_type, handler));
            if matched {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Occupied callback records in slot order.
    pub fn callbacks(&self) -> impl Iterator<Item = &CallbackRecord> {
        self.callbacks.iter().flatten()
    }

    /// Number of occupied callback slots.
    pub fn callback_count(&self) -> usize {
        self.callbacks().count()
    }
}

impl std::fmt::Debug for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Category")
            .field("id", &self.id)
            .field("callbacks", &self.callback_count())
            .finish()
    }
}
