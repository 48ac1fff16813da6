//! Callback registry: the category table and its registration protocol.
//!
//! One coarse lock guards the whole table. Writers (registration,
//! unregistration) take it exclusively; readers (lookup, counts) take it
//! shared. Dispatch works on a snapshot taken under the shared lock, so a
//! concurrent unregistration can never reclaim a record out from under an
//! in-flight scan.

mod category;

pub use category::{Category, CallbackRecord, MAX_CALLBACKS, MAX_CATEGORIES, MAX_CATEGORY_ID};

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{DispatchError, Result};
use crate::handler::HandlerRef;

/// Fixed-capacity table of dispatch categories.
///
/// Categories are created on first registration into their id and are
/// never removed afterwards, only emptied of callbacks. An instance is
/// owned by whatever owns the message subsystem; there is no process-wide
/// singleton.
pub struct Registry {
    categories: RwLock<[Option<Box<Category>>; MAX_CATEGORIES]>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            categories: RwLock::new(std::array::from_fn(|_| None)),
        }
    }

    /// First empty category slot, or `None` when the table is full.
    pub fn find_free_category_index(&self) -> Option<usize> {
        self.categories.read().iter().position(Option::is_none)
    }

    /// Number of OCCUPIED category slots.
    ///
    /// The name is historical; it has always returned the populated count,
    /// not the remaining capacity.
    pub fn free_category_count(&self) -> usize {
        self.categories.read().iter().flatten().count()
    }

    /// Look up a category by id, returning a snapshot of its current
    /// contents. Out-of-range ids and absent categories yield `None`.
    pub fn get_category(&self, category_id: u32) -> Option<Category> {
        if category_id >= MAX_CATEGORY_ID {
            return None;
        }
        self.categories
            .read()
            .iter()
            .flatten()
            .find(|category| category.id() == category_id)
            .map(|category| (**category).clone())
    }

    /// Register `handler` for `(category_id, msg_type)`.
    ///
    /// Creates the category in the first free table slot if it does not
    /// exist yet. Duplicate `(type, handler)` pairs are accepted and will
    /// each be invoked on a matching dispatch.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidCategory`] for an out-of-range id,
    /// [`DispatchError::CategoryTableFull`] when no category slot is free,
    /// [`DispatchError::CategoryFull`] when the category has no free
    /// callback slot. No failure leaves partial state behind.
    pub fn register_callback(
        &self,
        category_id: u32,
        msg_type: i32,
        handler: HandlerRef,
    ) -> Result<()> {
        if category_id >= MAX_CATEGORY_ID {
            return Err(DispatchError::InvalidCategory(category_id));
        }

        let mut table = self.categories.write();

        if let Some(category) = table
            .iter_mut()
            .flatten()
            .find(|category| category.id() == category_id)
        {
            let index = category
                .find_free_callback_index()
                .ok_or(DispatchError::CategoryFull(category_id))?;
            category.install(index, CallbackRecord::new(msg_type, handler));
            trace!(category = category_id, msg_type, slot = index, "callback registered");
            return Ok(());
        }

        let free_index = table
            .iter()
            .position(Option::is_none)
            .ok_or(DispatchError::CategoryTableFull)?;

        let mut category = Box::new(Category::new(category_id));
        category.install(0, CallbackRecord::new(msg_type, handler));
        table[free_index] = Some(category);
        trace!(category = category_id, msg_type, table_slot = free_index, "category created");
        Ok(())
    }

    /// Remove the first record matching `(category_id, msg_type, handler)`
    /// exactly, comparing handlers by pointer identity.
    ///
    /// Returns whether a match was found. An out-of-range id, an absent
    /// category or no matching pair all report `false`; none of them is a
    /// fault. The category itself stays in the table even when emptied.
    pub fn unregister_callback(
        &self,
        category_id: u32,
        msg_type: i32,
        handler: &HandlerRef,
    ) -> bool {
        if category_id >= MAX_CATEGORY_ID {
            return false;
        }

        let mut table = self.categories.write();
        let Some(category) = table
            .iter_mut()
            .flatten()
            .find(|category| category.id() == category_id)
        else {
            return false;
        };

        let removed = category.remove(msg_type, handler);
        if removed {
            trace!(category = category_id, msg_type, "callback unregistered");
        }
        removed
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
