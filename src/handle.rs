//! Scoped checkout of a pooled resource

use crate::ledger::ResourceId;
use crate::pool::Shared;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A checked-out resource that goes back to the pool when dropped
///
/// The resource is returned at most once, whether through [`release`],
/// an early return, or a panic unwinding past the handle.
///
/// [`release`]: Checkout::release
#[must_use = "dropping a checkout immediately returns the resource"]
pub struct Checkout<T: Send + 'static> {
    id: ResourceId,
    value: Option<T>,
    pool: Arc<Shared<T>>,
}

impl<T: Send + 'static> Checkout<T> {
    pub(crate) fn new(id: ResourceId, value: T, pool: Arc<Shared<T>>) -> Self {
        Self {
            id,
            value: Some(value),
            pool,
        }
    }

    /// Identity the pool assigned to this resource
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Borrow the resource.
    ///
    /// # Panics
    ///
    /// Panics if the checkout was already released.
    pub fn value(&self) -> &T {
        self.value.as_ref().expect("checkout already released")
    }

    /// Whether the resource has gone back to the pool
    pub fn is_released(&self) -> bool {
        self.value.is_none()
    }

    /// Hand the resource back to the pool. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.return_element(self.id, value);
        }
    }

    /// Keep the resource for good.
    ///
    /// The pool reclaims the slot once the checkout's time-to-live runs out.
    ///
    /// # Panics
    ///
    /// Panics if the checkout was already released.
    pub fn detach(mut self) -> T {
        self.value.take().expect("checkout already released")
    }
}

impl<T: Send + 'static> Deref for Checkout<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: Send + 'static> DerefMut for Checkout<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("checkout already released")
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for Checkout<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkout")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Send + 'static> Drop for Checkout<T> {
    fn drop(&mut self) {
        self.release();
    }
}
