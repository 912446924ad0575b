//! Single-slot latest-value cell.
//!
//! One side publishes, any number of readers take a copy of whatever was
//! published last. No queueing: a value nobody read before the next publish
//! is simply gone.

use parking_lot::RwLock;
use std::sync::Arc;

pub struct Latest<T> {
    slot: Arc<RwLock<T>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Latest<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: Arc::new(RwLock::new(initial)),
        }
    }

    /// Overwrite the slot
    pub fn publish(&self, value: T) {
        *self.slot.write() = value;
    }

    /// Overwrite the slot, returning the value it held
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.slot.write(), value)
    }

    /// Copy of the most recently published value
    pub fn get(&self) -> T {
        self.slot.read().clone()
    }
}
