//! Debug-only detection of caller callbacks re-entering the table.
//!
//! Capability callbacks run while a chain scan is in progress. A callback
//! that reaches back into the same table (through a raw pointer or shared
//! cell) would observe or corrupt a half-finished operation. Debug builds
//! panic on the nested entry; release builds compile this to nothing.
//!
//! The returned scope owns its counter handle instead of borrowing the
//! detector, so a `&mut self` method can hold a scope and still call other
//! `&mut self` helpers.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;
#[cfg(debug_assertions)]
use std::rc::Rc;

#[derive(Debug)]
pub struct ReentryDetector {
    #[cfg(debug_assertions)]
    active: Rc<Cell<bool>>,
    _nosend: PhantomData<*mut ()>,
}

impl ReentryDetector {
    pub fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Rc::new(Cell::new(false)),
            _nosend: PhantomData,
        }
    }

    /// Mark the start of an operation that may call into caller code.
    #[inline]
    pub fn enter(&self) -> CallbackScope {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "capability callback re-entered the table"
            );
            return CallbackScope {
                active: Rc::clone(&self.active),
            };
        }

        #[cfg(not(debug_assertions))]
        {
            return CallbackScope { _z: PhantomData };
        }
    }
}

impl Default for ReentryDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the active flag when the operation finishes, including on unwind.
pub struct CallbackScope {
    #[cfg(debug_assertions)]
    active: Rc<Cell<bool>>,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<*mut ()>,
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.active.set(false);
    }
}
