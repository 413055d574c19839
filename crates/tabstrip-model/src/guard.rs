//! Reentrancy guard
//!
//! Every mutating entry point holds a [`ReentrancyGuard`] for its whole
//! duration. Collaborators are called synchronously from inside those
//! operations; if one of them manages to call back into a mutating entry
//! point, acquisition fails before any state is touched.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::TabStripError;
use crate::Result;

#[derive(Debug, Default, Clone)]
pub(crate) struct ReentrancyFlag(Rc<Cell<bool>>);

impl ReentrancyFlag {
    pub(crate) fn is_held(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn acquire(&self) -> Result<ReentrancyGuard> {
        if self.0.replace(true) {
            tracing::warn!("Rejected reentrant tab strip mutation");
            return Err(TabStripError::ReentrantMutation);
        }
        Ok(ReentrancyGuard(Rc::clone(&self.0)))
    }
}

/// Releases the flag on drop, including during unwinding
#[must_use = "the guard releases the tab strip as soon as it is dropped"]
pub(crate) struct ReentrancyGuard(Rc<Cell<bool>>);

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
