//! At most one lock, unlock or claim in flight per owner.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anchor_lang::prelude::Pubkey;

use crate::error::{Result, WidgetError};

#[derive(Debug, Default)]
pub struct OperationGuard {
    active: Mutex<HashSet<Pubkey>>,
}

/// Held for the duration of an operation; releases the owner on drop.
#[derive(Debug)]
pub struct InFlight<'a> {
    guard: &'a OperationGuard,
    owner: Pubkey,
}

impl OperationGuard {
    fn active(&self) -> MutexGuard<'_, HashSet<Pubkey>> {
        // the set stays consistent even if a holder panicked
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn acquire(&self, owner: Pubkey) -> Result<InFlight<'_>> {
        if !self.active().insert(owner) {
            return Err(WidgetError::OperationInProgress(owner));
        }
        Ok(InFlight { guard: self, owner })
    }

    pub fn is_busy(&self, owner: &Pubkey) -> bool {
        self.active().contains(owner)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.active().remove(&self.owner);
    }
}
