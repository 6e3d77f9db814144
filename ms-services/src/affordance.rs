//! Suspendable user affordances.
//!
//! An affordance is an action the user can trigger (save a snap, post the
//! snaps). While an operation holds it suspended, a second trigger is
//! refused. The `AffordanceGuard` re-enables it when dropped, so every exit
//! path of the operation restores it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

#[derive(Debug, Clone)]
pub struct Affordance {
    name: &'static str,
    enabled: Arc<AtomicBool>,
}

impl Affordance {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Suspend the affordance. Returns `None` if it is already suspended.
    pub fn suspend(&self) -> Option<AffordanceGuard> {
        self.enabled
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        debug!("{} suspended", self.name);
        Some(AffordanceGuard {
            name: self.name,
            enabled: Arc::clone(&self.enabled),
        })
    }
}

/// Keeps an affordance suspended until dropped.
#[must_use = "the affordance is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct AffordanceGuard {
    name: &'static str,
    enabled: Arc<AtomicBool>,
}

impl Drop for AffordanceGuard {
    fn drop(&mut self) {
        self.enabled.store(true, Ordering::Release);
        debug!("{} restored", self.name);
    }
}
