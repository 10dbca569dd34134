//! Cooperative cancellation flag shared between a run and whoever may stop it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A level-triggered stop flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop before its next step.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the signal can be reused for a new run.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
