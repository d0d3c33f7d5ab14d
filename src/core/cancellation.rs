use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag that tells a build to stop handing out work.
///
/// Cancelling is one-way; every clone observes it. Workers check the flag
/// before starting each unit, so a unit is either finished whole or never
/// started.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
