use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MutationError, Result};

/// Shared cancellation flag for one engine call.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with `Cancelled` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MutationError::Cancelled)
        } else {
            Ok(())
        }
    }
}
