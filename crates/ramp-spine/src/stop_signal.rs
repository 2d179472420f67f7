use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Level-triggered stop flag shared between the controller and one ramp run.
///
/// Cloning hands out another reference to the same flag. A fresh signal is
/// created per cycle; [`StopSignal::same_as`] tells two handles apart.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the signal active. Idempotent.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clears the flag. Must not race an active run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn same_as(&self, other: &StopSignal) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}
