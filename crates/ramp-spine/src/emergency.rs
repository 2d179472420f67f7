use crate::stop_signal::StopSignal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Session-wide emergency stop latch.
///
/// Out-of-band interrupt sources call [`EmergencyStop::trigger`]; the
/// orchestrator arms the latch with each cycle's signal so the trigger
/// reaches whichever run is active.
#[derive(Debug, Default)]
pub struct EmergencyStop {
    triggered: AtomicBool,
    active: Mutex<Option<StopSignal>>,
}

impl EmergencyStop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches the session as interrupted and stops the armed run, if any.
    /// Returns true when a run was armed.
    pub fn trigger(&self) -> bool {
        self.triggered.store(true, Ordering::SeqCst);
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.as_ref() {
            Some(signal) => {
                signal.set();
                true
            }
            None => false,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Registers the signal of the cycle about to run. A trigger that already
    /// happened stops it immediately.
    pub fn arm(&self, signal: &StopSignal) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = Some(signal.clone());
        if self.triggered.load(Ordering::SeqCst) {
            signal.set();
        }
    }

    pub fn disarm(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = None;
    }

    pub fn is_armed(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
