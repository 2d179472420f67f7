//! Audit logging for ramp sessions.
//!
//! Every cycle, rejection and emergency stop is appended to a JSONL file so a
//! session can be reconstructed after the fact.

use ramp_spine::{CycleOutcome, EnvelopeViolation, ProgressSink};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Types of events that are logged in the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    SessionStart,
    /// Requested target fell outside the power envelope
    TargetRejected,
    CycleStarted,
    /// Cycle reached its terminal outcome
    CycleCompleted,
    /// Emergency stop triggered
    EmergencyStop,
    SessionEnd,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic microseconds since the logger was opened
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: AuditEventType,
    /// Additional event-specific details
    pub details: serde_json::Value,
}

/// Thread-safe audit logger that writes to a JSONL file
pub struct AuditLogger {
    writer: Mutex<BufWriter<File>>,
    opened: Instant,
}

impl AuditLogger {
    /// Create a new audit logger writing to the specified path.
    /// The file is opened in append mode to preserve existing logs.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
            opened: Instant::now(),
        })
    }

    /// Log an audit entry. Callable from any thread, including the interrupt
    /// handler.
    pub fn log(&self, entry: AuditEntry) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    pub fn log_event(
        &self,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        let unix_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        self.log(AuditEntry {
            timestamp_us: self.opened.elapsed().as_micros() as u64,
            unix_us,
            event_type,
            details,
        })
    }
}

/// Logs and swallows audit failures; a broken audit file must not stop a run.
pub fn record(
    logger: Option<&AuditLogger>,
    event_type: AuditEventType,
    details: serde_json::Value,
) {
    if let Some(logger) = logger {
        if let Err(e) = logger.log_event(event_type, details) {
            warn!(error = %e, "Failed to write audit entry");
        }
    }
}

/// Display decorator that mirrors cycle events into the audit trail.
pub struct AuditedSink<S> {
    inner: S,
    logger: Option<Arc<AuditLogger>>,
}

impl<S: ProgressSink> AuditedSink<S> {
    pub fn new(inner: S, logger: Option<Arc<AuditLogger>>) -> Self {
        Self { inner, logger }
    }
}

impl<S: ProgressSink> ProgressSink for AuditedSink<S> {
    fn cycle_started(&mut self, target: f64) {
        record(
            self.logger.as_deref(),
            AuditEventType::CycleStarted,
            serde_json::json!({ "target_power_ws": target }),
        );
        self.inner.cycle_started(target);
    }

    fn on_progress(&mut self, current: f64) {
        self.inner.on_progress(current);
    }

    fn report(&mut self, outcome: &CycleOutcome) {
        record(
            self.logger.as_deref(),
            AuditEventType::CycleCompleted,
            serde_json::to_value(outcome).unwrap_or_default(),
        );
        self.inner.report(outcome);
    }

    fn rejected(&mut self, violation: &EnvelopeViolation) {
        record(
            self.logger.as_deref(),
            AuditEventType::TargetRejected,
            serde_json::json!({ "reason": violation.to_string() }),
        );
        self.inner.rejected(violation);
    }
}
