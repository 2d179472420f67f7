//! Cycle orchestration: sequences ramp runs under one session.
//!
//! Each cycle gets a fresh [`StopSignal`], runs the [`RampEngine`] on a scoped
//! thread and joins it before the outcome is reported, so no ramp task can
//! outlive its cycle. The signal stays armed on the [`EmergencyStop`] latch
//! until the outcome has been reported.

use crate::emergency::EmergencyStop;
use crate::envelope::{EnvelopeViolation, PowerEnvelope, RampTarget, Validated};
use crate::ramp_engine::{CycleOutcome, RampConfig, RampEngine, RampStats};
use crate::stop_signal::StopSignal;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::thread;

/// Supplies target powers for the session.
pub trait TargetSource {
    /// Next requested target, or `None` to end the session.
    fn next_target(&mut self, envelope: &PowerEnvelope) -> Option<f64>;

    /// Asked after each completed cycle.
    fn continue_session(&mut self) -> bool;
}

/// Receives progress and outcomes. Progress calls arrive from the ramp task.
pub trait ProgressSink: Send {
    fn cycle_started(&mut self, _target: f64) {}

    fn on_progress(&mut self, current: f64);

    fn report(&mut self, outcome: &CycleOutcome);

    fn rejected(&mut self, _violation: &EnvelopeViolation) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    AwaitingTarget,
    Running,
    Reporting,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The input collaborator asked to quit.
    Quit,
    /// The user declined another cycle.
    Declined,
    /// An emergency stop ended the session.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub cycles_completed: u32,
    pub last_outcome: Option<CycleOutcome>,
    pub end: SessionEnd,
}

pub struct CycleOrchestrator {
    envelope: PowerEnvelope,
    engine: RampEngine,
    emergency: Arc<EmergencyStop>,
    phase: CyclePhase,
}

impl CycleOrchestrator {
    pub fn new(
        envelope: PowerEnvelope,
        config: RampConfig,
        emergency: Arc<EmergencyStop>,
    ) -> Self {
        Self {
            envelope,
            engine: RampEngine::new(config),
            emergency,
            phase: CyclePhase::AwaitingTarget,
        }
    }

    pub fn run_session<S, D>(&mut self, source: &mut S, display: &mut D) -> SessionSummary
    where
        S: TargetSource + ?Sized,
        D: ProgressSink + ?Sized,
    {
        let mut cycles_completed = 0;
        let mut last_outcome = None;

        let end = loop {
            if self.emergency.is_triggered() {
                break SessionEnd::Interrupted;
            }

            self.phase = CyclePhase::AwaitingTarget;
            let Some(requested) = source.next_target(&self.envelope) else {
                break self.end_unless_interrupted(SessionEnd::Quit);
            };

            let target = match RampTarget::new(requested).validate(&self.envelope) {
                Ok(target) => target,
                Err(violation) => {
                    warn!("target rejected: {violation}");
                    display.rejected(&violation);
                    continue;
                }
            };

            self.phase = CyclePhase::Running;
            let outcome = self.run_cycle(target, display);

            self.phase = CyclePhase::Reporting;
            display.report(&outcome);
            self.emergency.disarm();
            cycles_completed += 1;
            last_outcome = Some(outcome);

            if outcome.interrupted || self.emergency.is_triggered() {
                break SessionEnd::Interrupted;
            }
            if !source.continue_session() {
                break self.end_unless_interrupted(SessionEnd::Declined);
            }
        };

        self.phase = CyclePhase::Ended;
        info!("session ended: {end:?} after {cycles_completed} cycle(s)");
        SessionSummary {
            cycles_completed,
            last_outcome,
            end,
        }
    }

    fn run_cycle<D>(&mut self, target: RampTarget<Validated>, display: &mut D) -> CycleOutcome
    where
        D: ProgressSink + ?Sized,
    {
        let signal = StopSignal::new();
        self.emergency.arm(&signal);
        info!("cycle started: target={} w-s", target.value());
        display.cycle_started(target.value());

        let engine = &mut self.engine;
        let outcome = thread::scope(|scope| {
            let ramp = scope.spawn(|| {
                engine.run(target, &signal, |current| display.on_progress(current))
            });
            ramp.join()
        })
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        info!(
            "cycle finished: final={} w-s reached={} interrupted={}",
            outcome.final_power, outcome.reached_target, outcome.interrupted
        );
        outcome
    }

    fn end_unless_interrupted(&self, end: SessionEnd) -> SessionEnd {
        if self.emergency.is_triggered() {
            SessionEnd::Interrupted
        } else {
            end
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Timing of the most recent run.
    pub fn last_stats(&self) -> &RampStats {
        self.engine.stats()
    }
}
