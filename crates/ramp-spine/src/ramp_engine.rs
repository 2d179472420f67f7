use crate::envelope::{RampTarget, Validated};
use crate::stop_signal::StopSignal;
use log::debug;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampConfig {
    step_ws: f64,
    interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RampConfigError {
    #[error("ramp step must be a positive number of w-s, got {step_ws}")]
    NonPositiveStep { step_ws: f64 },
}

impl RampConfig {
    pub fn new(step_ws: f64, interval: Duration) -> Result<Self, RampConfigError> {
        if !step_ws.is_finite() || step_ws <= 0.0 {
            return Err(RampConfigError::NonPositiveStep { step_ws });
        }
        Ok(Self { step_ws, interval })
    }

    pub fn step_ws(&self) -> f64 {
        self.step_ws
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            step_ws: 10.0,
            interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RampState {
    #[default]
    Idle,
    Ramping {
        current: f64,
    },
    Stopped {
        final_power: f64,
        reached_target: bool,
    },
}

/// Terminal result of one ramp run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleOutcome {
    pub final_power: f64,
    pub reached_target: bool,
    pub interrupted: bool,
}

#[derive(Clone, Default, Debug)]
pub struct RampStats {
    pub steps_executed: u64,
    pub steps_late: u64,
    pub max_jitter_us: u64,
    pub elapsed: Duration,
}

/// Drives power from zero toward a validated target in fixed increments.
pub struct RampEngine {
    config: RampConfig,
    state: RampState,
    stats: RampStats,
}

impl RampEngine {
    pub fn new(config: RampConfig) -> Self {
        Self {
            config,
            state: RampState::Idle,
            stats: RampStats::default(),
        }
    }

    /// Runs one ramp to `target`, calling `on_progress` once per step with the
    /// new power. The signal is checked at every step boundary; once it is
    /// seen set no further increment is applied.
    pub fn run<F>(
        &mut self,
        target: RampTarget<Validated>,
        signal: &StopSignal,
        mut on_progress: F,
    ) -> CycleOutcome
    where
        F: FnMut(f64),
    {
        let target = target.value();
        let started = Instant::now();
        let mut current = 0.0_f64;

        self.stats = RampStats::default();
        self.state = RampState::Ramping { current };
        debug!(
            "ramp started: target={} step={} interval_ms={}",
            target,
            self.config.step_ws,
            self.config.interval.as_millis()
        );

        let mut next_step = started;
        while current < target {
            if signal.is_set() {
                break;
            }

            // Never overshoot.
            current = (current + self.config.step_ws).min(target);
            self.state = RampState::Ramping { current };
            self.stats.steps_executed += 1;
            on_progress(current);

            next_step += self.config.interval;
            next_step = self.pace(next_step);
        }

        let outcome = CycleOutcome {
            final_power: current,
            reached_target: current >= target,
            interrupted: signal.is_set(),
        };
        self.state = RampState::Stopped {
            final_power: outcome.final_power,
            reached_target: outcome.reached_target,
        };
        self.stats.elapsed = started.elapsed();
        debug!(
            "ramp stopped: final={} reached={} interrupted={} steps={}",
            outcome.final_power,
            outcome.reached_target,
            outcome.interrupted,
            self.stats.steps_executed
        );
        outcome
    }

    /// Sleeps until `deadline`. Returns the deadline the next step is
    /// scheduled from, re-anchored to now after an overrun.
    fn pace(&mut self, deadline: Instant) -> Instant {
        if self.config.interval.is_zero() {
            return deadline;
        }

        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
            let jitter_us = Instant::now().saturating_duration_since(deadline).as_micros() as u64;
            self.stats.max_jitter_us = self.stats.max_jitter_us.max(jitter_us);
            deadline
        } else {
            self.stats.steps_late += 1;
            let overrun_us = now.duration_since(deadline).as_micros() as u64;
            self.stats.max_jitter_us = self.stats.max_jitter_us.max(overrun_us);
            now
        }
    }

    pub fn state(&self) -> RampState {
        self.state
    }

    pub fn stats(&self) -> &RampStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{PowerEnvelope, RampTarget};

    fn fast_engine(step_ws: f64) -> RampEngine {
        RampEngine::new(RampConfig::new(step_ws, Duration::ZERO).unwrap())
    }

    fn target(value: f64) -> RampTarget<Validated> {
        RampTarget::new(value)
            .validate(&PowerEnvelope::transducer())
            .unwrap()
    }

    #[test]
    fn rejects_non_positive_step() {
        for step in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let res = RampConfig::new(step, Duration::from_millis(1));
            assert!(matches!(res, Err(RampConfigError::NonPositiveStep { .. })));
        }
    }

    #[test]
    fn uninterrupted_run_reaches_target() {
        let mut engine = fast_engine(10.0);
        let mut seen = Vec::new();
        let outcome = engine.run(target(100.0), &StopSignal::new(), |p| seen.push(p));

        let expected: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();
        assert_eq!(seen, expected);
        assert_eq!(
            outcome,
            CycleOutcome {
                final_power: 100.0,
                reached_target: true,
                interrupted: false
            }
        );
        assert_eq!(engine.stats().steps_executed, 10);
        assert_eq!(
            engine.state(),
            RampState::Stopped {
                final_power: 100.0,
                reached_target: true
            }
        );
    }

    #[test]
    fn clamps_final_step_to_target() {
        let mut engine = fast_engine(10.0);
        let mut seen = Vec::new();
        let outcome = engine.run(target(55.0), &StopSignal::new(), |p| seen.push(p));

        assert_eq!(seen, vec![10.0, 20.0, 30.0, 40.0, 50.0, 55.0]);
        assert_eq!(outcome.final_power, 55.0);
        assert!(outcome.reached_target);
    }

    #[test]
    fn stop_after_forty_halts_at_forty() {
        let mut engine = fast_engine(10.0);
        let signal = StopSignal::new();
        let mut seen = Vec::new();
        let outcome = engine.run(target(100.0), &signal, |p| {
            seen.push(p);
            if p == 40.0 {
                signal.set();
            }
        });

        assert_eq!(seen, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(
            outcome,
            CycleOutcome {
                final_power: 40.0,
                reached_target: false,
                interrupted: true
            }
        );
    }

    #[test]
    fn stop_on_final_step_reports_both_flags() {
        let mut engine = fast_engine(10.0);
        let signal = StopSignal::new();
        let outcome = engine.run(target(100.0), &signal, |p| {
            if p == 100.0 {
                signal.set();
            }
        });

        assert_eq!(outcome.final_power, 100.0);
        assert!(outcome.reached_target);
        assert!(outcome.interrupted);
    }

    #[test]
    fn preset_signal_performs_no_increment() {
        let mut engine = fast_engine(10.0);
        let signal = StopSignal::new();
        signal.set();
        let mut calls = 0;
        let outcome = engine.run(target(100.0), &signal, |_| calls += 1);

        assert_eq!(calls, 0);
        assert_eq!(outcome.final_power, 0.0);
        assert!(!outcome.reached_target);
        assert!(outcome.interrupted);
    }

    #[test]
    fn zero_target_finishes_immediately() {
        let mut engine = fast_engine(10.0);
        let mut calls = 0;
        let outcome = engine.run(RampTarget::zero(), &StopSignal::new(), |_| calls += 1);

        assert_eq!(calls, 0);
        assert_eq!(
            outcome,
            CycleOutcome {
                final_power: 0.0,
                reached_target: true,
                interrupted: false
            }
        );
    }

    #[test]
    fn stop_from_other_thread_lands_within_a_step() {
        let interval = Duration::from_millis(20);
        let mut engine = RampEngine::new(RampConfig::new(10.0, interval).unwrap());
        let signal = StopSignal::new();
        let remote = signal.clone();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.set();
            Instant::now()
        });
        let outcome = engine.run(target(5000.0), &signal, |_| {});
        let returned = Instant::now();
        let set_at = stopper.join().unwrap();

        assert!(outcome.interrupted);
        assert!(outcome.final_power < 5000.0);
        assert!(!outcome.reached_target);
        // at most one pending sleep, plus scheduling slack
        let latency = returned.saturating_duration_since(set_at);
        assert!(
            latency <= interval + Duration::from_millis(40),
            "stop took {latency:?}"
        );
    }

    #[test]
    fn starts_idle() {
        assert_eq!(RampEngine::new(RampConfig::default()).state(), RampState::Idle);
    }
}
