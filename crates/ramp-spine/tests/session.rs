use ramp_spine::{
    CycleOrchestrator, CycleOutcome, EmergencyStop, PowerEnvelope, ProgressSink, RampConfig,
    RampEngine, RampTarget, SessionEnd, StopSignal, TargetSource,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

struct OneTarget(Option<f64>);

impl TargetSource for OneTarget {
    fn next_target(&mut self, _envelope: &PowerEnvelope) -> Option<f64> {
        self.0.take()
    }

    fn continue_session(&mut self) -> bool {
        true
    }
}

#[derive(Clone, Default)]
struct SharedLog {
    progress: Arc<Mutex<Vec<f64>>>,
    outcomes: Arc<Mutex<Vec<CycleOutcome>>>,
}

impl ProgressSink for SharedLog {
    fn on_progress(&mut self, current: f64) {
        self.progress.lock().unwrap().push(current);
    }

    fn report(&mut self, outcome: &CycleOutcome) {
        self.outcomes.lock().unwrap().push(*outcome);
    }
}

#[test]
fn external_interrupt_stops_active_cycle_and_ends_session() {
    let estop = Arc::new(EmergencyStop::new());
    let config = RampConfig::new(10.0, Duration::from_millis(10)).unwrap();
    let mut orch = CycleOrchestrator::new(PowerEnvelope::transducer(), config, Arc::clone(&estop));
    let log = SharedLog::default();
    let mut display = log.clone();

    let interrupter = {
        let estop = Arc::clone(&estop);
        thread::spawn(move || {
            // wait until the run is armed, then pull the plug
            let deadline = Instant::now() + Duration::from_secs(5);
            while !estop.is_armed() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(50));
            let cycle_active = estop.trigger();
            (cycle_active, Instant::now())
        })
    };

    let summary = orch.run_session(&mut OneTarget(Some(5000.0)), &mut display);
    let returned = Instant::now();
    let (cycle_active, triggered_at) = interrupter.join().unwrap();
    assert!(cycle_active, "trigger should have hit an armed cycle");
    let latency = returned.saturating_duration_since(triggered_at);
    assert!(
        latency <= Duration::from_millis(10 + 40),
        "session took {latency:?} to stop"
    );

    assert_eq!(summary.end, SessionEnd::Interrupted);
    assert_eq!(summary.cycles_completed, 1);
    let outcome = summary.last_outcome.unwrap();
    assert!(outcome.interrupted);
    assert!(!outcome.reached_target);
    assert!(outcome.final_power < 5000.0);

    let progress = log.progress.lock().unwrap();
    assert_eq!(progress.last().copied(), Some(outcome.final_power));
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn stopped_cycle_does_not_leak_into_next() {
    let mut engine = RampEngine::new(RampConfig::new(10.0, Duration::ZERO).unwrap());
    let target = RampTarget::new(100.0)
        .validate(&PowerEnvelope::transducer())
        .unwrap();

    let first = StopSignal::new();
    first.set();
    let stopped = engine.run(target, &first, |_| {});
    assert!(stopped.interrupted);

    let second = StopSignal::new();
    assert!(!second.is_set());
    assert!(!second.same_as(&first));
    let completed = engine.run(target, &second, |_| {});
    assert_eq!(
        completed,
        CycleOutcome {
            final_power: 100.0,
            reached_target: true,
            interrupted: false
        }
    );
}

#[test]
fn paced_run_takes_roughly_one_interval_per_step() {
    let mut engine = RampEngine::new(RampConfig::new(10.0, Duration::from_millis(5)).unwrap());
    let target = RampTarget::new(50.0)
        .validate(&PowerEnvelope::transducer())
        .unwrap();

    let outcome = engine.run(target, &StopSignal::new(), |_| {});
    assert!(outcome.reached_target);
    assert_eq!(engine.stats().steps_executed, 5);
    assert!(engine.stats().elapsed >= Duration::from_millis(25));
}
