pub mod emergency;
pub mod envelope;
pub mod orchestrator;
pub mod ramp_engine;
pub mod stop_signal;
pub mod tags;

pub use emergency::EmergencyStop;
pub use envelope::{
    EnvelopeError, EnvelopeViolation, PowerEnvelope, RampTarget, Unvalidated, Validated,
    MAX_POWER_WS, MIN_POWER_WS,
};
pub use orchestrator::{
    CycleOrchestrator, CyclePhase, ProgressSink, SessionEnd, SessionSummary, TargetSource,
};
pub use ramp_engine::{CycleOutcome, RampConfig, RampConfigError, RampEngine, RampState, RampStats};
pub use stop_signal::StopSignal;
