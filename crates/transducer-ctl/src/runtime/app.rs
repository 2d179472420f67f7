use crate::infra::audit::{record, AuditEventType, AuditLogger, AuditedSink};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::error::RuntimeError;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use ramp_io::{
    write_banner, write_emergency_termination, write_session_end, ConsoleDisplay, ConsoleInput,
    MeteredSink,
};
use ramp_spine::{CycleOrchestrator, EmergencyStop, PowerEnvelope, SessionEnd, SessionSummary};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

const EXIT_CONFIG: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}\n");
            RuntimeConfig::print_help();
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }

    match run(config) {
        Ok(summary) if summary.end == SessionEnd::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Controller failed to start");
            eprintln!("error: {e}");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

pub fn run(config: RuntimeConfig) -> Result<SessionSummary, RuntimeError> {
    init_tracing(config.json_logs);

    let ramp_config = config.ramp_config()?;
    let envelope = PowerEnvelope::transducer();

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let audit_logger = init_audit_logger(config.audit_path.as_ref())?;
    record(
        audit_logger.as_deref(),
        AuditEventType::SessionStart,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "min_power_ws": envelope.min(),
            "max_power_ws": envelope.max(),
            "step_ws": ramp_config.step_ws(),
            "interval_ms": ramp_config.interval().as_millis() as u64,
        }),
    );

    let emergency = Arc::new(EmergencyStop::new());
    install_emergency_stop(Arc::clone(&emergency), audit_logger.clone())?;

    info!(
        step_ws = ramp_config.step_ws(),
        interval_ms = ramp_config.interval().as_millis() as u64,
        min_power_ws = envelope.min(),
        max_power_ws = envelope.max(),
        "Starting transducer session"
    );

    if let Err(e) = write_banner(&mut io::stdout(), &envelope) {
        warn!(error = %e, "Failed to print banner");
    }

    let mut input = ConsoleInput::new(io::stdin().lock(), io::stdout());
    let mut display = AuditedSink::new(
        MeteredSink::new(ConsoleDisplay::new(io::stdout(), envelope)),
        audit_logger.clone(),
    );
    let mut orchestrator = CycleOrchestrator::new(envelope, ramp_config, emergency);
    let summary = orchestrator.run_session(&mut input, &mut display);

    let stats = orchestrator.last_stats();
    info!(
        cycles_completed = summary.cycles_completed,
        end = ?summary.end,
        last_steps = stats.steps_executed,
        last_steps_late = stats.steps_late,
        last_max_jitter_us = stats.max_jitter_us,
        "Session complete"
    );

    if let Err(e) = write_session_end(&mut io::stdout(), &summary) {
        warn!(error = %e, "Failed to print session summary");
    }
    record(
        audit_logger.as_deref(),
        AuditEventType::SessionEnd,
        serde_json::to_value(&summary).unwrap_or_default(),
    );

    Ok(summary)
}

/// Routes Ctrl+C to the emergency stop latch. With no cycle running the
/// process is blocked on a prompt, so the session is terminated here.
fn install_emergency_stop(
    emergency: Arc<EmergencyStop>,
    audit_logger: Option<Arc<AuditLogger>>,
) -> Result<(), RuntimeError> {
    ctrlc::set_handler(move || {
        let cycle_active = emergency.trigger();
        warn!(cycle_active, "Emergency stop requested");
        record(
            audit_logger.as_deref(),
            AuditEventType::EmergencyStop,
            serde_json::json!({ "cycle_active": cycle_active }),
        );

        if !cycle_active {
            let mut out = io::stdout();
            let _ = write_emergency_termination(&mut out);
            let _ = writeln!(out, "Program ended.");
            let _ = out.flush();
            record(
                audit_logger.as_deref(),
                AuditEventType::SessionEnd,
                serde_json::json!({ "end": SessionEnd::Interrupted }),
            );
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    })?;
    Ok(())
}

fn init_audit_logger(
    audit_path: Option<&PathBuf>,
) -> Result<Option<Arc<AuditLogger>>, RuntimeError> {
    audit_path
        .map(|path| match AuditLogger::new(path) {
            Ok(logger) => {
                info!(path = %path.display(), "Audit logging enabled");
                Ok(Arc::new(logger))
            }
            Err(source) => Err(RuntimeError::Audit {
                path: path.clone(),
                source,
            }),
        })
        .transpose()
}
