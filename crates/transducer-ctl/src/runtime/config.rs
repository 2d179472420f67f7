use crate::runtime::error::RuntimeError;
use ramp_spine::RampConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub step_ws: f64,
    pub interval_ms: u64,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let ramp = RampConfig::default();
        Self {
            show_help: false,
            step_ws: ramp.step_ws(),
            interval_ms: ramp.interval().as_millis() as u64,
            json_logs: false,
            metrics_addr: None,
            audit_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, RuntimeError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, RuntimeError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--step" => {
                    cfg.step_ws = parse_value(args, i)?;
                    i += 1;
                }
                "--interval-ms" => {
                    cfg.interval_ms = parse_value(args, i)?;
                    i += 1;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(parse_value(args, i)?);
                    i += 1;
                }
                "--audit-log" => {
                    cfg.audit_path = Some(PathBuf::from(parse_value::<String>(args, i)?));
                    i += 1;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => {
                    return Err(RuntimeError::Config(format!("unknown option '{other}'")));
                }
            }
            i += 1;
        }
        Ok(cfg)
    }

    /// Ramp settings, rejecting a step that could never reach a target.
    pub fn ramp_config(&self) -> Result<RampConfig, RuntimeError> {
        Ok(RampConfig::new(
            self.step_ws,
            Duration::from_millis(self.interval_ms),
        )?)
    }

    pub fn print_help() {
        println!(
            r#"transducer-ctl - Bounded power-ramp transducer controller

USAGE:
    transducer-ctl [OPTIONS]

OPTIONS:
    --step <WS>             Power increment per step in w-s [default: 10]
    --interval-ms <MS>      Delay between steps in milliseconds [default: 100]
    --json-logs             Output logs in JSON format (for log aggregation)
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>      Enable audit logging to specified JSONL file
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,ramp_spine=trace)

EXAMPLES:
    # Interactive session with defaults
    transducer-ctl

    # Faster ramp with an audit trail
    transducer-ctl --step 25 --interval-ms 20 --audit-log /var/log/transducer/audit.jsonl
"#
        );
    }
}

fn parse_value<T: FromStr>(args: &[String], i: usize) -> Result<T, RuntimeError> {
    let flag = &args[i];
    let raw = args
        .get(i + 1)
        .ok_or_else(|| RuntimeError::Config(format!("{flag} requires a value")))?;
    raw.parse()
        .map_err(|_| RuntimeError::Config(format!("invalid value '{raw}' for {flag}")))
}
