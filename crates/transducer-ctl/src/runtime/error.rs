use ramp_spine::RampConfigError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid argument: {0}")]
    Config(String),
    #[error(transparent)]
    Ramp(#[from] RampConfigError),
    #[error("failed to install emergency stop handler: {0}")]
    InterruptHandler(#[from] ctrlc::Error),
    #[error("failed to open audit log {path}: {source}")]
    Audit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
