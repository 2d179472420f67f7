pub mod console;
pub mod metrics;

pub use console::{
    write_banner, write_emergency_termination, write_session_end, ConsoleDisplay, ConsoleInput,
};
pub use metrics::{init_metrics, serve_metrics, MeteredSink};
