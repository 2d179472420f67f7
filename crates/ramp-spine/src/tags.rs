/// Names a reported value across logs and metrics.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
}

pub const CURRENT_POWER_WS: Tag = Tag {
    key: "current_power_ws",
    metric: "transducer_current_power_ws",
};

pub const TARGET_POWER_WS: Tag = Tag {
    key: "target_power_ws",
    metric: "transducer_target_power_ws",
};

pub const CYCLES_COMPLETED: Tag = Tag {
    key: "cycles_completed",
    metric: "transducer_cycles_completed_total",
};

pub const CYCLES_INTERRUPTED: Tag = Tag {
    key: "cycles_interrupted",
    metric: "transducer_cycles_interrupted_total",
};

pub const TARGETS_REJECTED: Tag = Tag {
    key: "targets_rejected",
    metric: "transducer_targets_rejected_total",
};

pub const RAMP_DURATION_SECONDS: Tag = Tag {
    key: "ramp_duration_seconds",
    metric: "transducer_ramp_duration_seconds",
};
