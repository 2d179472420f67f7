//! Prometheus metrics for the transducer controller.
//!
//! Ramp progress and cycle outcomes are recorded by [`MeteredSink`], a
//! display decorator, and served over HTTP by [`serve_metrics`].

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use ramp_spine::{tags, CycleOutcome, EnvelopeViolation, ProgressSink};
use std::sync::LazyLock;
use std::thread;
use std::time::Instant;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Power Metrics
// ============================================================================

/// Current simulated output power
pub static CURRENT_POWER_WS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::CURRENT_POWER_WS.metric, "Current output power in w-s").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Target power of the active or most recent cycle
pub static TARGET_POWER_WS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        tags::TARGET_POWER_WS.metric,
        "Target power of the active or most recent cycle in w-s",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Cycle Metrics
// ============================================================================

pub static CYCLES_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::CYCLES_COMPLETED.metric,
        "Ramp cycles that reached a terminal outcome",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static CYCLES_INTERRUPTED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::CYCLES_INTERRUPTED.metric,
        "Ramp cycles halted by emergency stop",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static TARGETS_REJECTED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::TARGETS_REJECTED.metric,
        "Requested targets outside the power envelope",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Wall time from cycle start to terminal outcome
pub static RAMP_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            tags::RAMP_DURATION_SECONDS.metric,
            "Ramp duration from start to terminal outcome in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .unwrap();
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

/// Wraps a display and records every call into the metrics above.
pub struct MeteredSink<S> {
    inner: S,
    cycle_started: Option<Instant>,
}

impl<S: ProgressSink> MeteredSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cycle_started: None,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ProgressSink> ProgressSink for MeteredSink<S> {
    fn cycle_started(&mut self, target: f64) {
        TARGET_POWER_WS.set(target);
        CURRENT_POWER_WS.set(0.0);
        self.cycle_started = Some(Instant::now());
        self.inner.cycle_started(target);
    }

    fn on_progress(&mut self, current: f64) {
        CURRENT_POWER_WS.set(current);
        self.inner.on_progress(current);
    }

    fn report(&mut self, outcome: &CycleOutcome) {
        CURRENT_POWER_WS.set(outcome.final_power);
        CYCLES_COMPLETED.inc();
        if outcome.interrupted {
            CYCLES_INTERRUPTED.inc();
        }
        if let Some(started) = self.cycle_started.take() {
            RAMP_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
        }
        self.inner.report(outcome);
    }

    fn rejected(&mut self, violation: &EnvelopeViolation) {
        TARGETS_REJECTED.inc();
        self.inner.rejected(violation);
    }
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let (status, body, text) = render(request.url());
            let mut response = Response::from_data(body).with_status_code(status);
            if text {
                if let Ok(header) = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"text/plain; version=0.0.4"[..],
                ) {
                    response = response.with_header(header);
                }
            }
            let _ = request.respond(response);
        }
    })
}

/// Status, body and whether the body is the Prometheus exposition format.
fn render(path: &str) -> (u16, Vec<u8>, bool) {
    match path {
        "/metrics" => {
            let mut buffer = Vec::new();
            match TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
                Ok(()) => (200, buffer, true),
                Err(e) => {
                    tracing::warn!("Failed to encode metrics: {}", e);
                    (500, b"Internal Server Error".to_vec(), false)
                }
            }
        }
        "/health" => (200, b"OK".to_vec(), false),
        // Ready once a cycle has reached an outcome
        "/ready" if CYCLES_COMPLETED.get() > 0 => (200, b"Ready".to_vec(), false),
        "/ready" => (503, b"Not Ready".to_vec(), false),
        _ => (404, b"Not Found".to_vec(), false),
    }
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = CURRENT_POWER_WS.get();
    let _ = TARGET_POWER_WS.get();
    let _ = CYCLES_COMPLETED.get();
    let _ = CYCLES_INTERRUPTED.get();
    let _ = TARGETS_REJECTED.get();
    let _ = RAMP_DURATION_SECONDS.get_sample_count();
}
