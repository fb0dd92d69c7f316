use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

/// Tellere for konverteringer i denne prosessen.
pub struct Metrics {
    pub registry: Registry,
    pub frames_projected_total: IntCounter,
    pub decode_faults_total: IntCounter,
    pub records_reduced_total: IntCounter,
    pub conversions_total: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    // Navnene er statiske og unike; feil her er en programmeringsfeil.
    let c = IntCounter::with_opts(Opts::new(name, help)).expect("valid metric name");
    registry
        .register(Box::new(c.clone()))
        .expect("metric registered once");
    c
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();
        Self {
            frames_projected_total: counter(
                &registry,
                "fitconvert_frames_projected_total",
                "Frames rendered by the projector",
            ),
            decode_faults_total: counter(
                &registry,
                "fitconvert_decode_faults_total",
                "Frame streams truncated by a decode fault",
            ),
            records_reduced_total: counter(
                &registry,
                "fitconvert_records_reduced_total",
                "Record samples written to activity documents",
            ),
            conversions_total: counter(
                &registry,
                "fitconvert_conversions_total",
                "Completed activity conversions",
            ),
            registry,
        }
    }
}

static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

pub fn global() -> &'static Metrics {
    &METRICS
}

/// Prometheus tekstformat for alle tellere.
pub fn render() -> String {
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&METRICS.registry.gather(), &mut buf) {
        log::warn!("could not encode metrics: {e}");
    }
    String::from_utf8_lossy(&buf).into_owned()
}
