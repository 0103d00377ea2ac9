use crate::errors::Result;
use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref SNAPSHOTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_snapshots_total",
        "Total subscription events received from the telemetry source"
    ))
    .unwrap();
    pub static ref EMPTY_SNAPSHOTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_empty_snapshots_total",
        "Snapshots reporting that the reading document does not exist"
    ))
    .unwrap();
    pub static ref MALFORMED_SNAPSHOTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_malformed_snapshots_total",
        "Snapshots rejected as undecodable or incomplete"
    ))
    .unwrap();
    pub static ref SUBSCRIPTION_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_subscription_failures_total",
        "Telemetry subscriptions that ended with an error"
    ))
    .unwrap();
    pub static ref RECOMMENDATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "dashboard_recommendations_total",
            "Recommendations produced, by crop"
        ),
        &["crop"]
    )
    .unwrap();
}

pub fn init_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SNAPSHOTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EMPTY_SNAPSHOTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MALFORMED_SNAPSHOTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SUBSCRIPTION_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECOMMENDATIONS_TOTAL.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
