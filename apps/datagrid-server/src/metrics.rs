use datagrid_core::cache::CacheStatsSnapshot;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static BOOT_COUNTER: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::with_opts(Opts::new("datagrid_boot_total", "datagrid server boots"))
        .expect("valid metric opts");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static GRID_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "datagrid_requests_total",
            "grid requests by grid, endpoint and outcome",
        ),
        &["grid", "endpoint", "outcome"],
    )
    .expect("valid metric opts");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static GRID_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    let h = HistogramVec::new(
        HistogramOpts::new(
            "datagrid_request_latency_ms",
            "time to execute and serialize one grid page in milliseconds",
        )
        .buckets(vec![
            1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0,
        ]),
        &["grid"],
    )
    .expect("valid metric opts");
    REGISTRY.register(Box::new(h.clone())).ok();
    h
});

pub static CACHE_EVENTS: Lazy<IntGaugeVec> = Lazy::new(|| {
    let g = IntGaugeVec::new(
        Opts::new(
            "datagrid_cache_events",
            "result cache hits, misses and backend errors since boot",
        ),
        &["backend", "event"],
    )
    .expect("valid metric opts");
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

pub fn record_cache_stats(backend: &str, stats: CacheStatsSnapshot) {
    for (event, value) in [
        ("hit", stats.hits),
        ("miss", stats.misses),
        ("error", stats.errors),
    ] {
        CACHE_EVENTS
            .with_label_values(&[backend, event])
            .set(i64::try_from(value).unwrap_or(i64::MAX));
    }
}

pub fn gather() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %err, "metrics encode error");
    }
    buffer
}
