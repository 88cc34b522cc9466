use crate::errors::Result;
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref FETCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("dashboard_fetches_total", "Total fetches issued per source"),
        &["source"]
    )
    .unwrap();
    pub static ref FETCH_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "dashboard_fetch_failures_total",
            "Total failed fetches per source"
        ),
        &["source"]
    )
    .unwrap();
    pub static ref STALE_RESPONSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "dashboard_stale_responses_total",
            "Responses discarded because a newer one was already applied"
        ),
        &["source"]
    )
    .unwrap();
    pub static ref CHANNEL_FULL_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "dashboard_channel_full_total",
            "Fetch start notices skipped because the store channel was full"
        ),
        &["source"]
    )
    .unwrap();
    pub static ref LATE_RESULTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_late_results_total",
        "Results dropped because their poller was cancelled"
    ))
    .unwrap();
    pub static ref FETCH_LATENCY_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "dashboard_fetch_latency_seconds",
            "Time taken by one fetch against the farm backend"
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["source"]
    )
    .unwrap();
    pub static ref SEARCH_QUERIES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_search_queries_total",
        "Knowledge base searches that passed the length gate"
    ))
    .unwrap();
}

pub fn init_metrics() -> Result<()> {
    REGISTRY.register(Box::new(FETCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STALE_RESPONSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CHANNEL_FULL_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LATE_RESULTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(SEARCH_QUERIES_TOTAL.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
}
