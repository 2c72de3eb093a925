use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// Global Prometheus registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

fn service_and_env() -> (String, String) {
    let service = std::env::var("APP_SERVICE")
        .ok()
        .unwrap_or_else(|| env!("APP_SERVICE_DEFAULT").to_string());
    let env_name = std::env::var("APP_ENV")
        .ok()
        .unwrap_or_else(|| env!("APP_ENV_DEFAULT").to_string());
    (service, env_name)
}

// App info gauge (const)
pub static APP_INFO: Lazy<IntGauge> = Lazy::new(|| {
    let (service, env_name) = service_and_env();
    let g = IntGauge::with_opts(
        Opts::new("app_info", "Application info gauge")
            .const_label("service", &service)
            .const_label("env", &env_name)
            .const_label("version", env!("CARGO_PKG_VERSION"))
            .const_label("git_sha", env!("GIT_SHA"))
            .const_label("build_time", env!("BUILD_TIME")),
    )
    .unwrap();
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

/// Optimize requests by outcome: history_hit, fresh, invalid, upstream_error
pub static OPTIMIZE_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("optimize_requests_total", "Optimize requests by outcome"),
        &["outcome"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static HEURISTIC_REWRITES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("heuristic_rewrites_total", "Results produced by heuristic rules").unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static LLM_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("llm_requests_total", "Model calls by result"),
        &["result"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static LLM_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    let opts = HistogramOpts::new("llm_latency_ms", "Model call latency in milliseconds")
        .buckets(vec![250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0]);
    let h = Histogram::with_opts(opts).unwrap();
    REGISTRY.register(Box::new(h.clone())).ok();
    h
});

pub static HISTORY_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("history_errors_total", "Non-fatal history store failures by operation"),
        &["op"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static FEEDBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("feedback_total", "Feedback recorded by value"),
        &["feedback"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub fn record_optimize_outcome(outcome: &str) {
    OPTIMIZE_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_history_error(op: &str) {
    HISTORY_ERRORS_TOTAL.with_label_values(&[op]).inc();
}

pub fn record_feedback(feedback: &str) {
    FEEDBACK_TOTAL.with_label_values(&[feedback]).inc();
}

pub fn observe_llm_call(latency_ms: f64, ok: bool) {
    LLM_LATENCY_MS.observe(latency_ms);
    LLM_REQUESTS_TOTAL
        .with_label_values(&[if ok { "ok" } else { "error" }])
        .inc();
}

/// Force registration so every series shows up before first use
pub fn init() {
    APP_INFO.set(1);
    Lazy::force(&OPTIMIZE_REQUESTS_TOTAL);
    Lazy::force(&HEURISTIC_REWRITES_TOTAL);
    Lazy::force(&LLM_REQUESTS_TOTAL);
    Lazy::force(&LLM_LATENCY_MS);
    Lazy::force(&HISTORY_ERRORS_TOTAL);
    Lazy::force(&FEEDBACK_TOTAL);
}

pub fn export_prometheus() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_registered_series() {
        init();
        record_optimize_outcome("fresh");
        HEURISTIC_REWRITES_TOTAL.inc();

        let text = export_prometheus();
        assert!(text.contains("app_info"));
        assert!(text.contains("optimize_requests_total"));
        assert!(text.contains("heuristic_rewrites_total"));
    }
}
