use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("antipode_search_count", "count of the searches", &["domain", "method"])
        .expect("failed to register antipode_search_count")
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "antipode_search_duration",
        "duration of the per-request search in seconds",
        &["domain", "method"]
    )
    .expect("failed to register antipode_search_duration")
});

static METRIC_SEARCH_UNAVAILABLE: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "antipode_search_unavailable",
        "count of the searches rejected because the vector store is unavailable",
        &["domain"]
    )
    .expect("failed to register antipode_search_unavailable")
});

static METRIC_EMBEDDING_FAILURE: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "antipode_embedding_failure",
        "count of the failed embedding generations",
        &["kind"]
    )
    .expect("failed to register antipode_embedding_failure")
});

/// 记录一次成功的搜索以及耗时
pub fn observe_search(domain: &str, method: &str, duration: f64) {
    METRIC_SEARCH_COUNT.with_label_values(&[domain, method]).inc();
    METRIC_SEARCH_DURATION.with_label_values(&[domain, method]).observe(duration);
}

pub fn inc_search_unavailable(domain: &str) {
    METRIC_SEARCH_UNAVAILABLE.with_label_values(&[domain]).inc();
}

pub fn inc_embedding_failure(kind: &str) {
    METRIC_EMBEDDING_FAILURE.with_label_values(&[kind]).inc();
}
