use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_IMAGE_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("sm_search_image_count", "count of the images searched").unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "sm_search_duration",
        "duration of the per-image search in seconds"
    )
    .unwrap()
});

static METRIC_SEARCH_MAX_SCORE: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "sm_search_max_score",
        "max similarity score of the per-image search",
        (1..=20).map(|x| x as f64 * 0.05).collect()
    )
    .unwrap()
});

/// 增加搜索图片计数
pub fn inc_image_count() {
    METRIC_SEARCH_IMAGE_COUNT.inc();
}

/// 记录单张图片的搜索耗时
pub fn observe_search_duration(duration: f32) {
    METRIC_SEARCH_DURATION.observe(duration as f64);
}

/// 记录单张图片的最高相似度分数
pub fn observe_max_score(score: f32) {
    METRIC_SEARCH_MAX_SCORE.observe(score as f64);
}
