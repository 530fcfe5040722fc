//! 指标记录
//!
//! 基于 metrics crate 的门面接口，由宿主进程决定安装何种 recorder；
//! 未安装 recorder 时所有记录都是空操作。

/// 注册指标描述
pub fn describe_metrics() {
    metrics::describe_counter!(
        "condition_evaluations_total",
        "Total number of condition expression evaluations"
    );
    metrics::describe_histogram!(
        "condition_evaluation_duration_seconds",
        "Condition expression evaluation duration in seconds"
    );
    metrics::describe_counter!("form_evaluations_total", "Total number of form evaluations");
    metrics::describe_gauge!("forms_loaded", "Number of compiled forms in the store");
}

/// 记录一次条件表达式评估，`outcome` 为 matched / not_matched / error
#[inline]
pub fn record_condition_evaluation(outcome: &str, duration_secs: f64) {
    metrics::counter!("condition_evaluations_total", "outcome" => outcome.to_string())
        .increment(1);
    metrics::histogram!("condition_evaluation_duration_seconds").record(duration_secs);
}

/// 记录一次表单评估
#[inline]
pub fn record_form_evaluation(form_id: &str, missing_fields: usize) {
    metrics::counter!(
        "form_evaluations_total",
        "form_id" => form_id.to_string(),
        "complete" => (missing_fields == 0).to_string()
    )
    .increment(1);
}

/// 更新已加载表单数
#[inline]
pub fn set_forms_loaded(count: usize) {
    metrics::gauge!("forms_loaded").set(count as f64);
}
