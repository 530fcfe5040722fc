//! 配置加载集成测试
//!
//! 验证配置文件的分层覆盖顺序。

use formcond_shared::config::AppConfig;
use std::fs;

#[test]
fn test_layered_config_files() {
    let dir = tempfile::tempdir().unwrap();

    fs::write(
        dir.path().join("default.toml"),
        r#"
        [engine]
        max_depth = 32

        [forms]
        dir = "forms"

        [observability]
        log_level = "warn"
        "#,
    )
    .unwrap();

    fs::write(
        dir.path().join("staging.toml"),
        r#"
        [engine]
        trace_enabled = true
        "#,
    )
    .unwrap();

    fs::write(
        dir.path().join("condition-eval.toml"),
        r#"
        [engine]
        max_depth = 16
        "#,
    )
    .unwrap();

    let config = AppConfig::load_from("condition-eval", "staging", dir.path()).unwrap();

    assert_eq!(config.service_name, "condition-eval");
    assert_eq!(config.environment, "staging");
    // 服务配置覆盖默认配置
    assert_eq!(config.engine.max_depth, 16);
    // 环境配置生效
    assert!(config.engine.trace_enabled);
    assert_eq!(config.forms.dir, "forms");
    assert_eq!(config.observability.log_level, "warn");
    // 未配置项使用默认值
    assert_eq!(config.observability.log_format, "pretty");
}

#[test]
fn test_missing_config_dir_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let config = AppConfig::load_from("condition-eval", "development", &missing).unwrap();

    assert_eq!(config.engine.max_depth, 64);
    assert_eq!(config.forms.dir, "config/forms");
    assert_eq!(config.environment, "development");
}

#[test]
fn test_invalid_value_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
        [engine]
        max_depth = "deep"
        "#,
    )
    .unwrap();

    assert!(AppConfig::load_from("condition-eval", "development", dir.path()).is_err());
}
