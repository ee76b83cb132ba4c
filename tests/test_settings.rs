use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use dotenv::dotenv;

use hyperopt_runner::app_config::settings::{DuplicatePolicy, Settings};
use hyperopt_runner::AppError;

fn fixture_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hyperopt_runner_cfg_{}_{}", std::process::id(), name))
}

fn sample_config_json() -> &'static str {
    r#"{
        "results_spreadsheet_id": "results-id",
        "results_worksheet_name": "Results",
        "config_spreadsheet_id": "config-id",
        "config_worksheet_name": "Runs",
        "duplicate_policy": "skip_repeats",
        "tool": {
            "docker_image": "freqtradeorg/freqtrade:stable",
            "host_user_data_path": "/opt/freqtrade/user_data",
            "container_user_data_path": "/freqtrade/user_data"
        },
        "columns": {
            "context": ["Date and Time", "Run #", "Strategy"],
            "metrics": ["Trades #", "% Win", "Profit %", "DrawDown %"],
            "strategy_params": {
                "EmaCross": ["EMA_1D_1", "EMA_1D_2"]
            }
        },
        "labels": {
            "param_fields": {
                "EMA_1D_1": ["ema_1d_1"],
                "EMA_1D_2": ["ema_1d_2"]
            }
        }
    }"#
}

#[tokio::test]
async fn test_load_settings_with_defaults() -> Result<()> {
    dotenv().ok();
    let path = fixture_path("ok.json");
    fs::write(&path, sample_config_json())?;

    let settings = Settings::load(&path)?;
    assert_eq!(settings.results_spreadsheet_id, "results-id");
    assert_eq!(settings.config_worksheet_name, "Runs");
    assert_eq!(settings.duplicate_policy, DuplicatePolicy::SkipRepeats);

    // 没写的配置项落默认值
    assert_eq!(settings.access_token_env, "GSHEET_ACCESS_TOKEN");
    assert_eq!(settings.tool.program, "docker");
    assert_eq!(settings.tool.default_config_filename, "config.json");
    assert_eq!(settings.tool.default_loss_function, "ShortTradeDurHyperOptLoss");
    assert_eq!(settings.tool.default_job_workers, -1);
    assert_eq!(settings.tool.hyperopt_results_dir, "hyperopt_results");
    assert_eq!(settings.tool.artifact_settle_secs, 5);
    assert_eq!(
        settings.required_run_columns,
        vec!["epochs", "timerange", "Strategy"]
    );
    // 标签配置只覆盖写了的部分
    assert_eq!(settings.labels.summary_section, "SUMMARY METRICS");
    assert_eq!(
        settings.labels.param_fields.get("EMA_1D_1"),
        Some(&vec!["ema_1d_1".to_string()])
    );

    // 路径拼接
    assert_eq!(
        settings.tool.results_dir_host(),
        PathBuf::from("/opt/freqtrade/user_data/hyperopt_results")
    );
    assert_eq!(
        settings.tool.container_config_path("config_fut.json"),
        "/freqtrade/user_data/config_fut.json"
    );
    println!("配置加载测试通过-------");
    Ok(())
}

#[tokio::test]
async fn test_missing_config_file_is_config_error() -> Result<()> {
    let err = Settings::load(&fixture_path("nope.json")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_malformed_config_is_config_error() -> Result<()> {
    let path = fixture_path("bad.json");
    fs::write(&path, "{ not json")?;
    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_blank_required_field_rejected() -> Result<()> {
    let path = fixture_path("blank.json");
    let json = sample_config_json().replace("\"results-id\"", "\" \"");
    fs::write(&path, json)?;
    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_headers_rejected_at_load() -> Result<()> {
    let path = fixture_path("dup.json");
    let json = sample_config_json().replace("\"EMA_1D_2\"]", "\"Run #\"]");
    fs::write(&path, json)?;
    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Config(_))
    ));
    Ok(())
}
