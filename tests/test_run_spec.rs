use anyhow::Result;
use dotenv::dotenv;
use serde_json::json;

use hyperopt_runner::app_config::settings::{DuplicatePolicy, ToolSettings};
use hyperopt_runner::hyperopt::model::run_spec::{self, parse_specs};
use hyperopt_runner::hyperopt::schema::ColumnSchema;
use hyperopt_runner::{AppError, FieldMap, FieldValue};

fn sample_tool() -> ToolSettings {
    serde_json::from_value(json!({
        "docker_image": "freqtradeorg/freqtrade:stable",
        "host_user_data_path": "/opt/freqtrade/user_data",
        "container_user_data_path": "/freqtrade/user_data"
    }))
    .unwrap()
}

fn header_row() -> Vec<String> {
    [
        "Strategy",
        "Config",
        "epochs",
        "timerange",
        "Pairs",
        "Leverage",
        "% per trade",
        "spaces",
        "loss_function",
        "jobs",
        "min_trades",
        "random_state",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

fn required() -> Vec<String> {
    vec![
        "epochs".to_string(),
        "timerange".to_string(),
        "Strategy".to_string(),
    ]
}

#[tokio::test]
async fn test_parse_specs_full_row() -> Result<()> {
    dotenv().ok();
    let rows = vec![
        header_row(),
        row(&[
            "EmaCross",
            "config_fut.json",
            "500",
            "20240101-20240601",
            "BTC/USDT ETH/USDT",
            "3",
            "2.5",
            "buy sell",
            "SharpeHyperOptLoss",
            "8",
            "20",
            "40721",
        ]),
    ];

    let specs = parse_specs(&rows, &required(), DuplicatePolicy::RunAll)?;
    assert_eq!(specs.len(), 1);
    let spec = &specs[0];
    assert_eq!(spec.strategy, "EmaCross");
    assert_eq!(spec.config_filename.as_deref(), Some("config_fut.json"));
    assert_eq!(spec.epochs, 500);
    assert_eq!(spec.timerange, "20240101-20240601");
    assert_eq!(spec.pairs.as_deref(), Some("BTC/USDT ETH/USDT"));
    assert_eq!(spec.leverage.as_deref(), Some("3"));
    assert_eq!(spec.spaces.as_deref(), Some("buy sell"));
    assert_eq!(spec.loss_function.as_deref(), Some("SharpeHyperOptLoss"));
    assert_eq!(spec.jobs, Some(8));
    assert_eq!(spec.min_trades, Some(20));
    assert_eq!(spec.random_state, Some(40721));
    // 表头行是第 1 行，首条数据行号是 2
    assert_eq!(spec.row_number, 2);
    println!("完整行解析测试通过-------");
    Ok(())
}

#[tokio::test]
async fn test_parse_specs_skips_bad_rows() -> Result<()> {
    let rows = vec![
        header_row(),
        // 必填列 epochs 为空
        row(&["EmaCross", "", "", "20240101-", "", "", "", "", "", "", "", ""]),
        // epochs 不是数字
        row(&["EmaCross", "", "abc", "20240101-", "", "", "", "", "", "", "", ""]),
        // 全空行静默跳过
        row(&["", "", "", "", "", "", "", "", "", "", "", ""]),
        // 有效行
        row(&["EmaCross", "", "100", "20240101-", "", "", "", "", "", "", "", ""]),
    ];

    let specs = parse_specs(&rows, &required(), DuplicatePolicy::RunAll)?;
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].epochs, 100);
    assert_eq!(specs[0].row_number, 5);
    Ok(())
}

#[tokio::test]
async fn test_off_and_na_are_absent() -> Result<()> {
    let rows = vec![
        header_row(),
        row(&[
            "EmaCross", "#N/A", "100", "20240101-", "#N/A", "", "", "OFF", "OFF", "OFF", "", "",
        ]),
    ];

    let specs = parse_specs(&rows, &required(), DuplicatePolicy::RunAll)?;
    let spec = &specs[0];
    assert_eq!(spec.config_filename, None);
    assert_eq!(spec.pairs, None);
    assert_eq!(spec.spaces, None);
    assert_eq!(spec.loss_function, None);
    assert_eq!(spec.jobs, None);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_policy() -> Result<()> {
    let duplicate = row(&[
        "EmaCross", "", "100", "20240101-", "", "", "", "", "", "", "", "",
    ]);
    // 判重只看策略、配置、轮数、时间范围，loss_function 等可选列不参与
    let same_key_other_loss = row(&[
        "EmaCross", "", "100", "20240101-", "", "", "", "", "SharpeHyperOptLoss", "", "", "",
    ]);
    let other_epochs = row(&[
        "EmaCross", "", "200", "20240101-", "", "", "", "", "", "", "", "",
    ]);
    let rows = vec![
        header_row(),
        duplicate.clone(),
        duplicate.clone(),
        same_key_other_loss,
        other_epochs,
    ];

    let all = parse_specs(&rows, &required(), DuplicatePolicy::RunAll)?;
    assert_eq!(all.len(), 4);

    let deduped = parse_specs(&rows, &required(), DuplicatePolicy::SkipRepeats)?;
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].epochs, 100);
    assert_eq!(deduped[1].epochs, 200);
    println!("重复行策略测试通过-------");
    Ok(())
}

#[tokio::test]
async fn test_empty_table_is_config_error() -> Result<()> {
    let err = parse_specs(&[], &required(), DuplicatePolicy::RunAll).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Config(_))
    ));

    // 只有表头也算没有有效运行
    let err = parse_specs(&[header_row()], &required(), DuplicatePolicy::RunAll).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_blank_leverage_stays_blank_end_to_end() -> Result<()> {
    // Leverage 空单元格 → 运行说明里缺席 → 结果行里留空而不是 0
    let rows = vec![
        header_row(),
        row(&["EmaCross", "", "100", "20240101-", "", "", "", "", "", "", "", ""]),
    ];
    let specs = parse_specs(&rows, &required(), DuplicatePolicy::RunAll)?;
    let spec = &specs[0];
    assert_eq!(spec.leverage, None);

    let fields = spec.to_field_map(&sample_tool(), 1, None);
    assert_eq!(fields.get(run_spec::COL_LEVERAGE), None);

    let schema = ColumnSchema {
        context: vec![
            run_spec::COL_RUN_NO.to_string(),
            run_spec::COL_STRATEGY.to_string(),
            run_spec::COL_LEVERAGE.to_string(),
        ],
        metrics: vec!["Trades #".to_string()],
        strategy_params: Default::default(),
    };
    let mapped = schema.map_row(&spec.strategy, &fields);
    assert_eq!(mapped.cells.len(), 4);
    assert!(mapped.cells[2].is_blank());
    println!("空杠杆列留空测试通过-------");
    Ok(())
}

#[tokio::test]
async fn test_to_field_map_defaults_and_seed() -> Result<()> {
    let rows = vec![
        header_row(),
        row(&["EmaCross", "", "100", "20240101-", "", "", "", "", "", "", "", ""]),
    ];
    let specs = parse_specs(&rows, &required(), DuplicatePolicy::RunAll)?;
    let tool = sample_tool();

    let fields: FieldMap = specs[0].to_field_map(&tool, 7, Some(40721));
    assert_eq!(fields.get(run_spec::COL_RUN_NO), Some(&FieldValue::Int(7)));
    assert_eq!(
        fields.get(run_spec::COL_EPOCHS),
        Some(&FieldValue::Int(100))
    );
    // Config 与 loss_function 空时落到默认值
    assert_eq!(
        fields.get(run_spec::COL_CONFIG),
        Some(&FieldValue::Text("config.json".to_string()))
    );
    assert_eq!(
        fields.get(run_spec::COL_LOSS_FUNCTION),
        Some(&FieldValue::Text("ShortTradeDurHyperOptLoss".to_string()))
    );
    // 捕获到的随机种子写进上下文
    assert_eq!(
        fields.get(run_spec::COL_RANDOM_STATE),
        Some(&FieldValue::Int(40721))
    );
    Ok(())
}
