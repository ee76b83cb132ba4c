use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use hyperopt_runner::app_config::settings::Settings;
use hyperopt_runner::hyperopt::model::results_sheet::ResultsSheetModel;
use hyperopt_runner::hyperopt::model::run_spec::RunSpecModel;
use hyperopt_runner::hyperopt::sheets::sheet_client::SheetClient;
use hyperopt_runner::hyperopt::sheets::worksheet::Worksheet;
use hyperopt_runner::hyperopt::task::batch_job::BatchJob;
use hyperopt_runner::time_util;

/// 批量执行 hyperopt 并把结果写回 Google Sheets
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// 本地配置文件路径
    #[arg(short, long, default_value = "hyperopt_runner.json")]
    config: PathBuf,
    /// 有任何一条运行没写进结果表时以非零状态码退出
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 设置日志
    hyperopt_runner::app_init().await?;
    info!("批量 hyperopt 启动: {}", time_util::utc_now_display());

    let settings = Arc::new(Settings::load(&cli.config)?);
    let client = SheetClient::from_env(&settings.access_token_env)?;

    // 两张表的句柄各取一次，整个批次复用
    let config_ws = Worksheet::new(
        client.clone(),
        settings.config_spreadsheet_id.clone(),
        settings.config_worksheet_name.clone(),
    );
    let results_ws = Worksheet::new(
        client,
        settings.results_spreadsheet_id.clone(),
        settings.results_worksheet_name.clone(),
    );

    // 读配置表，拿到本批次要跑的所有运行
    let specs = RunSpecModel::new(config_ws)
        .read_specs(&settings.required_run_columns, settings.duplicate_policy)
        .await?;
    info!("配置表共读到 {} 条待运行", specs.len());

    let job = BatchJob::new(
        Arc::clone(&settings),
        Box::new(ResultsSheetModel::new(results_ws)),
    )?;
    let summary = job.process(&specs).await;

    if cli.strict && !summary.all_recorded() {
        anyhow::bail!(
            "{} 条运行失败 (共 {} 条)",
            summary.failed,
            summary.total
        );
    }
    Ok(())
}
