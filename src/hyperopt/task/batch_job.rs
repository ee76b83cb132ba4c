//! 批量任务：读配置 → 执行 → 抽取 → 映射 → 写入
//!
//! 整条流水线逐条串行，没有更多状态机。单条运行的错误按条隔离，
//! 不中断批次，也一律不重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::app_config::settings::Settings;
use crate::error::app_error::AppError;
use crate::hyperopt::extractor::show_output::Extractor;
use crate::hyperopt::model::results_sheet::ResultsSink;
use crate::hyperopt::model::run_result::RunResult;
use crate::hyperopt::model::run_spec::RunSpec;
use crate::hyperopt::task::session_runner::SessionRunner;

/// 一个批次的收尾统计
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub recorded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn all_recorded(&self) -> bool {
        self.failed == 0
    }
}

/// 批量任务
pub struct BatchJob {
    settings: Arc<Settings>,
    runner: SessionRunner,
    extractor: Arc<Extractor>,
    results: Box<dyn ResultsSink>,
}

impl BatchJob {
    /// 结果出口通过构造函数注入
    pub fn new(settings: Arc<Settings>, results: Box<dyn ResultsSink>) -> anyhow::Result<BatchJob> {
        let extractor = Arc::new(Extractor::new(settings.labels.clone())?);
        let runner = SessionRunner::new(settings.tool.clone(), Arc::clone(&extractor));
        Ok(BatchJob {
            settings,
            runner,
            extractor,
            results,
        })
    }

    /// 逐条处理整个批次，单条失败不影响后续
    pub async fn process(&self, specs: &[RunSpec]) -> BatchSummary {
        let started = Instant::now();
        let next_run_number = self.results.next_run_number().await;
        info!("下一个运行编号: {}", next_run_number);
        info!("--- 开始处理 {} 条运行 ---", specs.len());

        let mut recorded = 0usize;
        let mut failed = 0usize;
        for (i, spec) in specs.iter().enumerate() {
            let run_number = next_run_number + i as i64;
            info!(
                "======= RUN {} | 策略: {} (配置表第 {} 行) =======",
                run_number, spec.strategy, spec.row_number
            );
            match self.process_one(spec, run_number).await {
                Ok(()) => {
                    recorded += 1;
                    info!("======= RUN {} 已记录 =======", run_number);
                }
                Err(e) => {
                    failed += 1;
                    match e.downcast_ref::<AppError>() {
                        Some(AppError::Run(msg)) => {
                            error!("RUN {} 执行失败, 跳过该条: {}", run_number, msg);
                        }
                        Some(AppError::Write(msg)) => {
                            error!("RUN {} 结果未能写入, 需人工重跑: {}", run_number, msg);
                        }
                        _ => error!("RUN {} 失败: {:#}", run_number, e),
                    }
                }
            }
        }

        let summary = BatchSummary {
            total: specs.len(),
            recorded,
            failed,
            elapsed: started.elapsed(),
        };
        info!(
            "--- 批次结束: 共 {} 条, 成功记录 {} 条, 失败 {} 条, 耗时 {:.2}s ---",
            summary.total,
            summary.recorded,
            summary.failed,
            summary.elapsed.as_secs_f64()
        );
        summary
    }

    /// 单条流水线: Run → Extract → Map → Write
    async fn process_one(&self, spec: &RunSpec, run_number: i64) -> anyhow::Result<()> {
        let session = self.runner.run_session(spec).await?;

        let extracted = self
            .extractor
            .extract(&session.show_output, Some(&session.result_file));
        if extracted.is_empty() {
            return Err(AppError::Run(
                "hyperopt-show 输出不可解析, 一个标签都没有命中".to_string(),
            )
            .into());
        }
        let result = RunResult::from_fields(&extracted);
        if result.is_empty() {
            warn!(
                "RUN {} 没有抽取到指标, 检查标签配置是否匹配工具版本",
                run_number
            );
        }
        info!(
            "解析结果: trades={:?} win%={:?} profit%={:?} drawdown%={:?}",
            result.trades, result.win_percent, result.total_profit_percent, result.drawdown_percent
        );

        let mut fields = spec.to_field_map(&self.settings.tool, run_number, session.random_state);
        fields.merge(extracted);

        let row = self.settings.columns.map_row(&spec.strategy, &fields);
        self.results.append_mapped_row(&row).await?;
        Ok(())
    }
}
