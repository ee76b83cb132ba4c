//! 结果表写入
//!
//! 追加前先读一次远程表头行，按表头文本重新对齐单元格，部署侧调整
//! 列顺序不影响写入。追加失败不重试，该条结果按丢失上报。

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::app_error::AppError;
use crate::hyperopt::model::run_spec::COL_RUN_NO;
use crate::hyperopt::schema::MappedRow;
use crate::hyperopt::sheets::sheet_client::AppendResult;
use crate::hyperopt::sheets::worksheet::Worksheet;

/// 结果落地的出口
#[async_trait]
pub trait ResultsSink: Send + Sync {
    /// 下一个运行编号
    async fn next_run_number(&self) -> i64;

    /// 追加一行映射好的结果
    async fn append_mapped_row(&self, row: &MappedRow) -> anyhow::Result<AppendResult>;
}

/// 结果表模型
pub struct ResultsSheetModel {
    ws: Worksheet,
}

impl ResultsSheetModel {
    pub fn new(ws: Worksheet) -> ResultsSheetModel {
        ResultsSheetModel { ws }
    }
}

#[async_trait]
impl ResultsSink for ResultsSheetModel {
    /// Run # 列的最大值加一；读不到时从 1 开始
    async fn next_run_number(&self) -> i64 {
        match self.ws.column_by_header(COL_RUN_NO).await {
            Ok(cells) => next_number_after(&cells),
            Err(e) => {
                warn!("读取 {} 列失败, 运行编号从 1 开始: {}", COL_RUN_NO, e);
                1
            }
        }
    }

    async fn append_mapped_row(&self, row: &MappedRow) -> anyhow::Result<AppendResult> {
        let live_headers = self
            .ws
            .header_row()
            .await
            .map_err(|e| AppError::Write(format!("读取结果表表头失败: {}", e)))?;
        if live_headers.is_empty() {
            return Err(AppError::Write("结果表缺少表头行".to_string()).into());
        }

        let cells = row.align_to(&live_headers);
        let result = self
            .ws
            .append_row(cells.iter().map(|c| c.to_json()).collect())
            .await
            .map_err(|e| AppError::Write(format!("追加结果行失败: {}", e)))?;
        info!("结果已写入: {}", result.updated_range());
        Ok(result)
    }
}

/// Run # 列取最大值加一；列为空或没有可解析的数字时从 1 开始
pub fn next_number_after(cells: &[String]) -> i64 {
    cells
        .iter()
        .filter_map(|c| c.trim().parse::<i64>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(1)
}
