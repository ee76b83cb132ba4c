//! 运行说明：配置表一行 = 一次优化会话
//!
//! 配置表是只读的，表头大小写敏感。空单元格与 `#N/A` 一律视为
//! 缺省，`OFF` 表示显式关闭某个可选参数。

use tracing::{info, warn};

use crate::app_config::settings::{DuplicatePolicy, ToolSettings};
use crate::error::app_error::AppError;
use crate::hyperopt::model::field_map::{FieldMap, FieldValue};
use crate::hyperopt::sheets::worksheet::Worksheet;
use crate::time_util;

/// 配置表的输入列名
pub const CFG_STRATEGY: &str = "Strategy";
pub const CFG_CONFIG: &str = "Config";
pub const CFG_EPOCHS: &str = "epochs";
pub const CFG_TIMERANGE: &str = "timerange";
pub const CFG_PAIRS: &str = "Pairs";
pub const CFG_LEVERAGE: &str = "Leverage";
pub const CFG_PCT_PER_TRADE: &str = "% per trade";
pub const CFG_SPACES: &str = "spaces";
pub const CFG_LOSS_FUNCTION: &str = "loss_function";
pub const CFG_JOBS: &str = "jobs";
pub const CFG_MIN_TRADES: &str = "min_trades";
pub const CFG_RANDOM_STATE: &str = "random_state";

/// 结果表的上下文列名
pub const COL_DATETIME: &str = "Date and Time";
pub const COL_RUN_NO: &str = "Run #";
pub const COL_STRATEGY: &str = "Strategy";
pub const COL_CONFIG: &str = "Config";
pub const COL_EPOCHS: &str = "Epochs";
pub const COL_RANDOM_STATE: &str = "random-state";
pub const COL_TIMERANGE: &str = "Timerange";
pub const COL_PAIRS: &str = "Pairs";
pub const COL_LOSS_FUNCTION: &str = "loss_function";
pub const COL_LEVERAGE: &str = "Leverage";
pub const COL_PCT_PER_TRADE: &str = "% per trade";

/// 显式关闭可选参数的哨兵值
const OFF_SENTINEL: &str = "OFF";

/// 一条运行请求
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    pub strategy: String,
    /// 空则用配置里的默认文件名
    pub config_filename: Option<String>,
    pub epochs: u32,
    pub timerange: String,
    pub pairs: Option<String>,
    pub leverage: Option<String>,
    pub percent_per_trade: Option<String>,
    pub spaces: Option<String>,
    pub loss_function: Option<String>,
    pub jobs: Option<u32>,
    pub min_trades: Option<u32>,
    /// 配置指定的随机种子；空则执行后从工具输出捕获
    pub random_state: Option<u64>,
    /// 配置表中的行号，表头行是第 1 行
    pub row_number: usize,
}

impl RunSpec {
    /// 重复行判定的键：策略、配置、轮数、时间范围，可选列不参与
    pub fn same_run_key(&self, other: &RunSpec) -> bool {
        self.strategy == other.strategy
            && self.config_filename == other.config_filename
            && self.epochs == other.epochs
            && self.timerange == other.timerange
    }

    /// 生成写入结果表的上下文字段，键与结果表表头同名
    ///
    /// 可选参数缺席时不入映射，对应单元格最终留空。
    pub fn to_field_map(
        &self,
        tool: &ToolSettings,
        run_number: i64,
        reported_random_state: Option<u64>,
    ) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert_text(COL_DATETIME, time_util::utc_now_display());
        fields.insert(COL_RUN_NO, FieldValue::Int(run_number));
        fields.insert_text(COL_STRATEGY, self.strategy.clone());
        fields.insert_text(
            COL_CONFIG,
            self.config_filename
                .clone()
                .unwrap_or_else(|| tool.default_config_filename.clone()),
        );
        fields.insert(COL_EPOCHS, FieldValue::Int(self.epochs as i64));
        if let Some(rs) = reported_random_state {
            fields.insert(COL_RANDOM_STATE, FieldValue::Int(rs as i64));
        }
        fields.insert_text(COL_TIMERANGE, self.timerange.clone());
        if let Some(pairs) = &self.pairs {
            fields.insert_text(COL_PAIRS, pairs.clone());
        }
        fields.insert_text(
            COL_LOSS_FUNCTION,
            self.loss_function
                .clone()
                .unwrap_or_else(|| tool.default_loss_function.clone()),
        );
        if let Some(leverage) = &self.leverage {
            fields.insert(COL_LEVERAGE, FieldValue::numeric_or_text(leverage));
        }
        if let Some(pct) = &self.percent_per_trade {
            fields.insert(COL_PCT_PER_TRADE, FieldValue::numeric_or_text(pct));
        }
        fields
    }
}

/// 配置表读取器
pub struct RunSpecModel {
    ws: Worksheet,
}

impl RunSpecModel {
    pub fn new(ws: Worksheet) -> RunSpecModel {
        RunSpecModel { ws }
    }

    /// 读取全部运行说明，远程表不可达或没有有效行即配置错误
    pub async fn read_specs(
        &self,
        required: &[String],
        policy: DuplicatePolicy,
    ) -> anyhow::Result<Vec<RunSpec>> {
        info!("读取配置表 '{}'", self.ws.title());
        let rows = self
            .ws
            .read_all()
            .await
            .map_err(|e| AppError::Config(format!("读取配置表失败: {}", e)))?;
        parse_specs(&rows, required, policy)
    }
}

/// 把工作表的原始行解析成运行说明
///
/// 表头行在最前；必填列为空、数字列不可解析的行跳过并告警，
/// 剩下一条有效行都没有时按配置错误处理。
pub fn parse_specs(
    rows: &[Vec<String>],
    required: &[String],
    policy: DuplicatePolicy,
) -> anyhow::Result<Vec<RunSpec>> {
    let Some((headers, data_rows)) = rows.split_first() else {
        return Err(AppError::Config("配置表为空".to_string()).into());
    };
    info!("配置表共 {} 行待处理", data_rows.len());

    let mut specs: Vec<RunSpec> = Vec::new();
    for (i, row) in data_rows.iter().enumerate() {
        let row_number = i + 2;
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let view = RowView { headers, row };

        if let Some(col) = required.iter().find(|col| view.get(col).is_none()) {
            warn!("跳过第 {} 行: 必填列 {} 为空", row_number, col);
            continue;
        }

        let (Some(strategy), Some(epochs_raw), Some(timerange)) = (
            view.get(CFG_STRATEGY),
            view.get(CFG_EPOCHS),
            view.get(CFG_TIMERANGE),
        ) else {
            warn!("跳过第 {} 行: 缺少策略/轮数/时间范围", row_number);
            continue;
        };
        let Ok(epochs) = epochs_raw.parse::<u32>() else {
            warn!("跳过第 {} 行: epochs 不是数字: {}", row_number, epochs_raw);
            continue;
        };

        let spec = RunSpec {
            strategy: strategy.to_string(),
            config_filename: view.get(CFG_CONFIG).map(str::to_string),
            epochs,
            timerange: timerange.to_string(),
            pairs: view.get(CFG_PAIRS).map(str::to_string),
            leverage: view.get(CFG_LEVERAGE).map(str::to_string),
            percent_per_trade: view.get(CFG_PCT_PER_TRADE).map(str::to_string),
            spaces: view.get_switchable(CFG_SPACES).map(str::to_string),
            loss_function: view.get_switchable(CFG_LOSS_FUNCTION).map(str::to_string),
            jobs: parse_optional_number(&view, CFG_JOBS, row_number),
            min_trades: parse_optional_number(&view, CFG_MIN_TRADES, row_number),
            random_state: parse_optional_number(&view, CFG_RANDOM_STATE, row_number),
            row_number,
        };

        if policy == DuplicatePolicy::SkipRepeats
            && specs.iter().any(|s| s.same_run_key(&spec))
        {
            warn!("跳过第 {} 行: 策略/配置/轮数/时间范围与先前行重复", row_number);
            continue;
        }
        specs.push(spec);
    }

    if specs.is_empty() {
        return Err(AppError::Config("配置表中没有有效的运行".to_string()).into());
    }
    info!("准备了 {} 条有效运行", specs.len());
    Ok(specs)
}

/// 单行取值视图：空白与 `#N/A` 一律视为缺省
struct RowView<'a> {
    headers: &'a [String],
    row: &'a [String],
}

impl<'a> RowView<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == name)?;
        let value = self.row.get(idx)?.trim();
        if value.is_empty() || value == "#N/A" {
            None
        } else {
            Some(value)
        }
    }

    /// 可开关的列：`OFF` 同样视为缺省
    fn get_switchable(&self, name: &str) -> Option<&'a str> {
        self.get(name).filter(|v| *v != OFF_SENTINEL)
    }
}

fn parse_optional_number<T: std::str::FromStr>(
    view: &RowView,
    name: &str,
    row_number: usize,
) -> Option<T> {
    let raw = view.get_switchable(name)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("第 {} 行: {} 不是数字, 按缺省处理: {}", row_number, name, raw);
            None
        }
    }
}
