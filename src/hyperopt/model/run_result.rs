//! 运行结果：单次优化会话产出的指标汇总

use crate::hyperopt::model::field_map::{FieldMap, FieldValue};

/// 结果表指标列的规范列名
pub const COL_TRADES: &str = "Trades #";
pub const COL_WIN_PCT: &str = "% Win";
pub const COL_AVG_PROFIT_PCT: &str = "Avg. Profit %";
pub const COL_PROFIT_PCT: &str = "Profit %";
pub const COL_DURATION_MIN: &str = "Duration min";
pub const COL_DRAWDOWN_PCT: &str = "DrawDown %";

/// 单次会话的指标，缺失即 None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub trades: Option<i64>,
    pub win_percent: Option<f64>,
    pub avg_profit_percent: Option<f64>,
    pub total_profit_percent: Option<f64>,
    pub duration_minutes: Option<i64>,
    pub drawdown_percent: Option<f64>,
}

impl RunResult {
    /// 从抽取字段中收集指标
    pub fn from_fields(fields: &FieldMap) -> RunResult {
        RunResult {
            trades: fields.get(COL_TRADES).and_then(FieldValue::as_i64),
            win_percent: fields.get(COL_WIN_PCT).and_then(FieldValue::as_f64),
            avg_profit_percent: fields.get(COL_AVG_PROFIT_PCT).and_then(FieldValue::as_f64),
            total_profit_percent: fields.get(COL_PROFIT_PCT).and_then(FieldValue::as_f64),
            duration_minutes: fields.get(COL_DURATION_MIN).and_then(FieldValue::as_i64),
            drawdown_percent: fields.get(COL_DRAWDOWN_PCT).and_then(FieldValue::as_f64),
        }
    }

    /// 六个指标一个都没抽到
    pub fn is_empty(&self) -> bool {
        self.trades.is_none()
            && self.win_percent.is_none()
            && self.avg_profit_percent.is_none()
            && self.total_profit_percent.is_none()
            && self.duration_minutes.is_none()
            && self.drawdown_percent.is_none()
    }
}
