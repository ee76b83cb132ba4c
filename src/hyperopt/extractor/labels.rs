//! 抽取标签配置
//!
//! 控制台文本解析本质上是对外部工具输出格式的字符串匹配，上游格式
//! 一变就会失配。所有定位文案都放在配置里，格式漂移时只改配置不改
//! 代码。

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::hyperopt::model::run_result;

/// TOTAL 合计行里各指标所在的列号（0 号列是行名）
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportColumns {
    pub trades: usize,
    pub avg_profit: usize,
    pub profit: usize,
    pub duration: usize,
}

impl Default for ReportColumns {
    fn default() -> Self {
        ReportColumns {
            trades: 1,
            avg_profit: 2,
            profit: 4,
            duration: 5,
        }
    }
}

/// 控制台文本里各指标的定位文案
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelConfig {
    /// 汇总表开始标记
    pub summary_section: String,
    /// 汇总表里的成交笔数行（取 `/` 前半段）
    pub summary_trades: String,
    /// 汇总表里的总收益行
    pub summary_profit: String,
    /// 汇总表里的回撤行
    pub summary_drawdown: String,
    /// 汇总表扫描的终止行
    pub summary_end: String,
    /// 报告表合计行的行名
    pub report_total: String,
    /// 合计行各指标的列号
    pub report_columns: ReportColumns,
    /// 买方参数块开始标记
    pub buy_params_marker: String,
    /// 卖方参数块开始标记
    pub sell_params_marker: String,
    /// 暂停收集参数的标记（之后可能还有参数块）
    pub params_pause_markers: Vec<String>,
    /// 终止收集参数的标记
    pub params_end_markers: Vec<String>,
    /// 捕获随机种子的正则，第一个分组必须是数字
    pub random_state_pattern: String,
    /// `标签: 值` 形式的直接标签，命中即按标签名入字段
    pub plain_labels: Vec<String>,
    /// 策略参数列 → 候选参数键
    ///
    /// 候选键默认先查买方块再查卖方块，`buy:` / `sell:` 前缀可以
    /// 把查找限定到单边。
    pub param_fields: BTreeMap<String, Vec<String>>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            summary_section: "SUMMARY METRICS".to_string(),
            summary_trades: "Total/Daily Avg Trades".to_string(),
            summary_profit: "Total profit %".to_string(),
            summary_drawdown: "Absolute Drawdown (Account)".to_string(),
            summary_end: "Market change".to_string(),
            report_total: "TOTAL".to_string(),
            report_columns: ReportColumns::default(),
            buy_params_marker: "# Buy hyperspace params:".to_string(),
            sell_params_marker: "# Sell hyperspace params:".to_string(),
            params_pause_markers: vec!["# ROI table:".to_string(), "# Stoploss:".to_string()],
            params_end_markers: vec![
                "# Trailing stop:".to_string(),
                "# Max Open Trades:".to_string(),
            ],
            random_state_pattern: r"optimizer random state:\s*(\d+)".to_string(),
            plain_labels: vec![
                run_result::COL_TRADES.to_string(),
                run_result::COL_WIN_PCT.to_string(),
                run_result::COL_AVG_PROFIT_PCT.to_string(),
                run_result::COL_PROFIT_PCT.to_string(),
                run_result::COL_DURATION_MIN.to_string(),
                run_result::COL_DRAWDOWN_PCT.to_string(),
            ],
            param_fields: BTreeMap::new(),
        }
    }
}
