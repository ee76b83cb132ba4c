//! hyperopt-show 控制台输出解析
//!
//! 窄接口：原始文本进，字段映射出。解析策略要换（比如改读 JSON
//! 产物）时只动这个文件。

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::app_error::AppError;
use crate::hyperopt::extractor::labels::LabelConfig;
use crate::hyperopt::model::field_map::{FieldMap, FieldValue};
use crate::hyperopt::model::run_result;
use crate::time_util;

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").unwrap());

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// 参数行形如 `"ema_1d_1": 17,`
static PARAM_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"([^"]+)"\s*:\s*(.+?),?\s*$"#).unwrap());

/// 去除 ANSI 控制序列
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// 结果抽取器
pub struct Extractor {
    labels: LabelConfig,
    random_state_re: Regex,
}

impl Extractor {
    pub fn new(labels: LabelConfig) -> anyhow::Result<Extractor> {
        let random_state_re = RegexBuilder::new(&labels.random_state_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::Config(format!("随机种子正则无效: {}", e)))?;
        Ok(Extractor {
            labels,
            random_state_re,
        })
    }

    /// 从一段输出里捕获 optimizer 的随机种子
    pub fn capture_random_state(&self, text: &str) -> Option<u64> {
        self.random_state_re
            .captures(text)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }

    /// 控制台文本 → 字段映射
    ///
    /// 命中不了的标签直接缺席，不报错。`result_file` 只作来源记录。
    pub fn extract(&self, console_text: &str, result_file: Option<&Path>) -> FieldMap {
        let text = strip_ansi(console_text);
        let mut fields = FieldMap::new();

        // 报告表在汇总表之后解析，同名字段以报告表合计行为准
        self.extract_hyperspace_params(&text, &mut fields);
        self.extract_summary_metrics(&text, &mut fields);
        self.extract_report_total(&text, &mut fields);
        self.extract_plain_labels(&text, &mut fields);

        if fields.is_empty() {
            warn!(
                "控制台文本没有命中任何标签, result_file={:?}",
                result_file.map(|p| p.display().to_string())
            );
        } else {
            debug!(
                "抽取到 {} 个字段, result_file={:?}",
                fields.len(),
                result_file.map(|p| p.display().to_string())
            );
        }
        fields
    }

    /// SUMMARY METRICS 汇总表
    fn extract_summary_metrics(&self, text: &str, out: &mut FieldMap) {
        let mut in_summary = false;
        let mut summary_found = false;
        for line in text.lines() {
            let stripped = line.trim();
            if stripped.contains(&self.labels.summary_section) {
                in_summary = true;
                continue;
            }
            if !in_summary || stripped.len() < 5 {
                continue;
            }
            let parts = split_table_row(stripped);
            if parts.len() < 2 {
                continue;
            }
            let (name, value) = (parts[0], parts[parts.len() - 1]);
            summary_found = true;
            if name.contains(&self.labels.summary_trades) {
                let trades = value.split('/').next().unwrap_or("").trim();
                out.insert(run_result::COL_TRADES, FieldValue::numeric_or_text(trades));
            } else if name.contains(&self.labels.summary_profit) {
                out.insert(run_result::COL_PROFIT_PCT, FieldValue::numeric_or_text(value));
            } else if name.contains(&self.labels.summary_drawdown) {
                out.insert(run_result::COL_DRAWDOWN_PCT, FieldValue::numeric_or_text(value));
            } else if name.contains(&self.labels.summary_end) {
                break;
            }
        }
        if in_summary && !summary_found {
            debug!("{} 表没有可解析的行", self.labels.summary_section);
        }
    }

    /// 报告表的 TOTAL 合计行，窄终端下表格折行时取续行收尾
    fn extract_report_total(&self, text: &str, out: &mut FieldMap) {
        let lines: Vec<&str> = text.lines().collect();
        let total_prefix = format!("│ {}", self.labels.report_total);
        let rc = &self.labels.report_columns;
        let mut i = 0;
        while i < lines.len() {
            let stripped = lines[i].trim();
            if !(stripped.starts_with('│') && stripped.contains(&self.labels.report_total)) {
                i += 1;
                continue;
            }
            let mut row_lines = vec![stripped];
            let mut j = i + 1;
            while j < lines.len() {
                let s = lines[j].trim();
                if s.starts_with('│') && !s.starts_with(&total_prefix) {
                    row_lines.push(s);
                    j += 1;
                } else {
                    break;
                }
            }
            let fields = split_table_row(row_lines[0]);
            let win_raw = if row_lines.len() > 1 {
                let last_fields = split_table_row(row_lines[row_lines.len() - 1]);
                last_fields.last().or_else(|| fields.last()).copied()
            } else {
                fields.last().copied()
            };

            if let Some(v) = fields.get(rc.trades) {
                out.insert(run_result::COL_TRADES, FieldValue::numeric_or_text(v));
            }
            if let Some(v) = fields.get(rc.avg_profit) {
                out.insert(run_result::COL_AVG_PROFIT_PCT, FieldValue::numeric_or_text(v));
            }
            if let Some(v) = fields.get(rc.profit) {
                out.insert(run_result::COL_PROFIT_PCT, FieldValue::numeric_or_text(v));
            }
            if let Some(v) = fields.get(rc.duration) {
                match time_util::duration_to_minutes(v) {
                    Some(mins) => out.insert(run_result::COL_DURATION_MIN, FieldValue::Int(mins)),
                    None => debug!("合计行的持续时间不可解析: {}", v),
                }
            }
            if let Some(win) = win_raw {
                out.insert(run_result::COL_WIN_PCT, parse_win_cell(win));
            }
            return;
        }
        debug!("报告表中没有 {} 合计行", self.labels.report_total);
    }

    /// 参数块：`# Buy hyperspace params:` 与 `# Sell hyperspace params:`
    fn extract_hyperspace_params(&self, text: &str, out: &mut FieldMap) {
        let lines: Vec<&str> = text.lines().collect();
        // 多轮输出时从最后一个买方标记开始
        let Some(start) = lines
            .iter()
            .rposition(|l| l.trim().contains(&self.labels.buy_params_marker))
        else {
            debug!("没有找到参数块标记");
            return;
        };

        let mut buy_params: HashMap<String, FieldValue> = HashMap::new();
        let mut sell_params: HashMap<String, FieldValue> = HashMap::new();
        let mut in_buy = false;
        let mut in_sell = false;
        for line in &lines[start..] {
            let stripped = line.trim();
            if stripped.contains(&self.labels.buy_params_marker) {
                in_buy = true;
                in_sell = false;
                continue;
            }
            if stripped.contains(&self.labels.sell_params_marker) {
                in_buy = false;
                in_sell = true;
                continue;
            }
            if self
                .labels
                .params_pause_markers
                .iter()
                .any(|m| stripped.starts_with(m.as_str()))
            {
                in_buy = false;
                in_sell = false;
                continue;
            }
            if self
                .labels
                .params_end_markers
                .iter()
                .any(|m| stripped.starts_with(m.as_str()))
            {
                break;
            }
            if (in_buy || in_sell) && stripped.starts_with('"') {
                if let Some(caps) = PARAM_LINE.captures(stripped) {
                    let key = caps[1].to_string();
                    let value = parse_param_value(&caps[2]);
                    if in_buy {
                        buy_params.insert(key, value);
                    } else {
                        sell_params.insert(key, value);
                    }
                }
            }
        }

        for (header, candidates) in &self.labels.param_fields {
            for candidate in candidates {
                let found = match candidate.split_once(':') {
                    Some(("buy", key)) => buy_params.get(key),
                    Some(("sell", key)) => sell_params.get(key),
                    _ => buy_params
                        .get(candidate.as_str())
                        .or_else(|| sell_params.get(candidate.as_str())),
                };
                if let Some(v) = found {
                    out.insert(header.clone(), v.clone());
                    break;
                }
            }
        }
    }

    /// `标签: 值` 形式的直接标签，只补表格没给出的字段
    ///
    /// 长标签优先匹配，避免 `Profit %` 抢走 `Avg. Profit %` 的行。
    fn extract_plain_labels(&self, text: &str, out: &mut FieldMap) {
        let mut names: Vec<&String> = self.labels.plain_labels.iter().collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        for line in text.lines() {
            let mut claimed: Vec<(usize, usize)> = Vec::new();
            for name in &names {
                let Some(pos) = line.find(name.as_str()) else {
                    continue;
                };
                let end = pos + name.len();
                if claimed.iter().any(|(s, e)| pos < *e && end > *s) {
                    continue;
                }
                claimed.push((pos, end));
                if out.contains(name) {
                    continue;
                }
                let Some(rest) = line[end..].trim_start().strip_prefix(':') else {
                    continue;
                };
                let value = MULTI_SPACE.split(rest.trim()).next().unwrap_or("").trim();
                if !value.is_empty() {
                    out.insert(name.to_string(), FieldValue::numeric_or_text(value));
                }
            }
        }
    }
}

/// 表格行按 `│` 切分，没有竖线时按连续两个以上空格切分
fn split_table_row(line: &str) -> Vec<&str> {
    if line.contains('│') {
        line.split('│')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        MULTI_SPACE
            .split(line)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// 胜率单元格可能是 `Win Draw Loss Win%` 的合排，取最后一个数
fn parse_win_cell(raw: &str) -> FieldValue {
    let last_token = raw.split_whitespace().last().unwrap_or(raw);
    FieldValue::numeric_or_text(last_token)
}

/// 参数值：带引号的还原成文本，其余尽量数值化
fn parse_param_value(raw: &str) -> FieldValue {
    let v = raw.trim().trim_end_matches(',').trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        return FieldValue::Text(v[1..v.len() - 1].to_string());
    }
    FieldValue::numeric_or_text(v)
}
