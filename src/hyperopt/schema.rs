//! 列结构：结果表的有序表头定义
//!
//! 表头分三段拼接：行首的上下文列、按策略附加的参数列、行尾的指标列。
//! 表头文本必须与远程表的表头行逐字一致，大小写敏感，否则字段会
//! 静默落空。

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::app_error::AppError;
use crate::hyperopt::model::field_map::{FieldMap, FieldValue};

/// 结果表的列结构
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSchema {
    /// 上下文列（运行批次信息，固定在行首）
    pub context: Vec<String>,
    /// 指标列（回测结果，固定在行尾）
    pub metrics: Vec<String>,
    /// 策略参数列，按策略名追加在上下文列之后
    #[serde(default)]
    pub strategy_params: BTreeMap<String, Vec<String>>,
}

impl ColumnSchema {
    /// 指定策略的完整有序表头
    pub fn headers_for(&self, strategy: &str) -> Vec<String> {
        let mut headers = self.context.clone();
        if let Some(params) = self.strategy_params.get(strategy) {
            headers.extend(params.iter().cloned());
        } else {
            debug!("策略 {} 没有配置参数列", strategy);
        }
        headers.extend(self.metrics.iter().cloned());
        headers
    }

    /// 按表头顺序对齐字段，缺失的字段留空
    pub fn map_row(&self, strategy: &str, fields: &FieldMap) -> MappedRow {
        let headers = self.headers_for(strategy);
        let cells = align_to_headers(&headers, fields);
        MappedRow { headers, cells }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.context.is_empty() {
            return Err(AppError::Config("columns.context 不能为空".to_string()).into());
        }
        if self.metrics.is_empty() {
            return Err(AppError::Config("columns.metrics 不能为空".to_string()).into());
        }
        if let Some(h) = find_duplicate(self.context.iter().chain(self.metrics.iter())) {
            return Err(AppError::Config(format!("表头重复: {}", h)).into());
        }
        for (strategy, params) in &self.strategy_params {
            let all = self
                .context
                .iter()
                .chain(params.iter())
                .chain(self.metrics.iter());
            if let Some(h) = find_duplicate(all) {
                return Err(
                    AppError::Config(format!("策略 {} 的表头重复: {}", strategy, h)).into(),
                );
            }
        }
        Ok(())
    }
}

/// 映射后的结果行：表头与单元格一一对应
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub headers: Vec<String>,
    pub cells: Vec<FieldValue>,
}

impl MappedRow {
    /// 按表头名取单元格
    pub fn get(&self, header: &str) -> Option<&FieldValue> {
        let idx = self.headers.iter().position(|h| h == header)?;
        self.cells.get(idx)
    }

    /// 按远程表实际的表头行重排单元格
    ///
    /// 远程表缺少的映射字段被丢弃，远程表多出的表头留空，
    /// 这样部署侧调整列顺序不需要改代码。
    pub fn align_to(&self, live_headers: &[String]) -> Vec<FieldValue> {
        if live_headers == self.headers.as_slice() {
            return self.cells.clone();
        }
        for h in &self.headers {
            if !live_headers.contains(h) {
                debug!("结果表没有列 {}，该字段被丢弃", h);
            }
        }
        live_headers
            .iter()
            .map(|h| self.get(h).cloned().unwrap_or_else(FieldValue::blank))
            .collect()
    }
}

/// 对齐核心：每个表头按名字精确查找，缺失留空
pub fn align_to_headers(headers: &[String], fields: &FieldMap) -> Vec<FieldValue> {
    headers
        .iter()
        .map(|h| fields.get(h).cloned().unwrap_or_else(FieldValue::blank))
        .collect()
}

fn find_duplicate<'a, I>(headers: I) -> Option<&'a String>
where
    I: Iterator<Item = &'a String>,
{
    let mut seen = std::collections::HashSet::new();
    headers.into_iter().find(|h| !seen.insert(*h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> ColumnSchema {
        let mut strategy_params = BTreeMap::new();
        strategy_params.insert(
            "SampleStrategy".to_string(),
            vec!["EMA_1D_1".to_string(), "EMA_1D_2".to_string()],
        );
        ColumnSchema {
            context: vec!["Run #".to_string(), "Strategy".to_string()],
            metrics: vec!["Trades #".to_string(), "Profit %".to_string()],
            strategy_params,
        }
    }

    #[test]
    fn headers_splice_strategy_params_in_the_middle() {
        let schema = sample_schema();
        assert_eq!(
            schema.headers_for("SampleStrategy"),
            vec!["Run #", "Strategy", "EMA_1D_1", "EMA_1D_2", "Trades #", "Profit %"]
        );
        // 未配置参数列的策略只有上下文列和指标列
        assert_eq!(
            schema.headers_for("OtherStrategy"),
            vec!["Run #", "Strategy", "Trades #", "Profit %"]
        );
    }

    #[test]
    fn validate_rejects_duplicate_headers() {
        let mut schema = sample_schema();
        schema
            .strategy_params
            .insert("BadStrategy".to_string(), vec!["Run #".to_string()]);
        assert!(schema.validate().is_err());
    }
}
