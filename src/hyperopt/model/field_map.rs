//! 字段映射：名称→值的显式查找表
//!
//! 抽取结果与运行参数统一放进这里，缺失的键返回 None 而不是报错，
//! 下游按表头名逐个取值。

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// 单元格值：整数、浮点或原始文本
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// 按数值解析字符串，百分号后缀先截掉；无法解析返回 None
    pub fn parse_numeric(raw: &str) -> Option<FieldValue> {
        let s = raw.trim().trim_end_matches('%').trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(v) = s.parse::<i64>() {
            return Some(FieldValue::Int(v));
        }
        s.parse::<f64>().ok().map(FieldValue::Float)
    }

    /// 尽量数值化，解析失败时保留原始文本
    pub fn numeric_or_text(raw: &str) -> FieldValue {
        Self::parse_numeric(raw).unwrap_or_else(|| FieldValue::Text(raw.trim().to_string()))
    }

    /// 空白单元格
    pub fn blank() -> FieldValue {
        FieldValue::Text(String::new())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// 转成 Sheets 请求体里的 JSON 单元格
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Int(v) => Value::from(*v),
            FieldValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(v.to_string())),
            FieldValue::Text(v) => Value::String(v.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// 字段名→值的平面映射
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    inner: HashMap<String, FieldValue>,
}

impl FieldMap {
    pub fn new() -> FieldMap {
        FieldMap {
            inner: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.inner.insert(name.into(), value);
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(name.into(), FieldValue::Text(value.into()));
    }

    /// 缺失键返回 None
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// 合并另一张映射，键冲突时以 other 为准
    pub fn merge(&mut self, other: FieldMap) {
        self.inner.extend(other.inner);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_handles_percent_suffix() {
        assert_eq!(FieldValue::parse_numeric("42"), Some(FieldValue::Int(42)));
        assert_eq!(
            FieldValue::parse_numeric("-3.1%"),
            Some(FieldValue::Float(-3.1))
        );
        assert_eq!(FieldValue::parse_numeric("  7 % "), Some(FieldValue::Int(7)));
        assert_eq!(FieldValue::parse_numeric(""), None);
        assert_eq!(FieldValue::parse_numeric("N/A"), None);
    }

    #[test]
    fn numeric_or_text_keeps_raw_text() {
        assert_eq!(
            FieldValue::numeric_or_text("SampleStrategy"),
            FieldValue::Text("SampleStrategy".to_string())
        );
        assert_eq!(FieldValue::numeric_or_text("51.2%"), FieldValue::Float(51.2));
    }
}
