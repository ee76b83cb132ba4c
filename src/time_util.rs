use chrono::Utc;

/// 当前UTC时间的展示字符串，写入结果表的 "Date and Time" 列
pub fn utc_now_display() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// 把 "H:MM:SS" 或 "MM:SS" 形式的持续时间换算成整分钟
///
/// 恰逢半分钟时向偶数取整。
pub fn duration_to_minutes(duration_str: &str) -> Option<i64> {
    let parts: Vec<i64> = duration_str
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [h, m, s] => {
            Some((*h as f64 * 60.0 + *m as f64 + *s as f64 / 60.0).round_ties_even() as i64)
        }
        [m, s] => Some((*m as f64 + *s as f64 / 60.0).round_ties_even() as i64),
        _ => None,
    }
}
