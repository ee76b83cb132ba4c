//! 工作表句柄：绑定 spreadsheet id 与页签名的读写入口
//!
//! 批次开始时构建一次，贯穿整个批次传递使用。

use serde_json::Value;

use crate::hyperopt::sheets::sheet_client::{AppendResult, SheetClient, ValueRange};

pub struct Worksheet {
    client: SheetClient,
    spreadsheet_id: String,
    title: String,
}

impl Worksheet {
    pub fn new(
        client: SheetClient,
        spreadsheet_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Worksheet {
        Worksheet {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// 整表读取，含表头行；行尾的空单元格接口可能不返回
    pub async fn read_all(&self) -> anyhow::Result<Vec<Vec<String>>> {
        let range = format!("'{}'", self.title);
        let value_range = self.client.get_values(&self.spreadsheet_id, &range).await?;
        Ok(value_range
            .values
            .iter()
            .map(|row| row.iter().map(json_cell_to_string).collect())
            .collect())
    }

    /// 表头行
    pub async fn header_row(&self) -> anyhow::Result<Vec<String>> {
        let range = format!("'{}'!1:1", self.title);
        let value_range = self.client.get_values(&self.spreadsheet_id, &range).await?;
        Ok(value_range
            .values
            .first()
            .map(|row| row.iter().map(json_cell_to_string).collect())
            .unwrap_or_default())
    }

    /// 按表头名读一整列（不含表头单元格）
    pub async fn column_by_header(&self, header: &str) -> anyhow::Result<Vec<String>> {
        let headers = self.header_row().await?;
        let Some(idx) = headers.iter().position(|h| h == header) else {
            return Ok(Vec::new());
        };
        let letter = column_letter(idx);
        let range = format!("'{}'!{}2:{}", self.title, letter, letter);
        let value_range = self.client.get_values(&self.spreadsheet_id, &range).await?;
        Ok(value_range
            .values
            .iter()
            .filter_map(|row| row.first().map(json_cell_to_string))
            .collect())
    }

    /// 追加一行到表尾
    pub async fn append_row(&self, cells: Vec<Value>) -> anyhow::Result<AppendResult> {
        let range = format!("'{}'", self.title);
        let value_range = ValueRange {
            range: None,
            major_dimension: Some("ROWS".to_string()),
            values: vec![cells],
        };
        self.client
            .append_values(&self.spreadsheet_id, &range, &value_range)
            .await
    }
}

/// 0 起始的列号转 A1 记法的列字母（0→A, 25→Z, 26→AA）
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

/// 接口返回的单元格可能是字符串、数字或布尔
pub fn json_cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
