//! Google Sheets v4 REST 客户端
//!
//! 只用到 values 接口的读与追加，鉴权走 Bearer 访问令牌，
//! 令牌从环境变量里取。

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_config::env::env_required;
use crate::error::app_error::AppError;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// values 接口的读写载荷
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(rename = "majorDimension", skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// append 接口返回的更新信息
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppendResult {
    #[serde(default)]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: Option<UpdateSummary>,
}

impl AppendResult {
    /// 实际写入的区间，接口没返回时为 "?"
    pub fn updated_range(&self) -> &str {
        self.updates
            .as_ref()
            .and_then(|u| u.updated_range.as_deref())
            .unwrap_or("?")
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
    #[serde(default)]
    pub updated_columns: Option<u32>,
    #[serde(default)]
    pub updated_cells: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Deserialize, Debug)]
struct ErrorInfo {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Sheets 客户端，reqwest 内部自带连接池，可随意克隆
#[derive(Clone)]
pub struct SheetClient {
    client: Client,
    access_token: String,
}

impl SheetClient {
    fn new(access_token: String) -> SheetClient {
        SheetClient {
            client: Client::new(),
            access_token,
        }
    }

    /// 从环境变量读取访问令牌并构建客户端
    pub fn from_env(token_env: &str) -> anyhow::Result<SheetClient> {
        let access_token = env_required(token_env)?;
        Ok(SheetClient::new(access_token))
    }

    pub(crate) async fn send_request<T: for<'a> Deserialize<'a>>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<String>,
    ) -> anyhow::Result<T> {
        let url = format!("{}{}", SHEETS_API_BASE, path_and_query);
        let mut request_builder = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request_builder = request_builder.body(body);
        }

        let response = request_builder.send().await?;
        let status_code = response.status();
        let response_body = response.text().await?;
        debug!("path:{}, sheets_response: {}", path_and_query, response_body);

        if status_code == StatusCode::OK {
            let result: T = serde_json::from_str(&response_body)?;
            Ok(result)
        } else {
            match serde_json::from_str::<ErrorBody>(&response_body) {
                Ok(eb) => Err(AppError::SheetsApi(format!(
                    "{} {} ({})",
                    eb.error.status, eb.error.message, eb.error.code
                ))
                .into()),
                Err(_) => Err(AppError::SheetsApi(format!(
                    "HTTP {}: {}",
                    status_code, response_body
                ))
                .into()),
            }
        }
    }

    /// 读取区间的值
    pub async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> anyhow::Result<ValueRange> {
        let path = format!("/{}/values/{}", spreadsheet_id, encode_range(range));
        self.send_request(Method::GET, &path, None).await
    }

    /// 追加行，USER_ENTERED 让表格按用户输入解释单元格
    pub async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &ValueRange,
    ) -> anyhow::Result<AppendResult> {
        let path = format!(
            "/{}/values/{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            spreadsheet_id,
            encode_range(range)
        );
        let body = serde_json::to_string(values)?;
        self.send_request(Method::POST, &path, Some(body)).await
    }
}

/// 区间文本按路径段做百分号编码，工作表名里的空格和中文都要处理
pub fn encode_range(range: &str) -> String {
    let mut encoded = String::with_capacity(range.len());
    for byte in range.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'!' | b'\''
            | b':' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
