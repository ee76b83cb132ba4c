//! 本地配置文件加载
//!
//! 启动时读取一份 JSON 配置，内容包括两张远程表的定位信息、
//! 外部优化工具的调用参数，以及结果表的列结构与文本抽取标签。

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::app_error::AppError;
use crate::hyperopt::extractor::labels::LabelConfig;
use crate::hyperopt::schema::ColumnSchema;

/// 同一组运行参数在配置表中出现多次时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 每一行都执行，重复也照跑
    RunAll,
    /// 跳过策略、配置、轮数、时间范围与先前行重复的行
    SkipRepeats,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::RunAll
    }
}

/// 外部优化工具（docker 内 freqtrade）的调用配置
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    /// 容器运行时可执行文件，支持换成 podman 等兼容实现
    #[serde(default = "default_program")]
    pub program: String,
    pub docker_image: String,
    /// 宿主机上 user_data 目录
    pub host_user_data_path: String,
    /// 容器内 user_data 挂载点
    pub container_user_data_path: String,
    #[serde(default = "default_config_filename")]
    pub default_config_filename: String,
    #[serde(default = "default_loss_function")]
    pub default_loss_function: String,
    /// -j 并行 worker 数，-1 表示用满所有核
    #[serde(default = "default_job_workers")]
    pub default_job_workers: i32,
    /// 结果文件目录，相对于 user_data
    #[serde(default = "default_results_dir")]
    pub hyperopt_results_dir: String,
    /// hyperopt-show 输出落盘文件，相对于 user_data
    #[serde(default = "default_show_output_file")]
    pub hyperopt_show_output_file: String,
    /// 主进程结束后等待结果文件写盘的秒数
    #[serde(default = "default_artifact_settle_secs")]
    pub artifact_settle_secs: u64,
}

impl ToolSettings {
    /// 宿主机上的结果文件目录
    pub fn results_dir_host(&self) -> PathBuf {
        Path::new(&self.host_user_data_path).join(&self.hyperopt_results_dir)
    }

    /// 宿主机上 hyperopt-show 输出的落盘路径
    pub fn show_output_file_host(&self) -> PathBuf {
        Path::new(&self.host_user_data_path).join(&self.hyperopt_show_output_file)
    }

    /// 容器内的配置文件路径
    pub fn container_config_path(&self, config_filename: &str) -> String {
        format!(
            "{}/{}",
            self.container_user_data_path.trim_end_matches('/'),
            config_filename.trim_start_matches('/')
        )
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub results_spreadsheet_id: String,
    pub results_worksheet_name: String,
    pub config_spreadsheet_id: String,
    pub config_worksheet_name: String,
    /// 存放 Google Sheets 访问令牌的环境变量名
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
    pub tool: ToolSettings,
    pub columns: ColumnSchema,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// 配置表中必填的列，任一为空则该行跳过
    #[serde(default = "default_required_run_columns")]
    pub required_run_columns: Vec<String>,
}

impl Settings {
    /// 从本地 JSON 文件加载并校验配置
    pub fn load(path: &Path) -> anyhow::Result<Settings> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("配置文件不可读 {}: {}", path.display(), e))
        })?;
        let settings: Settings = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("配置文件解析失败 {}: {}", path.display(), e)))?;
        settings.validate()?;
        info!("已加载配置文件: {}", path.display());
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let non_empty = [
            ("results_spreadsheet_id", &self.results_spreadsheet_id),
            ("results_worksheet_name", &self.results_worksheet_name),
            ("config_spreadsheet_id", &self.config_spreadsheet_id),
            ("config_worksheet_name", &self.config_worksheet_name),
            ("access_token_env", &self.access_token_env),
            ("tool.program", &self.tool.program),
            ("tool.docker_image", &self.tool.docker_image),
            ("tool.host_user_data_path", &self.tool.host_user_data_path),
            ("tool.container_user_data_path", &self.tool.container_user_data_path),
        ];
        for (name, value) in non_empty {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("配置项 {} 不能为空", name)).into());
            }
        }
        if self.required_run_columns.is_empty() {
            return Err(AppError::Config("required_run_columns 不能为空".to_string()).into());
        }
        self.columns.validate()?;
        Ok(())
    }
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_config_filename() -> String {
    "config.json".to_string()
}

fn default_loss_function() -> String {
    "ShortTradeDurHyperOptLoss".to_string()
}

fn default_job_workers() -> i32 {
    -1
}

fn default_results_dir() -> String {
    "hyperopt_results".to_string()
}

fn default_show_output_file() -> String {
    "hyperopt_show_output.txt".to_string()
}

fn default_artifact_settle_secs() -> u64 {
    5
}

fn default_access_token_env() -> String {
    "GSHEET_ACCESS_TOKEN".to_string()
}

fn default_required_run_columns() -> Vec<String> {
    vec![
        "epochs".to_string(),
        "timerange".to_string(),
        "Strategy".to_string(),
    ]
}
