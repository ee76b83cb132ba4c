use thiserror::Error;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误（本地配置或远程配置表不可用，启动阶段即终止）
    #[error("配置错误: {0}")]
    Config(String),

    /// 运行错误（子进程失败或输出不可用，跳过该条运行，批次继续）
    #[error("运行错误: {0}")]
    Run(String),

    /// 写入错误（结果表拒绝追加，该条结果丢失，需人工重跑）
    #[error("写入错误: {0}")]
    Write(String),

    /// Sheets API错误
    #[error("Sheets API错误: {0}")]
    SheetsApi(String),
}
