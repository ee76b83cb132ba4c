#![allow(dead_code)]
#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(unused_mut)]
#![allow(unused_assignments)]
#![allow(unused_must_use)]

use anyhow::Result;
use dotenv::dotenv;

pub mod app_config;
pub mod error;
pub mod hyperopt;
pub mod time_util;

pub use crate::error::app_error::AppError;
pub use crate::hyperopt::model::field_map::{FieldMap, FieldValue};

/// 应用初始化
pub async fn app_init() -> Result<()> {
    env_logger::init();

    // 加载环境变量
    dotenv().ok();

    // 设置日志
    app_config::log::setup_logging().await?;

    Ok(())
}
