//! 会话执行器：驱动容器里的外部优化工具
//!
//! 一次会话 = hyperopt 主进程 → 定位结果文件 → hyperopt-show 读取
//! 最优轮。工具吃满本机算力，严格串行，一次只跑一条。任何一步失败
//! 都按运行错误上报，由批次决定跳过。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use crate::app_config::settings::ToolSettings;
use crate::error::app_error::AppError;
use crate::hyperopt::extractor::show_output::{strip_ansi, Extractor};
use crate::hyperopt::model::run_spec::RunSpec;

/// 一次完整会话的产出
///
/// 主进程的控制台文本只在执行期间消费（种子捕获与空输出检查），
/// 抽取只认 hyperopt-show 的输出。
#[derive(Debug)]
pub struct SessionOutput {
    /// hyperopt-show 的控制台文本
    pub show_output: String,
    /// 工具落盘的结果文件
    pub result_file: PathBuf,
    /// 上报的随机种子：配置指定的优先，否则从输出捕获
    pub random_state: Option<u64>,
}

pub struct SessionRunner {
    settings: ToolSettings,
    extractor: Arc<Extractor>,
}

impl SessionRunner {
    pub fn new(settings: ToolSettings, extractor: Arc<Extractor>) -> SessionRunner {
        SessionRunner {
            settings,
            extractor,
        }
    }

    /// 组装 hyperopt 主命令的参数
    pub fn build_hyperopt_args(&self, spec: &RunSpec) -> Vec<String> {
        let tool = &self.settings;
        let config_filename = spec
            .config_filename
            .as_deref()
            .unwrap_or(&tool.default_config_filename);
        let loss_function = spec
            .loss_function
            .as_deref()
            .unwrap_or(&tool.default_loss_function);

        let mut args: Vec<String> = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!(
                "{}:{}",
                tool.host_user_data_path, tool.container_user_data_path
            ),
            tool.docker_image.clone(),
            "hyperopt".to_string(),
            "--config".to_string(),
            tool.container_config_path(config_filename),
            "--strategy".to_string(),
            spec.strategy.clone(),
            "--hyperopt-loss".to_string(),
            loss_function.to_string(),
            "--epochs".to_string(),
            spec.epochs.to_string(),
            "--timerange".to_string(),
            spec.timerange.clone(),
        ];
        if let Some(spaces) = &spec.spaces {
            args.push("--spaces".to_string());
            args.extend(spaces.split_whitespace().map(str::to_string));
        }
        args.push("-j".to_string());
        args.push(
            spec.jobs
                .map(|j| j.to_string())
                .unwrap_or_else(|| tool.default_job_workers.to_string()),
        );
        if let Some(min_trades) = spec.min_trades {
            args.push("--min-trades".to_string());
            args.push(min_trades.to_string());
        }
        if let Some(random_state) = spec.random_state {
            args.push("--random-state".to_string());
            args.push(random_state.to_string());
        }
        if let Some(pairs) = &spec.pairs {
            let pairs: Vec<String> = pairs
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if !pairs.is_empty() {
                args.push("--pairs".to_string());
                args.extend(pairs);
            }
        }
        args
    }

    /// 组装 hyperopt-show 命令的参数
    pub fn build_show_args(&self, spec: &RunSpec, result_file: &Path) -> Vec<String> {
        let tool = &self.settings;
        let config_filename = spec
            .config_filename
            .as_deref()
            .unwrap_or(&tool.default_config_filename);
        let result_basename = result_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!(
                "{}:{}",
                tool.host_user_data_path, tool.container_user_data_path
            ),
            tool.docker_image.clone(),
            "hyperopt-show".to_string(),
            "--config".to_string(),
            tool.container_config_path(config_filename),
            "--hyperopt-filename".to_string(),
            result_basename,
            "--best".to_string(),
            "-n".to_string(),
            "1".to_string(),
            "--no-color".to_string(),
        ]
    }

    /// 执行 hyperopt 主进程，边跑边把输出回显到控制台
    ///
    /// 返回去除 ANSI 后的全部输出，以及上报的随机种子。配置没有指定
    /// 种子时，从输出里捕获 optimizer 自己选的那个。
    pub async fn run_hyperopt(&self, spec: &RunSpec) -> anyhow::Result<(String, Option<u64>)> {
        let args = self.build_hyperopt_args(spec);
        info!("--- 运行 hyperopt: {} {} ---", self.settings.program, args.join(" "));

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::Run(format!("无法启动 {}: {}", self.settings.program, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Run("拿不到子进程的 stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Run("拿不到子进程的 stderr".to_string()))?;

        // stderr 另起任务回显并缓存，工具的日志多半走这边
        let stderr_task = tokio::spawn(async move {
            let mut buffer = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{}", line);
                buffer.push_str(&line);
                buffer.push('\n');
            }
            buffer
        });

        let mut output = String::new();
        let mut captured_state: Option<u64> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::Run(format!("读取子进程输出失败: {}", e)))?
        {
            println!("{}", line);
            let clean_line = strip_ansi(&line);
            if spec.random_state.is_none() && captured_state.is_none() {
                captured_state = self.extractor.capture_random_state(&clean_line);
                if let Some(rs) = captured_state {
                    info!("--- 捕获随机种子: {} ---", rs);
                }
            }
            output.push_str(&clean_line);
            output.push('\n');
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AppError::Run(format!("等待子进程失败: {}", e)))?;
        let stderr_output = strip_ansi(&stderr_task.await.unwrap_or_default());
        if spec.random_state.is_none() && captured_state.is_none() {
            captured_state = self.extractor.capture_random_state(&stderr_output);
        }
        let reported_state = spec.random_state.or(captured_state);

        if !status.success() {
            return Err(AppError::Run(format!(
                "hyperopt 进程退出异常 (code={:?})",
                status.code()
            ))
            .into());
        }
        if output.trim().is_empty() && stderr_output.trim().is_empty() {
            return Err(AppError::Run("hyperopt 没有产生任何输出".to_string()).into());
        }
        info!("--- hyperopt 进程完成 ---");
        Ok((output, reported_state))
    }

    /// 定位最新的结果文件 strategy_<名称>*.fthypt
    pub async fn find_latest_result_file(&self, strategy: &str) -> anyhow::Result<PathBuf> {
        // 等待工具把结果文件写完盘
        tokio::time::sleep(Duration::from_secs(self.settings.artifact_settle_secs)).await;

        let dir = self.settings.results_dir_host();
        let prefix = format!("strategy_{}", strategy);
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            AppError::Run(format!("结果目录不可读 {}: {}", dir.display(), e))
        })?;

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Run(format!("遍历结果目录失败: {}", e)))?
        {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if !(name.starts_with(&prefix) && name.ends_with(".fthypt")) {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, entry.path()));
            }
        }

        match newest {
            Some((_, path)) => {
                info!("找到结果文件: {}", path.display());
                Ok(path)
            }
            None => Err(AppError::Run(format!(
                "没有找到结果文件: {}/{}*.fthypt",
                dir.display(),
                prefix
            ))
            .into()),
        }
    }

    /// 执行 hyperopt-show 读取最优一轮的完整输出
    pub async fn run_hyperopt_show(
        &self,
        spec: &RunSpec,
        result_file: &Path,
    ) -> anyhow::Result<String> {
        let args = self.build_show_args(spec, result_file);
        info!("--- 运行 hyperopt-show: {} {} ---", self.settings.program, args.join(" "));

        let output = Command::new(&self.settings.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                AppError::Run(format!("无法启动 {}: {}", self.settings.program, e))
            })?;

        if !output.status.success() {
            let stderr_text = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Run(format!(
                "hyperopt-show 退出异常 (code={:?}): {}",
                output.status.code(),
                stderr_text.trim()
            ))
            .into());
        }
        let text = strip_ansi(&String::from_utf8_lossy(&output.stdout));
        if text.trim().is_empty() {
            return Err(AppError::Run("hyperopt-show 没有产生任何输出".to_string()).into());
        }
        info!("--- hyperopt-show 完成 ---");
        Ok(text)
    }

    /// 完整会话：主进程 → 结果文件 → hyperopt-show → 输出落盘
    pub async fn run_session(&self, spec: &RunSpec) -> anyhow::Result<SessionOutput> {
        let (_, random_state) = self.run_hyperopt(spec).await?;
        let result_file = self.find_latest_result_file(&spec.strategy).await?;
        let show_output = self.run_hyperopt_show(spec, &result_file).await?;
        self.dump_show_output(&show_output).await;
        Ok(SessionOutput {
            show_output,
            result_file,
            random_state,
        })
    }

    /// hyperopt-show 输出落盘备查，失败只告警不影响批次
    async fn dump_show_output(&self, text: &str) {
        let path = self.settings.show_output_file_host();
        match tokio::fs::write(&path, text).await {
            Ok(()) => info!("hyperopt-show 输出已保存: {}", path.display()),
            Err(e) => warn!("保存 hyperopt-show 输出失败 {}: {}", path.display(), e),
        }
    }
}
