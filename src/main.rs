//! uBooNE ROI Toolkit - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成事件处理任务。

use anyhow::Context;
use std::process;
use tracing_subscriber::EnvFilter;
use uboone_roi_toolkit::{
    error::{ErrorCategory, RoiError},
    processing::EventProcessor,
    tools::{self, AppConfig},
};

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 格式/输入错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 配置错误
    pub const CONFIG_ERROR: i32 = 3;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 4;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &RoiError) -> &'static str {
    match error {
        RoiError::InvalidInput(_) => {
            "检查事件文件中的ROI是否有序且互不重叠 / Check that ROIs are ordered and non-overlapping"
        }
        RoiError::ResourceError(_) => {
            "资源不可用，尝试 --serial 串行模式或降低并发度 / Resource unavailable, try --serial or reduce --parallel-files"
        }
        _ => match ErrorCategory::from_roi_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Format => {
                "确保输入为有效的 JSON 事件文件 / Ensure input is a valid JSON event file"
            }
            ErrorCategory::Config => {
                "检查 --config / --scales 文件中的参数 / Check parameters in --config / --scales files"
            }
            ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: RoiError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match &error {
        RoiError::InvalidInput(_) => exit_codes::FORMAT_ERROR,
        RoiError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        _ => match ErrorCategory::from_roi_error(&error) {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Config => exit_codes::CONFIG_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 初始化日志：RUST_LOG 优先，否则 info（--verbose 时 debug）
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("无法解析日志过滤器 / invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("日志初始化失败 / failed to initialize logging")
}

/// 批量处理事件文件
fn process_batch_mode(config: &AppConfig, processor: &EventProcessor) -> Result<(), RoiError> {
    let event_files = tools::scan_event_files(&config.input_path, config.recursive)?;
    tools::show_scan_results(config, &event_files);

    if event_files.is_empty() {
        return Ok(());
    }

    match config.parallel_files {
        None => tools::process_batch_serial(&event_files, config, processor),
        Some(degree) => {
            let actual_degree =
                tools::utils::effective_parallel_degree(degree, Some(event_files.len()));

            if actual_degree == 1 {
                if config.verbose {
                    println!("[INFO] 并发度为1，使用串行模式 / Parallelism=1, using serial mode");
                }
                tools::process_batch_serial(&event_files, config, processor)
            } else {
                tools::process_batch_parallel(&event_files, config, processor, actual_degree)
                    .or_else(|e| {
                        eprintln!("[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial");
                        tools::process_batch_serial(&event_files, config, processor)
                    })
            }
        }
    }
}

/// 应用程序主逻辑
fn run(config: &AppConfig) -> Result<(), RoiError> {
    tools::show_startup_info(config);

    let processor = tools::load_processor(config)?;

    if config.is_batch_mode() {
        process_batch_mode(config, &processor)?;
    } else {
        tools::process_single_event_file(config, &processor)?;
    }

    tools::show_completion_info(config);
    Ok(())
}

fn main() {
    let config = tools::parse_args();

    if let Err(e) = init_logging(config.verbose) {
        eprintln!("[WARNING] {e:#}");
    }

    if let Err(error) = run(&config) {
        handle_error(error);
    }
}
