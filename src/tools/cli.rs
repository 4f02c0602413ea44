//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use super::constants::defaults;
use crate::processing::Stage;
use clap::{Arg, ArgAction, Command, value_parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 输入事件文件（单文件模式）或扫描目录（批量模式）
    pub input_path: PathBuf,

    /// 流水线配置文件（JSON，可选）
    pub config_path: Option<PathBuf>,

    /// 缩放标定表文件（JSON，可选）
    pub scales_path: Option<PathBuf>,

    /// 运行的处理阶段
    pub stage: Stage,

    /// 输出路径：单文件模式为处理后事件文件，批量模式为批量报告
    pub output_path: Option<PathBuf>,

    /// 是否显示详细信息
    pub verbose: bool,

    /// 多文件并行度（None 表示串行）
    pub parallel_files: Option<usize>,

    /// 批量模式是否递归扫描子目录
    pub recursive: bool,
}

impl AppConfig {
    /// 智能判断是否为批量模式（基于路径类型）
    #[inline]
    pub fn is_batch_mode(&self) -> bool {
        self.input_path.is_dir()
    }
}

fn build_command() -> Command {
    Command::new("roi-tool")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("MicroBooNE Detector Systematics")
        .arg(
            Arg::new("INPUT")
                .help("事件文件 (JSON) 或包含事件文件的目录 / Event file or directory")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("流水线配置文件 (JSON) / Pipeline configuration file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("scales")
                .long("scales")
                .short('s')
                .help("缩放标定表文件 (JSON) / Scale calibration tables")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("stage")
                .long("stage")
                .help("运行的处理阶段 / Processing stage to run")
                .value_parser(["filter", "baseline", "modify", "all"])
                .default_value(defaults::STAGE),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出文件路径 / Output path")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parallel-files")
                .long("parallel-files")
                .help("多文件并行度 / Number of event files processed in parallel")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("禁用多文件并行 / Disable parallel file processing")
                .action(ArgAction::SetTrue)
                .conflicts_with("parallel-files"),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .help("递归扫描子目录 / Scan subdirectories")
                .action(ArgAction::SetTrue),
        )
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    parse_args_from(std::env::args_os())
}

/// 从给定参数列表解析（便于测试）
pub fn parse_args_from<I, T>(args: I) -> AppConfig
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().get_matches_from(args);

    let stage = matches
        .get_one::<String>("stage")
        .and_then(|s| s.parse::<Stage>().ok())
        .unwrap_or_default();

    let parallel_files = if matches.get_flag("serial") {
        None
    } else {
        Some(
            matches
                .get_one::<usize>("parallel-files")
                .copied()
                .unwrap_or(defaults::PARALLEL_FILES_DEGREE),
        )
    };

    AppConfig {
        input_path: matches
            .get_one::<String>("INPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        config_path: matches.get_one::<String>("config").map(PathBuf::from),
        scales_path: matches.get_one::<String>("scales").map(PathBuf::from),
        stage,
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        verbose: matches.get_flag("verbose"),
        parallel_files,
        recursive: matches.get_flag("recursive"),
    }
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("[INFO] uBooNE ROI Toolkit v{VERSION} 启动 / starting");
    println!("[INFO] {DESCRIPTION}");
    if config.verbose {
        println!("[INFO] 处理阶段 / Stage: {}", config.stage);
        match config.parallel_files {
            Some(degree) => println!("[INFO] 文件并行度 / File parallelism: {degree}"),
            None => println!("[INFO] 串行模式 / Serial mode"),
        }
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("[INFO] 所有任务处理完成 / All tasks completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse_args_from(["roi-tool", "events/"]);
        assert_eq!(config.input_path, PathBuf::from("events/"));
        assert_eq!(config.stage, Stage::All);
        assert_eq!(config.parallel_files, Some(4));
        assert!(!config.recursive);
        assert!(config.scales_path.is_none());
    }

    #[test]
    fn test_serial_and_stage() {
        let config = parse_args_from([
            "roi-tool",
            "evt.json",
            "--serial",
            "--stage",
            "modify",
            "--scales",
            "tables.json",
            "-v",
        ]);
        assert_eq!(config.parallel_files, None);
        assert_eq!(config.stage, Stage::Modify);
        assert_eq!(config.scales_path, Some(PathBuf::from("tables.json")));
        assert!(config.verbose);
    }
}
