//! 文件扫描模块
//!
//! 负责扫描目录中的事件文件，以及批量报告的头部、尾部和输出路径。

use super::batch_state::{BatchStatsSnapshot, ErrorStats};
use super::cli::AppConfig;
use super::constants::{app_info, files};
use super::utils;
use crate::error::{RoiError, RoiResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 是否为待处理的事件文件（跳过本工具生成的输出）
fn is_event_file(path: &Path) -> bool {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(files::EVENT_EXTENSION))
        .unwrap_or(false);
    is_json && !utils::extract_file_stem(path).ends_with(files::PROCESSED_SUFFIX)
}

/// 扫描目录中的事件文件（按路径排序）
pub fn scan_event_files(dir_path: &Path, recursive: bool) -> RoiResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(RoiError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(RoiError::InvalidInput(format!(
            "路径不是目录: {}",
            dir_path.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut event_files = Vec::new();
    for entry in WalkDir::new(dir_path).max_depth(max_depth) {
        let entry = entry.map_err(|e| {
            RoiError::IoError(std::io::Error::other(format!("目录遍历失败: {e}")))
        })?;
        if entry.file_type().is_file() && is_event_file(entry.path()) {
            event_files.push(entry.into_path());
        }
    }

    event_files.sort();
    Ok(event_files)
}

/// 显示文件扫描结果
pub fn show_scan_results(config: &AppConfig, event_files: &[PathBuf]) {
    if event_files.is_empty() {
        println!(
            "[WARNING] 目录中没有找到事件文件 / No event files found in {}",
            config.input_path.display()
        );
        return;
    }

    println!("[INFO] 扫描目录 / Scanning: {}", config.input_path.display());
    println!("[INFO] 找到 {} 个事件文件 / event files found", event_files.len());

    if config.verbose {
        for (i, file) in event_files.iter().enumerate() {
            println!("   {}. {}", i + 1, utils::extract_filename_lossy(file));
        }
    }
    println!();
}

/// 生成批量输出的头部信息
pub fn create_batch_output_header(config: &AppConfig, event_files: &[PathBuf]) -> String {
    let mut batch_output = String::new();

    batch_output.push_str("=====================================\n");
    batch_output.push_str(&format!("   {}\n", app_info::APP_NAME));
    batch_output.push_str("   批量处理结果 / Batch results\n");
    batch_output.push_str("=====================================\n\n");

    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    batch_output.push_str(&format!("log date: {now}\n"));
    batch_output.push_str(&format!("Stage / 阶段: {}\n", config.stage));
    batch_output.push_str(&format!("Directory / 扫描目录: {}\n", config.input_path.display()));
    batch_output.push_str(&format!("Files / 文件数: {}\n\n", event_files.len()));

    batch_output.push_str(&format!(
        "{:<16}{:>10}{:>10}{:>10}{:>10}  {}\n",
        "Event", "Rejected", "ROIs", "Modified", "Guarded", "File"
    ));
    batch_output.push_str("--------------------------------------------------------------------------\n");

    batch_output
}

/// 生成批量输出的统计信息
pub fn create_batch_output_footer(
    event_files: &[PathBuf],
    processed_count: usize,
    failed_count: usize,
    error_stats: &ErrorStats,
) -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    let mut output = String::new();

    output.push('\n');
    output.push_str("=====================================\n");
    output.push_str("批量处理统计 / Batch statistics:\n");
    output.push_str(&format!("   总文件数 / Total: {}\n", event_files.len()));
    output.push_str(&format!("   成功处理 / Processed: {processed_count}\n"));
    output.push_str(&format!("   处理失败 / Failed: {failed_count}\n"));
    if !event_files.is_empty() {
        output.push_str(&format!(
            "   处理成功率 / Success rate: {:.1}%\n",
            processed_count as f64 / event_files.len() as f64 * 100.0
        ));
    }

    if !error_stats.is_empty() {
        output.push_str("\n错误分类 / Errors by category:\n");
        for (category, files) in error_stats {
            output.push_str(&format!(
                "   {} ({}): {}\n",
                category.display_name(),
                files.len(),
                files.join(", ")
            ));
        }
    }

    output.push('\n');
    output.push_str(&format!("生成工具 / Generated by: {} v{VERSION}\n", app_info::APP_NAME));

    output
}

/// 生成批量输出文件路径
pub fn generate_batch_output_path(config: &AppConfig) -> PathBuf {
    config.output_path.clone().unwrap_or_else(|| {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        config
            .input_path
            .join(format!("{}_{timestamp}.txt", files::BATCH_REPORT_NAME))
    })
}

/// 显示批量处理完成信息
pub fn show_batch_completion_info(
    output_path: &Path,
    processed_count: usize,
    total_count: usize,
    failed_count: usize,
) {
    println!();
    println!("[INFO] 批量处理完成 / Batch processing finished");
    println!("   成功处理 / Processed: {processed_count} / {total_count}");
    if failed_count > 0 {
        println!("   失败文件 / Failed: {failed_count}");
    }
    println!("   批量汇总 / Batch report: {}", output_path.display());
}

/// 批量输出收尾：追加统计尾部、写出批量报告并显示完成信息
pub fn finalize_and_write_batch_output(
    config: &AppConfig,
    event_files: &[PathBuf],
    mut batch_output: String,
    snapshot: &BatchStatsSnapshot,
) -> RoiResult<()> {
    batch_output.push_str(&create_batch_output_footer(
        event_files,
        snapshot.processed,
        snapshot.failed,
        &snapshot.error_stats,
    ));

    let output_path = generate_batch_output_path(config);
    std::fs::write(&output_path, &batch_output)?;

    show_batch_completion_info(
        &output_path,
        snapshot.processed,
        event_files.len(),
        snapshot.failed,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_skips_outputs_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        fs::write(dir.path().join("a_processed.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.json"), "{}").unwrap();

        let flat = scan_event_files(dir.path(), false).unwrap();
        let names: Vec<String> = flat.iter().map(|p| utils::extract_filename_lossy(p)).collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);

        let deep = scan_event_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_scan_missing_dir() {
        let err = scan_event_files(Path::new("/nonexistent/events"), false).unwrap_err();
        assert!(matches!(err, RoiError::IoError(_)));
    }
}
