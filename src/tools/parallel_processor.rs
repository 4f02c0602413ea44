//! 多文件批量处理模块
//!
//! 并行模式使用独立的 rayon 线程池控制文件级并发度，结果按原始索引排序后输出，
//! 保证批量报告与串行模式完全一致。

use super::batch_state::BatchStats;
use super::cli::AppConfig;
use super::processor::{add_failed_to_batch_output, add_to_batch_output, process_event_file};
use super::scanner::{create_batch_output_header, finalize_and_write_batch_output};
use super::utils;
use crate::error::{RoiError, RoiResult};
use crate::processing::{EventProcessor, EventReport};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 有序结果容器（保证输出顺序）
struct OrderedResult {
    /// 原始文件索引（用于排序）
    index: usize,
    file_path: PathBuf,
    result: RoiResult<EventReport>,
}

/// 处理单个文件并更新统计
fn process_one(
    index: usize,
    event_file: &Path,
    total: usize,
    config: &AppConfig,
    processor: &EventProcessor,
    stats: &BatchStats,
) -> OrderedResult {
    let result = process_event_file(event_file, processor, config.stage, None);
    let filename = utils::extract_filename_lossy(event_file);

    match &result {
        Ok(_) => {
            let count = stats.inc_processed();
            if config.verbose {
                println!("[OK] [{count}/{total}] {filename}");
            }
        }
        Err(e) => {
            let (_, category) = stats.inc_failed(e, filename.clone());
            println!(
                "[FAIL] [{}/{}] {} - [{}] {e} / 处理失败",
                index + 1,
                total,
                filename,
                category.display_name()
            );
        }
    }

    OrderedResult {
        index,
        file_path: event_file.to_path_buf(),
        result,
    }
}

/// 按序写出批量报告
fn write_batch_report(
    config: &AppConfig,
    event_files: &[PathBuf],
    mut results: Vec<OrderedResult>,
    stats: &BatchStats,
) -> RoiResult<()> {
    results.sort_by_key(|r| r.index);

    let mut batch_output = create_batch_output_header(config, event_files);
    for ordered in &results {
        match &ordered.result {
            Ok(report) => add_to_batch_output(&mut batch_output, report, &ordered.file_path),
            Err(_) => add_failed_to_batch_output(&mut batch_output, &ordered.file_path),
        }
    }

    finalize_and_write_batch_output(config, event_files, batch_output, &stats.snapshot())
}

/// 串行批量处理
pub fn process_batch_serial(
    event_files: &[PathBuf],
    config: &AppConfig,
    processor: &EventProcessor,
) -> RoiResult<()> {
    let stats = BatchStats::new();
    let results: Vec<OrderedResult> = event_files
        .iter()
        .enumerate()
        .map(|(index, event_file)| {
            if config.verbose {
                println!(
                    "[PROCESSING] [{}/{}] 处理 / Processing: {}",
                    index + 1,
                    event_files.len(),
                    utils::extract_filename_lossy(event_file)
                );
            }
            process_one(index, event_file, event_files.len(), config, processor, &stats)
        })
        .collect();

    write_batch_report(config, event_files, results, &stats)
}

/// 多文件并行处理
pub fn process_batch_parallel(
    event_files: &[PathBuf],
    config: &AppConfig,
    processor: &EventProcessor,
    parallel_degree: usize,
) -> RoiResult<()> {
    println!("[INFO] 启用多文件并行处理 / Parallel files: {parallel_degree}");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("roi-worker-{i}"))
        .build()
        .map_err(|e| RoiError::ResourceError(format!("线程池创建失败: {e}")))?;

    let stats = BatchStats::new();
    let results: Vec<OrderedResult> = pool.install(|| {
        event_files
            .par_iter()
            .enumerate()
            .map(|(index, event_file)| {
                process_one(index, event_file, event_files.len(), config, processor, &stats)
            })
            .collect()
    });

    write_batch_report(config, event_files, results, &stats)
}
