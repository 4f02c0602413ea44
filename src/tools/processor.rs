//! 事件文件处理模块
//!
//! 负责加载流水线（配置 + 标定表）、处理单个事件文件、写出处理结果与报告。

use super::cli::AppConfig;
use super::constants::files;
use super::formatter;
use super::utils;
use crate::core::scale::{ScaleModel, ScaleTables};
use crate::error::RoiResult;
use crate::event::{read_event, write_event};
use crate::processing::{EventProcessor, EventReport, PipelineConfig, ProcessedEvent, Stage};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 根据命令行配置构建事件处理器
///
/// 未提供标定表时使用单位缩放模型（电荷重分配阶段不改变波形）。
pub fn load_processor(config: &AppConfig) -> RoiResult<EventProcessor> {
    let pipeline = match &config.config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let scale_model = match &config.scales_path {
        Some(path) => {
            let tables = ScaleTables::from_json_file(path)?;
            let model = ScaleModel::from_config(&pipeline.modifier.scales, &tables)?;
            info!(surfaces = model.len(), "已加载缩放标定表");
            model
        }
        None => {
            if matches!(config.stage, Stage::Modify | Stage::All) {
                warn!("未提供缩放标定表，电荷重分配使用单位缩放");
            }
            ScaleModel::identity()
        }
    };

    EventProcessor::new(pipeline, scale_model)
}

/// 处理后事件文件的默认路径：`<stem>_processed.json`
pub fn processed_output_path(input: &Path) -> PathBuf {
    let parent_dir = utils::get_parent_dir(input);
    let file_stem = utils::extract_file_stem(input);
    parent_dir.join(format!(
        "{file_stem}{}.{}",
        files::PROCESSED_SUFFIX,
        files::EVENT_EXTENSION
    ))
}

/// 读取、处理并写出单个事件文件
///
/// `output` 为 `None` 时写到输入文件旁边。
pub fn process_event_file(
    path: &Path,
    processor: &EventProcessor,
    stage: Stage,
    output: Option<&Path>,
) -> RoiResult<EventReport> {
    let event = read_event(path)?;
    let ProcessedEvent { event, report } = processor.process_event(event, stage)?;

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| processed_output_path(path));
    write_event(&output_path, &event)?;

    Ok(report)
}

/// 单文件模式：处理并输出报告（控制台 + 自动保存）
pub fn process_single_event_file(config: &AppConfig, processor: &EventProcessor) -> RoiResult<()> {
    let report = process_event_file(
        &config.input_path,
        processor,
        config.stage,
        config.output_path.as_deref(),
    )?;

    let text = formatter::format_event_report(&config.input_path, &report);
    if config.verbose {
        formatter::write_output(&text, config, false)?;
    }
    formatter::write_output(&text, config, true)
}

/// 批量处理的单个文件结果添加到批量输出
pub fn add_to_batch_output(batch_output: &mut String, report: &EventReport, file_path: &Path) {
    let file_name = utils::extract_filename_lossy(file_path);
    let rejected = report.filter.as_ref().map(|f| f.rejected.len());
    let (rois, modified, guarded) = match &report.modifier {
        Some(m) => (
            Some(m.rois_modified + m.rois_untouched),
            Some(m.rois_modified),
            Some(m.sub_rois_guarded),
        ),
        None => (None, None, None),
    };
    let cell = |v: Option<usize>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());

    batch_output.push_str(&format!(
        "{:<16}{:>10}{:>10}{:>10}{:>10}  {}\n",
        report.event_id,
        cell(rejected),
        cell(rois),
        cell(modified),
        cell(guarded),
        file_name
    ));
}

/// 批量处理失败文件的结果添加到批量输出
pub fn add_failed_to_batch_output(batch_output: &mut String, file_path: &Path) {
    let file_name = utils::extract_filename_lossy(file_path);
    batch_output.push_str(&format!(
        "{:<16}{:>40}  {}\n",
        "-", "处理失败 / failed", file_name
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_output_path() {
        assert_eq!(
            processed_output_path(Path::new("/data/evt_7.json")),
            PathBuf::from("/data/evt_7_processed.json")
        );
    }

    #[test]
    fn test_batch_line_for_filter_only() {
        let report = EventReport {
            event_id: "1:0:5".into(),
            stage: Stage::Filter,
            filter: None,
            baselines: Vec::new(),
            modifier: None,
            elapsed_ms: 0,
        };
        let mut out = String::new();
        add_to_batch_output(&mut out, &report, Path::new("evt.json"));
        assert!(out.starts_with("1:0:5"));
        assert!(out.trim_end().ends_with("evt.json"));
    }
}
