//! 报告格式化模块
//!
//! 单事件报告：头部（时间戳）、通道质量表、基线摘要、电荷重分配统计表。
//! 表格使用 comfy-table 渲染。

use super::cli::AppConfig;
use super::constants::app_info;
use super::utils;
use crate::error::RoiResult;
use crate::processing::{EventReport, FilterReport, ModifierReport, RoiBaseline};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use std::path::Path;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SEPARATOR: &str =
    "--------------------------------------------------------------------------------\n";

/// 创建输出文件头部信息
pub fn create_output_header(input_path: &Path, report: &EventReport) -> String {
    let mut output = String::new();

    output.push_str(&app_info::format_output_header(VERSION));
    output.push('\n');
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    output.push_str(&format!("log date: {now}\n\n"));

    output.push_str(SEPARATOR);
    output.push_str(&format!("Statistics for: {}\n", utils::extract_filename(input_path)));
    output.push_str(&format!("Event / 事件: {}\n", report.event_id));
    output.push_str(&format!("Stage / 阶段: {}\n", report.stage));
    output.push_str(&format!("Elapsed / 耗时: {} ms\n", report.elapsed_ms));
    output.push_str(SEPARATOR);
    output.push('\n');

    output
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

/// 通道质量过滤结果（按平面）
pub fn format_filter_report(filter: &FilterReport) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Plane / 平面",
        "Examined / 检查",
        "Accepted / 保留",
        "Rejected / 剔除",
        "Mean RMS / 平均RMS",
    ]);
    for summary in &filter.planes {
        table.add_row(vec![
            Cell::new(summary.plane.to_string()),
            right(summary.examined),
            right(summary.accepted),
            right(summary.rejected),
            right(format!("{:.3}", summary.mean_rms)),
        ]);
    }

    let mut output = String::from("Channel quality / 通道质量\n");
    output.push_str(&format!("{table}\n"));
    if filter.skipped > 0 {
        output.push_str(&format!("Skipped channels / 跳过通道: {}\n", filter.skipped));
    }
    if !filter.rejected.is_empty() {
        let channels: Vec<String> = filter.rejected.iter().map(|q| q.channel.to_string()).collect();
        output.push_str(&format!("Rejected / 剔除通道: {}\n", channels.join(", ")));
    }
    output.push('\n');
    output
}

/// ROI 基线摘要
pub fn format_baseline_summary(baselines: &[RoiBaseline]) -> String {
    if baselines.is_empty() {
        return String::new();
    }
    let nonzero: Vec<f32> = baselines
        .iter()
        .map(|b| b.baseline)
        .filter(|b| *b != 0.0)
        .collect();
    let mean = if nonzero.is_empty() {
        0.0
    } else {
        nonzero.iter().sum::<f32>() / nonzero.len() as f32
    };
    format!(
        "ROI baselines / ROI基线: {} ROIs, {} non-zero, mean {:.3}\n\n",
        baselines.len(),
        nonzero.len(),
        mean
    )
}

/// 电荷重分配统计
pub fn format_modifier_report(report: &ModifierReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Metric / 指标", "Count / 数量"]);
    let rows = [
        ("Projections matched / 匹配投影", report.projections_matched),
        ("ROIs modified / 修改ROI", report.rois_modified),
        ("ROIs untouched / 未修改ROI", report.rois_untouched),
        ("Sub-ROIs / 子ROI", report.sub_rois),
        ("Scaled / 已缩放", report.sub_rois_scaled),
        ("Unmatched / 无匹配", report.sub_rois_unmatched),
        ("Guarded / 保护", report.sub_rois_guarded),
        ("Non-finite / 非有限", report.sub_rois_non_finite),
        ("Wires skipped / 跳过通道", report.wires_skipped),
    ];
    for (name, count) in rows {
        table.add_row(vec![Cell::new(name), right(count)]);
    }
    format!("Charge redistribution / 电荷重分配\n{table}\n\n")
}

/// 完整单事件报告
pub fn format_event_report(input_path: &Path, report: &EventReport) -> String {
    let mut output = create_output_header(input_path, report);
    if let Some(filter) = &report.filter {
        output.push_str(&format_filter_report(filter));
    }
    output.push_str(&format_baseline_summary(&report.baselines));
    if let Some(modifier) = &report.modifier {
        output.push_str(&format_modifier_report(modifier));
    }
    output
}

/// 写出报告（文件或控制台）
pub fn write_output(output: &str, config: &AppConfig, auto_save: bool) -> RoiResult<()> {
    if auto_save {
        let parent_dir = utils::get_parent_dir(&config.input_path);
        let file_stem = utils::extract_file_stem(&config.input_path);
        let report_path = parent_dir.join(format!(
            "{file_stem}{}",
            super::constants::files::REPORT_SUFFIX
        ));
        std::fs::write(&report_path, output)?;
        println!("[INFO] 报告已保存 / Report saved: {}", report_path.display());
    } else {
        print!("{output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Stage;

    fn report() -> EventReport {
        EventReport {
            event_id: "1:2:3".into(),
            stage: Stage::Modify,
            filter: None,
            baselines: Vec::new(),
            modifier: Some(ModifierReport {
                rois_modified: 4,
                sub_rois_guarded: 1,
                ..ModifierReport::default()
            }),
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_event_report_contains_sections() {
        let text = format_event_report(Path::new("/tmp/evt.json"), &report());
        assert!(text.contains("Statistics for: evt.json"));
        assert!(text.contains("Event / 事件: 1:2:3"));
        assert!(text.contains("Charge redistribution"));
        assert!(!text.contains("Channel quality"));
    }
}
