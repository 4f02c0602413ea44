//! 单事件处理流水线
//!
//! 按 过滤 → 基线扣除 → 电荷重分配 的顺序运行所选阶段。
//! 所有匹配表与中间结果都在单次调用内构建，不在事件之间保留状态。

use super::baseline::{RoiBaseline, subtract_roi_baselines};
use super::channel_filter::{ChannelQuality, PlaneQualitySummary, RawDigitFilter};
use super::config::PipelineConfig;
use super::wire_modifier::{ModifierReport, WireModifier};
use crate::core::baseline::MostProbableAverage;
use crate::core::calibration::{ChannelMap, PlaneCalibration, UBooNEChannelMap};
use crate::core::scale::ScaleModel;
use crate::error::{RoiError, RoiResult};
use crate::event::Event;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};

/// 处理阶段选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Filter,
    Baseline,
    Modify,
    #[default]
    All,
}

impl Stage {
    fn runs_filter(self) -> bool {
        matches!(self, Stage::Filter | Stage::All)
    }

    fn runs_baseline(self) -> bool {
        matches!(self, Stage::Baseline | Stage::All)
    }

    fn runs_modify(self) -> bool {
        matches!(self, Stage::Modify | Stage::All)
    }
}

impl FromStr for Stage {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "filter" => Ok(Stage::Filter),
            "baseline" => Ok(Stage::Baseline),
            "modify" => Ok(Stage::Modify),
            "all" => Ok(Stage::All),
            other => Err(RoiError::ConfigError(format!(
                "未知处理阶段: {other}（可选 filter|baseline|modify|all）"
            ))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Filter => "filter",
            Stage::Baseline => "baseline",
            Stage::Modify => "modify",
            Stage::All => "all",
        };
        f.write_str(name)
    }
}

/// 过滤阶段报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterReport {
    pub planes: [PlaneQualitySummary; 3],
    /// 被剔除通道的质量记录
    pub rejected: Vec<ChannelQuality>,
    pub skipped: usize,
}

/// 单事件处理报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReport {
    /// "run:subrun:event"
    pub event_id: String,
    pub stage: Stage,
    pub filter: Option<FilterReport>,
    pub baselines: Vec<RoiBaseline>,
    pub modifier: Option<ModifierReport>,
    pub elapsed_ms: u64,
}

/// 处理后的事件及其报告
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    pub event: Event,
    pub report: EventReport,
}

/// 事件处理器
///
/// 持有只读的配置、标定与缩放模型，可在多个线程间共享。
pub struct EventProcessor {
    config: PipelineConfig,
    scale_model: ScaleModel,
    channel_map: Box<dyn ChannelMap>,
    baseline_tool: MostProbableAverage<PlaneCalibration>,
}

impl EventProcessor {
    /// 使用 MicroBooNE 默认通道布局创建处理器
    pub fn new(config: PipelineConfig, scale_model: ScaleModel) -> RoiResult<Self> {
        config.validate()?;
        let baseline_tool = MostProbableAverage::new(config.calibration.clone());
        Ok(Self {
            config,
            scale_model,
            channel_map: Box::new(UBooNEChannelMap),
            baseline_tool,
        })
    }

    /// 替换通道布局
    pub fn with_channel_map<M: ChannelMap + 'static>(mut self, channel_map: M) -> Self {
        self.channel_map = Box::new(channel_map);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 处理单个事件
    pub fn process_event(&self, mut event: Event, stage: Stage) -> RoiResult<ProcessedEvent> {
        let start = Instant::now();
        event.validate()?;
        let event_id = event.id_string();
        debug!(event = %event_id, %stage, "开始处理事件");

        let filter = stage.runs_filter().then(|| {
            let filter = RawDigitFilter::new(
                &self.config.filter,
                self.channel_map.as_ref(),
                &self.config.calibration,
            );
            let output = filter.filter(&event.raw_digits);
            let report = FilterReport {
                planes: output.plane_summaries(),
                rejected: output.quality.iter().filter(|q| !q.accepted).copied().collect(),
                skipped: output.skipped,
            };
            event.raw_digits = output.accepted;
            report
        });

        let baselines = if stage.runs_baseline() {
            subtract_roi_baselines(
                &mut event.wires,
                &self.baseline_tool,
                self.channel_map.as_ref(),
                &self.config.baseline,
            )
        } else {
            Vec::new()
        };

        let modifier = stage.runs_modify().then(|| {
            let modifier = WireModifier::new(
                &self.config.modifier,
                self.channel_map.as_ref(),
                &self.scale_model,
            );
            modifier.modify(&mut event.wires, &event.hits, &event.deposits)
        });

        let report = EventReport {
            event_id,
            stage,
            filter,
            baselines,
            modifier,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            event = %report.event_id,
            rejected = report.filter.as_ref().map(|f| f.rejected.len()).unwrap_or(0),
            rois_modified = report.modifier.map(|m| m.rois_modified).unwrap_or(0),
            "事件处理完成"
        );

        Ok(ProcessedEvent { event, report })
    }
}
