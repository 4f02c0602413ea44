//! 事件级处理模块
//!
//! 把核心数值原语组合成逐事件的处理阶段：通道质量过滤、ROI基线扣除、电荷重分配。
//! 各阶段内部按通道使用 rayon 并行，结果顺序与输入一致。

pub mod baseline;
pub mod channel_filter;
pub mod config;
pub mod pipeline;
pub mod wire_modifier;

// 重新导出公共接口
pub use baseline::{RoiBaseline, subtract_roi_baselines};
pub use channel_filter::{ChannelQuality, FilterOutput, PlaneQualitySummary, RawDigitFilter};
pub use config::{BaselineConfig, FilterConfig, ModifierConfig, PipelineConfig};
pub use pipeline::{EventProcessor, EventReport, FilterReport, ProcessedEvent, Stage};
pub use wire_modifier::{ModifierReport, RoiMatchMap, WireModifier, build_roi_match_map};
