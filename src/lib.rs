//! uBooNE ROI Toolkit
//!
//! MicroBooNE 液氩时间投影室（LArTPC）稀疏波形的逐事件数值处理：
//! 众数直方图基线、截断均值/RMS 通道质量过滤，以及基于真实能量沉积的 ROI 电荷重分配。
//!
//! ## 核心特性
//! - 众数直方图基线：0.5 宽度 bin，众数 ± 1.26491×噪声 内取平均
//! - 截断统计：从峰值 bin 对称扩展窗口，均值与RMS两次独立扩展
//! - ROI 电荷重分配：sample × q_mod(t) / q_orig(t)，高斯混合密度比
//! - 数值异常（0/0、NaN、±Inf）全部按策略回退，不进入输出波形
//! - 按通道 / 按事件文件的 rayon 并行处理

pub mod core;
pub mod error;
pub mod event;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use crate::core::{
    BaselineTool, MostProbableAverage, Plane, RoiKey, RoiMoments, ScaleModel, ScaleSurface,
    ScaleValues, SubRoiKey, TruncatedStats, compute_roi_moments, estimate_baseline,
    estimate_truncated_stats, modify_roi,
};
pub use error::{ErrorCategory, RoiError, RoiResult};
pub use event::{Event, read_event, write_event};
pub use processing::{EventProcessor, PipelineConfig, Stage};
