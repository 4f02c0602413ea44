//! 核心算法模块
//!
//! 包含逐ROI / 逐通道的数值原语：众数基线、截断统计、ROI矩、
//! 沉积投影与匹配、缩放模型以及电荷重分配。

pub mod baseline;
pub mod calibration;
pub mod matching;
pub mod parameters;
pub mod projection;
pub mod redistributor;
pub mod roi_moments;
pub mod scale;
pub mod truncated_stats;
pub mod types;

// 重新导出公共接口
pub use baseline::{BaselineTool, MostProbableAverage, estimate_baseline};
pub use calibration::{
    ChannelMap, NoiseProvider, PedestalProvider, PlaneCalibration, UBooNEChannelMap,
};
pub use matching::{
    ScaleDecision, SubRoi, build_sub_rois, match_deposits_to_sub_rois, sub_roi_scale,
    truth_properties,
};
pub use projection::{TargetTick, project_deposit};
pub use redistributor::modify_roi;
pub use roi_moments::{RoiMoments, compute_roi_moments};
pub use scale::{
    ScaleModel, ScaleModelConfig, ScaleSurface, ScaleTables, ScaleValues, TruthProperties,
};
pub use truncated_stats::{TruncatedStats, estimate_truncated_stats};
pub use types::{ChannelId, Plane, RoiKey, SubRoiKey};
