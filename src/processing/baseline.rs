//! ROI 基线扣除
//!
//! 对每个 ROI 单独估计众数基线并从样本中扣除；通道间并行。
//! 平面由注入的通道映射解析，不属于任何平面的波形原样跳过。

use super::config::BaselineConfig;
use crate::core::baseline::BaselineTool;
use crate::core::calibration::ChannelMap;
use crate::core::types::RoiKey;
use crate::event::Wire;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// 单个 ROI 的基线记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoiBaseline {
    pub key: RoiKey,
    pub baseline: f32,
}

/// 估计并（可选）扣除所有 ROI 的基线
///
/// 返回按 (通道, ROI序号) 排列的记录。
pub fn subtract_roi_baselines<B, M>(
    wires: &mut [Wire],
    tool: &B,
    channel_map: &M,
    config: &BaselineConfig,
) -> Vec<RoiBaseline>
where
    B: BaselineTool + ?Sized,
    M: ChannelMap + ?Sized,
{
    let per_wire: Vec<Vec<RoiBaseline>> = wires
        .par_iter_mut()
        .map(|wire| {
            let channel = wire.channel;
            let Some(plane) = channel_map.plane_of(channel) else {
                debug!(channel, "通道不属于任何平面，跳过基线扣除");
                return Vec::new();
            };
            wire.rois
                .iter_mut()
                .enumerate()
                .map(|(roi_index, roi)| {
                    let baseline = tool.baseline(&roi.data, channel, plane, 0, roi.data.len());
                    if config.subtract && baseline != 0.0 {
                        roi.data.iter_mut().for_each(|s| *s -= baseline);
                    }
                    RoiBaseline {
                        key: RoiKey::new(channel, roi_index),
                        baseline,
                    }
                })
                .collect()
        })
        .collect();

    per_wire.into_iter().flatten().collect()
}
