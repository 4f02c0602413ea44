//! 原始波形通道质量过滤
//!
//! 对每个原始ADC波形计算截断均值 / 截断RMS，截断RMS低于平面阈值的通道保留，
//! 其余剔除。保留的波形原样输出（不修改样本），输出顺序与输入一致。
//!
//! 通道之间没有依赖，使用 rayon 按通道并行计算；`collect` 保持输入顺序。

use super::config::FilterConfig;
use crate::core::calibration::{ChannelMap, PedestalProvider};
use crate::core::truncated_stats::{TruncatedStats, estimate_truncated_stats};
use crate::core::types::{ChannelId, Plane};
use crate::event::RawDigit;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// 单通道质量记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelQuality {
    pub channel: ChannelId,
    pub plane: Plane,
    pub truncated_mean: f64,
    /// 截断RMS（质量分数）
    pub truncated_rms: f64,
    /// 数据库基座
    pub pedestal: f32,
    pub accepted: bool,
}

/// 单平面汇总
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaneQualitySummary {
    pub plane: Plane,
    pub examined: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// 已检查通道的平均截断RMS
    pub mean_rms: f64,
}

/// 过滤结果
#[derive(Debug, Clone, Default)]
pub struct FilterOutput {
    /// 通过的原始波形（输入顺序）
    pub accepted: Vec<RawDigit>,
    /// 每个被检查通道的质量记录（输入顺序）
    pub quality: Vec<ChannelQuality>,
    /// 因通道号非法而跳过的波形数
    pub skipped: usize,
}

impl FilterOutput {
    pub fn rejected_count(&self) -> usize {
        self.quality.iter().filter(|q| !q.accepted).count()
    }

    /// 按平面汇总（U, V, Y 顺序）
    pub fn plane_summaries(&self) -> [PlaneQualitySummary; 3] {
        Plane::ALL.map(|plane| {
            let records: Vec<&ChannelQuality> =
                self.quality.iter().filter(|q| q.plane == plane).collect();
            let accepted = records.iter().filter(|q| q.accepted).count();
            let mean_rms = if records.is_empty() {
                0.0
            } else {
                records.iter().map(|q| q.truncated_rms).sum::<f64>() / records.len() as f64
            };
            PlaneQualitySummary {
                plane,
                examined: records.len(),
                accepted,
                rejected: records.len() - accepted,
                mean_rms,
            }
        })
    }
}

/// 原始波形过滤器
pub struct RawDigitFilter<'a, M: ?Sized, P: ?Sized> {
    config: &'a FilterConfig,
    channel_map: &'a M,
    pedestals: &'a P,
}

impl<'a, M, P> RawDigitFilter<'a, M, P>
where
    M: ChannelMap + ?Sized,
    P: PedestalProvider + ?Sized,
{
    pub fn new(config: &'a FilterConfig, channel_map: &'a M, pedestals: &'a P) -> Self {
        Self {
            config,
            channel_map,
            pedestals,
        }
    }

    /// 检查单个通道；非法通道返回 `None`
    pub fn examine(&self, digit: &RawDigit) -> Option<ChannelQuality> {
        if digit.channel >= self.channel_map.num_channels() {
            debug!(channel = digit.channel, "通道号超出范围，跳过");
            return None;
        }
        let Some(plane) = self.channel_map.plane_of(digit.channel) else {
            debug!(channel = digit.channel, "通道不属于任何平面，跳过");
            return None;
        };

        let stats: TruncatedStats =
            estimate_truncated_stats(&digit.adcs, self.config.trunc_mean_fraction);
        let pedestal = self.pedestals.pedestal_mean(digit.channel, plane);

        let pedestal_diff = (stats.mean - f64::from(pedestal)).abs();
        if pedestal_diff > self.config.max_pedestal_diff {
            info!(
                channel = digit.channel,
                truncated_mean = stats.mean,
                pedestal,
                "截断均值与数据库基座不一致"
            );
        }

        let accepted = stats.rms < self.config.rms_rejection_cut[plane.index()];
        if !accepted {
            debug!(
                channel = digit.channel,
                %plane,
                rms = stats.rms,
                "截断RMS超过阈值，剔除通道"
            );
        }

        Some(ChannelQuality {
            channel: digit.channel,
            plane,
            truncated_mean: stats.mean,
            truncated_rms: stats.rms,
            pedestal,
            accepted,
        })
    }

    /// 过滤整个事件的原始波形
    pub fn filter(&self, digits: &[RawDigit]) -> FilterOutput {
        let examined: Vec<Option<ChannelQuality>> =
            digits.par_iter().map(|digit| self.examine(digit)).collect();

        let mut output = FilterOutput::default();
        for (digit, quality) in digits.iter().zip(examined) {
            match quality {
                Some(q) => {
                    if q.accepted {
                        output.accepted.push(digit.clone());
                    }
                    output.quality.push(q);
                }
                None => output.skipped += 1,
            }
        }
        output
    }
}
