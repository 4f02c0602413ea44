//! 众数直方图基线估计（Most-Probable-Average）
//!
//! 在ROI窗口内以 0.5 为 bin 宽建立幅度直方图，取计数最多的 bin 作为众数，
//! 再对落在众数 ± 噪声宽度内的样本取平均，得到对信号脉冲不敏感的基线。
//!
//! ## 退化输入策略
//! - 窗口长度 < 2 → 0.0
//! - 平坦窗口（max ≤ min）→ 0.0
//! - 噪声窗口内没有样本 → 0.0
//! - 幅度范围所需的 bin 数超过 `MAX_HISTOGRAM_BINS` → 输出诊断并返回 0.0
//! - ROI 越过缓冲区末尾 → 截断窗口并输出诊断，不报错

use super::calibration::NoiseProvider;
use super::parameters::baseline::{BINS_PER_UNIT, DECON_NOISE_SCALE, MAX_HISTOGRAM_BINS};
use super::types::{ChannelId, Plane};
use tracing::warn;

/// 基线工具接口（对应框架中的可插拔 baseline tool）
pub trait BaselineTool: Send + Sync {
    /// 估计 `holder[roi_start..roi_start + roi_len]` 的基线
    fn baseline(
        &self,
        holder: &[f32],
        channel: ChannelId,
        plane: Plane,
        roi_start: usize,
        roi_len: usize,
    ) -> f32;
}

/// 使用通道噪声表驱动的众数平均基线工具
#[derive(Debug, Clone)]
pub struct MostProbableAverage<N> {
    noise: N,
}

impl<N: NoiseProvider> MostProbableAverage<N> {
    pub fn new(noise: N) -> Self {
        Self { noise }
    }

    /// 通道的噪声窗口宽度（原始噪声 × `DECON_NOISE_SCALE`）
    #[inline]
    pub fn noise_width(&self, channel: ChannelId, plane: Plane) -> f32 {
        DECON_NOISE_SCALE * self.noise.decon_noise(channel, plane)
    }
}

impl<N: NoiseProvider> BaselineTool for MostProbableAverage<N> {
    fn baseline(
        &self,
        holder: &[f32],
        channel: ChannelId,
        plane: Plane,
        roi_start: usize,
        roi_len: usize,
    ) -> f32 {
        estimate_baseline(holder, roi_start, roi_len, self.noise_width(channel, plane))
    }
}

/// 众数直方图基线估计
///
/// # 参数
///
/// * `samples` - 完整波形缓冲区
/// * `roi_start` - 窗口起点（缓冲区索引）
/// * `roi_len` - 窗口长度
/// * `noise_width` - 众数两侧的平均窗口半宽（已乘倍数）
pub fn estimate_baseline(
    samples: &[f32],
    roi_start: usize,
    roi_len: usize,
    noise_width: f32,
) -> f32 {
    if roi_len < 2 {
        return 0.0;
    }

    let mut roi_len = roi_len;
    if roi_start.saturating_add(roi_len) > samples.len() {
        warn!(
            roi_start,
            roi_len,
            size = samples.len(),
            "ROI超出缓冲区，截断窗口 / roi exceeds buffer size, clamping"
        );
        roi_len = samples.len().saturating_sub(roi_start);
        if roi_len < 2 {
            return 0.0;
        }
    }

    let window = &samples[roi_start..roi_start + roi_len];

    let (min, max) = window
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    // 同时覆盖平坦窗口和全NaN窗口
    if !(max > min) {
        return 0.0;
    }

    let Some(nbin) = histogram_bin_count(min, max) else {
        warn!(
            min,
            max,
            limit = MAX_HISTOGRAM_BINS,
            "幅度范围过宽，无法建立众数直方图 / amplitude range too wide for mode histogram"
        );
        return 0.0;
    };

    let histogram = build_mode_histogram(window, min, nbin);
    let mode_bin = first_mode_bin(&histogram);
    let mode_value = (f64::from(min) + mode_bin as f64 / f64::from(BINS_PER_UNIT)) as f32;

    average_near_mode(window, mode_value, noise_width)
}

/// 直方图 bin 数 `2·ceil(max − min) + 1`
///
/// bin 数量多留一个，覆盖 (max − min) 恰为整数的情况。范围非有限或超过上限时返回 `None`。
fn histogram_bin_count(min: f32, max: f32) -> Option<usize> {
    let span = (f64::from(max) - f64::from(min)).ceil();
    let bins = f64::from(BINS_PER_UNIT) * span + 1.0;
    (bins.is_finite() && bins <= MAX_HISTOGRAM_BINS as f64).then_some(bins as usize)
}

/// 建立 0.5 宽度 bin 的计数直方图；越界索引钳位到最近的有效 bin
fn build_mode_histogram(window: &[f32], min: f32, nbin: usize) -> Vec<u32> {
    let mut histogram = vec![0u32; nbin];
    let last = nbin as i64 - 1;
    let mut clamped = 0usize;

    for &value in window {
        let raw = (f64::from(BINS_PER_UNIT) * f64::from(value - min)).floor() as i64;
        let idx = raw.clamp(0, last);
        if idx != raw {
            clamped += 1;
        }
        histogram[idx as usize] += 1;
    }

    if clamped > 0 {
        warn!(
            clamped,
            nbin,
            min,
            "直方图索引越界已钳位 / histogram index out of range, clamped"
        );
    }

    histogram
}

/// 正向扫描的第一个最大 bin（严格大于比较）
fn first_mode_bin(histogram: &[u32]) -> usize {
    let mut mode_bin = 0;
    let mut mode_count = 0;
    for (idx, &count) in histogram.iter().enumerate() {
        if count > mode_count {
            mode_bin = idx;
            mode_count = count;
        }
    }
    mode_bin
}

/// 对 |v − mode| < noise_width 的样本取平均；没有样本时返回 0
fn average_near_mode(window: &[f32], mode_value: f32, noise_width: f32) -> f32 {
    let mut base = 0.0f32;
    let mut count = 0u32;
    for &value in window {
        if (value - mode_value).abs() < noise_width {
            base += value;
            count += 1;
        }
    }

    if count > 0 { base / count as f32 } else { 0.0 }
}
