//! 截断均值 / 截断RMS 估计
//!
//! 以ADC原始整数值为键建立精确频数表，从峰值 bin 向两侧对称扩展窗口，
//! 直到窗口内样本数达到 `(1 − f)·N − 1`，在该窗口上计算均值与RMS。
//!
//! 均值与RMS是两次独立的窗口扩展（两个纯函数），RMS 扩展不复用均值扩展的累加状态。

use std::collections::BTreeMap;

/// 截断统计结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TruncatedStats {
    /// 截断均值
    pub mean: f64,
    /// 截断RMS（围绕截断均值）
    pub rms: f64,
    /// 峰值 bin 的ADC值
    pub peak_value: i32,
    /// 峰值 bin 的计数
    pub peak_count: u32,
    /// 均值窗口最终包含的样本数
    pub included_count: u32,
}

/// 精确值频数表（按ADC值升序）
pub type ValueHistogram = BTreeMap<i32, u32>;

/// 计算截断统计
///
/// # 参数
///
/// * `samples` - 原始ADC样本
/// * `trunc_fraction` - 丢弃的样本比例（0.2 表示保留约 80%）
pub fn estimate_truncated_stats(samples: &[i16], trunc_fraction: f32) -> TruncatedStats {
    if samples.is_empty() {
        return TruncatedStats::default();
    }

    let histogram = build_value_histogram(samples);
    let Some((peak_value, peak_count)) = find_peak(&histogram) else {
        return TruncatedStats::default();
    };

    let min_count = min_window_count(samples.len(), trunc_fraction);
    let (mean, included_count) = truncated_mean(&histogram, peak_value, peak_count, min_count);
    let rms = truncated_rms(&histogram, peak_value, peak_count, mean, min_count);

    TruncatedStats {
        mean,
        rms,
        peak_value,
        peak_count,
        included_count,
    }
}

/// 建立精确值频数表
pub fn build_value_histogram(samples: &[i16]) -> ValueHistogram {
    let mut histogram = ValueHistogram::new();
    for &adc in samples {
        *histogram.entry(i32::from(adc)).or_insert(0) += 1;
    }
    histogram
}

/// 查找峰值 bin
///
/// 按ADC值升序扫描，严格大于才替换：计数相同时保留较小的ADC值。
pub fn find_peak(histogram: &ValueHistogram) -> Option<(i32, u32)> {
    let mut peak: Option<(i32, u32)> = None;
    for (&value, &count) in histogram {
        match peak {
            Some((_, best)) if count <= best => {}
            _ => peak = Some((value, count)),
        }
    }
    peak
}

/// 窗口扩展的停止阈值 `trunc((1 − f)·N − 1)`
#[inline]
pub fn min_window_count(data_size: usize, trunc_fraction: f32) -> i64 {
    ((1.0 - f64::from(trunc_fraction)) * data_size as f64 - 1.0) as i64
}

/// 窗口扩展的最大偏移：覆盖全部取值后即停止
fn max_offset(histogram: &ValueHistogram, peak_value: i32) -> i32 {
    let lo = histogram.keys().next().copied().unwrap_or(peak_value);
    let hi = histogram.keys().next_back().copied().unwrap_or(peak_value);
    (peak_value - lo).max(hi - peak_value)
}

/// 第一次扩展：截断均值
///
/// 返回 (均值, 窗口样本数)。
pub fn truncated_mean(
    histogram: &ValueHistogram,
    peak_value: i32,
    peak_count: u32,
    min_count: i64,
) -> (f64, u32) {
    let limit = max_offset(histogram, peak_value);
    let mut count = peak_count;
    let mut sum = f64::from(peak_count) * f64::from(peak_value);

    let mut offset = 1;
    while i64::from(count) < min_count && offset <= limit {
        for value in [peak_value - offset, peak_value + offset] {
            if let Some(&bin_count) = histogram.get(&value) {
                count += bin_count;
                sum += f64::from(bin_count) * f64::from(value);
            }
        }
        offset += 1;
    }

    (sum / f64::from(count), count)
}

/// 第二次扩展：围绕截断均值的截断RMS
///
/// 从偏移 1 重新扩展，使用同一停止阈值；根号内的值钳位到 ≥ 0。
pub fn truncated_rms(
    histogram: &ValueHistogram,
    peak_value: i32,
    peak_count: u32,
    mean: f64,
    min_count: i64,
) -> f64 {
    let limit = max_offset(histogram, peak_value);
    let mut count = peak_count;
    let peak_dev = f64::from(peak_value) - mean;
    let mut sum_sq = f64::from(peak_count) * peak_dev * peak_dev;

    let mut offset = 1;
    while i64::from(count) < min_count && offset <= limit {
        for value in [peak_value - offset, peak_value + offset] {
            if let Some(&bin_count) = histogram.get(&value) {
                let dev = f64::from(value) - mean;
                count += bin_count;
                sum_sq += f64::from(bin_count) * dev * dev;
            }
        }
        offset += 1;
    }

    (sum_sq / f64::from(count)).max(0.0).sqrt()
}
