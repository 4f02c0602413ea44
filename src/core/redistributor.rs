//! ROI 电荷重分配
//!
//! 每个样本乘以 "缩放后高斯混合密度 / 原始高斯混合密度"：
//!
//! ```text
//! q_orig(t) = Σ G(t; c_i, σ_i, Q_i)
//! q_mod(t)  = Σ G(t; c_i, r_σ·σ_i, r_Q·Q_i)
//! G(x; μ, σ, a) = (a/σ)·(1/√(2π))·exp(−(x−μ)²/(2σ²))
//! ```
//!
//! 样本之间没有依赖，可以按 ROI / 通道并行。

use super::matching::SubRoi;
use super::parameters::modifier::ONE_OVER_SQRT_2PI;
use super::roi_moments::RoiMoments;
use super::scale::ScaleValues;
use super::types::SubRoiKey;
use std::collections::BTreeMap;

/// 归一化高斯（幅度为积分电荷）
#[inline]
pub fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    let z = (x - mu) / sigma;
    amplitude / sigma * ONE_OVER_SQRT_2PI * (-0.5 * z * z).exp()
}

/// 密度比 q_mod / q_orig
///
/// 分子或分母为 NaN 时按 0 处理；比值为 NaN 或 ±Inf（如 0/0）时返回 1.0。
#[inline]
pub fn density_ratio(q_mod: f64, q_orig: f64) -> f64 {
    let q_mod = if q_mod.is_nan() { 0.0 } else { q_mod };
    let q_orig = if q_orig.is_nan() { 0.0 } else { q_orig };
    let ratio = q_mod / q_orig;
    if ratio.is_finite() { ratio } else { 1.0 }
}

/// 就地修改一个 ROI 的样本
///
/// `samples[i]` 对应绝对 tick `roi.begin + i`。缺少缩放值的子ROI使用单位缩放。
pub fn modify_roi(
    samples: &mut [f32],
    roi: &RoiMoments,
    sub_rois: &[SubRoi],
    scales: &BTreeMap<SubRoiKey, ScaleValues>,
) {
    if sub_rois.is_empty() {
        return;
    }

    let components: Vec<(SubRoi, ScaleValues)> = sub_rois
        .iter()
        .map(|sub| (*sub, scales.get(&sub.key).copied().unwrap_or_default()))
        .collect();

    for (i, sample) in samples.iter_mut().enumerate() {
        let tick = (roi.begin + i) as f64;
        let (q_orig, q_mod) = components.iter().fold((0.0, 0.0), |(orig, modded), (sub, scale)| {
            (
                orig + gaussian(tick, sub.center, sub.sigma, sub.total_q),
                modded
                    + gaussian(
                        tick,
                        sub.center,
                        scale.r_sigma * sub.sigma,
                        scale.r_q * sub.total_q,
                    ),
            )
        });

        *sample = (f64::from(*sample) * density_ratio(q_mod, q_orig)) as f32;
    }
}
