//! ROI 电荷加权矩
//!
//! total_q = Σ s[i]，center = Σ s[i]·(i+begin) / total_q，
//! sigma = √(Σ s[i]·(i+begin−center)² / total_q)。

/// ROI 聚合统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiMoments {
    /// 起始 tick（含）
    pub begin: usize,
    /// 结束 tick（不含）
    pub end: usize,
    /// 总电荷
    pub total_q: f64,
    /// 电荷加权中心（绝对 tick）
    pub center: f64,
    /// 电荷加权宽度
    pub sigma: f64,
}

impl RoiMoments {
    /// ROI 长度（样本数）
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }

    /// 绝对 tick 是否位于 ROI 内
    #[inline]
    pub fn contains_tick(&self, tick: f64) -> bool {
        tick >= self.begin as f64 && tick < self.end as f64
    }
}

/// 计算 ROI 的电荷加权矩
///
/// - 单样本 ROI：方差恒为 0，强制 `center = begin + 0.5`、`sigma = 0.5`
/// - 总电荷 ≤ 0 或结果非有限：回落到 ROI 中点，`sigma = len / 2`
/// - 负样本导致的负方差钳位到 0
pub fn compute_roi_moments(begin: usize, samples: &[f32]) -> RoiMoments {
    let end = begin + samples.len();
    let mut moments = RoiMoments {
        begin,
        end,
        total_q: 0.0,
        center: 0.0,
        sigma: 0.0,
    };

    let mut weighted_tick = 0.0;
    for (i, &q) in samples.iter().enumerate() {
        let q = f64::from(q);
        weighted_tick += q * (i + begin) as f64;
        moments.total_q += q;
    }

    if samples.len() == 1 {
        moments.center = begin as f64 + 0.5;
        moments.sigma = 0.5;
        return moments;
    }

    moments.center = weighted_tick / moments.total_q;
    if moments.total_q <= 0.0 || !moments.center.is_finite() {
        return with_midpoint_fallback(moments);
    }

    let mut variance = 0.0;
    for (i, &q) in samples.iter().enumerate() {
        let dt = (i + begin) as f64 - moments.center;
        variance += f64::from(q) * dt * dt;
    }
    moments.sigma = (variance / moments.total_q).max(0.0).sqrt();

    if !moments.sigma.is_finite() {
        return with_midpoint_fallback(moments);
    }

    moments
}

fn with_midpoint_fallback(mut moments: RoiMoments) -> RoiMoments {
    let len = moments.len() as f64;
    moments.center = moments.begin as f64 + 0.5 * len;
    moments.sigma = 0.5 * len;
    moments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sample_roi() {
        let m = compute_roi_moments(42, &[7.5]);
        assert_eq!(m.center, 42.5);
        assert_eq!(m.sigma, 0.5);
        assert_eq!(m.total_q, 7.5);

        // 零电荷单样本也不产生 NaN
        let z = compute_roi_moments(3, &[0.0]);
        assert_eq!(z.center, 3.5);
        assert_eq!(z.sigma, 0.5);
    }

    #[test]
    fn test_symmetric_roi() {
        let m = compute_roi_moments(100, &[1.0, 2.0, 1.0]);
        assert_eq!(m.total_q, 4.0);
        assert!((m.center - 101.0).abs() < 1e-12);
        assert!((m.sigma - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(m.len(), 3);
        assert!(m.contains_tick(102.9));
        assert!(!m.contains_tick(103.0));
    }

    #[test]
    fn test_zero_charge_falls_back_to_midpoint() {
        let m = compute_roi_moments(10, &[1.0, -1.0, 0.0, 0.0]);
        assert_eq!(m.center, 12.0);
        assert_eq!(m.sigma, 2.0);
        assert!(m.center.is_finite() && m.sigma.is_finite());
    }

    #[test]
    fn test_negative_variance_clamped() {
        // 正总电荷但负样本位于远端：方差为负
        let m = compute_roi_moments(0, &[-1.0, 0.0, 3.0, 0.0, -1.0]);
        assert_eq!(m.total_q, 1.0);
        assert!((m.center - 2.0).abs() < 1e-12);
        assert_eq!(m.sigma, 0.0);
    }
}
