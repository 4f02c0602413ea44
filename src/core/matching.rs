//! 子ROI构建、沉积匹配与真实属性汇总
//!
//! 每个ROI按其中的重建脉冲划分子ROI（无脉冲时整体作为一个子ROI）；
//! 沉积按归一化距离 |tick − center| / sigma 分配给最近的子ROI，
//! 再按径迹分组汇总真实属性，逐径迹查询缩放值并按能量加权平均。

use super::parameters::geometry::A_T;
use super::parameters::modifier::{GUARD_MAX_CHARGE, GUARD_MIN_ENERGY, MATCH_DISTANCE_SIGMA};
use super::projection::x_to_tick;
use super::roi_moments::RoiMoments;
use super::scale::{ScaleSurface, ScaleValues, TruthProperties};
use super::types::{Plane, RoiKey, SubRoiKey};
use crate::event::{EnergyDeposit, Hit};
use std::collections::BTreeMap;

/// 子ROI统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubRoi {
    pub key: SubRoiKey,
    /// 中心（绝对 tick）
    pub center: f64,
    pub sigma: f64,
    pub total_q: f64,
}

impl SubRoi {
    /// 沉积 tick 到子ROI中心的归一化距离；退化宽度下只有恰好位于中心才为 0
    pub fn normalized_distance(&self, tick: f64) -> f64 {
        let distance = ((tick - self.center) / self.sigma).abs();
        if distance.is_nan() { f64::INFINITY } else { distance }
    }
}

/// 由ROI内的脉冲构建子ROI；没有脉冲时用ROI整体矩构建一个子ROI
pub fn build_sub_rois(roi_key: RoiKey, moments: &RoiMoments, hits: &[Hit]) -> Vec<SubRoi> {
    let mut sub_rois: Vec<SubRoi> = hits
        .iter()
        .filter(|hit| moments.contains_tick(f64::from(hit.peak_time)))
        .map(|hit| (f64::from(hit.peak_time), f64::from(hit.rms), f64::from(hit.integral)))
        .collect::<Vec<_>>()
        .into_iter()
        .enumerate()
        .map(|(sub_index, (center, sigma, total_q))| SubRoi {
            key: SubRoiKey::new(roi_key, sub_index),
            center,
            sigma,
            total_q,
        })
        .collect();

    if sub_rois.is_empty() {
        sub_rois.push(SubRoi {
            key: SubRoiKey::new(roi_key, 0),
            center: moments.center,
            sigma: moments.sigma,
            total_q: moments.total_q,
        });
    }

    sub_rois
}

/// 把沉积分配到最近的子ROI
///
/// `deposit_ticks` 为 (沉积序号, 连续 tick)。距离超过 `MATCH_DISTANCE_SIGMA` 的沉积不匹配。
pub fn match_deposits_to_sub_rois(
    sub_rois: &[SubRoi],
    deposit_ticks: &[(usize, f64)],
) -> BTreeMap<SubRoiKey, Vec<usize>> {
    let mut matched: BTreeMap<SubRoiKey, Vec<usize>> = BTreeMap::new();

    for &(deposit_index, tick) in deposit_ticks {
        let nearest = sub_rois
            .iter()
            .map(|sub| (sub.key, sub.normalized_distance(tick)))
            .fold(None, |best: Option<(SubRoiKey, f64)>, (key, distance)| match best {
                Some((_, best_distance)) if best_distance <= distance => best,
                _ => Some((key, distance)),
            });

        if let Some((key, distance)) = nearest
            && distance <= MATCH_DISTANCE_SIGMA
        {
            matched.entry(key).or_default().push(deposit_index);
        }
    }

    matched
}

/// 汇总一组沉积的真实属性（能量加权；总能量为 0 时退化为等权）
pub fn truth_properties(deposits: &[&EnergyDeposit], tick_offset: f64) -> TruthProperties {
    let mut props = TruthProperties::default();
    if deposits.is_empty() {
        return props;
    }

    let total_energy: f64 = deposits.iter().map(|d| d.energy).sum();
    let weight = |d: &EnergyDeposit| if total_energy > 0.0 { d.energy } else { 1.0 };
    let weight_sum: f64 = deposits.iter().map(|d| weight(d)).sum();

    for d in deposits {
        let w = weight(d);
        props.x += w * d.x;
        props.y += w * d.y;
        props.z += w * d.z;
    }
    props.x /= weight_sum;
    props.y /= weight_sum;
    props.z /= weight_sum;

    let x_var: f64 = deposits
        .iter()
        .map(|d| weight(d) * (d.x - props.x) * (d.x - props.x))
        .sum::<f64>()
        / weight_sum;
    props.x_rms = x_var.max(0.0).sqrt();

    props.tick = x_to_tick(props.x, tick_offset);
    props.tick_rms = A_T * props.x_rms;

    props.total_energy = total_energy;
    props.total_charge = deposits.iter().map(|d| d.num_electrons).sum();

    // 方向：能量加权的单位步长向量之和
    let (mut dx, mut dy, mut dz) = (0.0, 0.0, 0.0);
    for d in deposits {
        let sx = d.step_end.x - d.step_start.x;
        let sy = d.step_end.y - d.step_start.y;
        let sz = d.step_end.z - d.step_start.z;
        let norm = (sx * sx + sy * sy + sz * sz).sqrt();
        if norm > 0.0 {
            let w = weight(d);
            dx += w * sx / norm;
            dy += w * sy / norm;
            dz += w * sz / norm;
        }
    }
    let norm = (dx * dx + dy * dy + dz * dz).sqrt();
    if norm > 0.0 {
        props.dxdr = dx / norm;
        props.dydr = dy / norm;
        props.dzdr = dz / norm;
    }

    let total_length: f64 = deposits.iter().map(|d| d.step_length).sum();
    if total_length > 0.0 {
        props.dedr = total_energy / total_length;
    }

    props
}

/// 子ROI缩放决策
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleDecision {
    /// 没有匹配的沉积
    Unmatched,
    /// 低能量高电荷保护，强制单位缩放
    Guarded,
    /// 曲面给出非有限值，回落单位缩放
    NonFinite,
    /// 正常缩放
    Scaled(ScaleValues),
}

impl ScaleDecision {
    /// 实际应用的缩放值
    pub fn values(&self) -> ScaleValues {
        match self {
            ScaleDecision::Scaled(values) => *values,
            _ => ScaleValues::IDENTITY,
        }
    }
}

/// 计算单个子ROI的缩放值
///
/// 沉积按 `track_id` 分组，每条径迹单独查询曲面，结果按径迹能量加权平均。
pub fn sub_roi_scale<S: ScaleSurface + ?Sized>(
    sub_roi: &SubRoi,
    matched: &[&EnergyDeposit],
    surface: &S,
    plane: Plane,
    tick_offset: f64,
) -> ScaleDecision {
    if matched.is_empty() {
        return ScaleDecision::Unmatched;
    }

    let total_energy: f64 = matched.iter().map(|d| d.energy).sum();
    if total_energy < GUARD_MIN_ENERGY && sub_roi.total_q > GUARD_MAX_CHARGE {
        return ScaleDecision::Guarded;
    }

    let mut by_track: BTreeMap<i32, Vec<&EnergyDeposit>> = BTreeMap::new();
    for &d in matched {
        by_track.entry(d.track_id).or_default().push(d);
    }

    let mut weight_sum = 0.0;
    let mut r_q = 0.0;
    let mut r_sigma = 0.0;
    for track_deposits in by_track.values() {
        let props = truth_properties(track_deposits, tick_offset);
        let scales = surface.lookup(&props, plane);
        let w = if total_energy > 0.0 { props.total_energy } else { 1.0 };
        weight_sum += w;
        r_q += w * scales.r_q;
        r_sigma += w * scales.r_sigma;
    }

    let scales = ScaleValues::new(r_q / weight_sum, r_sigma / weight_sum);
    if scales.is_finite() {
        ScaleDecision::Scaled(scales)
    } else {
        ScaleDecision::NonFinite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roi_moments::compute_roi_moments;
    use crate::event::Point3;

    fn deposit(x: f64, energy: f64, track_id: i32) -> EnergyDeposit {
        EnergyDeposit {
            x,
            y: 0.0,
            z: 0.0,
            track_id,
            energy,
            num_electrons: energy * 4.0e4,
            step_start: Point3::new(0.0, 0.0, 0.0),
            step_end: Point3::new(0.0, 0.0, 1.0),
            step_length: 1.0,
        }
    }

    struct ByTrackEnergy;

    impl ScaleSurface for ByTrackEnergy {
        fn lookup(&self, truth: &TruthProperties, _plane: Plane) -> ScaleValues {
            ScaleValues::new(truth.total_energy, 2.0)
        }
    }

    fn key(sub_index: usize) -> SubRoiKey {
        SubRoiKey::new(RoiKey::new(5000, 0), sub_index)
    }

    fn sub(sub_index: usize, center: f64, sigma: f64, total_q: f64) -> SubRoi {
        SubRoi {
            key: key(sub_index),
            center,
            sigma,
            total_q,
        }
    }

    #[test]
    fn test_sub_rois_from_hits() {
        let moments = compute_roi_moments(100, &[1.0; 20]);
        let hits = [
            Hit {
                channel: 5000,
                peak_time: 104.0,
                integral: 50.0,
                rms: 2.0,
            },
            Hit {
                channel: 5000,
                peak_time: 150.0,
                integral: 10.0,
                rms: 2.0,
            },
            Hit {
                channel: 5000,
                peak_time: 115.0,
                integral: 30.0,
                rms: 3.0,
            },
        ];
        let subs = build_sub_rois(RoiKey::new(5000, 0), &moments, &hits);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].key.sub_index, 0);
        assert_eq!(subs[1].center, 115.0);
        assert_eq!(subs[1].key.sub_index, 1);
    }

    #[test]
    fn test_sub_roi_fallback_to_moments() {
        let moments = compute_roi_moments(100, &[1.0, 2.0, 1.0]);
        let subs = build_sub_rois(RoiKey::new(5000, 0), &moments, &[]);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].center, moments.center);
        assert_eq!(subs[0].total_q, 4.0);
    }

    #[test]
    fn test_nearest_center_wins_over_first_match() {
        // 两个子ROI都在 2.5σ 内：第一个距离 2σ，第二个距离 0.5σ
        let subs = [sub(0, 100.0, 2.0, 10.0), sub(1, 105.0, 2.0, 10.0)];
        let matched = match_deposits_to_sub_rois(&subs, &[(7, 104.0)]);
        assert_eq!(matched.get(&key(1)), Some(&vec![7]));
        assert!(!matched.contains_key(&key(0)));
    }

    #[test]
    fn test_deposit_outside_threshold_unmatched() {
        let subs = [sub(0, 100.0, 2.0, 10.0)];
        let matched = match_deposits_to_sub_rois(&subs, &[(0, 105.0), (1, 106.0)]);
        // 2.5σ = 5 tick：105 恰在边界上匹配，106 不匹配
        assert_eq!(matched.get(&key(0)), Some(&vec![0]));
    }

    #[test]
    fn test_truth_properties_energy_weighted() {
        let a = deposit(10.0, 1.0, 1);
        let b = deposit(20.0, 3.0, 1);
        let props = truth_properties(&[&a, &b], 0.0);
        assert!((props.x - 17.5).abs() < 1e-12);
        // 方差 (1·7.5² + 3·2.5²) / 4 = 18.75
        assert!((props.x_rms - 18.75f64.sqrt()).abs() < 1e-12);
        assert!((props.tick - x_to_tick(17.5, 0.0)).abs() < 1e-9);
        assert!((props.tick_rms - A_T * props.x_rms).abs() < 1e-9);
        assert_eq!(props.total_energy, 4.0);
        assert_eq!(props.dzdr, 1.0);
        assert_eq!(props.dedr, 2.0);
    }

    #[test]
    fn test_guard_forces_identity() {
        let d = deposit(10.0, 0.1, 1);
        let decision = sub_roi_scale(&sub(0, 0.0, 1.0, 100.0), &[&d], &ByTrackEnergy, Plane::Y, 0.0);
        assert_eq!(decision, ScaleDecision::Guarded);
        assert_eq!(decision.values(), ScaleValues::IDENTITY);

        // 电荷不大时不触发保护
        let decision = sub_roi_scale(&sub(0, 0.0, 1.0, 50.0), &[&d], &ByTrackEnergy, Plane::Y, 0.0);
        assert!(matches!(decision, ScaleDecision::Scaled(_)));
    }

    #[test]
    fn test_unmatched_is_identity() {
        let decision = sub_roi_scale(&sub(0, 0.0, 1.0, 100.0), &[], &ByTrackEnergy, Plane::U, 0.0);
        assert_eq!(decision.values(), ScaleValues::IDENTITY);
    }

    #[test]
    fn test_per_track_energy_average() {
        // 径迹1能量 1，径迹2能量 3：r_Q = (1·1 + 3·3) / 4
        let a = deposit(10.0, 1.0, 1);
        let b = deposit(12.0, 3.0, 2);
        let decision = sub_roi_scale(&sub(0, 0.0, 1.0, 10.0), &[&a, &b], &ByTrackEnergy, Plane::V, 0.0);
        assert_eq!(decision, ScaleDecision::Scaled(ScaleValues::new(2.5, 2.0)));
    }
}
