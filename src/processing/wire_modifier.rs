//! 稀疏波形系统性修改（电荷重分配驱动）
//!
//! 每个事件的流程：
//! 1. 把所有真实沉积投影到三个平面，建立 ROI → 沉积 匹配表（事件级缓存，不跨事件复用）
//! 2. 按通道分组重建脉冲
//! 3. 对有匹配沉积的 ROI：构建子ROI、匹配沉积、查询缩放值、就地重分配电荷
//!
//! 步骤 3 各通道相互独立，使用 rayon 并行。

use super::config::ModifierConfig;
use crate::core::calibration::ChannelMap;
use crate::core::matching::{
    ScaleDecision, build_sub_rois, match_deposits_to_sub_rois, sub_roi_scale,
};
use crate::core::projection::{project_deposit, x_to_tick};
use crate::core::redistributor::modify_roi;
use crate::core::roi_moments::compute_roi_moments;
use crate::core::scale::{ScaleSurface, ScaleValues};
use crate::core::types::{ChannelId, RoiKey};
use crate::event::{EnergyDeposit, Hit, Wire};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// ROI → 匹配沉积序号
pub type RoiMatchMap = BTreeMap<RoiKey, Vec<usize>>;

/// 修改统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModifierReport {
    /// 有效投影（落在某个ROI内）的数量
    pub projections_matched: usize,
    /// 有匹配沉积、实际进行重分配的 ROI 数
    pub rois_modified: usize,
    /// 没有匹配沉积、保持不变的 ROI 数
    pub rois_untouched: usize,
    pub sub_rois: usize,
    pub sub_rois_scaled: usize,
    pub sub_rois_unmatched: usize,
    pub sub_rois_guarded: usize,
    pub sub_rois_non_finite: usize,
    /// 通道号不属于任何平面而跳过的波形数
    pub wires_skipped: usize,
}

impl ModifierReport {
    fn merge(mut self, other: ModifierReport) -> ModifierReport {
        self.projections_matched += other.projections_matched;
        self.rois_modified += other.rois_modified;
        self.rois_untouched += other.rois_untouched;
        self.sub_rois += other.sub_rois;
        self.sub_rois_scaled += other.sub_rois_scaled;
        self.sub_rois_unmatched += other.sub_rois_unmatched;
        self.sub_rois_guarded += other.sub_rois_guarded;
        self.sub_rois_non_finite += other.sub_rois_non_finite;
        self.wires_skipped += other.wires_skipped;
        self
    }

    fn record(&mut self, decision: &ScaleDecision) {
        match decision {
            ScaleDecision::Unmatched => self.sub_rois_unmatched += 1,
            ScaleDecision::Guarded => self.sub_rois_guarded += 1,
            ScaleDecision::NonFinite => self.sub_rois_non_finite += 1,
            ScaleDecision::Scaled(_) => self.sub_rois_scaled += 1,
        }
    }
}

/// 建立 ROI → 沉积 匹配表
///
/// 每个沉积在三个平面上各有一个投影；投影的取整 tick 落在目标通道的某个 ROI 内即记为匹配，
/// 落在空白区的投影忽略。
pub fn build_roi_match_map<M: ChannelMap + ?Sized>(
    wires: &[Wire],
    deposits: &[EnergyDeposit],
    channel_map: &M,
    tick_offset: f64,
) -> RoiMatchMap {
    let wire_index: HashMap<ChannelId, usize> = wires
        .iter()
        .enumerate()
        .map(|(idx, wire)| (wire.channel, idx))
        .collect();

    let mut matches = RoiMatchMap::new();
    for (deposit_index, deposit) in deposits.iter().enumerate() {
        for target in project_deposit(deposit, channel_map, tick_offset) {
            let Some(&idx) = wire_index.get(&target.channel) else {
                continue;
            };
            if let Some(roi_index) = wires[idx].roi_index_at(target.rounded_tick()) {
                matches
                    .entry(RoiKey::new(target.channel, roi_index))
                    .or_default()
                    .push(deposit_index);
            }
        }
    }
    matches
}

/// 按通道分组重建脉冲
pub fn group_hits_by_channel(hits: &[Hit]) -> HashMap<ChannelId, Vec<Hit>> {
    let mut grouped: HashMap<ChannelId, Vec<Hit>> = HashMap::new();
    for hit in hits {
        grouped.entry(hit.channel).or_default().push(*hit);
    }
    grouped
}

/// 电荷重分配驱动
pub struct WireModifier<'a, M: ?Sized, S: ?Sized> {
    config: &'a ModifierConfig,
    channel_map: &'a M,
    scales: &'a S,
}

impl<'a, M, S> WireModifier<'a, M, S>
where
    M: ChannelMap + ?Sized,
    S: ScaleSurface + ?Sized,
{
    pub fn new(config: &'a ModifierConfig, channel_map: &'a M, scales: &'a S) -> Self {
        Self {
            config,
            channel_map,
            scales,
        }
    }

    /// 就地修改一个事件的全部稀疏波形
    pub fn modify(
        &self,
        wires: &mut [Wire],
        hits: &[Hit],
        deposits: &[EnergyDeposit],
    ) -> ModifierReport {
        let matches =
            build_roi_match_map(wires, deposits, self.channel_map, self.config.tick_offset);
        let hits_by_channel = group_hits_by_channel(hits);

        let mut report = ModifierReport {
            projections_matched: matches.values().map(Vec::len).sum(),
            ..ModifierReport::default()
        };

        let per_wire = wires
            .par_iter_mut()
            .map(|wire| {
                let channel_hits = hits_by_channel
                    .get(&wire.channel)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                self.modify_wire(wire, &matches, channel_hits, deposits)
            })
            .reduce(ModifierReport::default, ModifierReport::merge);

        report = report.merge(per_wire);
        debug!(
            rois_modified = report.rois_modified,
            sub_rois = report.sub_rois,
            guarded = report.sub_rois_guarded,
            "电荷重分配完成"
        );
        report
    }

    fn modify_wire(
        &self,
        wire: &mut Wire,
        matches: &RoiMatchMap,
        hits: &[Hit],
        deposits: &[EnergyDeposit],
    ) -> ModifierReport {
        let mut report = ModifierReport::default();
        let Some(plane) = self.channel_map.plane_of(wire.channel) else {
            debug!(channel = wire.channel, "通道不属于任何平面，跳过");
            report.wires_skipped = 1;
            return report;
        };

        let channel = wire.channel;
        for (roi_index, roi) in wire.rois.iter_mut().enumerate() {
            let key = RoiKey::new(channel, roi_index);
            let Some(deposit_indices) = matches.get(&key) else {
                report.rois_untouched += 1;
                continue;
            };

            let moments = compute_roi_moments(roi.begin, &roi.data);
            let sub_rois = build_sub_rois(key, &moments, hits);
            let deposit_ticks: Vec<(usize, f64)> = deposit_indices
                .iter()
                .map(|&idx| (idx, x_to_tick(deposits[idx].x, self.config.tick_offset)))
                .collect();
            let sub_matches = match_deposits_to_sub_rois(&sub_rois, &deposit_ticks);

            let mut scales: BTreeMap<_, ScaleValues> = BTreeMap::new();
            for sub in &sub_rois {
                let matched: Vec<&EnergyDeposit> = sub_matches
                    .get(&sub.key)
                    .map(|indices| indices.iter().map(|&idx| &deposits[idx]).collect())
                    .unwrap_or_default();
                let decision =
                    sub_roi_scale(sub, &matched, self.scales, plane, self.config.tick_offset);
                report.record(&decision);
                scales.insert(sub.key, decision.values());
            }

            modify_roi(&mut roi.data, &moments, &sub_rois, &scales);
            report.rois_modified += 1;
            report.sub_rois += sub_rois.len();
        }
        report
    }
}
