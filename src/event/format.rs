//! 事件数据格式
//!
//! 单个事件的输入/输出数据产品：原始ADC波形、稀疏ROI波形、重建脉冲与真实能量沉积。
//! 全部通过 serde 以 JSON 读写。

use crate::core::types::ChannelId;
use crate::error::{RoiError, RoiResult};
use serde::{Deserialize, Serialize};

/// 三维点 (cm)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 单通道原始ADC波形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDigit {
    pub channel: ChannelId,
    pub adcs: Vec<i16>,
}

/// 一段连续的非空 tick 区间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    /// 起始 tick（含）
    pub begin: usize,
    pub data: Vec<f32>,
}

impl Roi {
    pub fn new(begin: usize, data: Vec<f32>) -> Self {
        Self { begin, data }
    }

    /// 结束 tick（不含）
    #[inline]
    pub fn end(&self) -> usize {
        self.begin + self.data.len()
    }
}

/// 单通道稀疏波形（按 begin 排序、互不重叠的 ROI 列表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub channel: ChannelId,
    #[serde(default)]
    pub rois: Vec<Roi>,
}

impl Wire {
    pub fn new(channel: ChannelId, rois: Vec<Roi>) -> Self {
        Self { channel, rois }
    }

    /// 校验 ROI 有序、非空且互不重叠
    pub fn validate(&self) -> RoiResult<()> {
        for (index, roi) in self.rois.iter().enumerate() {
            if roi.data.is_empty() {
                return Err(RoiError::InvalidInput(format!(
                    "通道 {} 的第 {index} 个ROI为空",
                    self.channel
                )));
            }
        }
        for pair in self.rois.windows(2) {
            if pair[1].begin < pair[0].end() {
                return Err(RoiError::InvalidInput(format!(
                    "通道 {} 的ROI重叠或乱序: [{}, {}) 与 [{}, {})",
                    self.channel,
                    pair[0].begin,
                    pair[0].end(),
                    pair[1].begin,
                    pair[1].end()
                )));
            }
        }
        Ok(())
    }

    /// 包含 `tick` 的 ROI 序号；落在空白区返回 `None`
    pub fn roi_index_at(&self, tick: usize) -> Option<usize> {
        let idx = self.rois.partition_point(|roi| roi.begin <= tick);
        let candidate = idx.checked_sub(1)?;
        (tick < self.rois[candidate].end()).then_some(candidate)
    }
}

/// 重建脉冲（hit）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub channel: ChannelId,
    /// 峰值时间 (tick)
    pub peak_time: f32,
    /// 积分电荷 (ADC·tick)
    pub integral: f32,
    /// 高斯拟合宽度 (tick)
    pub rms: f32,
}

/// 真实能量沉积（模拟步）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyDeposit {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub track_id: i32,
    /// 沉积能量 (MeV)
    pub energy: f64,
    /// 电离电子数
    #[serde(default)]
    pub num_electrons: f64,
    #[serde(default)]
    pub step_start: Point3,
    #[serde(default)]
    pub step_end: Point3,
    #[serde(default)]
    pub step_length: f64,
}

/// 单个事件的全部数据产品
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub run: u32,
    pub subrun: u32,
    pub event: u32,
    pub raw_digits: Vec<RawDigit>,
    pub wires: Vec<Wire>,
    pub hits: Vec<Hit>,
    pub deposits: Vec<EnergyDeposit>,
}

impl Event {
    /// 事件标识 "run:subrun:event"
    pub fn id_string(&self) -> String {
        format!("{}:{}:{}", self.run, self.subrun, self.event)
    }

    /// 校验所有通道的ROI布局
    pub fn validate(&self) -> RoiResult<()> {
        self.wires.iter().try_for_each(Wire::validate)
    }
}
