//! 核心标识类型
//!
//! 通道、平面以及 ROI / 子ROI 的强类型复合键。复合键替代裸整数对，
//! 防止 (channel, roi_index) 与 (roi_index, sub_index) 被误换顺序。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 读出通道编号
pub type ChannelId = u32;

/// 丝平面（两个感应面 U/V 与收集面 Y）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Plane {
    U,
    V,
    Y,
}

impl Plane {
    /// 全部平面（按索引顺序）
    pub const ALL: [Plane; 3] = [Plane::U, Plane::V, Plane::Y];

    /// 平面索引 (0, 1, 2)
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Plane::U => 0,
            Plane::V => 1,
            Plane::Y => 2,
        }
    }

    /// 从索引构造平面
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plane::U => "U",
            Plane::V => "V",
            Plane::Y => "Y",
        };
        f.write_str(name)
    }
}

/// 事件内 ROI 的唯一键：(通道, 该通道上的ROI序号)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoiKey {
    pub channel: ChannelId,
    pub roi_index: usize,
}

impl RoiKey {
    pub fn new(channel: ChannelId, roi_index: usize) -> Self {
        Self { channel, roi_index }
    }
}

/// 子ROI键：所属ROI + ROI内的子ROI序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubRoiKey {
    pub roi: RoiKey,
    pub sub_index: usize,
}

impl SubRoiKey {
    pub fn new(roi: RoiKey, sub_index: usize) -> Self {
        Self { roi, sub_index }
    }
}
