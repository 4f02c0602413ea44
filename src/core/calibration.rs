//! 外部几何/标定服务的注入接口
//!
//! 通道→平面映射、基座值、去卷积噪声在框架中由数据库服务提供；
//! 这里以纯查询 trait 表示，并给出 MicroBooNE 默认实现。

use super::parameters::geometry;
use super::types::{ChannelId, Plane};
use serde::{Deserialize, Serialize};

/// 通道→平面映射
pub trait ChannelMap: Send + Sync {
    /// 通道所在平面，非法通道返回 `None`
    fn plane_of(&self, channel: ChannelId) -> Option<Plane>;

    /// 通道总数
    fn num_channels(&self) -> u32;

    /// 平面的通道范围 [begin, end)
    fn channel_range(&self, plane: Plane) -> (ChannelId, ChannelId);
}

/// MicroBooNE 默认通道布局：U 0–2399，V 2400–4799，Y 4800–8255
#[derive(Debug, Clone, Copy, Default)]
pub struct UBooNEChannelMap;

impl ChannelMap for UBooNEChannelMap {
    fn plane_of(&self, channel: ChannelId) -> Option<Plane> {
        Plane::ALL.into_iter().find(|&plane| {
            let (begin, end) = self.channel_range(plane);
            (begin..end).contains(&channel)
        })
    }

    fn num_channels(&self) -> u32 {
        geometry::NUM_CHANNELS
    }

    fn channel_range(&self, plane: Plane) -> (ChannelId, ChannelId) {
        match plane {
            Plane::U => geometry::U_CHANNELS,
            Plane::V => geometry::V_CHANNELS,
            Plane::Y => geometry::Y_CHANNELS,
        }
    }
}

/// 基座（pedestal）查询
///
/// `plane` 由调用方通过其 [`ChannelMap`] 解析，提供者不自行推断通道布局。
pub trait PedestalProvider: Send + Sync {
    fn pedestal_mean(&self, channel: ChannelId, plane: Plane) -> f32;
}

/// 去卷积后电子学噪声查询（未乘 `DECON_NOISE_SCALE`）
pub trait NoiseProvider: Send + Sync {
    fn decon_noise(&self, channel: ChannelId, plane: Plane) -> f32;
}

/// 按平面给定的基座与噪声表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneCalibration {
    /// 各平面基座 (U, V, Y)
    pub pedestals: [f32; 3],
    /// 各平面去卷积噪声 (U, V, Y)
    pub decon_noise: [f32; 3],
}

impl Default for PlaneCalibration {
    fn default() -> Self {
        Self {
            pedestals: [2048.0, 2048.0, 400.0],
            decon_noise: [3.0, 3.0, 2.0],
        }
    }
}

impl PedestalProvider for PlaneCalibration {
    fn pedestal_mean(&self, _channel: ChannelId, plane: Plane) -> f32 {
        self.pedestals[plane.index()]
    }
}

impl NoiseProvider for PlaneCalibration {
    fn decon_noise(&self, _channel: ChannelId, plane: Plane) -> f32 {
        self.decon_noise[plane.index()]
    }
}
