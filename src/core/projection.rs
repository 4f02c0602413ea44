//! 真实沉积 → (通道, tick) 线性投影

use super::calibration::ChannelMap;
use super::parameters::geometry::{
    A_T, A_W, C_T, C_U, C_V, C_Y, COS_SIXTY, NUM_TICKS, SIN_SIXTY,
};
use super::types::{ChannelId, Plane};
use crate::event::EnergyDeposit;

/// 沉积在某一平面上的投影目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetTick {
    pub plane: Plane,
    pub channel: ChannelId,
    /// 连续 tick（用于子ROI距离计算）
    pub tick: f64,
}

impl TargetTick {
    /// 取整后的 tick（用于ROI查找）
    #[inline]
    pub fn rounded_tick(&self) -> usize {
        self.tick.round() as usize
    }
}

/// 漂移坐标 x → tick
#[inline]
pub fn x_to_tick(x: f64, tick_offset: f64) -> f64 {
    A_T * x + C_T + tick_offset
}

/// 平面上的丝坐标（未取整）
#[inline]
pub fn wire_coordinate(plane: Plane, y: f64, z: f64) -> f64 {
    match plane {
        Plane::U => A_W * (-SIN_SIXTY * y + COS_SIXTY * z) + C_U,
        Plane::V => A_W * (SIN_SIXTY * y + COS_SIXTY * z) + C_V,
        Plane::Y => A_W * z + C_Y,
    }
}

/// 把沉积投影到三个平面
///
/// 读出窗口外的 tick 整体丢弃；超出平面通道范围的投影单独丢弃。
pub fn project_deposit<M: ChannelMap + ?Sized>(
    deposit: &EnergyDeposit,
    channel_map: &M,
    tick_offset: f64,
) -> Vec<TargetTick> {
    let tick = x_to_tick(deposit.x, tick_offset);
    let rounded = tick.round();
    if !(0.0..NUM_TICKS as f64).contains(&rounded) {
        return Vec::new();
    }

    Plane::ALL
        .into_iter()
        .filter_map(|plane| {
            let channel = wire_coordinate(plane, deposit.y, deposit.z).round();
            let (begin, end) = channel_map.channel_range(plane);
            (channel >= f64::from(begin) && channel < f64::from(end)).then_some(TargetTick {
                plane,
                channel: channel as ChannelId,
                tick,
            })
        })
        .collect()
}
