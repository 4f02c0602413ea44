//! 流水线配置
//!
//! 各阶段配置均可从 JSON 反序列化，缺省字段使用默认值；
//! 加载后统一调用 [`PipelineConfig::validate`] 检查取值范围。

use crate::core::calibration::PlaneCalibration;
use crate::core::parameters::filter::{MAX_PEDESTAL_DIFF, RMS_REJECTION_CUT, TRUNC_MEAN_FRACTION};
use crate::core::scale::ScaleModelConfig;
use crate::error::{RoiResult, config_error, format_error};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 通道质量过滤配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 截断比例（丢弃的样本比例）
    pub trunc_mean_fraction: f32,
    /// 各平面截断RMS拒绝阈值 (U, V, Y)
    pub rms_rejection_cut: [f64; 3],
    /// 截断均值与基座差异告警阈值
    pub max_pedestal_diff: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            trunc_mean_fraction: TRUNC_MEAN_FRACTION,
            rms_rejection_cut: RMS_REJECTION_CUT,
            max_pedestal_diff: MAX_PEDESTAL_DIFF,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> RoiResult<()> {
        if !(0.0..1.0).contains(&self.trunc_mean_fraction) {
            return Err(config_error(format!(
                "截断比例必须位于 [0, 1): {}",
                self.trunc_mean_fraction
            )));
        }
        if let Some(cut) = self.rms_rejection_cut.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(config_error(format!("RMS拒绝阈值必须为正数: {cut}")));
        }
        if !(self.max_pedestal_diff >= 0.0) {
            return Err(config_error(format!(
                "基座差异阈值不能为负: {}",
                self.max_pedestal_diff
            )));
        }
        Ok(())
    }
}

/// ROI 基线扣除配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// 是否把估计的基线从ROI样本中扣除（否则只报告）
    pub subtract: bool,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self { subtract: true }
    }
}

/// 电荷重分配配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierConfig {
    /// 真实 x → tick 映射的附加偏移
    pub tick_offset: f64,
    /// 各缩放曲面开关
    pub scales: ScaleModelConfig,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            tick_offset: 0.0,
            scales: ScaleModelConfig::default(),
        }
    }
}

impl ModifierConfig {
    pub fn validate(&self) -> RoiResult<()> {
        if !self.tick_offset.is_finite() {
            return Err(config_error(format!("tick偏移必须为有限值: {}", self.tick_offset)));
        }
        Ok(())
    }
}

/// 完整流水线配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub baseline: BaselineConfig,
    pub modifier: ModifierConfig,
    pub calibration: PlaneCalibration,
}

impl PipelineConfig {
    /// 从 JSON 文件加载并校验
    pub fn from_json_file(path: &Path) -> RoiResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: PipelineConfig = serde_json::from_str(&text)
            .map_err(|e| format_error(&format!("配置文件 {}", path.display()), e))?;
        config.modifier.scales = config.modifier.scales.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RoiResult<()> {
        self.filter.validate()?;
        self.modifier.validate()?;
        if let Some(noise) = self
            .calibration
            .decon_noise
            .iter()
            .find(|n| !(n.is_finite() && **n >= 0.0))
        {
            return Err(config_error(format!("噪声值不能为负: {noise}")));
        }
        Ok(())
    }
}
