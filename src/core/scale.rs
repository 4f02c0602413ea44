//! 电荷 / 宽度缩放模型
//!
//! 标定曲面在框架中是按平面存储的样条与二维插值图；这里抽象为
//! [`ScaleSurface`] trait（`f(truth, plane) -> ScaleValues`），每个曲面由配置开关独立启用，
//! 多个启用的曲面按乘法组合。
//!
//! 内置实现仅使用分段线性 / 双线性插值，不绑定任何特定插值库。

use super::parameters::geometry::{COS_SIXTY, SIN_SIXTY};
use super::types::Plane;
use crate::error::{RoiError, RoiResult, config_error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 缩放值 (r_Q, r_sigma)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleValues {
    pub r_q: f64,
    pub r_sigma: f64,
}

impl ScaleValues {
    /// 单位缩放（不修改）
    pub const IDENTITY: ScaleValues = ScaleValues {
        r_q: 1.0,
        r_sigma: 1.0,
    };

    pub fn new(r_q: f64, r_sigma: f64) -> Self {
        Self { r_q, r_sigma }
    }

    /// 逐分量相乘
    #[inline]
    pub fn combine(self, other: ScaleValues) -> ScaleValues {
        ScaleValues {
            r_q: self.r_q * other.r_q,
            r_sigma: self.r_sigma * other.r_sigma,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.r_q.is_finite() && self.r_sigma.is_finite()
    }
}

impl Default for ScaleValues {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 一组真实能量沉积的汇总属性
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TruthProperties {
    /// 能量加权平均位置 (cm)
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// 漂移方向能量加权RMS (cm)
    pub x_rms: f64,
    /// 对应的 tick 与 tick RMS
    pub tick: f64,
    pub tick_rms: f64,
    /// 总真实能量 (MeV)
    pub total_energy: f64,
    /// 总电离电子数
    pub total_charge: f64,
    /// 单位方向向量
    pub dxdr: f64,
    pub dydr: f64,
    pub dzdr: f64,
    /// dE/dx (MeV/cm)
    pub dedr: f64,
}

impl TruthProperties {
    /// 平面局部坐标下的 (θ_xz, θ_yz)，单位：度
    ///
    /// 感应面先把 (y, z) 方向分量旋转 ∓60°，使 z' 垂直于该平面的丝。
    pub fn plane_angles(&self, plane: Plane) -> (f64, f64) {
        let (dy, dz) = match plane {
            Plane::U => (
                COS_SIXTY * self.dydr + SIN_SIXTY * self.dzdr,
                COS_SIXTY * self.dzdr - SIN_SIXTY * self.dydr,
            ),
            Plane::V => (
                COS_SIXTY * self.dydr - SIN_SIXTY * self.dzdr,
                COS_SIXTY * self.dzdr + SIN_SIXTY * self.dydr,
            ),
            Plane::Y => (self.dydr, self.dzdr),
        };
        let theta_xz = self.dxdr.atan2(dz).to_degrees();
        let theta_yz = dy.atan2(dz).to_degrees();
        (theta_xz, theta_yz)
    }
}

/// 标定曲面接口
pub trait ScaleSurface: Send + Sync {
    fn lookup(&self, truth: &TruthProperties, plane: Plane) -> ScaleValues;
}

/// 一维曲线的自变量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleAxis {
    X,
    Y,
    Z,
    XzAngle,
    YzAngle,
    DEdX,
}

impl ScaleAxis {
    /// 从真实属性中取出自变量
    pub fn value(self, truth: &TruthProperties, plane: Plane) -> f64 {
        match self {
            ScaleAxis::X => truth.x,
            ScaleAxis::Y => truth.y,
            ScaleAxis::Z => truth.z,
            ScaleAxis::XzAngle => truth.plane_angles(plane).0,
            ScaleAxis::YzAngle => truth.plane_angles(plane).1,
            ScaleAxis::DEdX => truth.dedr,
        }
    }
}

/// 分段线性曲线（两端外钳位）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph1D {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Graph1D {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> RoiResult<Self> {
        let graph = Self { x, y };
        graph.validate()?;
        Ok(graph)
    }

    /// 校验：长度一致且自变量严格递增
    pub fn validate(&self) -> RoiResult<()> {
        if self.x.len() != self.y.len() {
            return Err(config_error(format!(
                "曲线点数不一致: x={}, y={}",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(config_error("曲线自变量必须严格递增"));
        }
        Ok(())
    }

    /// 求值；空曲线返回 1.0
    pub fn eval(&self, at: f64) -> f64 {
        let n = self.x.len();
        if n == 0 {
            return 1.0;
        }
        if n == 1 || at <= self.x[0] {
            return self.y[0];
        }
        if at >= self.x[n - 1] {
            return self.y[n - 1];
        }

        // at 严格位于 (x[0], x[n-1]) 内
        let hi = self.x.partition_point(|&x| x <= at);
        let lo = hi - 1;
        let t = (at - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + t * (self.y[hi] - self.y[lo])
    }
}

/// 规则网格双线性插值（两轴外钳位）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid2D {
    /// 第一轴节点（y）
    pub u: Vec<f64>,
    /// 第二轴节点（z）
    pub v: Vec<f64>,
    /// values[i][j] 对应 (u[i], v[j])
    pub values: Vec<Vec<f64>>,
}

impl Grid2D {
    pub fn validate(&self) -> RoiResult<()> {
        if self.values.len() != self.u.len() || self.values.iter().any(|row| row.len() != self.v.len())
        {
            return Err(config_error("二维网格尺寸与节点数不一致"));
        }
        let increasing = |axis: &[f64]| axis.windows(2).all(|w| w[1] > w[0]);
        if !increasing(&self.u) || !increasing(&self.v) {
            return Err(config_error("二维网格节点必须严格递增"));
        }
        Ok(())
    }

    /// 双线性求值；空网格返回 1.0
    pub fn eval(&self, u: f64, v: f64) -> f64 {
        if self.u.is_empty() || self.v.is_empty() {
            return 1.0;
        }
        let (i0, i1, tu) = bracket(&self.u, u);
        let (j0, j1, tv) = bracket(&self.v, v);
        let f00 = self.values[i0][j0];
        let f01 = self.values[i0][j1];
        let f10 = self.values[i1][j0];
        let f11 = self.values[i1][j1];
        let low = f00 + tv * (f01 - f00);
        let high = f10 + tv * (f11 - f10);
        low + tu * (high - low)
    }
}

/// 查找包围 `at` 的节点区间及插值系数（外钳位）
fn bracket(nodes: &[f64], at: f64) -> (usize, usize, f64) {
    let n = nodes.len();
    if n == 1 || at <= nodes[0] {
        return (0, 0, 0.0);
    }
    if at >= nodes[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let hi = nodes.partition_point(|&x| x <= at);
    let lo = hi - 1;
    (lo, hi, (at - nodes[lo]) / (nodes[hi] - nodes[lo]))
}

/// 一组（电荷, 宽度）曲线
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphPair {
    pub charge: Graph1D,
    pub sigma: Graph1D,
}

/// 一组（电荷, 宽度）二维网格
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPair {
    pub charge: Grid2D,
    pub sigma: Grid2D,
}

/// 一维曲线曲面：按平面选曲线，按轴取自变量
#[derive(Debug, Clone)]
pub struct AxisSurface {
    pub axis: ScaleAxis,
    pub planes: [GraphPair; 3],
}

impl ScaleSurface for AxisSurface {
    fn lookup(&self, truth: &TruthProperties, plane: Plane) -> ScaleValues {
        let at = self.axis.value(truth, plane);
        let pair = &self.planes[plane.index()];
        ScaleValues::new(pair.charge.eval(at), pair.sigma.eval(at))
    }
}

/// (y, z) 联合曲面
#[derive(Debug, Clone)]
pub struct YzSurface {
    pub planes: [GridPair; 3],
}

impl ScaleSurface for YzSurface {
    fn lookup(&self, truth: &TruthProperties, plane: Plane) -> ScaleValues {
        let pair = &self.planes[plane.index()];
        ScaleValues::new(
            pair.charge.eval(truth.y, truth.z),
            pair.sigma.eval(truth.y, truth.z),
        )
    }
}

/// 按平面的整体常数缩放
#[derive(Debug, Clone, Copy)]
pub struct OverallScale {
    pub planes: [ScaleValues; 3],
}

impl ScaleSurface for OverallScale {
    fn lookup(&self, _truth: &TruthProperties, plane: Plane) -> ScaleValues {
        self.planes[plane.index()]
    }
}

/// 缩放曲面开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleModelConfig {
    pub apply_x_scale: bool,
    pub apply_y_scale: bool,
    pub apply_z_scale: bool,
    pub apply_yz_scale: bool,
    pub apply_xz_angle_scale: bool,
    pub apply_yz_angle_scale: bool,
    pub apply_dedx_scale: bool,
    pub apply_overall_scale: bool,
}

impl Default for ScaleModelConfig {
    fn default() -> Self {
        Self {
            apply_x_scale: true,
            apply_y_scale: false,
            apply_z_scale: false,
            apply_yz_scale: true,
            apply_xz_angle_scale: true,
            apply_yz_angle_scale: true,
            apply_dedx_scale: true,
            apply_overall_scale: false,
        }
    }
}

impl ScaleModelConfig {
    /// 全部关闭
    pub fn disabled() -> Self {
        Self {
            apply_x_scale: false,
            apply_y_scale: false,
            apply_z_scale: false,
            apply_yz_scale: false,
            apply_xz_angle_scale: false,
            apply_yz_angle_scale: false,
            apply_dedx_scale: false,
            apply_overall_scale: false,
        }
    }

    /// 启用 YZ 联合曲面时关闭独立的 Y / Z 曲面
    pub fn normalized(mut self) -> Self {
        if self.apply_yz_scale {
            self.apply_y_scale = false;
            self.apply_z_scale = false;
        }
        self
    }
}

/// 标定表集合（JSON 文件）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleTables {
    pub x: Option<[GraphPair; 3]>,
    pub y: Option<[GraphPair; 3]>,
    pub z: Option<[GraphPair; 3]>,
    pub xz_angle: Option<[GraphPair; 3]>,
    pub yz_angle: Option<[GraphPair; 3]>,
    pub dedx: Option<[GraphPair; 3]>,
    pub yz: Option<[GridPair; 3]>,
    pub overall: Option<[ScaleValues; 3]>,
}

impl ScaleTables {
    /// 从 JSON 文件读取并校验
    pub fn from_json_file(path: &Path) -> RoiResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let tables: ScaleTables = serde_json::from_str(&text)
            .map_err(|e| RoiError::FormatError(format!("{}: {e}", path.display())))?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn validate(&self) -> RoiResult<()> {
        let graph_sets = [
            &self.x,
            &self.y,
            &self.z,
            &self.xz_angle,
            &self.yz_angle,
            &self.dedx,
        ];
        for set in graph_sets.into_iter().flatten() {
            for pair in set {
                pair.charge.validate()?;
                pair.sigma.validate()?;
            }
        }
        if let Some(grids) = &self.yz {
            for pair in grids {
                pair.charge.validate()?;
                pair.sigma.validate()?;
            }
        }
        Ok(())
    }
}

/// 组合缩放模型：启用曲面按乘法组合
#[derive(Clone, Default)]
pub struct ScaleModel {
    surfaces: Vec<Arc<dyn ScaleSurface>>,
}

impl std::fmt::Debug for ScaleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleModel")
            .field("surfaces", &self.surfaces.len())
            .finish()
    }
}

impl ScaleModel {
    /// 空模型（恒为单位缩放）
    pub fn identity() -> Self {
        Self::default()
    }

    /// 根据开关与标定表构建；开关启用但表缺失时返回配置错误
    pub fn from_config(config: &ScaleModelConfig, tables: &ScaleTables) -> RoiResult<Self> {
        let config = config.normalized();
        let mut model = Self::identity();

        let axis_tables = [
            (config.apply_x_scale, ScaleAxis::X, &tables.x, "x"),
            (config.apply_y_scale, ScaleAxis::Y, &tables.y, "y"),
            (config.apply_z_scale, ScaleAxis::Z, &tables.z, "z"),
            (
                config.apply_xz_angle_scale,
                ScaleAxis::XzAngle,
                &tables.xz_angle,
                "xz_angle",
            ),
            (
                config.apply_yz_angle_scale,
                ScaleAxis::YzAngle,
                &tables.yz_angle,
                "yz_angle",
            ),
            (config.apply_dedx_scale, ScaleAxis::DEdX, &tables.dedx, "dedx"),
        ];

        for (enabled, axis, table, name) in axis_tables {
            if !enabled {
                continue;
            }
            let planes = table
                .clone()
                .ok_or_else(|| config_error(format!("已启用 {name} 缩放但缺少标定表")))?;
            model.push(AxisSurface { axis, planes });
        }

        if config.apply_yz_scale {
            let planes = tables
                .yz
                .clone()
                .ok_or_else(|| config_error("已启用 yz 缩放但缺少标定表"))?;
            model.push(YzSurface { planes });
        }

        if config.apply_overall_scale {
            let planes = tables
                .overall
                .ok_or_else(|| config_error("已启用 overall 缩放但缺少标定表"))?;
            model.push(OverallScale { planes });
        }

        Ok(model)
    }

    /// 注入自定义曲面
    pub fn push<S: ScaleSurface + 'static>(&mut self, surface: S) {
        self.surfaces.push(Arc::new(surface));
    }

    pub fn with_surface<S: ScaleSurface + 'static>(mut self, surface: S) -> Self {
        self.push(surface);
        self
    }

    /// 启用的曲面数量
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl ScaleSurface for ScaleModel {
    fn lookup(&self, truth: &TruthProperties, plane: Plane) -> ScaleValues {
        self.surfaces
            .iter()
            .fold(ScaleValues::IDENTITY, |acc, surface| {
                acc.combine(surface.lookup(truth, plane))
            })
    }
}
