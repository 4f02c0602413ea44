//! 探测器与算法常量集中管理
//!
//! 所有投影系数、物理常量和策略阈值集中定义，避免散落的字面量导致数值漂移。

/// 几何投影常量（MicroBooNE TPC 线性近似）
pub mod geometry {
    /// 丝间距换算系数（wire / cm）
    pub const A_W: f64 = 3.33328;
    /// U平面通道偏移
    pub const C_U: f64 = 338.140;
    /// V平面通道偏移
    pub const C_V: f64 = 2732.53;
    /// Y平面（收集面）通道偏移
    pub const C_Y: f64 = 4799.19;
    /// 漂移方向 x(cm) → tick 换算系数
    pub const A_T: f64 = 18.2148;
    /// tick 偏移
    pub const C_T: f64 = 818.351;
    /// sin(60°)
    pub const SIN_SIXTY: f64 = 0.866_025_403_784_438_6;
    /// cos(60°)
    pub const COS_SIXTY: f64 = 0.5;

    /// 每个读出窗口的 tick 数
    pub const NUM_TICKS: i64 = 6400;

    /// 各平面通道范围 [begin, end)
    pub const U_CHANNELS: (u32, u32) = (0, 2400);
    pub const V_CHANNELS: (u32, u32) = (2400, 4800);
    pub const Y_CHANNELS: (u32, u32) = (4800, 8256);

    /// 通道总数
    pub const NUM_CHANNELS: u32 = 8256;
}

/// 基线估计常量
pub mod baseline {
    /// 去卷积噪声宽度倍数（相对原始噪声值）
    pub const DECON_NOISE_SCALE: f32 = 1.26491;

    /// 众数直方图 bin 宽度的倒数（bin 宽 0.5）
    pub const BINS_PER_UNIT: f32 = 2.0;

    /// 众数直方图 bin 数上限（对应约 5.2×10⁵ 的幅度范围）
    pub const MAX_HISTOGRAM_BINS: usize = 1 << 20;
}

/// 通道质量过滤默认值
pub mod filter {
    /// 默认截断比例
    pub const TRUNC_MEAN_FRACTION: f32 = 0.2;
    /// 默认各平面 RMS 拒绝阈值 (U, V, Y)
    pub const RMS_REJECTION_CUT: [f64; 3] = [10.0, 10.0, 5.0];
    /// 截断均值与数据库基座差异的告警阈值
    pub const MAX_PEDESTAL_DIFF: f64 = 10.0;
}

/// 电荷重分配常量
pub mod modifier {
    /// 1/√(2π)
    pub const ONE_OVER_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

    /// 沉积与子ROI匹配的归一化距离上限 |tick − center| / sigma
    pub const MATCH_DISTANCE_SIGMA: f64 = 2.5;

    /// 保护策略：匹配到的真实能量低于此值（MeV）……
    pub const GUARD_MIN_ENERGY: f64 = 0.3;
    /// ……且子ROI电荷高于此值（ADC·tick）时强制使用单位缩放
    pub const GUARD_MAX_CHARGE: f64 = 80.0;
}
