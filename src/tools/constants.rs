//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 默认配置值
pub mod defaults {
    /// 默认多文件并行并发度
    ///
    /// 单个事件内部已经按通道并行，文件级并发度不宜过高
    pub const PARALLEL_FILES_DEGREE: usize = 4;

    /// 默认处理阶段
    pub const STAGE: &str = "all";
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}

/// 文件命名约定
pub mod files {
    /// 事件文件扩展名
    pub const EVENT_EXTENSION: &str = "json";

    /// 处理后事件文件后缀
    pub const PROCESSED_SUFFIX: &str = "_processed";

    /// 单事件文本报告后缀
    pub const REPORT_SUFFIX: &str = "_ROI_Report.txt";

    /// 批量报告文件名
    pub const BATCH_REPORT_NAME: &str = "ROI_Batch_Report";
}

/// 应用信息
pub mod app_info {
    pub const APP_NAME: &str = "uBooNE ROI Toolkit";

    /// 报告标题行
    pub fn format_output_header(version: &str) -> String {
        format!("{APP_NAME} v{version} / ROI waveform processing report")
    }
}
