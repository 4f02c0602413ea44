//! 统一错误处理框架
//!
//! 数值核心（基线、截断统计、电荷重分配）全部采用策略回退值，不返回错误；
//! 只有驱动层（配置、事件文件、批处理）才会产生 [`RoiError`]。

use std::io;

/// ROI处理相关的统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum RoiError {
    /// 输入验证错误（ROI重叠、乱序、通道缺失等）
    #[error("输入验证失败: {0}")]
    InvalidInput(String),

    /// 文件I/O错误
    #[error("文件I/O错误: {0}")]
    IoError(#[from] io::Error),

    /// 事件/标定文件格式错误
    #[error("数据格式错误: {0}")]
    FormatError(String),

    /// 配置参数错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 资源访问错误（线程池等）
    #[error("资源访问错误: {0}")]
    ResourceError(String),
}

impl From<serde_json::Error> for RoiError {
    fn from(err: serde_json::Error) -> Self {
        RoiError::FormatError(format!("JSON解析错误: {err}"))
    }
}

/// ROI处理操作的标准Result类型
pub type RoiResult<T> = Result<T, RoiError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: std::fmt::Display>(context: &str, err: E) -> RoiError {
    RoiError::FormatError(format!("{context}: {err}"))
}

/// 创建配置错误的helper函数
#[inline]
pub fn config_error(msg: impl Into<String>) -> RoiError {
    RoiError::ConfigError(msg.into())
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的错误统计和退出码映射

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// 格式相关错误（JSON损坏、字段缺失等）
    Format,
    /// I/O相关错误（文件不存在、权限不足等）
    Io,
    /// 配置相关错误
    Config,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从RoiError提取错误类别
    pub fn from_roi_error(e: &RoiError) -> Self {
        match e {
            RoiError::FormatError(_) => Self::Format,
            RoiError::IoError(_) => Self::Io,
            RoiError::ConfigError(_) => Self::Config,
            RoiError::InvalidInput(_) | RoiError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Format => "格式错误",
            Self::Io => "I/O错误",
            Self::Config => "配置错误",
            Self::Other => "其他错误",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        let io = RoiError::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(ErrorCategory::from_roi_error(&io), ErrorCategory::Io);

        let json = serde_json::from_str::<u32>("not-json").unwrap_err();
        let fmt = RoiError::from(json);
        assert_eq!(ErrorCategory::from_roi_error(&fmt), ErrorCategory::Format);

        assert_eq!(
            ErrorCategory::from_roi_error(&config_error("bad")),
            ErrorCategory::Config
        );
        assert_eq!(
            ErrorCategory::from_roi_error(&RoiError::InvalidInput("x".into())),
            ErrorCategory::Other
        );
        // 线程池失败归入其他类别，退出码由主程序单独映射
        let pool = RoiError::ResourceError("线程池创建失败".into());
        assert_eq!(ErrorCategory::from_roi_error(&pool), ErrorCategory::Other);
        assert_eq!(ErrorCategory::Other.display_name(), "其他错误");
    }

    #[test]
    fn test_display_contains_context() {
        let err = format_error("scale table", "unexpected token");
        assert!(err.to_string().contains("scale table: unexpected token"));
    }
}
