//! 工具函数模块
//!
//! 提供文件路径处理、并发度计算等通用工具函数。

use super::constants::parallel_limits::{MAX_PARALLEL_DEGREE, MIN_PARALLEL_DEGREE};

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（统一处理路径提取逻辑）
    #[inline]
    pub fn extract_filename(path: &Path) -> &str {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
    }

    /// 提取文件stem（不含扩展名）
    #[inline]
    pub fn extract_file_stem(path: &Path) -> &str {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("event")
    }

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 获取父目录，如果不存在则返回当前目录
    #[inline]
    pub fn get_parent_dir(path: &Path) -> &Path {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// 计算实际并发度
///
/// 钳位到 [MIN, MAX]，且不超过任务数量（任务数为 0 时按 1 计）。
pub fn effective_parallel_degree(requested: usize, task_count: Option<usize>) -> usize {
    let degree = requested.clamp(MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE);
    match task_count {
        Some(count) => degree.min(count.max(MIN_PARALLEL_DEGREE)),
        None => degree,
    }
}

// 重新导出为平级函数
pub use path::{extract_file_stem, extract_filename, extract_filename_lossy, get_parent_dir};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_effective_parallel_degree() {
        assert_eq!(effective_parallel_degree(0, None), 1);
        assert_eq!(effective_parallel_degree(64, None), 16);
        assert_eq!(effective_parallel_degree(8, Some(3)), 3);
        assert_eq!(effective_parallel_degree(4, Some(0)), 1);
    }

    #[test]
    fn test_path_helpers() {
        let p = Path::new("/data/run7/evt_0042.json");
        assert_eq!(extract_filename(p), "evt_0042.json");
        assert_eq!(extract_file_stem(p), "evt_0042");
        assert_eq!(get_parent_dir(Path::new("evt.json")), Path::new("."));
    }
}
