//! 批处理状态管理模块
//!
//! 串行与并行模式共用同一个线程安全的统计容器；
//! 错误分类使用 BTreeMap，保证报告中的类别顺序稳定。

use crate::error::{ErrorCategory, RoiError};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 错误类别 → 失败文件列表
pub type ErrorStats = BTreeMap<ErrorCategory, Vec<String>>;

/// 批处理统计快照
#[derive(Debug, Clone, Default)]
pub struct BatchStatsSnapshot {
    pub processed: usize,
    pub failed: usize,
    pub error_stats: ErrorStats,
}

/// 批处理统计
#[derive(Debug, Default)]
pub struct BatchStats {
    processed: AtomicUsize,
    failed: AtomicUsize,
    error_stats: Mutex<ErrorStats>,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功，返回累计成功数
    #[inline]
    pub fn inc_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 记录一次失败并按错误类别归档，返回 (累计失败数, 类别)
    pub fn inc_failed(&self, error: &RoiError, filename: String) -> (usize, ErrorCategory) {
        let category = ErrorCategory::from_roi_error(error);
        let count = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut stats) = self.error_stats.lock() {
            stats.entry(category).or_default().push(filename);
        }
        (count, category)
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            error_stats: self
                .error_stats
                .lock()
                .map(|stats| stats.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_categories_grouped() {
        let stats = BatchStats::new();
        stats.inc_processed();
        stats.inc_failed(&RoiError::FormatError("bad".into()), "a.json".into());
        stats.inc_failed(&RoiError::InvalidInput("overlap".into()), "b.json".into());
        let (count, category) =
            stats.inc_failed(&RoiError::FormatError("bad".into()), "c.json".into());

        assert_eq!(count, 3);
        assert_eq!(category, ErrorCategory::Format);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.error_stats[&ErrorCategory::Format], vec!["a.json", "c.json"]);
        assert_eq!(snapshot.error_stats[&ErrorCategory::Other].len(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = BatchStats::new();
        (0..100).into_par_iter().for_each(|_| {
            stats.inc_processed();
        });
        (0..50).into_par_iter().for_each(|i| {
            stats.inc_failed(&RoiError::ConfigError("x".into()), format!("evt{i}.json"));
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.processed, 100);
        assert_eq!(snapshot.failed, 50);
        assert_eq!(snapshot.error_stats[&ErrorCategory::Config].len(), 50);
    }
}
