//! 报告生成进度表
//!
//! 进度只是轮询提示，报告是否存在以报告表为准。默认实现为容量有界的 LRU，
//! 由 `AnalysisGuard` 保证任何退出路径（包括 panic 与取消）都会写入 completed。

use crate::models::analysis::AnalysisStatus;
use lru::LruCache;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// 可注入的进度存储
///
/// 同步接口：Drop 中也能写入。
pub trait AnalysisStatusStore: Send + Sync {
    fn mark(&self, event_id: i64, status: AnalysisStatus);
    fn get(&self, event_id: i64) -> Option<AnalysisStatus>;
    /// 某一时刻的完整快照
    fn snapshot(&self) -> BTreeMap<i64, AnalysisStatus>;
}

/// 默认进度存储：超过容量时淘汰最久未写入的条目
pub struct LruStatusStore {
    entries: Mutex<LruCache<i64, AnalysisStatus>>,
}

impl LruStatusStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    // 持锁期间不会 panic，中毒时直接取回数据
    fn lock(&self) -> MutexGuard<'_, LruCache<i64, AnalysisStatus>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AnalysisStatusStore for LruStatusStore {
    fn mark(&self, event_id: i64, status: AnalysisStatus) {
        self.lock().put(event_id, status);
    }

    fn get(&self, event_id: i64) -> Option<AnalysisStatus> {
        // peek 不改变淘汰顺序，只有写入算作“使用”
        self.lock().peek(&event_id).copied()
    }

    fn snapshot(&self) -> BTreeMap<i64, AnalysisStatus> {
        self.lock().iter().map(|(id, status)| (*id, *status)).collect()
    }
}

/// 生成期间持有；创建时标记 analyzing，释放时标记 completed
pub struct AnalysisGuard {
    store: Arc<dyn AnalysisStatusStore>,
    event_id: i64,
}

impl AnalysisGuard {
    pub fn begin(store: Arc<dyn AnalysisStatusStore>, event_id: i64) -> Self {
        store.mark(event_id, AnalysisStatus::Analyzing);
        Self { store, event_id }
    }
}

impl Drop for AnalysisGuard {
    fn drop(&mut self) {
        self.store.mark(self.event_id, AnalysisStatus::Completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_snapshot() {
        let store = LruStatusStore::new(10);
        store.mark(2, AnalysisStatus::Analyzing);
        store.mark(1, AnalysisStatus::Completed);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&1], AnalysisStatus::Completed);
        assert_eq!(snapshot[&2], AnalysisStatus::Analyzing);
        assert_eq!(store.get(3), None);
    }

    #[test]
    fn test_capacity_evicts_least_recently_written() {
        let store = LruStatusStore::new(2);
        store.mark(1, AnalysisStatus::Completed);
        store.mark(2, AnalysisStatus::Completed);
        store.mark(1, AnalysisStatus::Analyzing);
        store.mark(3, AnalysisStatus::Analyzing);

        assert_eq!(store.get(2), None);
        assert_eq!(store.get(1), Some(AnalysisStatus::Analyzing));
        assert_eq!(store.get(3), Some(AnalysisStatus::Analyzing));
    }

    #[test]
    fn test_guard_marks_completed_on_drop() {
        let store: Arc<dyn AnalysisStatusStore> = Arc::new(LruStatusStore::new(10));

        let guard = AnalysisGuard::begin(store.clone(), 42);
        assert_eq!(store.get(42), Some(AnalysisStatus::Analyzing));

        drop(guard);
        assert_eq!(store.get(42), Some(AnalysisStatus::Completed));
    }

    #[test]
    fn test_guard_marks_completed_on_panic() {
        let store: Arc<dyn AnalysisStatusStore> = Arc::new(LruStatusStore::new(10));

        let inner = store.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = AnalysisGuard::begin(inner, 7);
            panic!("generator exploded");
        }));

        assert!(result.is_err());
        assert_eq!(store.get(7), Some(AnalysisStatus::Completed));
    }
}
