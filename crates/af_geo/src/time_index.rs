// crates/af_geo/src/time_index.rs

//! 时间索引
//!
//! 对齐后所有数据源共享的离散时间轴。严格单调递增，无重复时间戳。
//!
//! # 示例
//!
//! ```
//! use af_geo::time_index::TimeIndex;
//! use chrono::{TimeZone, Utc, Duration};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap();
//! let index = TimeIndex::new(start, end, Duration::days(1)).unwrap();
//! assert_eq!(index.len(), 8);
//! ```

use af_foundation::error::{AfError, AfResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 时间索引
///
/// 等间隔离散时间轴 `[start, start + step, ..., <= end]`。
/// 构建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeIndex {
    /// 起始时刻
    start: DateTime<Utc>,
    /// 步长 (秒)
    step_secs: i64,
    /// 时间槽数量
    n_slots: usize,
}

impl TimeIndex {
    /// 创建时间索引
    ///
    /// # Errors
    /// 步长非正或 `end < start` 时返回 `InvalidConfig`。
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> AfResult<Self> {
        let step_secs = step.num_seconds();
        if step_secs <= 0 {
            return Err(AfError::invalid_config(
                "time.step",
                step_secs.to_string(),
                "步长必须为正",
            ));
        }
        if end < start {
            return Err(AfError::invalid_config(
                "time.range",
                format!("{start} .. {end}"),
                "结束时刻不能早于起始时刻",
            ));
        }
        let n_slots = ((end - start).num_seconds() / step_secs) as usize + 1;
        Ok(Self {
            start,
            step_secs,
            n_slots,
        })
    }

    /// 时间槽数量
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_slots
    }

    /// 是否为空（构造保证至少一个槽，总为 false）
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_slots == 0
    }

    /// 步长
    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::seconds(self.step_secs)
    }

    /// 起始时刻
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// 最后一个时间槽的时刻
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp(self.n_slots - 1)
    }

    /// 第 `slot` 个时间槽的时刻
    ///
    /// # Panics
    /// `slot` 越界时 debug 模式 panic。
    #[must_use]
    pub fn timestamp(&self, slot: usize) -> DateTime<Utc> {
        debug_assert!(slot < self.n_slots);
        self.start + Duration::seconds(self.step_secs * slot as i64)
    }

    /// 距给定时刻最近的时间槽及绝对时间差
    ///
    /// 返回 `(slot, |t - timestamp(slot)|)`。轴外时刻钳制到端点槽，
    /// 由调用方用时间容差判定取舍。
    #[must_use]
    pub fn nearest_slot(&self, t: DateTime<Utc>) -> (usize, Duration) {
        let offset = (t - self.start).num_seconds();
        let raw = (offset as f64 / self.step_secs as f64).round();
        let slot = (raw.max(0.0) as usize).min(self.n_slots - 1);
        let diff = (t - self.timestamp(slot)).abs();
        (slot, diff)
    }

    /// 迭代所有时间槽
    pub fn iter(&self) -> impl Iterator<Item = (usize, DateTime<Utc>)> + '_ {
        (0..self.n_slots).map(|slot| (slot, self.timestamp(slot)))
    }
}

// ============================================================================
// 测试
// ============================================================================
