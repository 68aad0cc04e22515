// crates/af_geo/src/field.rs

//! 栅格场
//!
//! 参考网格上每个 (单元, 时间槽) 的标量值。缺失用 `None` 显式标记，
//! 绝不使用哨兵数值，防止假零悄悄进入模型。
//!
//! 对齐器产出后只读；预测面也复用此类型。

use af_foundation::error::{AfError, AfResult};
use serde::{Deserialize, Serialize};

/// 栅格场
///
/// 行优先展平存储，时间为外层维度：`values[slot * n_cells + cell]`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedField {
    /// 场名称（如 "aod"、"temperature"）
    name: String,
    /// 单元数
    n_cells: usize,
    /// 时间槽数
    n_slots: usize,
    /// 值，`None` = 缺失
    values: Vec<Option<f64>>,
}

impl GriddedField {
    /// 创建全缺失的栅格场
    #[must_use]
    pub fn new_missing(name: impl Into<String>, n_cells: usize, n_slots: usize) -> Self {
        Self {
            name: name.into(),
            n_cells,
            n_slots,
            values: vec![None; n_cells * n_slots],
        }
    }

    /// 从展平数据创建
    ///
    /// # Errors
    /// 数据长度与 `n_cells * n_slots` 不符时返回 `SizeMismatch`。
    pub fn from_values(
        name: impl Into<String>,
        n_cells: usize,
        n_slots: usize,
        values: Vec<Option<f64>>,
    ) -> AfResult<Self> {
        AfError::check_size("gridded field", n_cells * n_slots, values.len())?;
        Ok(Self {
            name: name.into(),
            n_cells,
            n_slots,
            values,
        })
    }

    /// 场名称
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 单元数
    #[inline]
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// 时间槽数
    #[inline]
    #[must_use]
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    #[inline]
    fn idx(&self, cell: usize, slot: usize) -> usize {
        debug_assert!(cell < self.n_cells && slot < self.n_slots);
        slot * self.n_cells + cell
    }

    /// 读取 (单元, 时间槽) 的值
    #[inline]
    #[must_use]
    pub fn get(&self, cell: usize, slot: usize) -> Option<f64> {
        self.values[self.idx(cell, slot)]
    }

    /// 写入值
    #[inline]
    pub fn set(&mut self, cell: usize, slot: usize, value: Option<f64>) {
        let i = self.idx(cell, slot);
        self.values[i] = value;
    }

    /// 某时间槽的所有单元值
    #[must_use]
    pub fn slot_values(&self, slot: usize) -> &[Option<f64>] {
        let lo = slot * self.n_cells;
        &self.values[lo..lo + self.n_cells]
    }

    /// 缺失值数量
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// 有效值数量
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.values.len() - self.missing_count()
    }

    /// 是否完全无有效值
    #[must_use]
    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }
}

// ============================================================================
// 测试
// ============================================================================
