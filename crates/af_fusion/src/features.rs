// crates/af_fusion/src/features.rs

//! 特征表构建器
//!
//! 把对齐后的栅格场与匹配后的站点观测连接成模型可用的行列表。
//! 训练表与推理表共用同一构建路径，保证两者列模式完全一致：
//! 同名、同序、同缺失策略。
//!
//! 缺失策略逐列解析，填充值计入插补统计；任何列解析失败则整行丢弃，
//! 丢弃行数计入统计。无法解析的行从不悄悄置零。

use af_config::{FeatureConfig, MissingPolicy};
use af_foundation::error::{AfError, AfResult};
use af_geo::field::GriddedField;
use af_geo::grid::ReferenceGrid;
use af_geo::time_index::TimeIndex;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::matcher::MatchedObservation;

/// 派生特征列名（启用 `derived` 时追加在栅格列之后）
pub const DERIVED_COLUMNS: [&str; 4] = ["lat", "lon", "doy_sin", "doy_cos"];

// ============================================================================
// 特征表
// ============================================================================

/// 特征表
///
/// 行为 (单元, 时间槽) 对，列模式由配置决定且训练/推理必须一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    /// 列名（有序，不含目标列）
    columns: Vec<String>,
    /// 行数据，外层为行
    rows: Vec<Vec<f64>>,
    /// 每行对应的 (单元, 时间槽)
    keys: Vec<(usize, usize)>,
}

impl FeatureTable {
    /// 列名
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 行数
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// 特征数
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// 第 `i` 行的特征向量
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// 全部行
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// 每行对应的 (单元, 时间槽)
    #[must_use]
    pub fn keys(&self) -> &[(usize, usize)] {
        &self.keys
    }

    /// 校验列模式与期望一致
    ///
    /// # Errors
    /// 列名或顺序不一致时返回 [`AfError::SchemaMismatch`]。
    pub fn check_schema(&self, expected: &[String]) -> AfResult<()> {
        if self.columns != expected {
            return Err(AfError::schema_mismatch(
                expected.to_vec(),
                self.columns.clone(),
            ));
        }
        Ok(())
    }
}

/// 训练表
///
/// 特征表加上目标列与行来源站点，站点标识用于按站点划分交叉验证折。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTable {
    /// 特征部分
    pub features: FeatureTable,
    /// 每行来源站点
    pub station_ids: Vec<String>,
    /// 目标列 (PM2.5)
    pub targets: Vec<f64>,
}

/// 构建统计
///
/// 随运行摘要输出，记录缺失策略的实际效果。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// 候选行数（策略应用前）
    pub n_candidates: usize,
    /// 产出行数
    pub n_rows: usize,
    /// 因缺失被丢弃的行数
    pub n_dropped: usize,
    /// 插补填充的单元格数
    pub n_imputed: usize,
}

// ============================================================================
// 构建器
// ============================================================================

/// 特征表构建器
pub struct FeatureTableBuilder<'a> {
    grid: &'a ReferenceGrid,
    time_index: &'a TimeIndex,
    config: &'a FeatureConfig,
}

impl<'a> FeatureTableBuilder<'a> {
    /// 创建构建器
    #[must_use]
    pub fn new(grid: &'a ReferenceGrid, time_index: &'a TimeIndex, config: &'a FeatureConfig) -> Self {
        Self {
            grid,
            time_index,
            config,
        }
    }

    /// 最终列模式：配置的栅格列，启用时追加派生列
    #[must_use]
    pub fn schema(&self) -> Vec<String> {
        let mut columns = self.config.columns.clone();
        if self.config.derived {
            columns.extend(DERIVED_COLUMNS.iter().map(|c| (*c).to_string()));
        }
        columns
    }

    /// 构建训练表
    ///
    /// 每条匹配观测产出一个候选行，特征取自其 (单元, 时间槽)，
    /// 目标为观测 PM2.5 原值。
    ///
    /// # Errors
    /// 配置列在栅格场中缺名时返回 [`AfError::SchemaMismatch`]。
    pub fn build_training(
        &self,
        fields: &[GriddedField],
        matched: &[MatchedObservation],
    ) -> AfResult<(TrainingTable, BuildStats)> {
        let ordered = self.order_fields(fields)?;
        let mut stats = BuildStats {
            n_candidates: matched.len(),
            ..BuildStats::default()
        };

        let mut rows = Vec::new();
        let mut keys = Vec::new();
        let mut station_ids = Vec::new();
        let mut targets = Vec::new();

        for obs in matched {
            match self.build_row(&ordered, obs.cell, obs.slot, &mut stats) {
                Some(row) => {
                    rows.push(row);
                    keys.push((obs.cell, obs.slot));
                    station_ids.push(obs.station_id.clone());
                    targets.push(obs.pm25);
                    stats.n_rows += 1;
                }
                None => stats.n_dropped += 1,
            }
        }

        tracing::info!(
            n_candidates = stats.n_candidates,
            n_rows = stats.n_rows,
            n_dropped = stats.n_dropped,
            n_imputed = stats.n_imputed,
            "training table built"
        );

        Ok((
            TrainingTable {
                features: FeatureTable {
                    columns: self.schema(),
                    rows,
                    keys,
                },
                station_ids,
                targets,
            },
            stats,
        ))
    }

    /// 构建推理表
    ///
    /// 每个 (单元, 时间槽) 一个候选行，与训练表走同一缺失策略：
    /// 解析失败的行被丢弃，对应单元在预测面中保持缺失。
    ///
    /// # Errors
    /// 配置列在栅格场中缺名时返回 [`AfError::SchemaMismatch`]。
    pub fn build_inference(
        &self,
        fields: &[GriddedField],
    ) -> AfResult<(FeatureTable, BuildStats)> {
        let ordered = self.order_fields(fields)?;
        let n_cells = self.grid.n_cells();
        let n_slots = self.time_index.len();
        let mut stats = BuildStats {
            n_candidates: n_cells * n_slots,
            ..BuildStats::default()
        };

        let mut rows = Vec::new();
        let mut keys = Vec::new();
        for slot in 0..n_slots {
            for cell in 0..n_cells {
                match self.build_row(&ordered, cell, slot, &mut stats) {
                    Some(row) => {
                        rows.push(row);
                        keys.push((cell, slot));
                        stats.n_rows += 1;
                    }
                    None => stats.n_dropped += 1,
                }
            }
        }

        tracing::info!(
            n_candidates = stats.n_candidates,
            n_rows = stats.n_rows,
            n_dropped = stats.n_dropped,
            n_imputed = stats.n_imputed,
            "inference table built"
        );

        Ok((
            FeatureTable {
                columns: self.schema(),
                rows,
                keys,
            },
            stats,
        ))
    }

    /// 按配置列序排列栅格场
    fn order_fields<'f>(&self, fields: &'f [GriddedField]) -> AfResult<Vec<&'f GriddedField>> {
        let mut ordered = Vec::with_capacity(self.config.columns.len());
        for column in &self.config.columns {
            let field = fields.iter().find(|f| f.name() == column);
            match field {
                Some(f) => ordered.push(f),
                None => {
                    let available = fields.iter().map(|f| f.name().to_string()).collect();
                    return Err(AfError::schema_mismatch(
                        self.config.columns.clone(),
                        available,
                    ));
                }
            }
        }
        Ok(ordered)
    }

    /// 构建一行；任一列解析失败返回 None
    ///
    /// 插补计数先累积在行内，整行保留后才并入统计，
    /// 被丢弃行中的插补不计入诊断。
    fn build_row(
        &self,
        ordered: &[&GriddedField],
        cell: usize,
        slot: usize,
        stats: &mut BuildStats,
    ) -> Option<Vec<f64>> {
        let mut row = Vec::with_capacity(self.schema().len());
        let mut row_imputed = 0usize;
        for (column, field) in self.config.columns.iter().zip(ordered) {
            match self.resolve(field, cell, slot, self.config.policy_for(column)) {
                Resolution::Present(v) => row.push(v),
                Resolution::Imputed(v) => {
                    row_imputed += 1;
                    row.push(v);
                }
                Resolution::Unresolved => return None,
            }
        }
        stats.n_imputed += row_imputed;
        if self.config.derived {
            let centroid = self.grid.centroid(cell);
            let doy = f64::from(self.time_index.timestamp(slot).ordinal());
            let angle = 2.0 * std::f64::consts::PI * doy / 365.25;
            row.push(centroid.y);
            row.push(centroid.x);
            row.push(angle.sin());
            row.push(angle.cos());
        }
        Some(row)
    }

    /// 按策略解析单个 (列, 单元, 时间槽)
    fn resolve(
        &self,
        field: &GriddedField,
        cell: usize,
        slot: usize,
        policy: MissingPolicy,
    ) -> Resolution {
        if let Some(v) = field.get(cell, slot) {
            return Resolution::Present(v);
        }
        match policy {
            MissingPolicy::Drop => Resolution::Unresolved,
            MissingPolicy::Constant { value } => Resolution::Imputed(value),
            MissingPolicy::NeighborMean => match self.neighbor_mean(field, cell, slot) {
                Some(v) => Resolution::Imputed(v),
                None => Resolution::Unresolved,
            },
        }
    }

    /// 邻域均值：先取同时间槽的 4 邻单元，再退回同单元 ±1 时间槽
    fn neighbor_mean(&self, field: &GriddedField, cell: usize, slot: usize) -> Option<f64> {
        let (row, col) = self.grid.rowcol(cell);
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut visit = |r: isize, c: isize| {
            if r >= 0
                && c >= 0
                && (r as usize) < self.grid.n_rows()
                && (c as usize) < self.grid.n_cols()
            {
                if let Some(v) = field.get(self.grid.cell_id(r as usize, c as usize), slot) {
                    sum += v;
                    count += 1;
                }
            }
        };
        let (r, c) = (row as isize, col as isize);
        visit(r - 1, c);
        visit(r + 1, c);
        visit(r, c - 1);
        visit(r, c + 1);
        if count > 0 {
            return Some(sum / count as f64);
        }

        // 空间邻域全缺失，退回时间邻域
        let mut sum = 0.0;
        let mut count = 0usize;
        if slot > 0 {
            if let Some(v) = field.get(cell, slot - 1) {
                sum += v;
                count += 1;
            }
        }
        if slot + 1 < field.n_slots() {
            if let Some(v) = field.get(cell, slot + 1) {
                sum += v;
                count += 1;
            }
        }
        if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        }
    }
}

enum Resolution {
    Present(f64),
    Imputed(f64),
    Unresolved,
}

// ============================================================================
// 测试
// ============================================================================
