// crates/af_fusion/src/aligner.rs

//! 网格对齐器
//!
//! 把任意原生分辨率/投影的栅格数据源重采样到共享参考网格与时间轴。
//!
//! # 流程
//!
//! 1. 重投影：源采样点坐标统一转换到 WGS84，质心身份不变
//! 2. 重叠检查：与参考网格无空间重叠或与时间轴无时间重叠 → `Alignment` 致命错误
//! 3. 时间聚合：每个源时刻归入最近的时间槽（偏差不超过半个步长），
//!    同槽多个源时刻按点取算术平均
//! 4. 空间重采样：按数据源声明的规则逐单元计算，规则整条管线固定不变
//!
//! 输出保证每个 (单元, 时间槽) 恰好一个值或显式缺失标记，
//! 无数据时从不悄悄写零。

use af_config::ResampleRule;
use af_foundation::error::{AfError, AfResult};
use af_geo::field::GriddedField;
use af_geo::geometry::Point2D;
use af_geo::grid::ReferenceGrid;
use af_geo::spatial_index::{BoundingBox, SpatialIndex};
use af_geo::time_index::TimeIndex;
use rayon::prelude::*;

use crate::sources::RawGridData;

/// 每纬度度数对应的米数（搜索半径米 → 度的保守换算）
const METERS_PER_DEGREE: f64 = 111_195.0;

/// 网格对齐器
///
/// 持有共享参考网格与时间轴的引用；对每个数据源调用一次 [`GridAligner::align`]。
pub struct GridAligner<'a> {
    grid: &'a ReferenceGrid,
    time_index: &'a TimeIndex,
}

impl<'a> GridAligner<'a> {
    /// 创建对齐器
    #[must_use]
    pub fn new(grid: &'a ReferenceGrid, time_index: &'a TimeIndex) -> Self {
        Self { grid, time_index }
    }

    /// 将一个原始栅格源对齐到参考网格与时间轴
    ///
    /// # Errors
    /// 数据源与参考网格无空间重叠、或与时间轴无时间重叠时返回
    /// [`AfError::Alignment`]，管线必须中止。
    pub fn align(&self, raw: &RawGridData, rule: ResampleRule) -> AfResult<GriddedField> {
        // 1. 重投影到 WGS84
        let points = self.reproject(raw)?;

        // 2. 空间重叠检查
        let source_bbox = BoundingBox::from_points(&points).ok_or_else(|| {
            AfError::alignment(&raw.name, "数据源不含任何采样点")
        })?;
        if !source_bbox.intersects(&self.grid.bounds()) {
            return Err(AfError::alignment(&raw.name, "与参考网格无空间重叠"));
        }

        // 3. 时间槽分配与重叠检查
        let slot_sources = self.assign_time_slots(raw);
        if slot_sources.iter().all(|s| s.is_empty()) {
            return Err(AfError::alignment(&raw.name, "与时间索引无时间重叠"));
        }

        tracing::info!(
            source = %raw.name,
            n_points = raw.n_points(),
            n_source_times = raw.n_times(),
            "aligning gridded source"
        );

        // 4. 逐槽时间聚合 + 空间重采样
        let n_cells = self.grid.n_cells();
        let n_slots = self.time_index.len();
        let mut field = GriddedField::new_missing(&raw.name, n_cells, n_slots);

        for (slot, source_times) in slot_sources.iter().enumerate() {
            if source_times.is_empty() {
                continue; // 该槽无数据，保持显式缺失
            }
            let point_values = aggregate_times(raw, source_times);
            let cell_values = match rule {
                ResampleRule::NearestNeighbor { search_radius_m } => {
                    let radius = search_radius_m
                        .unwrap_or_else(|| 1.5 * self.grid.cell_diagonal_m());
                    self.resample_nearest(&points, &point_values, radius)
                }
                ResampleRule::CellMean => self.resample_cell_mean(&points, &point_values),
            };
            for (cell, value) in cell_values.into_iter().enumerate() {
                field.set(cell, slot, value);
            }
        }

        Ok(field)
    }

    /// 源采样点坐标 → WGS84
    fn reproject(&self, raw: &RawGridData) -> AfResult<Vec<Point2D>> {
        let mut points = Vec::with_capacity(raw.n_points());
        for i in 0..raw.n_points() {
            let (lon, lat) = raw.crs.to_wgs84(raw.xs[i], raw.ys[i])?;
            points.push(Point2D::new(lon, lat));
        }
        Ok(points)
    }

    /// 每个时间槽收到哪些源时刻
    fn assign_time_slots(&self, raw: &RawGridData) -> Vec<Vec<usize>> {
        let half_step = self.time_index.step().num_seconds() / 2;
        let mut slots: Vec<Vec<usize>> = vec![Vec::new(); self.time_index.len()];
        for (t, timestamp) in raw.times.iter().enumerate() {
            let (slot, diff) = self.time_index.nearest_slot(*timestamp);
            if diff.num_seconds() <= half_step {
                slots[slot].push(t);
            }
        }
        slots
    }

    /// 最近邻重采样
    ///
    /// 每个参考单元取搜索半径内质心距离最近的有效源点。
    /// 索引以经纬度建立，半径先换算为度做粗筛，
    /// 再用 Haversine 距离精确过滤。粗筛窗口按网格最高纬度的
    /// cos(lat) 放大，高纬度单元不会漏掉半径内的经向邻点。
    fn resample_nearest(
        &self,
        points: &[Point2D],
        point_values: &[Option<f64>],
        radius_m: f64,
    ) -> Vec<Option<f64>> {
        let entries: Vec<(Point2D, usize)> = points
            .iter()
            .enumerate()
            .filter(|(i, _)| point_values[*i].is_some())
            .map(|(i, p)| (*p, i))
            .collect();
        if entries.is_empty() {
            return vec![None; self.grid.n_cells()];
        }
        let index = SpatialIndex::bulk_load(entries);
        let bounds = self.grid.bounds();
        let max_abs_lat = bounds.min_y.abs().max(bounds.max_y.abs());
        let cos_lat = max_abs_lat.to_radians().cos().max(1e-3);
        let radius_deg = radius_m / (METERS_PER_DEGREE * cos_lat) * 1.5;

        (0..self.grid.n_cells())
            .into_par_iter()
            .map(|cell| {
                let centroid = self.grid.centroid(cell);
                index
                    .query_within_distance(&centroid, radius_deg)
                    .into_iter()
                    .filter(|(p, _)| centroid.geodesic_distance_to(p) <= radius_m)
                    .min_by(|(a, _), (b, _)| {
                        let da = centroid.geodesic_distance_to(a);
                        let db = centroid.geodesic_distance_to(b);
                        da.total_cmp(&db)
                    })
                    .and_then(|(_, i)| point_values[*i])
            })
            .collect()
    }

    /// 单元均值重采样
    ///
    /// 每个参考单元取落入其地理范围的全部有效源点的算术平均。
    fn resample_cell_mean(
        &self,
        points: &[Point2D],
        point_values: &[Option<f64>],
    ) -> Vec<Option<f64>> {
        let grid = self.grid;
        (0..grid.n_cells())
            .into_par_iter()
            .map(|cell| {
                let bounds = grid.cell_bounds(cell);
                let mut sum = 0.0;
                let mut count = 0usize;
                for (i, p) in points.iter().enumerate() {
                    if bounds.contains_point(p) {
                        if let Some(v) = point_values[i] {
                            sum += v;
                            count += 1;
                        }
                    }
                }
                if count > 0 {
                    Some(sum / count as f64)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// 同一时间槽内多个源时刻按点取算术平均（忽略缺失）
fn aggregate_times(raw: &RawGridData, source_times: &[usize]) -> Vec<Option<f64>> {
    let n_points = raw.n_points();
    let mut out = Vec::with_capacity(n_points);
    for i in 0..n_points {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &t in source_times {
            if let Some(v) = raw.value(t, i) {
                sum += v;
                count += 1;
            }
        }
        out.push(if count > 0 { Some(sum / count as f64) } else { None });
    }
    out
}

// ============================================================================
// 测试
// ============================================================================
