// crates/af_geo/src/grid.rs

//! 参考网格
//!
//! 整个管线共享的唯一空间格网。所有栅格数据源都必须重采样到此格网，
//! 站点观测匹配到其最近单元。构建后不可变。
//!
//! # 约定
//!
//! - 单元按行优先编号：`cell = row * n_cols + col`
//! - `row` 沿纬度从南向北递增，`col` 沿经度从西向东递增
//! - 单元质心为 `(min + (i + 0.5) * 分辨率)`
//!
//! # 示例
//!
//! ```
//! use af_geo::grid::ReferenceGrid;
//!
//! // 覆盖印度的 0.5° 格网
//! let grid = ReferenceGrid::new(5.0, 38.0, 65.0, 100.0, 0.5).unwrap();
//! let (row, col) = grid.rowcol(grid.nearest_cell(28.6, 77.2));
//! let c = grid.centroid(grid.cell_id(row, col));
//! assert!((c.y - 28.6).abs() < 0.5);
//! ```

use crate::geometry::Point2D;
use crate::spatial_index::BoundingBox;
use af_foundation::error::{AfError, AfResult};
use serde::{Deserialize, Serialize};

/// 参考网格
///
/// 规则经纬度格网，WGS84。构建后不可变，由所有下游组件共享。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGrid {
    /// 南边界纬度 (度)
    lat_min: f64,
    /// 西边界经度 (度)
    lon_min: f64,
    /// 单元分辨率 (度)
    resolution: f64,
    /// 行数（纬度方向）
    n_rows: usize,
    /// 列数（经度方向）
    n_cols: usize,
}

impl ReferenceGrid {
    /// 从地理边界和分辨率创建
    ///
    /// 行列数向上取整，使格网完全覆盖请求的范围。
    ///
    /// # Errors
    /// 边界非法或分辨率非正时返回 `InvalidConfig`。
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        resolution: f64,
    ) -> AfResult<Self> {
        if !(resolution > 0.0) {
            return Err(AfError::invalid_config(
                "grid.resolution",
                resolution.to_string(),
                "必须为正",
            ));
        }
        if lat_max <= lat_min || lon_max <= lon_min {
            return Err(AfError::invalid_config(
                "grid.bounds",
                format!("lat [{lat_min}, {lat_max}], lon [{lon_min}, {lon_max}]"),
                "上界必须大于下界",
            ));
        }
        AfError::check_range("grid.lat_min", lat_min, -90.0, 90.0)?;
        AfError::check_range("grid.lat_max", lat_max, -90.0, 90.0)?;
        AfError::check_range("grid.lon_min", lon_min, -180.0, 180.0)?;
        AfError::check_range("grid.lon_max", lon_max, -180.0, 180.0)?;

        let n_rows = ((lat_max - lat_min) / resolution).ceil() as usize;
        let n_cols = ((lon_max - lon_min) / resolution).ceil() as usize;

        Ok(Self {
            lat_min,
            lon_min,
            resolution,
            n_rows,
            n_cols,
        })
    }

    /// 行数
    #[inline]
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 列数
    #[inline]
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 单元总数
    #[inline]
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.n_rows * self.n_cols
    }

    /// 分辨率 (度)
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// (row, col) -> 单元编号
    #[inline]
    #[must_use]
    pub fn cell_id(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.n_rows && col < self.n_cols);
        row * self.n_cols + col
    }

    /// 单元编号 -> (row, col)
    #[inline]
    #[must_use]
    pub fn rowcol(&self, cell: usize) -> (usize, usize) {
        debug_assert!(cell < self.n_cells());
        (cell / self.n_cols, cell % self.n_cols)
    }

    /// 单元质心 (x = 经度, y = 纬度)
    #[must_use]
    pub fn centroid(&self, cell: usize) -> Point2D {
        let (row, col) = self.rowcol(cell);
        Point2D::new(
            self.lon_min + (col as f64 + 0.5) * self.resolution,
            self.lat_min + (row as f64 + 0.5) * self.resolution,
        )
    }

    /// 单元的地理范围
    #[must_use]
    pub fn cell_bounds(&self, cell: usize) -> BoundingBox {
        let (row, col) = self.rowcol(cell);
        let lon0 = self.lon_min + col as f64 * self.resolution;
        let lat0 = self.lat_min + row as f64 * self.resolution;
        BoundingBox::new(lon0, lat0, lon0 + self.resolution, lat0 + self.resolution)
    }

    /// 整个格网的地理范围
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.lon_min,
            self.lat_min,
            self.lon_min + self.n_cols as f64 * self.resolution,
            self.lat_min + self.n_rows as f64 * self.resolution,
        )
    }

    /// 单元质心间对角线长度 (米)，在格网中心纬度处估算
    ///
    /// 用作最近邻重采样的默认搜索半径基准。
    #[must_use]
    pub fn cell_diagonal_m(&self) -> f64 {
        let b = self.bounds();
        let mid_lat = (b.min_y + b.max_y) / 2.0;
        let p0 = Point2D::new(b.min_x, mid_lat);
        let p1 = Point2D::new(b.min_x + self.resolution, mid_lat + self.resolution);
        p0.geodesic_distance_to(&p1)
    }

    /// 距离给定经纬度最近的单元
    ///
    /// 规则经纬度格网上，按行、列独立取最近下标即为质心距离最小的单元。
    /// 落在格网外的点被钳制到边缘单元，由调用方用距离容差判定取舍。
    #[must_use]
    pub fn nearest_cell(&self, lat: f64, lon: f64) -> usize {
        let row = ((lat - self.lat_min) / self.resolution).floor();
        let col = ((lon - self.lon_min) / self.resolution).floor();
        let row = (row.max(0.0) as usize).min(self.n_rows - 1);
        let col = (col.max(0.0) as usize).min(self.n_cols - 1);
        self.cell_id(row, col)
    }

    /// 迭代所有单元质心
    pub fn iter_centroids(&self) -> impl Iterator<Item = (usize, Point2D)> + '_ {
        (0..self.n_cells()).map(|cell| (cell, self.centroid(cell)))
    }
}

// ============================================================================
// 测试
// ============================================================================
