// crates/af_geo/src/lib.rs

//! AeroFuse 地理空间处理模块
//!
//! 提供几何类型、坐标参考系统、空间索引，以及融合管线共享的
//! 参考网格 / 时间索引 / 栅格场数据模型。
//!
//! # 模块
//!
//! - `geometry`: 几何类型 (Point2D) 与地理距离
//! - `crs`: 坐标参考系统与纯 Rust 重投影
//! - `spatial_index`: 基于 R-tree 的空间索引
//! - `grid`: 参考网格（唯一共享格网）
//! - `time_index`: 共享时间轴
//! - `field`: 带显式缺失标记的栅格场
//!
//! # 示例
//!
//! ```
//! use af_geo::prelude::*;
//!
//! let grid = ReferenceGrid::new(5.0, 38.0, 65.0, 100.0, 0.5).unwrap();
//! let cell = grid.nearest_cell(28.6, 77.2);
//! assert!(cell < grid.n_cells());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod crs;
pub mod field;
pub mod geometry;
pub mod grid;
pub mod spatial_index;
pub mod time_index;

/// 预导入模块
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::field::GriddedField;
    pub use crate::geometry::{Point2D, EARTH_MEAN_RADIUS};
    pub use crate::grid::ReferenceGrid;
    pub use crate::spatial_index::{BoundingBox, SpatialIndex};
    pub use crate::time_index::TimeIndex;
}

// 重导出常用类型
pub use crs::Crs;
pub use field::GriddedField;
pub use geometry::Point2D;
pub use grid::ReferenceGrid;
pub use spatial_index::{BoundingBox, SpatialIndex};
pub use time_index::TimeIndex;
