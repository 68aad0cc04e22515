// crates/af_geo/src/spatial_index.rs

//! 空间索引实现
//!
//! 基于 R-tree 的空间索引，用于重采样时的最近邻查询和
//! 站点-网格单元的距离受限匹配。
//!
//! # 示例
//!
//! ```
//! use af_geo::spatial_index::SpatialIndex;
//! use af_geo::geometry::Point2D;
//!
//! let index = SpatialIndex::bulk_load(vec![
//!     (Point2D::new(10.0, 20.0), 0usize),
//!     (Point2D::new(15.0, 25.0), 1),
//! ]);
//! let nearest = index.nearest(&Point2D::new(11.0, 21.0));
//! assert_eq!(*nearest.unwrap().1, 0);
//! ```

use crate::geometry::Point2D;
use rstar::{RTree, RTreeObject, AABB};

/// 边界框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// 最小 x
    pub min_x: f64,
    /// 最小 y
    pub min_y: f64,
    /// 最大 x
    pub max_x: f64,
    /// 最大 y
    pub max_y: f64,
}

impl BoundingBox {
    /// 创建新的边界框（自动规范化角点顺序）
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// 从点集计算边界框，空集返回 None
    #[must_use]
    pub fn from_points(points: &[Point2D]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// 检查点是否在边界框内
    #[must_use]
    pub fn contains_point(&self, point: &Point2D) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// 检查两个边界框是否相交
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// 计算宽度
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// 计算高度
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

// ============================================================================
// R-tree 包装
// ============================================================================

/// 空间索引条目
#[derive(Debug, Clone)]
struct SpatialEntry<T> {
    point: Point2D,
    data: T,
}

impl<T> RTreeObject for SpatialEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.x, self.point.y])
    }
}

impl<T> rstar::PointDistance for SpatialEntry<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point.x - point[0];
        let dy = self.point.y - point[1];
        dx * dx + dy * dy
    }
}

/// 空间索引
///
/// 基于 R-tree 的点索引。融合管线中有两处使用：
/// 对齐器以源网格采样点建索引做最近邻重采样，
/// 匹配器以参考网格质心建索引做站点匹配。
pub struct SpatialIndex<T> {
    tree: RTree<SpatialEntry<T>>,
}

impl<T: Clone> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SpatialIndex<T> {
    /// 创建空的空间索引
    #[must_use]
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// 从点集批量构建
    #[must_use]
    pub fn bulk_load(points: Vec<(Point2D, T)>) -> Self {
        let entries: Vec<SpatialEntry<T>> = points
            .into_iter()
            .map(|(point, data)| SpatialEntry { point, data })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// 插入点
    pub fn insert(&mut self, point: Point2D, data: T) {
        self.tree.insert(SpatialEntry { point, data });
    }

    /// 查询最近的一个点
    #[must_use]
    pub fn nearest(&self, point: &Point2D) -> Option<(&Point2D, &T)> {
        self.tree
            .nearest_neighbor(&[point.x, point.y])
            .map(|entry| (&entry.point, &entry.data))
    }

    /// 查询指定距离内的点（按距离从近到远）
    #[must_use]
    pub fn query_within_distance(&self, point: &Point2D, distance: f64) -> Vec<(&Point2D, &T)> {
        let dist_squared = distance * distance;
        self.tree
            .nearest_neighbor_iter(&[point.x, point.y])
            .take_while(|entry| {
                let dx = entry.point.x - point.x;
                let dy = entry.point.y - point.y;
                dx * dx + dy * dy <= dist_squared
            })
            .map(|entry| (&entry.point, &entry.data))
            .collect()
    }

    /// 返回索引中的点数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// 检查索引是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains_point(&Point2D::new(5.0, 5.0)));
        assert!(!bbox.contains_point(&Point2D::new(15.0, 5.0)));
        assert!((bbox.width() - 10.0).abs() < 1e-10);
        assert!((bbox.height() - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_bounding_box_intersects() {
        let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let bbox2 = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let bbox3 = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(bbox1.intersects(&bbox2));
        assert!(!bbox1.intersects(&bbox3));
    }

    #[test]
    fn test_bounding_box_from_points() {
        let points = vec![
            Point2D::new(2.0, 8.0),
            Point2D::new(-1.0, 3.0),
            Point2D::new(5.0, 0.0),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert!((bbox.min_x + 1.0).abs() < 1e-10);
        assert!((bbox.max_y - 8.0).abs() < 1e-10);

        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_spatial_index_nearest() {
        let index = SpatialIndex::bulk_load(vec![
            (Point2D::new(0.0, 0.0), 1u32),
            (Point2D::new(10.0, 10.0), 2),
            (Point2D::new(20.0, 20.0), 3),
        ]);

        let (_, data) = index.nearest(&Point2D::new(9.0, 9.0)).unwrap();
        assert_eq!(*data, 2);
    }

    #[test]
    fn test_spatial_index_within_distance() {
        let index = SpatialIndex::bulk_load(vec![
            (Point2D::new(0.0, 0.0), 1u32),
            (Point2D::new(5.0, 0.0), 2),
            (Point2D::new(100.0, 0.0), 3),
        ]);

        let results = index.query_within_distance(&Point2D::new(0.0, 0.0), 10.0);
        assert_eq!(results.len(), 2);
        // 结果按距离升序
        assert_eq!(*results[0].1, 1);
        assert_eq!(*results[1].1, 2);
    }

    #[test]
    fn test_spatial_index_empty() {
        let index: SpatialIndex<u32> = SpatialIndex::new();
        assert!(index.is_empty());
        assert!(index.nearest(&Point2D::ZERO).is_none());
    }
}
