// crates/af_geo/src/geometry.rs

//! 几何类型定义
//!
//! 提供项目统一的 2D 点类型和地理距离计算。
//!
//! # 距离计算
//!
//! - `distance_to`: 欧几里得距离（适用于投影坐标）
//! - `geodesic_distance_to`: Haversine 公式（适用于经纬度，返回米）

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Sub};

// ============================================================================
// 地球物理常量
// ============================================================================

/// 地球平均半径 (米) - 用于 Haversine 公式
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.8;

/// 角度转弧度
#[inline]
fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

// ============================================================================
// Point2D - 2D点（项目统一几何类型）
// ============================================================================

/// 2D 点 - 项目统一几何类型
///
/// 经纬度坐标约定 `x = 经度, y = 纬度`（度）。
///
/// # 示例
///
/// ```
/// use af_geo::geometry::Point2D;
///
/// let delhi = Point2D::new(77.2, 28.6);
/// let mumbai = Point2D::new(72.9, 19.1);
/// let d = delhi.geodesic_distance_to(&mumbai);
/// assert!(d > 1_000_000.0 && d < 1_300_000.0); // 约 1150 km
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X坐标（投影米或经度）
    pub x: f64,
    /// Y坐标（投影米或纬度）
    pub y: f64,
}

impl Point2D {
    /// 零点常量
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// 创建新的2D点
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 欧几里得距离
    #[inline]
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// 欧几里得距离平方（避免开方）
    #[inline]
    #[must_use]
    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Haversine 球面距离 (米)
    ///
    /// 坐标必须为经纬度（度），`x = 经度, y = 纬度`。
    #[must_use]
    pub fn geodesic_distance_to(&self, other: &Self) -> f64 {
        let lat1 = deg_to_rad(self.y);
        let lat2 = deg_to_rad(other.y);
        let dlat = lat2 - lat1;
        let dlon = deg_to_rad(other.x - self.x);

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_MEAN_RADIUS * c
    }
}

impl Add for Point2D {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

// ============================================================================
// 测试
// ============================================================================
