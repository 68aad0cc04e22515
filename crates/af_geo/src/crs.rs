// crates/af_geo/src/crs.rs

//! 坐标参考系统 (CRS)
//!
//! 所有栅格数据源在重采样前都必须先转换到统一的地理参考系 (WGS84)。
//! 参考网格的单元质心以 WGS84 经纬度定义，重投影不改变质心身份。
//!
//! 纯 Rust 实现，不依赖外部 C 库。
//!
//! # 示例
//!
//! ```
//! use af_geo::crs::Crs;
//!
//! // Web Mercator 坐标转回经纬度
//! let (lon, lat) = Crs::WebMercator.to_wgs84(12_913_060.0, 4_865_942.0).unwrap();
//! assert!((lon - 116.0).abs() < 0.01);
//! assert!((lat - 40.0).abs() < 0.01);
//! ```

use af_foundation::error::{AfError, AfResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Web Mercator 使用的地球半径（等于 WGS84 长半轴）
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Web Mercator 最大纬度 (度)
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779;

/// 坐标参考系统
///
/// 管线内部统一使用 WGS84 经纬度；数据源可以声明自己的 CRS，
/// 对齐器在重采样前调用 [`Crs::to_wgs84`] 完成重投影。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// WGS84 地理坐标 (EPSG:4326)，x = 经度, y = 纬度
    #[default]
    Wgs84,
    /// Web Mercator (EPSG:3857)，x/y 为投影米
    WebMercator,
}

impl Crs {
    /// 从 EPSG 代码创建
    pub fn from_epsg(code: u32) -> AfResult<Self> {
        match code {
            4326 => Ok(Self::Wgs84),
            3857 => Ok(Self::WebMercator),
            _ => Err(AfError::projection(format!("不支持的 EPSG 代码: {code}"))),
        }
    }

    /// EPSG 代码
    #[must_use]
    pub fn epsg(&self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }

    /// 是否为地理坐标系
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Wgs84)
    }

    /// 本 CRS 坐标 -> WGS84 经纬度 (度)
    pub fn to_wgs84(&self, x: f64, y: f64) -> AfResult<(f64, f64)> {
        match self {
            Self::Wgs84 => Ok((x, y)),
            Self::WebMercator => {
                if !x.is_finite() || !y.is_finite() {
                    return Err(AfError::projection(format!(
                        "Web Mercator 坐标非有限值: ({x}, {y})"
                    )));
                }
                let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
                let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
                Ok((lon, lat))
            }
        }
    }

    /// WGS84 经纬度 (度) -> 本 CRS 坐标
    pub fn from_wgs84(&self, lon: f64, lat: f64) -> AfResult<(f64, f64)> {
        match self {
            Self::Wgs84 => Ok((lon, lat)),
            Self::WebMercator => {
                let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
                let x = WEB_MERCATOR_RADIUS * lon.to_radians();
                let y = WEB_MERCATOR_RADIUS * ((PI / 4.0 + lat.to_radians() / 2.0).tan()).ln();
                Ok((x, y))
            }
        }
    }
}

// ============================================================================
// 测试
// ============================================================================
