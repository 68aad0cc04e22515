// crates/af_fusion/src/sources.rs

//! 数据源抽象
//!
//! 管线以抽象接口消费三类输入：栅格场源（卫星 AOD、气象再分析）
//! 与点观测源（地面站）。具体文件格式由数据提供方负责，
//! 核心只接收已解析的内存表示。
//!
//! # 支持的数据源
//!
//! - 内存数据源（测试与上游适配）
//! - 合成数据源（演示模式，取值范围沿用原型数据生成器）

use af_foundation::error::{AfError, AfResult};
use af_geo::crs::Crs;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// ============================================================================
// 原始栅格数据
// ============================================================================

/// 原始栅格数据（对齐前）
///
/// 源网格可以是任意原生分辨率/投影的散点集合：
/// `(xs[i], ys[i])` 为第 i 个采样点在 `crs` 下的坐标，
/// `values[t * n_points + i]` 为第 t 个源时刻该点的值。
#[derive(Debug, Clone)]
pub struct RawGridData {
    /// 数据源名称（同时作为特征列名）
    pub name: String,
    /// 坐标参考系统
    pub crs: Crs,
    /// 采样点 x 坐标
    pub xs: Vec<f64>,
    /// 采样点 y 坐标
    pub ys: Vec<f64>,
    /// 源时间戳（升序）
    pub times: Vec<DateTime<Utc>>,
    /// 值，时间为外层维度，`None` = 缺失
    pub values: Vec<Option<f64>>,
}

impl RawGridData {
    /// 创建并校验
    ///
    /// # Errors
    /// 坐标/值数组长度不一致时返回 `SizeMismatch`。
    pub fn new(
        name: impl Into<String>,
        crs: Crs,
        xs: Vec<f64>,
        ys: Vec<f64>,
        times: Vec<DateTime<Utc>>,
        values: Vec<Option<f64>>,
    ) -> AfResult<Self> {
        AfError::check_size("source coords", xs.len(), ys.len())?;
        AfError::check_size("source values", xs.len() * times.len(), values.len())?;
        Ok(Self {
            name: name.into(),
            crs,
            xs,
            ys,
            times,
            values,
        })
    }

    /// 采样点数量
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.xs.len()
    }

    /// 源时刻数量
    #[must_use]
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// 第 `t` 个源时刻第 `i` 个采样点的值
    #[inline]
    #[must_use]
    pub fn value(&self, t: usize, i: usize) -> Option<f64> {
        self.values[t * self.n_points() + i]
    }
}

/// 栅格场源
pub trait GriddedFieldSource {
    /// 数据源名称
    fn name(&self) -> &str;

    /// 读取原始栅格数据
    fn fetch(&self) -> AfResult<RawGridData>;
}

// ============================================================================
// 站点观测
// ============================================================================

/// 地面站观测
///
/// 原始且不可变：站点真实坐标，从不重采样，只匹配到最近网格单元。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationObservation {
    /// 站点标识
    pub station_id: String,
    /// 站点纬度 (度)
    pub lat: f64,
    /// 站点经度 (度)
    pub lon: f64,
    /// 观测时刻 (UTC)
    pub timestamp: DateTime<Utc>,
    /// PM2.5 浓度 [µg/m³]
    pub pm25: f64,
}

/// 点观测源
pub trait StationSource {
    /// 读取全部站点观测
    fn fetch(&self) -> AfResult<Vec<StationObservation>>;
}

// ============================================================================
// 内存数据源
// ============================================================================

/// 内存栅格场源
#[derive(Debug, Clone)]
pub struct MemoryGriddedSource {
    data: RawGridData,
}

impl MemoryGriddedSource {
    /// 包装已有数据
    #[must_use]
    pub fn new(data: RawGridData) -> Self {
        Self { data }
    }
}

impl GriddedFieldSource for MemoryGriddedSource {
    fn name(&self) -> &str {
        &self.data.name
    }

    fn fetch(&self) -> AfResult<RawGridData> {
        Ok(self.data.clone())
    }
}

/// 内存点观测源
#[derive(Debug, Clone, Default)]
pub struct MemoryStationSource {
    observations: Vec<StationObservation>,
}

impl MemoryStationSource {
    /// 包装已有观测
    #[must_use]
    pub fn new(observations: Vec<StationObservation>) -> Self {
        Self { observations }
    }
}

impl StationSource for MemoryStationSource {
    fn fetch(&self) -> AfResult<Vec<StationObservation>> {
        Ok(self.observations.clone())
    }
}

// ============================================================================
// 合成数据源（演示模式）
// ============================================================================

/// 合成场景配置
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// 地理边界 (lat_min, lat_max, lon_min, lon_max)
    pub bounds: (f64, f64, f64, f64),
    /// 源网格原生分辨率 (度)，故意与参考网格不同
    pub native_resolution: f64,
    /// 源时间戳
    pub times: Vec<DateTime<Utc>>,
    /// 站点数量
    pub n_stations: usize,
    /// 每站观测的时刻间隔
    pub station_step: Duration,
    /// 缺失值比例 [0, 1)
    pub missing_fraction: f64,
    /// 随机种子
    pub seed: u64,
}

/// 合成场景
///
/// 生成相互一致的 AOD / 气象栅格与地面站观测：
/// 站点 PM2.5 由同位置 AOD 与气象量线性组合加噪声得到，
/// 使得回归模型存在可学习的信号。取值范围沿用原型数据生成器：
/// AOD [0.1, 1.2]、气温 [20, 40] °C、湿度 [30, 90] %、风速 [1, 10] m/s。
pub struct SyntheticScene {
    config: SyntheticConfig,
}

impl SyntheticScene {
    /// 创建合成场景
    #[must_use]
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    fn grid_points(&self) -> (Vec<f64>, Vec<f64>) {
        let (lat_min, lat_max, lon_min, lon_max) = self.config.bounds;
        let res = self.config.native_resolution;
        let n_rows = ((lat_max - lat_min) / res).ceil() as usize;
        let n_cols = ((lon_max - lon_min) / res).ceil() as usize;

        let mut xs = Vec::with_capacity(n_rows * n_cols);
        let mut ys = Vec::with_capacity(n_rows * n_cols);
        for r in 0..n_rows {
            for c in 0..n_cols {
                xs.push(lon_min + (c as f64 + 0.5) * res);
                ys.push(lat_min + (r as f64 + 0.5) * res);
            }
        }
        (xs, ys)
    }

    fn field(&self, name: &str, lo: f64, hi: f64, seed_offset: u64) -> AfResult<RawGridData> {
        let (xs, ys) = self.grid_points();
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(seed_offset));
        let n = xs.len() * self.config.times.len();

        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            if rng.gen::<f64>() < self.config.missing_fraction {
                values.push(None);
            } else {
                values.push(Some(rng.gen_range(lo..hi)));
            }
        }

        RawGridData::new(
            name,
            Crs::Wgs84,
            xs,
            ys,
            self.config.times.clone(),
            values,
        )
    }

    /// 卫星 AOD 场
    pub fn aod(&self) -> AfResult<RawGridData> {
        self.field("aod", 0.1, 1.2, 1)
    }

    /// 气温场 [°C]
    pub fn temperature(&self) -> AfResult<RawGridData> {
        self.field("temperature", 20.0, 40.0, 2)
    }

    /// 相对湿度场 [%]
    pub fn humidity(&self) -> AfResult<RawGridData> {
        self.field("humidity", 30.0, 90.0, 3)
    }

    /// 风速场 [m/s]
    pub fn wind_speed(&self) -> AfResult<RawGridData> {
        self.field("wind_speed", 1.0, 10.0, 4)
    }

    /// 地面站观测
    ///
    /// 站点随机落在边界内，PM2.5 = 60·AOD 近似 + 温湿风修正 + 噪声。
    pub fn stations(&self) -> AfResult<Vec<StationObservation>> {
        let (lat_min, lat_max, lon_min, lon_max) = self.config.bounds;
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(100));

        let aod = self.aod()?;
        let temperature = self.temperature()?;
        let wind = self.wind_speed()?;

        let mut observations = Vec::new();
        for s in 0..self.config.n_stations {
            let lat = rng.gen_range(lat_min..lat_max);
            let lon = rng.gen_range(lon_min..lon_max);
            let station_id = format!("ST{s:04}");

            // 最近源采样点，用其特征构造目标
            let mut best = 0usize;
            let mut best_d = f64::MAX;
            for i in 0..aod.n_points() {
                let dx = aod.xs[i] - lon;
                let dy = aod.ys[i] - lat;
                let d = dx * dx + dy * dy;
                if d < best_d {
                    best_d = d;
                    best = i;
                }
            }

            let mut t = *self.config.times.first().ok_or_else(|| {
                AfError::invalid_input("合成场景需要至少一个源时刻")
            })?;
            let t_end = *self.config.times.last().unwrap_or(&t);
            while t <= t_end {
                let (slot, _) = nearest_source_time(&aod.times, t);
                let a = aod.value(slot, best).unwrap_or(0.6);
                let tc = temperature.value(slot, best).unwrap_or(30.0);
                let w = wind.value(slot, best).unwrap_or(5.0);

                let pm25 = 60.0 * a + 0.8 * (tc - 30.0) - 2.0 * (w - 5.0)
                    + rng.gen_range(-5.0..5.0)
                    + 20.0;

                observations.push(StationObservation {
                    station_id: station_id.clone(),
                    lat,
                    lon,
                    timestamp: t,
                    pm25: pm25.max(1.0),
                });
                t += self.config.station_step;
            }
        }
        Ok(observations)
    }
}

/// 距给定时刻最近的源时刻下标
fn nearest_source_time(times: &[DateTime<Utc>], t: DateTime<Utc>) -> (usize, Duration) {
    let mut best = 0usize;
    let mut best_diff = Duration::MAX;
    for (i, st) in times.iter().enumerate() {
        let diff = (t - *st).abs();
        if diff < best_diff {
            best_diff = diff;
            best = i;
        }
    }
    (best, best_diff)
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn times() -> Vec<DateTime<Utc>> {
        (0..3)
            .map(|d| Utc.with_ymd_and_hms(2024, 3, 1 + d, 0, 0, 0).unwrap())
            .collect()
    }

    fn scene() -> SyntheticScene {
        SyntheticScene::new(SyntheticConfig {
            bounds: (10.0, 12.0, 70.0, 72.0),
            native_resolution: 0.5,
            times: times(),
            n_stations: 4,
            station_step: Duration::days(1),
            missing_fraction: 0.1,
            seed: 7,
        })
    }

    #[test]
    fn test_raw_grid_size_check() {
        let bad = RawGridData::new(
            "aod",
            Crs::Wgs84,
            vec![70.0, 71.0],
            vec![10.0],
            times(),
            vec![Some(1.0)],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_synthetic_field_ranges() {
        let aod = scene().aod().unwrap();
        assert_eq!(aod.n_points(), 16);
        assert_eq!(aod.n_times(), 3);
        for v in aod.values.iter().flatten() {
            assert!(*v >= 0.1 && *v < 1.2);
        }
    }

    #[test]
    fn test_synthetic_deterministic() {
        let a = scene().aod().unwrap();
        let b = scene().aod().unwrap();
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn test_synthetic_stations() {
        let observations = scene().stations().unwrap();
        // 4 个站 × 3 天
        assert_eq!(observations.len(), 12);
        for o in &observations {
            assert!(o.lat >= 10.0 && o.lat <= 12.0);
            assert!(o.pm25 > 0.0);
        }
    }

    #[test]
    fn test_memory_sources() {
        let data = scene().aod().unwrap();
        let source = MemoryGriddedSource::new(data);
        assert_eq!(source.name(), "aod");
        assert!(source.fetch().is_ok());

        let stations = MemoryStationSource::new(scene().stations().unwrap());
        assert_eq!(stations.fetch().unwrap().len(), 12);
    }
}
