// crates/af_fusion/src/matcher.rs

//! 站点匹配器
//!
//! 把地面站观测关联到参考网格单元与时间槽。观测保持原始值不变，
//! 从不重采样；超出空间/时间容差的观测被拒绝并记入匹配报告，
//! 拒绝属于预期的正常结果而非错误。

use af_config::MatcherConfig;
use af_foundation::error::AfResult;
use af_geo::grid::ReferenceGrid;
use af_geo::time_index::TimeIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sources::StationObservation;

// ============================================================================
// 匹配结果
// ============================================================================

/// 已匹配的站点观测
///
/// 观测值原样保留，附加其落入的网格单元、时间槽与匹配距离。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedObservation {
    /// 站点标识
    pub station_id: String,
    /// 匹配到的网格单元
    pub cell: usize,
    /// 匹配到的时间槽
    pub slot: usize,
    /// PM2.5 浓度 [µg/m³]
    pub pm25: f64,
    /// 站点到单元质心的距离 (米)
    pub distance_m: f64,
    /// 观测时刻到槽时刻的偏差 (秒)
    pub time_diff_secs: i64,
}

/// 匹配报告
///
/// 汇总接受与各类拒绝的数量，随运行摘要一起输出。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// 输入观测总数
    pub n_input: usize,
    /// 成功匹配数
    pub n_matched: usize,
    /// 因空间距离超限被拒数
    pub rejected_distance: usize,
    /// 因时间偏差超限被拒数
    pub rejected_time: usize,
}

impl MatchReport {
    /// 被拒观测总数
    #[must_use]
    pub fn n_rejected(&self) -> usize {
        self.rejected_distance + self.rejected_time
    }
}

// ============================================================================
// 匹配器
// ============================================================================

/// 站点匹配器
pub struct StationMatcher<'a> {
    grid: &'a ReferenceGrid,
    time_index: &'a TimeIndex,
    config: MatcherConfig,
}

impl<'a> StationMatcher<'a> {
    /// 创建匹配器
    #[must_use]
    pub fn new(grid: &'a ReferenceGrid, time_index: &'a TimeIndex, config: MatcherConfig) -> Self {
        Self {
            grid,
            time_index,
            config,
        }
    }

    /// 匹配一批站点观测
    ///
    /// 每条观测独立判定：先找最近网格单元，质心距离超过
    /// `max_distance_m` 则拒绝；再找最近时间槽，偏差超过
    /// `max_time_diff_secs` 则拒绝。两者都通过才进入结果。
    pub fn match_observations(
        &self,
        observations: &[StationObservation],
    ) -> AfResult<(Vec<MatchedObservation>, MatchReport)> {
        let mut matched = Vec::with_capacity(observations.len());
        let mut report = MatchReport {
            n_input: observations.len(),
            ..MatchReport::default()
        };

        for obs in observations {
            match self.match_one(obs) {
                MatchOutcome::Accepted(m) => {
                    matched.push(m);
                    report.n_matched += 1;
                }
                MatchOutcome::TooFar(distance_m) => {
                    report.rejected_distance += 1;
                    tracing::debug!(
                        station = %obs.station_id,
                        distance_m,
                        limit_m = self.config.max_distance_m,
                        "observation rejected: too far from nearest cell"
                    );
                }
                MatchOutcome::TooLate(diff_secs) => {
                    report.rejected_time += 1;
                    tracing::debug!(
                        station = %obs.station_id,
                        timestamp = %obs.timestamp,
                        diff_secs,
                        limit_secs = self.config.max_time_diff_secs,
                        "observation rejected: outside time tolerance"
                    );
                }
            }
        }

        tracing::info!(
            n_input = report.n_input,
            n_matched = report.n_matched,
            rejected_distance = report.rejected_distance,
            rejected_time = report.rejected_time,
            "station matching finished"
        );
        Ok((matched, report))
    }

    fn match_one(&self, obs: &StationObservation) -> MatchOutcome {
        let cell = self.grid.nearest_cell(obs.lat, obs.lon);
        let centroid = self.grid.centroid(cell);
        let distance_m = centroid
            .geodesic_distance_to(&af_geo::geometry::Point2D::new(obs.lon, obs.lat));
        if distance_m > self.config.max_distance_m {
            return MatchOutcome::TooFar(distance_m);
        }

        let (slot, diff) = self.nearest_slot(obs.timestamp);
        let diff_secs = diff;
        if diff_secs > self.config.max_time_diff_secs {
            return MatchOutcome::TooLate(diff_secs);
        }

        MatchOutcome::Accepted(MatchedObservation {
            station_id: obs.station_id.clone(),
            cell,
            slot,
            pm25: obs.pm25,
            distance_m,
            time_diff_secs: diff_secs,
        })
    }

    fn nearest_slot(&self, t: DateTime<Utc>) -> (usize, i64) {
        let (slot, diff) = self.time_index.nearest_slot(t);
        (slot, diff.num_seconds())
    }
}

enum MatchOutcome {
    Accepted(MatchedObservation),
    TooFar(f64),
    TooLate(i64),
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn setup() -> (ReferenceGrid, TimeIndex) {
        let grid = ReferenceGrid::new(10.0, 13.0, 70.0, 73.0, 1.0).unwrap();
        let index = TimeIndex::new(day(1), day(3), Duration::days(1)).unwrap();
        (grid, index)
    }

    fn obs(id: &str, lat: f64, lon: f64, t: DateTime<Utc>) -> StationObservation {
        StationObservation {
            station_id: id.into(),
            lat,
            lon,
            timestamp: t,
            pm25: 42.0,
        }
    }

    #[test]
    fn test_match_at_centroid() {
        let (grid, index) = setup();
        let matcher = StationMatcher::new(&grid, &index, MatcherConfig::default());

        let c = grid.centroid(4);
        let (matched, report) = matcher
            .match_observations(&[obs("ST01", c.y, c.x, day(2))])
            .unwrap();

        assert_eq!(report.n_matched, 1);
        assert_eq!(matched[0].cell, 4);
        assert_eq!(matched[0].slot, 1);
        assert!(matched[0].distance_m < 1.0);
        assert_eq!(matched[0].pm25, 42.0);
    }

    #[test]
    fn test_distance_tolerance() {
        // 约 50 km 偏移：默认容差 (50 km) 拒绝与否取决于配置
        let (grid, index) = setup();
        let c = grid.centroid(0);
        let far = obs("ST01", c.y + 0.45, c.x, day(1)); // ~50 km 纬向偏移

        let strict = StationMatcher::new(
            &grid,
            &index,
            MatcherConfig {
                max_distance_m: 10_000.0,
                ..MatcherConfig::default()
            },
        );
        let (_, report) = strict.match_observations(&[far.clone()]).unwrap();
        assert_eq!(report.rejected_distance, 1);
        assert_eq!(report.n_matched, 0);

        let loose = StationMatcher::new(
            &grid,
            &index,
            MatcherConfig {
                max_distance_m: 60_000.0,
                ..MatcherConfig::default()
            },
        );
        let (_, report) = loose.match_observations(&[far]).unwrap();
        assert_eq!(report.n_matched, 1);
    }

    #[test]
    fn test_time_tolerance() {
        let (grid, index) = setup();
        let matcher = StationMatcher::new(
            &grid,
            &index,
            MatcherConfig {
                max_time_diff_secs: 3_600,
                ..MatcherConfig::default()
            },
        );

        let c = grid.centroid(0);
        // 槽时刻 +30 分钟：接受；+5 小时：拒绝
        let near = obs("ST01", c.y, c.x, day(1) + Duration::minutes(30));
        let far = obs("ST02", c.y, c.x, day(1) + Duration::hours(5));
        let (matched, report) = matcher.match_observations(&[near, far]).unwrap();

        assert_eq!(report.n_matched, 1);
        assert_eq!(report.rejected_time, 1);
        assert_eq!(matched[0].station_id, "ST01");
    }

    #[test]
    fn test_rejection_is_not_fatal() {
        let (grid, index) = setup();
        let matcher = StationMatcher::new(&grid, &index, MatcherConfig::default());

        // 全部在格网之外，全部被拒但调用成功
        let result = matcher.match_observations(&[
            obs("ST01", -30.0, 0.0, day(1)),
            obs("ST02", 60.0, 170.0, day(2)),
        ]);
        assert!(result.is_ok());
        let (matched, report) = result.unwrap();
        assert!(matched.is_empty());
        assert_eq!(report.n_rejected(), 2);
        assert_eq!(report.n_input, 2);
    }

    #[test]
    fn test_observation_value_unchanged() {
        let (grid, index) = setup();
        let matcher = StationMatcher::new(&grid, &index, MatcherConfig::default());

        let c = grid.centroid(7);
        let mut o = obs("ST01", c.y + 0.01, c.x - 0.02, day(3));
        o.pm25 = 123.456;
        let (matched, _) = matcher.match_observations(&[o]).unwrap();
        assert_eq!(matched[0].pm25, 123.456);
    }
}
