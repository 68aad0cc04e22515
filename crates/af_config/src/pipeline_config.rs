// crates/af_config/src/pipeline_config.rs

//! PipelineConfig - 融合管线配置（全 f64）
//!
//! 定义一次管线运行的所有参数。配置对象显式传入每个组件，
//! 不使用全局状态，因此不同配置的管线可以并行运行互不干扰。
//!
//! 默认值对应原始研究区域：印度，0.5° 日尺度格网，
//! 特征 aod / temperature / humidity / wind_speed。

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use af_foundation::error::{AfError, AfResult};

/// 融合管线配置
///
/// 所有字段均可在 JSON 配置文件中省略，省略时取默认值。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// 参考网格配置
    #[serde(default)]
    pub grid: GridConfig,

    /// 时间轴配置
    #[serde(default)]
    pub time: TimeConfig,

    /// 站点匹配配置
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// 特征表配置
    #[serde(default)]
    pub features: FeatureConfig,

    /// 模型配置
    #[serde(default)]
    pub model: ModelConfig,

    /// 交叉验证配置
    #[serde(default)]
    pub cv: CvConfig,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> AfResult<Self> {
        if !path.exists() {
            return Err(AfError::file_not_found(path));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AfError::serialization(format!("配置解析失败: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存为 JSON 文件
    pub fn save(&self, path: &Path) -> AfResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AfError::serialization(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// 校验配置一致性
    ///
    /// 各子配置的结构性错误（非法边界、非正分辨率等）在构建
    /// 参考网格/时间轴时报告；这里检查跨节的约束。
    pub fn validate(&self) -> AfResult<()> {
        self.grid.validate()?;
        self.time.validate()?;
        self.matcher.validate()?;
        self.model.validate()?;
        self.cv.validate()?;
        if self.features.columns.is_empty() {
            return Err(AfError::missing_config("features.columns"));
        }
        Ok(())
    }
}

// ============================================================================
// 网格配置
// ============================================================================

/// 参考网格配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// 南边界纬度 (度)
    #[serde(default = "default_lat_min")]
    pub lat_min: f64,

    /// 北边界纬度 (度)
    #[serde(default = "default_lat_max")]
    pub lat_max: f64,

    /// 西边界经度 (度)
    #[serde(default = "default_lon_min")]
    pub lon_min: f64,

    /// 东边界经度 (度)
    #[serde(default = "default_lon_max")]
    pub lon_max: f64,

    /// 单元分辨率 (度)
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

// 印度研究区域范围
fn default_lat_min() -> f64 { 5.0 }
fn default_lat_max() -> f64 { 38.0 }
fn default_lon_min() -> f64 { 65.0 }
fn default_lon_max() -> f64 { 100.0 }
fn default_resolution() -> f64 { 0.5 }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            lat_min: default_lat_min(),
            lat_max: default_lat_max(),
            lon_min: default_lon_min(),
            lon_max: default_lon_max(),
            resolution: default_resolution(),
        }
    }
}

impl GridConfig {
    fn validate(&self) -> AfResult<()> {
        if !(self.resolution > 0.0) {
            return Err(AfError::invalid_config(
                "grid.resolution",
                self.resolution.to_string(),
                "必须为正",
            ));
        }
        if self.lat_max <= self.lat_min || self.lon_max <= self.lon_min {
            return Err(AfError::invalid_config(
                "grid.bounds",
                format!(
                    "lat [{}, {}], lon [{}, {}]",
                    self.lat_min, self.lat_max, self.lon_min, self.lon_max
                ),
                "上界必须大于下界",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// 时间轴配置
// ============================================================================

/// 时间粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    /// 逐小时
    Hourly,
    /// 逐日
    #[default]
    Daily,
}

impl TimeGranularity {
    /// 对应的时间步长
    #[must_use]
    pub fn step(&self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::Daily => Duration::days(1),
        }
    }
}

/// 时间轴配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 起始时刻 (UTC)
    #[serde(default = "default_time_start")]
    pub start: DateTime<Utc>,

    /// 结束时刻 (UTC)，含
    #[serde(default = "default_time_end")]
    pub end: DateTime<Utc>,

    /// 时间粒度
    #[serde(default)]
    pub granularity: TimeGranularity,
}

fn default_time_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn default_time_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 30, 0, 0, 0).unwrap()
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start: default_time_start(),
            end: default_time_end(),
            granularity: TimeGranularity::default(),
        }
    }
}

impl TimeConfig {
    fn validate(&self) -> AfResult<()> {
        if self.end < self.start {
            return Err(AfError::invalid_config(
                "time.range",
                format!("{} .. {}", self.start, self.end),
                "结束时刻不能早于起始时刻",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// 重采样规则
// ============================================================================

/// 空间重采样规则
///
/// 每个数据源声明一条规则，整条管线内固定不变。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ResampleRule {
    /// 最近邻：取距参考单元质心最近的源采样点
    ///
    /// `search_radius_m` 为 None 时使用参考单元对角线的 1.5 倍。
    NearestNeighbor {
        /// 搜索半径 (米)
        #[serde(default)]
        search_radius_m: Option<f64>,
    },
    /// 单元均值：落入参考单元地理范围内的源采样点取算术平均
    CellMean,
}

impl Default for ResampleRule {
    fn default() -> Self {
        Self::NearestNeighbor {
            search_radius_m: None,
        }
    }
}

// ============================================================================
// 站点匹配配置
// ============================================================================

/// 站点匹配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// 最大质心距离 (米)，超出则拒绝该观测
    #[serde(default = "default_max_distance")]
    pub max_distance_m: f64,

    /// 最大时间差 (秒)，超出则拒绝该观测
    #[serde(default = "default_max_time_diff")]
    pub max_time_diff_secs: i64,
}

fn default_max_distance() -> f64 { 50_000.0 }
fn default_max_time_diff() -> i64 { 43_200 }

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_distance_m: default_max_distance(),
            max_time_diff_secs: default_max_time_diff(),
        }
    }
}

impl MatcherConfig {
    fn validate(&self) -> AfResult<()> {
        if !(self.max_distance_m > 0.0) {
            return Err(AfError::invalid_config(
                "matcher.max_distance_m",
                self.max_distance_m.to_string(),
                "必须为正",
            ));
        }
        if self.max_time_diff_secs <= 0 {
            return Err(AfError::invalid_config(
                "matcher.max_time_diff_secs",
                self.max_time_diff_secs.to_string(),
                "必须为正",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// 特征表配置
// ============================================================================

/// 缺失数据策略
///
/// 训练行与推理行必须使用同一策略，避免分布漂移。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MissingPolicy {
    /// 丢弃整行（推理时该单元在预测面中保持缺失）
    #[default]
    Drop,
    /// 用固定回退值填充
    Constant {
        /// 回退值
        value: f64,
    },
    /// 邻域均值：先取同时间槽 4 邻单元均值，再取同单元 ±1 时间槽均值，
    /// 两者皆缺失时退化为 Drop
    NeighborMean,
}

/// 特征表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// 栅格特征列及其顺序（决定表的列模式）
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,

    /// 各特征的缺失策略，未列出的特征使用 `default_policy`
    #[serde(default)]
    pub policies: BTreeMap<String, MissingPolicy>,

    /// 默认缺失策略
    #[serde(default)]
    pub default_policy: MissingPolicy,

    /// 是否附加派生特征 (lat, lon, doy_sin, doy_cos)
    #[serde(default = "default_true")]
    pub derived: bool,
}

fn default_columns() -> Vec<String> {
    vec![
        "aod".to_string(),
        "temperature".to_string(),
        "humidity".to_string(),
        "wind_speed".to_string(),
    ]
}

fn default_true() -> bool { true }

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            policies: BTreeMap::new(),
            default_policy: MissingPolicy::default(),
            derived: default_true(),
        }
    }
}

impl FeatureConfig {
    /// 某特征的缺失策略
    #[must_use]
    pub fn policy_for(&self, feature: &str) -> MissingPolicy {
        self.policies
            .get(feature)
            .copied()
            .unwrap_or(self.default_policy)
    }
}

// ============================================================================
// 模型配置
// ============================================================================

/// 估计器族
///
/// 通过配置选择，而非子类化。所有实现满足统一的 fit/predict 契约。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum EstimatorKind {
    /// 随机森林回归
    RandomForest {
        /// 树数量
        #[serde(default = "default_n_trees")]
        n_trees: usize,
        /// 最大深度
        #[serde(default = "default_max_depth")]
        max_depth: usize,
        /// 叶节点最小样本数
        #[serde(default = "default_min_samples_leaf")]
        min_samples_leaf: usize,
        /// 随机种子
        #[serde(default = "default_seed")]
        seed: u64,
    },
    /// 梯度提升树回归
    GradientBoosting {
        /// 提升轮数
        #[serde(default = "default_n_rounds")]
        n_rounds: usize,
        /// 学习率
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        /// 单树最大深度
        #[serde(default = "default_gb_depth")]
        max_depth: usize,
        /// 叶节点最小样本数
        #[serde(default = "default_min_samples_leaf")]
        min_samples_leaf: usize,
        /// 随机种子
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

// 原始实现: RandomForestRegressor(n_estimators=100, random_state=42)
fn default_n_trees() -> usize { 100 }
fn default_max_depth() -> usize { 12 }
fn default_min_samples_leaf() -> usize { 2 }
fn default_seed() -> u64 { 42 }
fn default_n_rounds() -> usize { 200 }
fn default_learning_rate() -> f64 { 0.05 }
fn default_gb_depth() -> usize { 4 }

impl Default for EstimatorKind {
    fn default() -> Self {
        Self::RandomForest {
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

impl EstimatorKind {
    /// 族名称
    #[must_use]
    pub fn family_name(&self) -> &'static str {
        match self {
            Self::RandomForest { .. } => "random_forest",
            Self::GradientBoosting { .. } => "gradient_boosting",
        }
    }
}

/// 模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 估计器族与超参数
    #[serde(default)]
    pub estimator: EstimatorKind,

    /// 缺失策略应用后的最小可用训练行数
    #[serde(default = "default_min_training_rows")]
    pub min_training_rows: usize,
}

fn default_min_training_rows() -> usize { 30 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorKind::default(),
            min_training_rows: default_min_training_rows(),
        }
    }
}

impl ModelConfig {
    fn validate(&self) -> AfResult<()> {
        if self.min_training_rows == 0 {
            return Err(AfError::invalid_config(
                "model.min_training_rows",
                "0",
                "必须为正",
            ));
        }
        match &self.estimator {
            EstimatorKind::RandomForest { n_trees, max_depth, .. } => {
                if *n_trees == 0 || *max_depth == 0 {
                    return Err(AfError::invalid_config(
                        "model.estimator",
                        "random_forest",
                        "树数量与最大深度必须为正",
                    ));
                }
            }
            EstimatorKind::GradientBoosting {
                n_rounds,
                learning_rate,
                max_depth,
                ..
            } => {
                if *n_rounds == 0 || *max_depth == 0 {
                    return Err(AfError::invalid_config(
                        "model.estimator",
                        "gradient_boosting",
                        "轮数与最大深度必须为正",
                    ));
                }
                if !(*learning_rate > 0.0 && *learning_rate <= 1.0) {
                    return Err(AfError::invalid_config(
                        "model.estimator.learning_rate",
                        learning_rate.to_string(),
                        "必须在 (0, 1] 内",
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// 交叉验证配置
// ============================================================================

/// 交叉验证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvConfig {
    /// 折数（按站点划分，非按行）
    #[serde(default = "default_n_folds")]
    pub n_folds: usize,
}

fn default_n_folds() -> usize { 5 }

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_folds: default_n_folds(),
        }
    }
}

impl CvConfig {
    fn validate(&self) -> AfResult<()> {
        if self.n_folds < 2 {
            return Err(AfError::invalid_config(
                "cv.n_folds",
                self.n_folds.to_string(),
                "至少为 2",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// 输出配置
// ============================================================================

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出目录（模型、导出包）
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_columns() {
        let config = FeatureConfig::default();
        assert_eq!(
            config.columns,
            vec!["aod", "temperature", "humidity", "wind_speed"]
        );
    }

    #[test]
    fn test_policy_for_falls_back_to_default() {
        let mut config = FeatureConfig::default();
        config
            .policies
            .insert("aod".into(), MissingPolicy::NeighborMean);
        assert_eq!(config.policy_for("aod"), MissingPolicy::NeighborMean);
        assert_eq!(config.policy_for("humidity"), MissingPolicy::Drop);
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let mut config = PipelineConfig::default();
        config.grid.resolution = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_cv_rejected() {
        let mut config = PipelineConfig::default();
        config.cv.n_folds = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_learning_rate_rejected() {
        let mut config = PipelineConfig::default();
        config.model.estimator = EstimatorKind::GradientBoosting {
            n_rounds: 100,
            learning_rate: 1.5,
            max_depth: 4,
            min_samples_leaf: 2,
            seed: 42,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PipelineConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.grid.resolution, config.grid.resolution);
        assert_eq!(parsed.features.columns, config.features.columns);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: PipelineConfig =
            serde_json::from_str(r#"{"grid": {"resolution": 1.0}}"#).unwrap();
        assert_eq!(parsed.grid.resolution, 1.0);
        assert_eq!(parsed.grid.lat_min, 5.0);
        assert_eq!(parsed.cv.n_folds, 5);
    }

    #[test]
    fn test_estimator_tagged_json() {
        let kind: EstimatorKind = serde_json::from_str(
            r#"{"family": "gradient_boosting", "n_rounds": 50}"#,
        )
        .unwrap();
        assert_eq!(kind.family_name(), "gradient_boosting");
    }

    #[test]
    fn test_resample_rule_default_radius() {
        let rule = ResampleRule::default();
        assert!(matches!(
            rule,
            ResampleRule::NearestNeighbor {
                search_radius_m: None
            }
        ));
    }
}
