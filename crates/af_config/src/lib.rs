// crates/af_config/src/lib.rs

//! AeroFuse 配置层
//!
//! 提供融合管线的结构化配置文档。配置作为显式对象传入各组件，
//! 不使用进程级全局状态。
//!
//! # 模块
//!
//! - [`pipeline_config`]: 管线配置及各子节
//!
//! # 示例
//!
//! ```
//! use af_config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! assert!(config.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline_config;

pub use pipeline_config::{
    CvConfig, EstimatorKind, FeatureConfig, GridConfig, MatcherConfig, MissingPolicy,
    ModelConfig, OutputConfig, PipelineConfig, ResampleRule, TimeConfig, TimeGranularity,
};
