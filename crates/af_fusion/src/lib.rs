// crates/af_fusion/src/lib.rs

//! AeroFuse 融合核心
//!
//! 把互不兼容的栅格数据源与地面站观测统一到共享参考网格/时间轴上，
//! 并产出模型可用的特征表。
//!
//! # 模块
//!
//! - [`sources`]: 数据源抽象与合成演示场景
//! - [`aligner`]: 栅格重投影与时空重采样
//! - [`matcher`]: 站点观测到网格单元/时间槽的关联
//! - [`features`]: 训练/推理特征表构建
//!
//! # 数据流
//!
//! ```text
//! RawGridData --GridAligner--> GriddedField ┐
//!                                           ├--FeatureTableBuilder--> FeatureTable
//! StationObservation --StationMatcher-------┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aligner;
pub mod features;
pub mod matcher;
pub mod sources;

pub use aligner::GridAligner;
pub use features::{BuildStats, FeatureTable, FeatureTableBuilder, TrainingTable};
pub use matcher::{MatchReport, MatchedObservation, StationMatcher};
pub use sources::{
    GriddedFieldSource, MemoryGriddedSource, MemoryStationSource, RawGridData,
    StationObservation, StationSource, SyntheticConfig, SyntheticScene,
};

/// 常用类型预导入
pub mod prelude {
    pub use crate::aligner::GridAligner;
    pub use crate::features::{FeatureTable, FeatureTableBuilder, TrainingTable};
    pub use crate::matcher::{MatchReport, MatchedObservation, StationMatcher};
    pub use crate::sources::{RawGridData, StationObservation, SyntheticConfig, SyntheticScene};
}
