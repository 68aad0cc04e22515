// crates/af_model/src/lib.rs

//! AeroFuse 模型层
//!
//! 树集成回归器、站点分折交叉验证与训练编排。
//!
//! # 模块
//!
//! - [`tree`]: 方差削减回归树 (CART)
//! - [`forest`]: 随机森林
//! - [`boosting`]: 梯度提升
//! - [`estimator`]: 配置驱动的统一拟合/预测入口
//! - [`cv`]: 站点分折划分
//! - [`metrics`]: MAE / RMSE / R²
//! - [`trainer`]: 交叉验证 + 最终拟合编排
//!
//! # 确定性
//!
//! 所有随机性由配置中的种子驱动；同配置同数据必得同一模型，
//! 同模型同输入必得同一预测。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boosting;
pub mod cv;
pub mod estimator;
pub mod forest;
pub mod metrics;
pub mod trainer;
pub mod tree;

pub use cv::FoldAssignment;
pub use estimator::FittedModel;
pub use metrics::ErrorMetrics;
pub use trainer::{FoldOutcome, ModelTrainer, TrainingOutcome};

/// 常用类型预导入
pub mod prelude {
    pub use crate::cv::FoldAssignment;
    pub use crate::estimator::FittedModel;
    pub use crate::metrics::ErrorMetrics;
    pub use crate::trainer::{FoldOutcome, ModelTrainer, TrainingOutcome};
}
