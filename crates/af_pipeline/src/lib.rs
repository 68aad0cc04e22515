// crates/af_pipeline/src/lib.rs

//! AeroFuse 管线编排
//!
//! 把融合、建模与预测各组件按固定阶段顺序串成一次完整运行。
//!
//! # 模块
//!
//! - [`runner`]: 管线运行器与网格预测器
//! - [`summary`]: 运行摘要

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod runner;
pub mod summary;

pub use runner::{GridPredictor, PipelineOutput, PipelineRunner};
pub use summary::{RunSummary, SourceSummary};
