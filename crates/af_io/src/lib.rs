// crates/af_io/src/lib.rs

//! AeroFuse 持久化层
//!
//! - [`model_store`]: 版本化模型封套的保存与加载
//! - [`export`]: 仪表盘导出包

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod export;
pub mod model_store;

pub use export::{write_json, DashboardBundle};
pub use model_store::{ModelEnvelope, ModelStore};
