// crates/af_foundation/src/lib.rs

//! AeroFuse Foundation Layer
//!
//! 基础层，提供整个项目的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型，含融合管线的致命错误分类
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 thiserror
//! 2. **显式失败**: 任何会悄悄改变结果语义的情况
//!    (零重叠、列不一致) 必须以错误形式浮出，不允许默认值兜底
//!
//! # 示例
//!
//! ```
//! use af_foundation::{AfError, AfResult, ensure};
//!
//! fn positive(x: f64) -> AfResult<f64> {
//!     ensure!(x > 0.0, AfError::invalid_input("x 必须为正"));
//!     Ok(x)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

// 重导出常用类型
pub use error::{AfError, AfResult};

/// 条件检查宏：条件不满足时返回给定错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}

/// Option 解包宏：None 时返回给定错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err),
        }
    };
}

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{AfError, AfResult};
    pub use crate::{ensure, require};
}
