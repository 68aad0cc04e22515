// crates/af_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `AfError` 枚举和 `AfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **层次化**: 基础层定义核心错误，融合/建模相关错误通过专用变体表达
//! 2. **致命 vs 非致命**: 空间/时间零重叠 (`Alignment`)、训练行不足
//!    (`InsufficientData`)、特征列不一致 (`SchemaMismatch`) 为致命错误，
//!    管线必须中止；单条观测被拒 (匹配容差) 不是错误，仅计入诊断
//! 3. **可追溯**: 支持错误链
//!
//! # 示例
//!
//! ```
//! use af_foundation::error::{AfError, AfResult};
//!
//! fn read_config() -> AfResult<()> {
//!     Err(AfError::config("配置文件格式错误"))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type AfResult<T> = Result<T, AfError>;

/// AeroFuse 错误类型
///
/// 核心错误类型，用于整个项目。致命的数据融合错误
/// (`Alignment`/`InsufficientData`/`SchemaMismatch`) 也在此定义，
/// 以便跨层传递。
#[derive(Error, Debug)]
pub enum AfError {
    // ========================================================================
    // 数据融合致命错误
    // ========================================================================

    /// 对齐失败：数据源与参考网格/时间索引无重叠
    #[error("对齐失败: 数据源 {source_name} {reason}")]
    Alignment {
        /// 数据源名称
        source_name: String,
        /// 失败原因（无空间重叠 / 无时间重叠）
        reason: String,
    },

    /// 可用训练数据不足
    #[error("训练数据不足: 需要至少 {required} 行, 实际 {actual} 行")]
    InsufficientData {
        /// 配置的最小行数
        required: usize,
        /// 缺失策略应用后的实际行数
        actual: usize,
    },

    /// 训练/推理特征列不一致
    #[error("特征列不一致: 训练列 {expected:?}, 推理列 {actual:?}")]
    SchemaMismatch {
        /// 训练表列名（不含目标列）
        expected: Vec<String>,
        /// 推理表列名
        actual: Vec<String>,
    },

    // ========================================================================
    // IO 相关错误
    // ========================================================================

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    /// 持久化格式版本不兼容
    #[error("模型格式版本不兼容: 文件版本 {file}, 当前版本 {current}")]
    FormatVersion {
        /// 文件中记录的版本
        file: u32,
        /// 当前支持的版本
        current: u32,
    },

    // ========================================================================
    // 输入/配置错误
    // ========================================================================

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 缺少配置项
    #[error("缺少必需的配置项: {key}")]
    MissingConfig {
        /// 配置键名
        key: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 投影错误
    #[error("投影错误: {0}")]
    Projection(String),

    /// 验证失败
    #[error("验证失败: {0}")]
    Validation(String),

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl AfError {
    /// 对齐失败
    pub fn alignment(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Alignment {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// 训练数据不足
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// 特征列不一致
    pub fn schema_mismatch(expected: Vec<String>, actual: Vec<String>) -> Self {
        Self::SchemaMismatch { expected, actual }
    }

    /// 从IO错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 缺少配置
    pub fn missing_config(key: impl Into<String>) -> Self {
        Self::MissingConfig { key: key.into() }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 投影错误
    pub fn projection(message: impl Into<String>) -> Self {
        Self::Projection(message.into())
    }

    /// 验证失败
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl AfError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> AfResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> AfResult<()> {
        if value < min || value > max {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> AfResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for AfError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
