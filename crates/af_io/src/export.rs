// crates/af_io/src/export.rs

//! 仪表盘导出包
//!
//! 面向可视化消费方的只读数据包：预测面、格网定义、时间轴与
//! 评估指标打包为单个 JSON 文件。导出是管线的最后一步，
//! 消费方不回写任何内容。

use af_foundation::error::{AfError, AfResult};
use af_geo::field::GriddedField;
use af_geo::grid::ReferenceGrid;
use af_model::{ErrorMetrics, FoldOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 仪表盘导出包
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardBundle {
    /// 导出时刻 (UTC)
    pub created_at: DateTime<Utc>,
    /// 参考格网定义（供消费方恢复单元几何）
    pub grid: ReferenceGrid,
    /// 时间槽对应的时刻
    pub timestamps: Vec<DateTime<Utc>>,
    /// PM2.5 预测面，覆盖不到的单元为缺失
    pub surface: GriddedField,
    /// 留出折汇总指标
    pub metrics: ErrorMetrics,
    /// 各折指标
    pub fold_outcomes: Vec<FoldOutcome>,
    /// 留出折 (实测, 预测) 对，供散点验证图
    pub validation_pairs: Vec<(f64, f64)>,
}

impl DashboardBundle {
    /// 保存为 JSON 文件
    pub fn save(&self, path: &Path) -> AfResult<()> {
        write_json(path, self)?;
        tracing::info!(path = %path.display(), "dashboard bundle exported");
        Ok(())
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> AfResult<Self> {
        if !path.exists() {
            return Err(AfError::file_not_found(path));
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| AfError::serialization(format!("导出包解析失败: {e}")))
    }
}

/// 任意可序列化值写为 JSON 文件
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> AfResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AfError::serialization(e.to_string()))?;
    std::fs::write(path, text)?;
    Ok(())
}

// ============================================================================
// 测试
// ============================================================================
