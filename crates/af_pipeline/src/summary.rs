// crates/af_pipeline/src/summary.rs

//! 运行摘要
//!
//! 一次管线运行的可序列化账目：各数据源覆盖率、匹配拒绝计数、
//! 缺失策略效果与评估指标。随导出包一起写入输出目录。

use af_fusion::{BuildStats, MatchReport};
use af_model::{ErrorMetrics, FoldOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单个栅格源的对齐结果统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// 数据源名称
    pub name: String,
    /// 对齐后有效 (单元, 槽) 数
    pub present: usize,
    /// 对齐后缺失 (单元, 槽) 数
    pub missing: usize,
}

/// 运行摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// 运行标识
    pub run_id: Uuid,
    /// 运行时刻 (UTC)
    pub created_at: DateTime<Utc>,
    /// 参考格网单元数
    pub n_cells: usize,
    /// 时间槽数
    pub n_slots: usize,
    /// 各栅格源对齐统计
    pub sources: Vec<SourceSummary>,
    /// 站点匹配报告
    pub match_report: MatchReport,
    /// 训练表构建统计
    pub training_stats: BuildStats,
    /// 推理表构建统计
    pub inference_stats: BuildStats,
    /// 各折评估
    pub fold_outcomes: Vec<FoldOutcome>,
    /// 留出折汇总指标
    pub overall: ErrorMetrics,
    /// 预测面有效单元数
    pub surface_present: usize,
    /// 预测面缺失单元数
    pub surface_missing: usize,
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json_roundtrip() {
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            n_cells: 100,
            n_slots: 30,
            sources: vec![SourceSummary {
                name: "aod".into(),
                present: 2900,
                missing: 100,
            }],
            match_report: MatchReport {
                n_input: 500,
                n_matched: 480,
                rejected_distance: 15,
                rejected_time: 5,
            },
            training_stats: BuildStats::default(),
            inference_stats: BuildStats::default(),
            fold_outcomes: Vec::new(),
            overall: ErrorMetrics {
                mae: 4.2,
                rmse: 6.1,
                r2: 0.75,
                n: 480,
            },
            surface_present: 2950,
            surface_missing: 50,
        };

        let text = serde_json::to_string(&summary).unwrap();
        let parsed: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.run_id, summary.run_id);
        assert_eq!(parsed.match_report, summary.match_report);
        assert_eq!(parsed.sources, summary.sources);
    }
}
