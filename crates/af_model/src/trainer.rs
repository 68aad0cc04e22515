// crates/af_model/src/trainer.rs

//! 模型训练器
//!
//! 先做站点分折交叉验证得到泛化指标，再在全部训练行上拟合最终模型。
//! 指标全部来自留出折的实测/预测对，从不用训练行自评。

use af_config::{CvConfig, ModelConfig};
use af_foundation::error::{AfError, AfResult};
use af_fusion::TrainingTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cv::FoldAssignment;
use crate::estimator::FittedModel;
use crate::metrics::ErrorMetrics;

/// 单折评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldOutcome {
    /// 折序号
    pub fold: usize,
    /// 训练行数
    pub n_train: usize,
    /// 测试行数
    pub n_test: usize,
    /// 留出折指标
    pub metrics: ErrorMetrics,
}

/// 训练产物
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// 最终模型（全部训练行拟合）
    pub model: FittedModel,
    /// 训练时的列模式
    pub schema: Vec<String>,
    /// 各折评估
    pub fold_outcomes: Vec<FoldOutcome>,
    /// 全部留出对的汇总指标
    pub overall: ErrorMetrics,
    /// 留出折的 (实测, 预测) 对，供散点验证图导出
    pub validation_pairs: Vec<(f64, f64)>,
}

/// 模型训练器
pub struct ModelTrainer<'a> {
    model: &'a ModelConfig,
    cv: &'a CvConfig,
}

impl<'a> ModelTrainer<'a> {
    /// 创建训练器
    #[must_use]
    pub fn new(model: &'a ModelConfig, cv: &'a CvConfig) -> Self {
        Self { model, cv }
    }

    /// 交叉验证并拟合最终模型
    ///
    /// # Errors
    /// 训练行数低于 `min_training_rows` 时返回
    /// [`AfError::InsufficientData`]；站点数少于折数时返回输入错误。
    pub fn train(&self, table: &TrainingTable) -> AfResult<TrainingOutcome> {
        let n_rows = table.features.n_rows();
        if n_rows < self.model.min_training_rows {
            return Err(AfError::insufficient_data(
                self.model.min_training_rows,
                n_rows,
            ));
        }

        let assignment = FoldAssignment::by_station(&table.station_ids, self.cv.n_folds)?;
        tracing::info!(
            n_rows,
            n_folds = assignment.n_folds(),
            family = self.model.estimator.family_name(),
            "cross validation started"
        );

        // 各折相互独立，折内拟合并行
        let fold_results: Vec<AfResult<(FoldOutcome, Vec<(f64, f64)>)>> = (0..assignment
            .n_folds())
            .into_par_iter()
            .map(|k| self.run_fold(table, &assignment, k))
            .collect();

        let mut fold_outcomes = Vec::with_capacity(self.cv.n_folds);
        let mut validation_pairs = Vec::new();
        for result in fold_results {
            let (outcome, pairs) = result?;
            tracing::info!(
                fold = outcome.fold,
                n_test = outcome.n_test,
                mae = outcome.metrics.mae,
                rmse = outcome.metrics.rmse,
                r2 = outcome.metrics.r2,
                "fold evaluated"
            );
            fold_outcomes.push(outcome);
            validation_pairs.extend(pairs);
        }

        let (actual, predicted): (Vec<f64>, Vec<f64>) =
            validation_pairs.iter().copied().unzip();
        let overall = ErrorMetrics::compute(&actual, &predicted)?;

        // 最终模型用全部训练行
        let (x, y) = materialize(table, None);
        let model = FittedModel::fit(&self.model.estimator, &x, &y);
        tracing::info!(
            mae = overall.mae,
            rmse = overall.rmse,
            r2 = overall.r2,
            "final model fitted"
        );

        Ok(TrainingOutcome {
            model,
            schema: table.features.columns().to_vec(),
            fold_outcomes,
            overall,
            validation_pairs,
        })
    }

    fn run_fold(
        &self,
        table: &TrainingTable,
        assignment: &FoldAssignment,
        k: usize,
    ) -> AfResult<(FoldOutcome, Vec<(f64, f64)>)> {
        let train_rows = assignment.train_rows(k);
        let test_rows = assignment.test_rows(k);

        let (x_train, y_train) = materialize(table, Some(&train_rows));
        let model = FittedModel::fit(&self.model.estimator, &x_train, &y_train);

        let mut pairs = Vec::with_capacity(test_rows.len());
        for &row in test_rows {
            let predicted = model.predict(table.features.row(row));
            pairs.push((table.targets[row], predicted));
        }
        let (actual, predicted): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
        let metrics = ErrorMetrics::compute(&actual, &predicted)?;

        Ok((
            FoldOutcome {
                fold: k,
                n_train: train_rows.len(),
                n_test: test_rows.len(),
                metrics,
            },
            pairs,
        ))
    }
}

/// 取出 (特征矩阵, 目标) 的行子集；`None` 表示全部行
fn materialize(table: &TrainingTable, rows: Option<&[usize]>) -> (Vec<Vec<f64>>, Vec<f64>) {
    match rows {
        Some(rows) => {
            let x = rows.iter().map(|&r| table.features.row(r).to_vec()).collect();
            let y = rows.iter().map(|&r| table.targets[r]).collect();
            (x, y)
        }
        None => {
            let x = table.features.rows().to_vec();
            let y = table.targets.clone();
            (x, y)
        }
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::{EstimatorKind, FeatureConfig};
    use af_fusion::matcher::MatchedObservation;
    use af_fusion::FeatureTableBuilder;
    use af_geo::field::GriddedField;
    use af_geo::grid::ReferenceGrid;
    use af_geo::time_index::TimeIndex;
    use chrono::{Duration, TimeZone, Utc};

    /// 5x5 网格、4 槽、12 站点的合成训练表
    fn training_table() -> TrainingTable {
        let grid = ReferenceGrid::new(10.0, 15.0, 70.0, 75.0, 1.0).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let index = TimeIndex::new(start, end, Duration::days(1)).unwrap();

        let n = grid.n_cells() * index.len();
        let aod = GriddedField::from_values(
            "aod",
            grid.n_cells(),
            index.len(),
            (0..n).map(|i| Some(0.1 + (i % 11) as f64 * 0.1)).collect(),
        )
        .unwrap();

        let config = FeatureConfig {
            columns: vec!["aod".into()],
            derived: false,
            ..FeatureConfig::default()
        };
        let builder = FeatureTableBuilder::new(&grid, &index, &config);

        // 每站固定在一个单元，目标与 aod 线性相关
        let mut matched = Vec::new();
        for s in 0..12 {
            let cell = s * 2;
            for slot in 0..index.len() {
                let a = aod.get(cell, slot).unwrap();
                matched.push(MatchedObservation {
                    station_id: format!("ST{s:02}"),
                    cell,
                    slot,
                    pm25: 60.0 * a + 20.0,
                    distance_m: 0.0,
                    time_diff_secs: 0,
                });
            }
        }
        let (table, _) = builder.build_training(&[aod], &matched).unwrap();
        table
    }

    fn fast_config() -> ModelConfig {
        ModelConfig {
            estimator: EstimatorKind::RandomForest {
                n_trees: 10,
                max_depth: 6,
                min_samples_leaf: 1,
                seed: 42,
            },
            min_training_rows: 10,
        }
    }

    #[test]
    fn test_train_produces_folds_and_model() {
        let table = training_table();
        let cv = CvConfig { n_folds: 3 };
        let config = fast_config();
        let outcome = ModelTrainer::new(&config, &cv).train(&table).unwrap();

        assert_eq!(outcome.fold_outcomes.len(), 3);
        assert_eq!(outcome.schema, vec!["aod"]);
        assert_eq!(
            outcome.validation_pairs.len(),
            table.features.n_rows()
        );
        // 线性信号应学得不错
        assert!(outcome.overall.r2 > 0.5, "r2 = {}", outcome.overall.r2);
    }

    #[test]
    fn test_insufficient_rows_fatal() {
        let table = training_table();
        let cv = CvConfig { n_folds: 3 };
        let mut config = fast_config();
        config.min_training_rows = 10_000;

        let err = ModelTrainer::new(&config, &cv).train(&table).unwrap_err();
        assert!(matches!(err, AfError::InsufficientData { .. }));
    }

    #[test]
    fn test_training_deterministic() {
        let table = training_table();
        let cv = CvConfig { n_folds: 3 };
        let config = fast_config();

        let a = ModelTrainer::new(&config, &cv).train(&table).unwrap();
        let b = ModelTrainer::new(&config, &cv).train(&table).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.overall, b.overall);
    }

    #[test]
    fn test_gradient_boosting_family() {
        let table = training_table();
        let cv = CvConfig { n_folds: 3 };
        let config = ModelConfig {
            estimator: EstimatorKind::GradientBoosting {
                n_rounds: 30,
                learning_rate: 0.1,
                max_depth: 3,
                min_samples_leaf: 1,
                seed: 42,
            },
            min_training_rows: 10,
        };
        let outcome = ModelTrainer::new(&config, &cv).train(&table).unwrap();
        assert_eq!(outcome.model.family_name(), "gradient_boosting");
    }
}
