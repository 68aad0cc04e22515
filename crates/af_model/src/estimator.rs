// crates/af_model/src/estimator.rs

//! 估计器统一入口
//!
//! 估计器族由配置选择，拟合产物 [`FittedModel`] 是可序列化的闭合值：
//! 预测只依赖模型自身状态，同一模型对同一输入永远给出同一输出。

use af_config::EstimatorKind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::boosting::{BoostingModel, BoostingParams};
use crate::forest::{ForestModel, ForestParams};

/// 拟合完成的模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FittedModel {
    /// 随机森林
    RandomForest(ForestModel),
    /// 梯度提升
    GradientBoosting(BoostingModel),
}

impl FittedModel {
    /// 按配置拟合
    #[must_use]
    pub fn fit(kind: &EstimatorKind, x: &[Vec<f64>], y: &[f64]) -> Self {
        match kind {
            EstimatorKind::RandomForest {
                n_trees,
                max_depth,
                min_samples_leaf,
                seed,
            } => Self::RandomForest(ForestModel::fit(
                x,
                y,
                &ForestParams {
                    n_trees: *n_trees,
                    max_depth: *max_depth,
                    min_samples_leaf: *min_samples_leaf,
                    seed: *seed,
                },
            )),
            EstimatorKind::GradientBoosting {
                n_rounds,
                learning_rate,
                max_depth,
                min_samples_leaf,
                seed,
            } => Self::GradientBoosting(BoostingModel::fit(
                x,
                y,
                &BoostingParams {
                    n_rounds: *n_rounds,
                    learning_rate: *learning_rate,
                    max_depth: *max_depth,
                    min_samples_leaf: *min_samples_leaf,
                    seed: *seed,
                },
            )),
        }
    }

    /// 族名称
    #[must_use]
    pub fn family_name(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "random_forest",
            Self::GradientBoosting(_) => "gradient_boosting",
        }
    }

    /// 对单行特征预测
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Self::RandomForest(m) => m.predict(row),
            Self::GradientBoosting(m) => m.predict(row),
        }
    }

    /// 对多行并行预测，输出顺序与输入一致
    #[must_use]
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| 2.0 * i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_fit_both_families() {
        let (x, y) = data();
        let rf = FittedModel::fit(&EstimatorKind::default(), &x, &y);
        assert_eq!(rf.family_name(), "random_forest");

        let gb_kind = EstimatorKind::GradientBoosting {
            n_rounds: 20,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            seed: 42,
        };
        let gb = FittedModel::fit(&gb_kind, &x, &y);
        assert_eq!(gb.family_name(), "gradient_boosting");
    }

    #[test]
    fn test_predict_batch_matches_single() {
        let (x, y) = data();
        let model = FittedModel::fit(&EstimatorKind::default(), &x, &y);
        let batch = model.predict_batch(&x);
        for (row, p) in x.iter().zip(&batch) {
            assert_eq!(model.predict(row), *p);
        }
    }

    #[test]
    fn test_prediction_idempotent() {
        let (x, y) = data();
        let model = FittedModel::fit(&EstimatorKind::default(), &x, &y);
        let row = [13.0];
        assert_eq!(model.predict(&row), model.predict(&row));
    }

    #[test]
    fn test_serde_tagged() {
        let (x, y) = data();
        let model = FittedModel::fit(&EstimatorKind::default(), &x, &y);
        let text = serde_json::to_string(&model).unwrap();
        assert!(text.contains("\"family\":\"random_forest\""));
        let restored: FittedModel = serde_json::from_str(&text).unwrap();
        assert_eq!(model.predict(&[5.0]), restored.predict(&[5.0]));
    }
}
