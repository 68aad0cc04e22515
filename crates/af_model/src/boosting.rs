// crates/af_model/src/boosting.rs

//! 梯度提升树回归
//!
//! 以目标均值为基准，逐轮在残差上拟合浅树并按学习率累加。
//! 平方损失下残差即负梯度。

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::tree::{RegressionTree, TreeParams};

/// 梯度提升超参数
#[derive(Debug, Clone)]
pub struct BoostingParams {
    /// 提升轮数
    pub n_rounds: usize,
    /// 学习率 (0, 1]
    pub learning_rate: f64,
    /// 单树最大深度
    pub max_depth: usize,
    /// 叶节点最小样本数
    pub min_samples_leaf: usize,
    /// 随机种子
    pub seed: u64,
}

/// 梯度提升模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingModel {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl BoostingModel {
    /// 拟合提升序列
    ///
    /// 残差链是串行依赖，无法按树并行；浅树使训练仍然可控。
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &BoostingParams) -> Self {
        let n = x.len();
        let base = if n > 0 {
            y.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
            n_split_features: None,
        };
        let indices: Vec<usize> = (0..n).collect();

        let mut prediction = vec![base; n];
        let mut residual = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_rounds);
        for round in 0..params.n_rounds {
            for i in 0..n {
                residual[i] = y[i] - prediction[i];
            }
            let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(round as u64));
            let tree = RegressionTree::fit(x, &residual, &indices, &tree_params, &mut rng);
            for i in 0..n {
                prediction[i] += params.learning_rate * tree.predict(&x[i]);
            }
            trees.push(tree);
        }

        Self {
            base,
            learning_rate: params.learning_rate,
            trees,
        }
    }

    /// 轮数
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    /// 对单行特征预测
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        self.base + self.learning_rate * boost
    }
}

// ============================================================================
// 测试
// ============================================================================
