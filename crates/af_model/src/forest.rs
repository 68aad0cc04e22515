// crates/af_model/src/forest.rs

//! 随机森林回归
//!
//! 自助采样 + 特征子抽样的树集成，预测取各树均值。
//! 每棵树的随机流由主种子派生，同配置同数据必得同一模型。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tree::{RegressionTree, TreeParams};

/// 随机森林超参数
#[derive(Debug, Clone)]
pub struct ForestParams {
    /// 树数量
    pub n_trees: usize,
    /// 最大深度
    pub max_depth: usize,
    /// 叶节点最小样本数
    pub min_samples_leaf: usize,
    /// 随机种子
    pub seed: u64,
}

/// 随机森林模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl ForestModel {
    /// 拟合森林
    ///
    /// 每棵树在有放回抽取的 n 个样本上生长，分裂时考察
    /// `max(1, n_features / 3)` 个随机特征（回归惯例）。
    /// 树之间相互独立，并行生长，随机流按树序号派生保证确定性。
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Self {
        let n = x.len();
        let n_features = x.first().map_or(0, Vec::len);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
            n_split_features: Some((n_features / 3).max(1)),
        };

        let trees: Vec<RegressionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &indices, &tree_params, &mut rng)
            })
            .collect();

        Self { trees, n_features }
    }

    /// 树数量
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// 训练时的特征数
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// 对单行特征预测（各树均值）
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 20,
            max_depth: 6,
            min_samples_leaf: 1,
            seed: 42,
        }
    }

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 3 x0 + 噪声形状的确定性扰动
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 / n as f64, (i % 7) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] * 10.0).collect();
        (x, y)
    }

    #[test]
    fn test_forest_learns_signal() {
        let (x, y) = linear_data(100);
        let model = ForestModel::fit(&x, &y, &params());

        // 低端与高端预测应分离
        let low = model.predict(&[0.05, 0.0]);
        let high = model.predict(&[0.95, 0.0]);
        assert!(high - low > 15.0, "low={low}, high={high}");
    }

    #[test]
    fn test_forest_deterministic() {
        let (x, y) = linear_data(60);
        let a = ForestModel::fit(&x, &y, &params());
        let b = ForestModel::fit(&x, &y, &params());
        assert_eq!(a, b);

        let row = [0.4, 2.0];
        assert_eq!(a.predict(&row), b.predict(&row));
    }

    #[test]
    fn test_different_seed_different_model() {
        let (x, y) = linear_data(60);
        let a = ForestModel::fit(&x, &y, &params());
        let mut p = params();
        p.seed = 7;
        let b = ForestModel::fit(&x, &y, &p);
        assert_ne!(a, b);
    }

    #[test]
    fn test_n_trees() {
        let (x, y) = linear_data(30);
        let model = ForestModel::fit(&x, &y, &params());
        assert_eq!(model.n_trees(), 20);
        assert_eq!(model.n_features(), 2);
    }

    #[test]
    fn test_serde_roundtrip_preserves_predictions() {
        let (x, y) = linear_data(40);
        let model = ForestModel::fit(&x, &y, &params());
        let text = serde_json::to_string(&model).unwrap();
        let restored: ForestModel = serde_json::from_str(&text).unwrap();

        let row = [0.3, 1.0];
        assert_eq!(model.predict(&row), restored.predict(&row));
    }
}
