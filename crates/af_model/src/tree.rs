// crates/af_model/src/tree.rs

//! 回归树 (CART)
//!
//! 方差削减二叉分裂，扁平节点数组存储，可直接序列化。
//! 单棵树只在集成内部使用，随机性由调用方传入的种子控制。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// 树的生长参数
#[derive(Debug, Clone)]
pub struct TreeParams {
    /// 最大深度
    pub max_depth: usize,
    /// 叶节点最小样本数
    pub min_samples_leaf: usize,
    /// 每次分裂考察的特征数，None = 全部
    pub n_split_features: Option<usize>,
}

/// 树节点
///
/// `Split` 的子节点以数组下标引用，根节点固定为 0。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    /// 叶节点：区域内目标均值
    Leaf {
        /// 预测值
        value: f64,
    },
    /// 内部节点：`feature <= threshold` 走左子树
    Split {
        /// 分裂特征下标
        feature: usize,
        /// 分裂阈值
        threshold: f64,
        /// 左子节点下标
        left: usize,
        /// 右子节点下标
        right: usize,
    },
}

/// 回归树
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// 在给定样本子集上生长一棵树
    ///
    /// `indices` 为参与训练的行下标（可重复，支持自助采样）。
    /// 空子集退化为单个零值叶节点。
    #[must_use]
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        if indices.is_empty() {
            tree.nodes.push(Node::Leaf { value: 0.0 });
            return tree;
        }
        let n_features = x[indices[0]].len();
        tree.grow(x, y, indices.to_vec(), 0, n_features, params, rng);
        tree
    }

    /// 节点数
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 对单行特征预测
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// 递归生长，返回新节点下标
    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        n_features: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;

        if depth >= params.max_depth || indices.len() < 2 * params.min_samples_leaf {
            return self.push_leaf(mean);
        }

        let split = best_split(x, y, &indices, n_features, params, rng);
        let Some(split) = split else {
            return self.push_leaf(mean);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        // 占位，子树生长完成后回填
        let node = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });
        let left = self.grow(x, y, left_idx, depth + 1, n_features, params, rng);
        let right = self.grow(x, y, right_idx, depth + 1, n_features, params, rng);
        self.nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    fn push_leaf(&mut self, value: f64) -> usize {
        let node = self.nodes.len();
        self.nodes.push(Node::Leaf { value });
        node
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// 在特征子集上搜索方差削减最大的分裂
///
/// 对每个候选特征按值排序后用前缀和扫描所有切点，
/// 得分为父节点平方误差减去两侧平方误差之和。
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    n_features: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let mut features: Vec<usize> = (0..n_features).collect();
    if let Some(m) = params.n_split_features {
        features.shuffle(rng);
        features.truncate(m.clamp(1, n_features));
        // 遍历顺序固定，避免并列得分时结果依赖洗牌顺序
        features.sort_unstable();
    }

    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<SplitCandidate> = None;
    for feature in features {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (k, &i) in sorted.iter().enumerate().take(n - 1) {
            left_sum += y[i];
            left_sq += y[i] * y[i];
            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }
            let v = x[i][feature];
            let v_next = x[sorted[k + 1]][feature];
            if v == v_next {
                continue; // 同值样本不可分
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let score = parent_sse - sse;
            if score > 1e-12 && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (v + v_next) / 2.0,
                    score,
                });
            }
        }
    }
    best
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf: 1,
            n_split_features: None,
        }
    }

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 0 当 x < 5，否则 10
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 10.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_fits_step_function() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..10).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, &indices, &params(3), &mut rng);

        assert_eq!(tree.predict(&[2.0]), 0.0);
        assert_eq!(tree.predict(&[7.0]), 10.0);
    }

    #[test]
    fn test_depth_zero_is_mean_leaf() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..10).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, &indices, &params(0), &mut rng);

        assert_eq!(tree.n_nodes(), 1);
        assert!((tree.predict(&[3.0]) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..10).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let p = TreeParams {
            max_depth: 10,
            min_samples_leaf: 5,
            n_split_features: None,
        };
        let tree = RegressionTree::fit(&x, &y, &indices, &p, &mut rng);

        // 最多一次分裂 (5 + 5)
        assert!(tree.n_nodes() <= 3);
    }

    #[test]
    fn test_constant_target_single_leaf() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y = vec![3.0; 8];
        let indices: Vec<usize> = (0..8).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, &indices, &params(5), &mut rng);

        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[100.0]), 3.0);
    }

    #[test]
    fn test_empty_subset() {
        let tree = RegressionTree::fit(
            &[],
            &[],
            &[],
            &params(3),
            &mut StdRng::seed_from_u64(0),
        );
        assert_eq!(tree.predict(&[1.0]), 0.0);
    }

    #[test]
    fn test_two_feature_split() {
        // 目标只依赖第二个特征
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![(i % 3) as f64, (i / 10) as f64])
            .collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 9.0 }).collect();
        let indices: Vec<usize> = (0..20).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, &indices, &params(4), &mut rng);

        assert_eq!(tree.predict(&[0.0, 0.0]), 1.0);
        assert_eq!(tree.predict(&[0.0, 1.0]), 9.0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..10).collect();
        let p = TreeParams {
            max_depth: 4,
            min_samples_leaf: 1,
            n_split_features: Some(1),
        };
        let a = RegressionTree::fit(&x, &y, &indices, &p, &mut StdRng::seed_from_u64(9));
        let b = RegressionTree::fit(&x, &y, &indices, &p, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
