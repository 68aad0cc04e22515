// crates/af_model/src/metrics.rs

//! 回归评估指标

use af_foundation::error::{AfError, AfResult};
use serde::{Deserialize, Serialize};

/// 回归误差指标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// 平均绝对误差
    pub mae: f64,
    /// 均方根误差
    pub rmse: f64,
    /// 决定系数；目标方差为零时置 0
    pub r2: f64,
    /// 样本数
    pub n: usize,
}

impl ErrorMetrics {
    /// 由实测/预测对计算
    ///
    /// # Errors
    /// 两数组长度不一致或为空时返回错误。
    pub fn compute(actual: &[f64], predicted: &[f64]) -> AfResult<Self> {
        AfError::check_size("metrics pairs", actual.len(), predicted.len())?;
        if actual.is_empty() {
            return Err(AfError::invalid_input("评估需要至少一对实测/预测值"));
        }

        let n = actual.len() as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            let e = a - p;
            abs_sum += e.abs();
            sq_sum += e * e;
        }

        let mean = actual.iter().sum::<f64>() / n;
        let var_sum: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
        let r2 = if var_sum > 0.0 {
            1.0 - sq_sum / var_sum
        } else {
            0.0
        };

        Ok(Self {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            r2,
            n: actual.len(),
        })
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let m = ErrorMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.n, 4);
    }

    #[test]
    fn test_known_values() {
        let actual = [0.0, 2.0];
        let predicted = [1.0, 1.0];
        let m = ErrorMetrics::compute(&actual, &predicted).unwrap();
        assert!((m.mae - 1.0).abs() < 1e-12);
        assert!((m.rmse - 1.0).abs() < 1e-12);
        // 残差平方和 2, 总平方和 2 -> r2 = 0
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn test_constant_target_r2_zero() {
        let actual = [5.0, 5.0, 5.0];
        let predicted = [4.0, 5.0, 6.0];
        let m = ErrorMetrics::compute(&actual, &predicted).unwrap();
        assert_eq!(m.r2, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ErrorMetrics::compute(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(ErrorMetrics::compute(&[], &[]).is_err());
    }
}
