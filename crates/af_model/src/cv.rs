// crates/af_model/src/cv.rs

//! 站点分折交叉验证
//!
//! 折按站点划分而非按行：同一站点的全部行落在同一折，
//! 避免同站行同时出现在训练集与测试集造成的空间信息泄漏。

use af_foundation::error::{AfError, AfResult};
use std::collections::BTreeMap;

/// 折划分结果
///
/// `folds[k]` 为第 k 折包含的行下标。
#[derive(Debug, Clone, PartialEq)]
pub struct FoldAssignment {
    folds: Vec<Vec<usize>>,
}

impl FoldAssignment {
    /// 按站点划分 `n_folds` 折
    ///
    /// 站点按标识排序后轮转分配到各折，行跟随其站点。
    /// 排序 + 轮转使划分与输入行序无关，完全可复现。
    ///
    /// # Errors
    /// 唯一站点数少于折数时无法保证每折非空，返回 `InvalidInput`。
    pub fn by_station(station_ids: &[String], n_folds: usize) -> AfResult<Self> {
        // BTreeMap 保证站点迭代有序
        let mut rows_by_station: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, id) in station_ids.iter().enumerate() {
            rows_by_station.entry(id).or_default().push(row);
        }

        if rows_by_station.len() < n_folds {
            return Err(AfError::invalid_input(format!(
                "站点分折需要至少 {n_folds} 个站点, 实际 {} 个",
                rows_by_station.len()
            )));
        }

        let mut folds = vec![Vec::new(); n_folds];
        for (k, rows) in rows_by_station.into_values().enumerate() {
            folds[k % n_folds].extend(rows);
        }
        Ok(Self { folds })
    }

    /// 折数
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }

    /// 第 `k` 折的测试行
    #[must_use]
    pub fn test_rows(&self, k: usize) -> &[usize] {
        &self.folds[k]
    }

    /// 第 `k` 折的训练行（其余所有折）
    #[must_use]
    pub fn train_rows(&self, k: usize) -> Vec<usize> {
        let mut rows = Vec::new();
        for (j, fold) in self.folds.iter().enumerate() {
            if j != k {
                rows.extend_from_slice(fold);
            }
        }
        rows
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn ids(spec: &[(&str, usize)]) -> Vec<String> {
        let mut out = Vec::new();
        for (id, count) in spec {
            for _ in 0..*count {
                out.push((*id).to_string());
            }
        }
        out
    }

    #[test]
    fn test_stations_are_fold_disjoint() {
        let station_ids = ids(&[("A", 3), ("B", 2), ("C", 4), ("D", 1), ("E", 2)]);
        let assignment = FoldAssignment::by_station(&station_ids, 3).unwrap();

        // 每个站点的行只出现在一个折
        for station in ["A", "B", "C", "D", "E"] {
            let mut seen_in = BTreeSet::new();
            for k in 0..assignment.n_folds() {
                if assignment
                    .test_rows(k)
                    .iter()
                    .any(|&r| station_ids[r] == station)
                {
                    seen_in.insert(k);
                }
            }
            assert_eq!(seen_in.len(), 1, "station {station} spans folds {seen_in:?}");
        }
    }

    #[test]
    fn test_all_rows_covered_once() {
        let station_ids = ids(&[("A", 2), ("B", 2), ("C", 2), ("D", 2)]);
        let assignment = FoldAssignment::by_station(&station_ids, 2).unwrap();

        let mut all: Vec<usize> = (0..assignment.n_folds())
            .flat_map(|k| assignment.test_rows(k).to_vec())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_train_test_partition() {
        let station_ids = ids(&[("A", 2), ("B", 1), ("C", 3)]);
        let assignment = FoldAssignment::by_station(&station_ids, 3).unwrap();

        for k in 0..3 {
            let test: BTreeSet<usize> = assignment.test_rows(k).iter().copied().collect();
            let train: BTreeSet<usize> = assignment.train_rows(k).into_iter().collect();
            assert!(test.is_disjoint(&train));
            assert_eq!(test.len() + train.len(), 6);
        }
    }

    #[test]
    fn test_independent_of_row_order() {
        let a = ids(&[("A", 2), ("B", 2)]);
        let b = ids(&[("B", 2), ("A", 2)]);
        let fa = FoldAssignment::by_station(&a, 2).unwrap();
        let fb = FoldAssignment::by_station(&b, 2).unwrap();

        // 行下标不同但站点到折的映射一致：A -> 折 0, B -> 折 1
        assert_eq!(fa.test_rows(0).iter().map(|&r| &a[r]).collect::<Vec<_>>(), ["A", "A"]);
        assert_eq!(fb.test_rows(0).iter().map(|&r| &b[r]).collect::<Vec<_>>(), ["A", "A"]);
    }

    #[test]
    fn test_too_few_stations() {
        let station_ids = ids(&[("A", 5), ("B", 5)]);
        assert!(FoldAssignment::by_station(&station_ids, 3).is_err());
    }
}
