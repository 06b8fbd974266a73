//! Flat-array decision trees

use serde::{Deserialize, Serialize};

/// Marker used in the child arrays for leaf nodes
pub const LEAF: i64 = -1;

/// A fitted decision tree in flat node layout.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise a sample
/// goes left when `x[feature[i]] <= threshold[i]` and right otherwise.
/// `value[i]` holds class weights (classification) or a single mean
/// (regression).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    /// Structural checks run once at load time.
    ///
    /// Children must point strictly forward so traversal always terminates.
    pub fn validate(&self, n_features: usize, value_width: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(format!("tree arrays differ in length (expected {})", n));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                if right != LEAF {
                    return Err(format!("node {} has only a right child", node));
                }
                if self.value[node].len() != value_width {
                    return Err(format!(
                        "leaf {} carries {} values, expected {}",
                        node,
                        self.value[node].len(),
                        value_width
                    ));
                }
                continue;
            }

            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }

            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!(
                    "node {} splits on feature {} but input has {} features",
                    node, feature, n_features
                ));
            }
        }

        Ok(())
    }

    /// Values stored at the leaf reached by `x`
    pub fn leaf_value(&self, x: &[f64]) -> &[f64] {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        &self.value[node]
    }

    /// Leaf class weights normalised to probabilities
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let weights = self.leaf_value(x);
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![0.0; weights.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x[0] <= 0.5 -> leaf 1, else x[1] <= 2.0 -> leaf 3, else leaf 4
    fn stump() -> DecisionTree {
        DecisionTree {
            children_left: vec![1, -1, 3, -1, -1],
            children_right: vec![2, -1, 4, -1, -1],
            feature: vec![0, -2, 1, -2, -2],
            threshold: vec![0.5, -2.0, 2.0, -2.0, -2.0],
            value: vec![
                vec![10.0],
                vec![100.0],
                vec![0.0],
                vec![200.0],
                vec![300.0],
            ],
        }
    }

    #[test]
    fn test_traversal() {
        let tree = stump();
        assert!(tree.validate(2, 1).is_ok());
        assert_eq!(tree.leaf_value(&[0.0, 9.0]), &[100.0]);
        assert_eq!(tree.leaf_value(&[0.5, 9.0]), &[100.0]);
        assert_eq!(tree.leaf_value(&[1.0, 2.0]), &[200.0]);
        assert_eq!(tree.leaf_value(&[1.0, 2.5]), &[300.0]);
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let mut tree = stump();
        tree.children_left[2] = 0;
        assert!(tree.validate(2, 1).is_err());
    }

    #[test]
    fn test_validate_rejects_feature_out_of_range() {
        let tree = stump();
        assert!(tree.validate(1, 1).unwrap_err().contains("feature 1"));
    }

    #[test]
    fn test_predict_proba_normalises() {
        let tree = DecisionTree {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![vec![3.0, 1.0]],
        };
        assert_eq!(tree.predict_proba(&[]), vec![0.75, 0.25]);
    }
}
