//! Fitted estimators evaluated on an encoded numeric row

use super::tree::DecisionTree;
use modelgate_core::{Error, FeatureValue, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    /// Binary logistic regression
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
        classes: Vec<FeatureValue>,
    },

    LinearRegression { coef: Vec<f64>, intercept: f64 },

    /// Averaged class probabilities over the trees
    RandomForestClassifier {
        classes: Vec<FeatureValue>,
        trees: Vec<DecisionTree>,
    },

    /// Mean of the trees' leaf values
    RandomForestRegressor { trees: Vec<DecisionTree> },
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::LinearRegression { .. } => "linear_regression",
            Self::RandomForestClassifier { .. } => "random_forest_classifier",
            Self::RandomForestRegressor { .. } => "random_forest_regressor",
        }
    }

    pub fn is_classifier(&self) -> bool {
        matches!(
            self,
            Self::LogisticRegression { .. } | Self::RandomForestClassifier { .. }
        )
    }

    /// Fitted class labels, empty for regressors
    pub fn classes(&self) -> &[FeatureValue] {
        match self {
            Self::LogisticRegression { classes, .. } | Self::RandomForestClassifier { classes, .. } => {
                classes
            }
            _ => &[],
        }
    }

    /// Check fitted parameters against the encoded input width
    pub fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        match self {
            Self::LogisticRegression { coef, classes, .. } => {
                if classes.len() != 2 {
                    return Err(format!(
                        "logistic_regression supports 2 classes, artifact has {}",
                        classes.len()
                    ));
                }
                check_coef(coef, n_features)
            }
            Self::LinearRegression { coef, .. } => check_coef(coef, n_features),
            Self::RandomForestClassifier { classes, trees } => {
                if classes.len() < 2 {
                    return Err("random_forest_classifier needs at least 2 classes".to_string());
                }
                check_trees(trees, n_features, classes.len())
            }
            Self::RandomForestRegressor { trees } => check_trees(trees, n_features, 1),
        }
    }

    /// Probability per class, in `classes()` order
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        match self {
            Self::LogisticRegression { coef, intercept, .. } => {
                let p = sigmoid(dot(coef, x) + intercept);
                Ok(vec![1.0 - p, p])
            }
            Self::RandomForestClassifier { classes, trees } => {
                let mut acc = vec![0.0; classes.len()];
                for tree in trees {
                    for (a, p) in acc.iter_mut().zip(tree.predict_proba(x)) {
                        *a += p;
                    }
                }
                let n = trees.len() as f64;
                Ok(acc.into_iter().map(|a| a / n).collect())
            }
            _ => Err(Error::inference(format!(
                "{} does not provide class probabilities",
                self.kind()
            ))),
        }
    }

    /// Index into `classes()` chosen by the model's own decision rule
    pub fn predict_class(&self, x: &[f64]) -> Result<usize> {
        match self {
            Self::LogisticRegression { coef, intercept, .. } => {
                Ok(usize::from(dot(coef, x) + intercept > 0.0))
            }
            Self::RandomForestClassifier { .. } => Ok(argmax(&self.predict_proba(x)?)),
            _ => Err(Error::inference(format!("{} is not a classifier", self.kind()))),
        }
    }

    /// Scalar prediction of a regressor
    pub fn predict_value(&self, x: &[f64]) -> Result<f64> {
        match self {
            Self::LinearRegression { coef, intercept } => Ok(dot(coef, x) + intercept),
            Self::RandomForestRegressor { trees } => {
                let sum: f64 = trees.iter().map(|t| t.leaf_value(x)[0]).sum();
                Ok(sum / trees.len() as f64)
            }
            _ => Err(Error::inference(format!("{} is not a regressor", self.kind()))),
        }
    }
}

fn check_coef(coef: &[f64], n_features: usize) -> std::result::Result<(), String> {
    if coef.len() != n_features {
        return Err(format!(
            "estimator has {} coefficients, encoded input has {} features",
            coef.len(),
            n_features
        ));
    }
    Ok(())
}

fn check_trees(
    trees: &[DecisionTree],
    n_features: usize,
    value_width: usize,
) -> std::result::Result<(), String> {
    if trees.is_empty() {
        return Err("forest has no trees".to_string());
    }
    for (i, tree) in trees.iter().enumerate() {
        tree.validate(n_features, value_width)
            .map_err(|e| format!("tree {}: {}", i, e))?;
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// First index of the maximum, matching numpy's argmax on ties
pub(crate) fn argmax<T: PartialOrd + Copy>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic() -> Estimator {
        Estimator::LogisticRegression {
            coef: vec![2.0, -1.0],
            intercept: -0.5,
            classes: vec![FeatureValue::Int(0), FeatureValue::Int(1)],
        }
    }

    fn leaf(values: Vec<f64>) -> DecisionTree {
        DecisionTree {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![values],
        }
    }

    #[test]
    fn test_logistic_probabilities_and_decision_agree() {
        let model = logistic();
        assert!(model.validate(2).is_ok());

        let proba = model.predict_proba(&[1.0, 0.0]).unwrap();
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        assert!(proba[1] > 0.5);
        assert_eq!(model.predict_class(&[1.0, 0.0]).unwrap(), 1);

        let proba = model.predict_proba(&[0.0, 1.0]).unwrap();
        assert!(proba[1] < 0.5);
        assert_eq!(model.predict_class(&[0.0, 1.0]).unwrap(), 0);
    }

    #[test]
    fn test_logistic_width_mismatch() {
        assert!(logistic().validate(3).unwrap_err().contains("2 coefficients"));
    }

    #[test]
    fn test_forest_classifier_averages() {
        let model = Estimator::RandomForestClassifier {
            classes: vec!["No".into(), "Yes".into()],
            trees: vec![leaf(vec![1.0, 3.0]), leaf(vec![4.0, 0.0])],
        };
        assert!(model.validate(0).is_ok());
        assert_eq!(model.predict_proba(&[]).unwrap(), vec![0.625, 0.375]);
        assert_eq!(model.predict_class(&[]).unwrap(), 0);
    }

    #[test]
    fn test_forest_regressor_mean() {
        let model = Estimator::RandomForestRegressor {
            trees: vec![leaf(vec![4000.0]), leaf(vec![6000.0])],
        };
        assert_eq!(model.predict_value(&[]).unwrap(), 5000.0);
        assert!(model.predict_proba(&[]).is_err());
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.9_f32]), 0);
    }
}
