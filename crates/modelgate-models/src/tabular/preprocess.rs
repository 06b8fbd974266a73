//! Column-wise preprocessing fitted alongside a tabular estimator

use modelgate_core::{Error, FeatureFrame, FeatureValue, Result};
use serde::{Deserialize, Serialize};

/// Ordered set of column transforms.
///
/// The encoded row is the concatenation of each transform's output in list
/// order. Frame columns not named by any transform are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    #[serde(default)]
    pub transformers: Vec<ColumnTransform>,
}

/// Steps applied in sequence to a group of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransform {
    #[serde(default)]
    pub name: String,
    pub columns: Vec<String>,
    /// No steps means passthrough
    #[serde(default)]
    pub steps: Vec<TransformStep>,
}

/// What to do with a category never seen during fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode as all zeros
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    /// Forward cells unchanged
    Passthrough,

    /// Replace missing cells with a fitted per-column statistic
    SimpleImputer { statistics: Vec<FeatureValue> },

    /// `(x - mean) / scale` per column
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },

    /// One indicator per fitted category, per column
    OneHotEncoder {
        categories: Vec<Vec<FeatureValue>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
}

impl TransformStep {
    fn name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::SimpleImputer { .. } => "simple_imputer",
            Self::StandardScaler { .. } => "standard_scaler",
            Self::OneHotEncoder { .. } => "one_hot_encoder",
        }
    }

    /// Output width for a given input width, or why the step cannot take it
    fn output_width(&self, input_width: usize) -> std::result::Result<usize, String> {
        let fitted = match self {
            Self::Passthrough => input_width,
            Self::SimpleImputer { statistics } => statistics.len(),
            Self::StandardScaler { mean, scale } => {
                if mean.len() != scale.len() {
                    return Err(format!(
                        "standard_scaler has {} means but {} scales",
                        mean.len(),
                        scale.len()
                    ));
                }
                mean.len()
            }
            Self::OneHotEncoder { categories, .. } => categories.len(),
        };

        if fitted != input_width {
            return Err(format!(
                "{} fitted on {} columns, receives {}",
                self.name(),
                fitted,
                input_width
            ));
        }

        Ok(match self {
            Self::OneHotEncoder { categories, .. } => categories.iter().map(Vec::len).sum(),
            _ => input_width,
        })
    }

    fn apply(&self, columns: &[String], values: Vec<FeatureValue>) -> Result<Vec<FeatureValue>> {
        match self {
            Self::Passthrough => Ok(values),

            Self::SimpleImputer { statistics } => Ok(values
                .into_iter()
                .zip(statistics)
                .map(|(v, stat)| if v.is_missing() { stat.clone() } else { v })
                .collect()),

            Self::StandardScaler { mean, scale } => values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let x = numeric(columns, i, v)?;
                    // Zero-variance columns are fitted with scale 1
                    let s = if scale[i] == 0.0 { 1.0 } else { scale[i] };
                    Ok(FeatureValue::Float((x - mean[i]) / s))
                })
                .collect(),

            Self::OneHotEncoder {
                categories,
                handle_unknown,
            } => {
                let mut out = Vec::with_capacity(categories.iter().map(Vec::len).sum());
                for (i, (value, cats)) in values.iter().zip(categories).enumerate() {
                    let hit = cats.iter().position(|c| c.same_category(value));
                    if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(Error::inference(format!(
                            "Found unknown category {} in column '{}' during transform",
                            value,
                            column_name(columns, i)
                        )));
                    }
                    out.extend(
                        (0..cats.len())
                            .map(|j| FeatureValue::Float(if Some(j) == hit { 1.0 } else { 0.0 })),
                    );
                }
                Ok(out)
            }
        }
    }
}

impl ColumnTransform {
    fn output_width(&self) -> std::result::Result<usize, String> {
        self.steps
            .iter()
            .try_fold(self.columns.len(), |width, step| step.output_width(width))
            .map_err(|e| format!("transformer '{}': {}", self.name, e))
    }

    fn transform(&self, frame: &FeatureFrame, out: &mut Vec<f64>) -> Result<()> {
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = frame.get(column).ok_or_else(|| {
                Error::inference(format!("column '{}' is not present in the input frame", column))
            })?;
            values.push(value.clone());
        }

        for step in &self.steps {
            values = step.apply(&self.columns, values)?;
        }

        for (i, value) in values.iter().enumerate() {
            out.push(numeric(&self.columns, i, value)?);
        }
        Ok(())
    }
}

impl ColumnTransformer {
    /// Check fitted parameters against the artifact's feature list and
    /// return the encoded width.
    pub fn validate(&self, features: &[String]) -> std::result::Result<usize, String> {
        let mut width = 0;
        for transform in &self.transformers {
            if let Some(unknown) = transform.columns.iter().find(|c| !features.contains(c)) {
                return Err(format!(
                    "transformer '{}' reads column '{}' which is not in the feature list",
                    transform.name, unknown
                ));
            }
            width += transform.output_width()?;
        }
        Ok(width)
    }

    /// Encode a frame into the estimator's numeric input row
    pub fn transform(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        for transform in &self.transformers {
            transform.transform(frame, &mut out)?;
        }
        Ok(out)
    }
}

fn column_name(columns: &[String], i: usize) -> &str {
    // Indices past the input columns only occur after one-hot expansion
    columns.get(i).map(String::as_str).unwrap_or("?")
}

fn numeric(columns: &[String], i: usize, value: &FeatureValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::inference(format!(
            "could not convert {} to float in column '{}'",
            value,
            column_name(columns, i)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        let mut frame = FeatureFrame::with_capacity(3);
        frame.push("Airline", FeatureValue::from("IndiGo"));
        frame.push("Total_Stops", FeatureValue::Int(1));
        frame.push("Duration", FeatureValue::Missing);
        frame
    }

    fn features() -> Vec<String> {
        vec!["Airline".into(), "Total_Stops".into(), "Duration".into()]
    }

    fn transformer(handle_unknown: HandleUnknown) -> ColumnTransformer {
        ColumnTransformer {
            transformers: vec![
                ColumnTransform {
                    name: "num".into(),
                    columns: vec!["Total_Stops".into(), "Duration".into()],
                    steps: vec![TransformStep::SimpleImputer {
                        statistics: vec![FeatureValue::Float(0.0), FeatureValue::Float(150.0)],
                    }],
                },
                ColumnTransform {
                    name: "cat".into(),
                    columns: vec!["Airline".into()],
                    steps: vec![TransformStep::OneHotEncoder {
                        categories: vec![vec!["Air India".into(), "IndiGo".into(), "Vistara".into()]],
                        handle_unknown,
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_transform_concatenates_in_order() {
        let ct = transformer(HandleUnknown::Error);
        assert_eq!(ct.validate(&features()).unwrap(), 5);
        assert_eq!(ct.transform(&frame()).unwrap(), vec![1.0, 150.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category() {
        let mut f = FeatureFrame::with_capacity(3);
        f.push("Airline", FeatureValue::from("SpiceJet"));
        f.push("Total_Stops", FeatureValue::Int(0));
        f.push("Duration", FeatureValue::Int(90));

        let err = transformer(HandleUnknown::Error).transform(&f).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(err.to_string().contains("SpiceJet"));

        let encoded = transformer(HandleUnknown::Ignore).transform(&f).unwrap();
        assert_eq!(encoded, vec![0.0, 90.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_string_in_numeric_column_fails() {
        let ct = ColumnTransformer {
            transformers: vec![ColumnTransform {
                name: "num".into(),
                columns: vec!["Airline".into()],
                steps: vec![],
            }],
        };
        assert!(matches!(ct.transform(&frame()), Err(Error::Inference(_))));
    }

    #[test]
    fn test_scaler() {
        let ct = ColumnTransformer {
            transformers: vec![ColumnTransform {
                name: "scaled".into(),
                columns: vec!["Total_Stops".into()],
                steps: vec![TransformStep::StandardScaler {
                    mean: vec![3.0],
                    scale: vec![2.0],
                }],
            }],
        };
        assert_eq!(ct.transform(&frame()).unwrap(), vec![-1.0]);
    }

    #[test]
    fn test_validate_rejects_unknown_column_and_width_mismatch() {
        let mut ct = transformer(HandleUnknown::Error);
        ct.transformers[0].columns.push("Price".into());
        assert!(ct.validate(&features()).unwrap_err().contains("Price"));

        let mut ct = transformer(HandleUnknown::Error);
        ct.transformers[0].columns.pop();
        assert!(ct.validate(&features()).unwrap_err().contains("fitted on 2 columns"));
    }

    #[test]
    fn test_deserialize_step_tags() {
        let json = r#"{
            "transformers": [
                {"name": "num", "columns": ["Age"], "steps": [{"type": "simple_imputer", "statistics": [21]}]},
                {"name": "cat", "columns": ["Gender"], "steps": [
                    {"type": "one_hot_encoder", "categories": [["Female", "Male"]], "handle_unknown": "ignore"}
                ]}
            ]
        }"#;
        let ct: ColumnTransformer = serde_json::from_str(json).unwrap();
        assert_eq!(ct.transformers.len(), 2);
        assert!(matches!(
            &ct.transformers[1].steps[0],
            TransformStep::OneHotEncoder { handle_unknown: HandleUnknown::Ignore, .. }
        ));
    }
}
