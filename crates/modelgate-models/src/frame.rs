//! Feature framing: request fields to the artifact's exact column layout

use modelgate_core::{Error, FeatureFrame, FeatureValue, Result};
use std::collections::{BTreeMap, HashMap};

/// A value object that can supply cells for named artifact columns.
///
/// Implementors map the artifact's column names (which may differ from the
/// client-facing field names) onto their own fields.
pub trait FeatureSource {
    /// Value for `column`, or `None` when this source has no mapping for it
    fn feature(&self, column: &str) -> Option<FeatureValue>;
}

impl FeatureSource for HashMap<String, FeatureValue> {
    fn feature(&self, column: &str) -> Option<FeatureValue> {
        self.get(column).cloned()
    }
}

impl FeatureSource for BTreeMap<String, FeatureValue> {
    fn feature(&self, column: &str) -> Option<FeatureValue> {
        self.get(column).cloned()
    }
}

/// Build a single-row frame with exactly `feature_names`, in that order.
///
/// Fields the source carries beyond `feature_names` are dropped. Any
/// column without a mapped value fails with `IncompleteFeatureMapping`
/// listing every missing column.
pub fn frame<S>(source: &S, feature_names: &[String]) -> Result<FeatureFrame>
where
    S: FeatureSource + ?Sized,
{
    let mut frame = FeatureFrame::with_capacity(feature_names.len());
    let mut missing = Vec::new();

    for name in feature_names {
        match source.feature(name) {
            Some(value) => frame.push(name.clone(), value),
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(Error::IncompleteFeatureMapping { missing });
    }

    Ok(frame)
}
