//! Construction-time knobs of the estimators.
use crate::filters::{Sparse, SparseCof};
use pileup_common::Real;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterParameters {
    /// Pile-up deviation above which COF and MAE fit a bunch.
    pub threshold: Real,
    /// Weight of negative amplitudes in the sparse objective.
    pub k: Real,
    /// Tolerance of the sparse representation.
    pub e: Real,
    /// Sparse amplitude above which SparseCOF fits a bunch.
    pub cof_threshold: Real,
    /// Whether Wiener learns a constant offset.
    pub using_bias: bool,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            k: Sparse::DEFAULT_K,
            e: Sparse::DEFAULT_E,
            cof_threshold: SparseCof::DEFAULT_COF_THRESHOLD,
            using_bias: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_parameters_use_defaults() {
        let parameters: FilterParameters =
            serde_json::from_str(r#"{ "threshold": 4.5, "using-bias": false }"#).unwrap();
        assert_eq!(parameters.threshold, 4.5);
        assert!(!parameters.using_bias);
        assert_eq!(parameters.k, 0.5);
        assert_eq!(parameters.e, 0.12);
        assert_eq!(parameters.cof_threshold, 3.0);
    }
}
