use super::{AmplitudeFilter, PileupSelector};
use crate::{ReferencePulse, error::FilterError, linalg::to_vector};
use nalgebra::DMatrix;
use ndarray::{Array1, ArrayView1};
use pileup_common::Real;

/// Multiple amplitude estimator.
///
/// Shares the bunch selection of [Cof](super::Cof) but fits the columns of the pile-up matrix,
/// and reports an amplitude for every selected bunch.
#[derive(Clone, Debug)]
pub struct Mae {
    selector: PileupSelector,
    pedestal: Real,
}

impl Mae {
    pub fn new(reference: &ReferencePulse, threshold: Real, pedestal: Real) -> Result<Self, FilterError> {
        Ok(Self {
            selector: PileupSelector::new(reference, Some(threshold))?,
            pedestal,
        })
    }

    /// Amplitudes of every selected bunch at its position in the window, zero elsewhere.
    pub fn estimate_all(&self, window: ArrayView1<'_, Real>) -> Result<Array1<Real>, FilterError> {
        FilterError::check_size(self.window_size(), window.len())?;
        let window = to_vector(window).add_scalar(-self.pedestal);
        let selected = self.selector.select(&window);

        let h = self.selector.pileup_matrix();
        let d = DMatrix::from_fn(selected.len(), h.nrows(), |i, r| h[(r, selected[i])]);
        let amplitudes = PileupSelector::project(&d, &window)?;

        let mut output = Array1::zeros(self.window_size());
        for (&position, &amplitude) in selected.iter().zip(amplitudes.iter()) {
            output[position] = amplitude;
        }
        Ok(output)
    }
}

impl AmplitudeFilter for Mae {
    fn window_size(&self) -> usize {
        self.selector.window_size()
    }

    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        Ok(self.estimate_all(window)?[self.selector.centre()])
    }

    fn describe(&self) -> String {
        format!(
            "MAE Filter:\n  centered_sample = {}\n  threshold = {}\n  pedestal = {}\n  size = {}",
            self.selector.centre(),
            self.selector.threshold().unwrap_or_default(),
            self.pedestal,
            self.window_size()
        )
    }
}
