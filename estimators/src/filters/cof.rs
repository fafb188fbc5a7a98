use super::{AmplitudeFilter, PileupSelector};
use crate::{ReferencePulse, error::FilterError, linalg::to_vector};
use nalgebra::DMatrix;
use ndarray::ArrayView1;
use pileup_common::Real;
use tracing::trace;

/// Constrained optimal filter.
///
/// Re-derives a least squares estimator for each window over the in-time bunch and the pile-up
/// bunches found by a [PileupSelector]. Built without a threshold it reduces to the optimal
/// filter OF2, which only ever fits the in-time bunch.
#[derive(Clone, Debug)]
pub struct Cof {
    selector: PileupSelector,
    pedestal: Real,
}

impl Cof {
    pub fn new(reference: &ReferencePulse, threshold: Real, pedestal: Real) -> Result<Self, FilterError> {
        Ok(Self {
            selector: PileupSelector::new(reference, Some(threshold))?,
            pedestal,
        })
    }

    pub fn of2(reference: &ReferencePulse, pedestal: Real) -> Result<Self, FilterError> {
        Ok(Self {
            selector: PileupSelector::new(reference, None)?,
            pedestal,
        })
    }

    pub fn is_of2(&self) -> bool {
        self.selector.threshold().is_none()
    }

    pub fn selector(&self) -> &PileupSelector {
        &self.selector
    }

    /// Bunches fitted for `window`, in increasing order.
    pub fn selected_samples(&self, window: ArrayView1<'_, Real>) -> Result<Vec<usize>, FilterError> {
        FilterError::check_size(self.window_size(), window.len())?;
        let window = to_vector(window).add_scalar(-self.pedestal);
        Ok(self.selector.select(&window))
    }
}

impl AmplitudeFilter for Cof {
    fn window_size(&self) -> usize {
        self.selector.window_size()
    }

    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        FilterError::check_size(self.window_size(), window.len())?;
        let window = to_vector(window).add_scalar(-self.pedestal);
        let selected = self.selector.select(&window);

        let h = self.selector.pileup_matrix();
        let d = DMatrix::from_fn(selected.len(), h.ncols(), |i, c| h[(selected[i], c)]);
        let amplitudes = PileupSelector::project(&d, &window)?;
        trace!("Selected {selected:?}, amplitudes {amplitudes:?}");

        let centre = self.selector.centre();
        let in_time = selected.iter().position(|&i| i == centre).unwrap_or_default();
        Ok(amplitudes[in_time])
    }

    fn describe(&self) -> String {
        let name = if self.is_of2() { "OF2" } else { "COF" };
        let mut description = format!("{name} Filter:\n  centered_sample = {}", self.selector.centre());
        if let Some(threshold) = self.selector.threshold() {
            description.push_str(&format!("\n  threshold = {threshold}"));
        }
        description.push_str(&format!(
            "\n  pedestal = {}\n  size = {}",
            self.pedestal,
            self.window_size()
        ));
        description
    }
}
