//! Amplitude estimators applied to a window of digital samples.
//!
//! Every estimator implements [AmplitudeFilter]; the closed set of them is gathered in [Filter].
//! Weights of [Blue] and [Wiener] are fixed at construction, the other estimators derive theirs
//! from each window they are applied to.
mod blue;
mod cof;
mod mae;
mod selection;
mod sparse;
mod sparse_cof;
mod wiener;

pub use blue::Blue;
pub use cof::Cof;
pub use mae::Mae;
pub use selection::PileupSelector;
pub use sparse::Sparse;
pub use sparse_cof::SparseCof;
pub use wiener::Wiener;

use crate::error::FilterError;
use ndarray::ArrayView1;
use pileup_common::Real;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Implement for estimators, which take in a window of samples and output the in-time amplitude.
pub trait AmplitudeFilter {
    /// Number of samples expected in each window.
    fn window_size(&self) -> usize;

    /// Estimates the amplitude of the in-time pulse.
    ///
    /// Fails with [FilterError::InvalidInputSize] when the window does not hold
    /// [Self::window_size] samples.
    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError>;

    /// Multi-line summary of the estimator's parameters.
    fn describe(&self) -> String;
}

/// Labels under which estimators appear in configuration and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Deserialize, Serialize)]
pub enum FilterKind {
    #[strum(serialize = "BLUE")]
    #[serde(rename = "BLUE")]
    Blue,
    #[strum(serialize = "OF2")]
    #[serde(rename = "OF2")]
    Of2,
    #[strum(serialize = "COF")]
    #[serde(rename = "COF")]
    Cof,
    #[strum(serialize = "MAE")]
    #[serde(rename = "MAE")]
    Mae,
    #[strum(serialize = "SPR")]
    #[serde(rename = "SPR")]
    Sparse,
    #[strum(serialize = "SCF")]
    #[serde(rename = "SCF")]
    SparseCof,
    #[strum(serialize = "WHF")]
    #[serde(rename = "WHF")]
    Wiener,
}

impl FilterKind {
    /// Human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Of2 => "OF2",
            Self::Cof => "COF",
            Self::Mae => "MAE",
            Self::Sparse => "Sparse",
            Self::SparseCof => "Sparse COF",
            Self::Wiener => "Wiener",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Filter {
    Blue(Blue),
    Cof(Cof),
    Mae(Mae),
    Sparse(Sparse),
    SparseCof(SparseCof),
    Wiener(Wiener),
}

impl Filter {
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Blue(_) => FilterKind::Blue,
            Self::Cof(cof) if cof.is_of2() => FilterKind::Of2,
            Self::Cof(_) => FilterKind::Cof,
            Self::Mae(_) => FilterKind::Mae,
            Self::Sparse(_) => FilterKind::Sparse,
            Self::SparseCof(_) => FilterKind::SparseCof,
            Self::Wiener(_) => FilterKind::Wiener,
        }
    }

    fn inner(&self) -> &dyn AmplitudeFilter {
        match self {
            Self::Blue(filter) => filter,
            Self::Cof(filter) => filter,
            Self::Mae(filter) => filter,
            Self::Sparse(filter) => filter,
            Self::SparseCof(filter) => filter,
            Self::Wiener(filter) => filter,
        }
    }
}

impl AmplitudeFilter for Filter {
    fn window_size(&self) -> usize {
        self.inner().window_size()
    }

    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        self.inner().apply(window)
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }
}

macro_rules! impl_from_filter {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Filter {
                fn from(filter: $variant) -> Self {
                    Self::$variant(filter)
                }
            }
        )*
    };
}

impl_from_filter!(Blue, Cof, Mae, Sparse, SparseCof, Wiener);
