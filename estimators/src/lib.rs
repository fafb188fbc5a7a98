//! Estimators of the in-time pulse amplitude from a window of digital samples, in the presence
//! of pile-up from neighbouring bunch crossings.
mod error;
pub mod filters;
pub mod linalg;
pub mod linprog;
mod parameters;
mod reference;

pub use error::{FilterError, LinearAlgebraError};
pub use filters::{AmplitudeFilter, Filter, FilterKind};
pub use parameters::FilterParameters;
pub use reference::ReferencePulse;
