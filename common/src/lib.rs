//! Items shared by every component of the pile-up filter bench.
mod tracer;

pub use tracer::{TracerError, TracerOptions, init_tracer};

/// Scalar type used for times, samples and amplitudes throughout the workspace.
pub type Real = f64;

/// Expands to the version string reported by the command line tools.
///
/// Falls back to `unknown` when the sources are not inside a git checkout.
#[macro_export]
macro_rules! version {
    () => {
        git_version::git_version!(
            args = ["--tags", "--always", "--dirty=-modified"],
            fallback = "unknown"
        )
    };
}
