//! Installs the global [tracing] subscriber used by the binaries.
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{
    EnvFilter, filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("Tracing subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Options controlling the subscriber.
#[derive(Debug, Default, Clone)]
pub struct TracerOptions {
    /// Explicit filter directive, e.g. `info,pileup_estimators=debug`.
    /// When absent `RUST_LOG` is consulted, then `info` is used.
    pub filter: Option<String>,
    /// Whether to print span close events with their busy/idle timings.
    pub span_timings: bool,
}

impl TracerOptions {
    pub fn new(filter: Option<&str>) -> Self {
        Self {
            filter: filter.map(ToOwned::to_owned),
            span_timings: false,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        match &self.filter {
            Some(directive) => EnvFilter::try_new(directive),
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
        }
    }
}

pub fn init_tracer(options: &TracerOptions) -> Result<(), TracerError> {
    let span_events = if options.span_timings {
        fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    };
    tracing_subscriber::registry()
        .with(options.env_filter()?)
        .with(fmt::layer().with_target(true).with_span_events(span_events))
        .try_init()?;
    debug!("Tracer installed with {options:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_is_parsed() {
        let options = TracerOptions::new(Some("debug,pileup_estimators=trace"));
        assert!(options.env_filter().is_ok());
    }

    #[test]
    fn malformed_filter_is_rejected() {
        let options = TracerOptions::new(Some("pileup_estimators=notalevel"));
        assert!(options.env_filter().is_err());
    }
}
