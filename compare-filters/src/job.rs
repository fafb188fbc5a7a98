//! One point of the comparison sweep: pile-up dataset, filter design, then evaluation.
use crate::parameters::{CompareConfig, JobParameters};
use ndarray::{Array1, Array2, ArrayView2};
use pileup_common::Real;
use pileup_estimators::{
    AmplitudeFilter, Filter, FilterError, FilterKind, ReferencePulse,
    filters::{Blue, Cof, Mae, Sparse, SparseCof, Wiener},
};
use pileup_simulator::{
    DatasetError, DatasetGenerator, DistributionError, PulseGenerator, PulseOverrides, PulseShape,
    Sampler, read_noise_matrix, setup::ConfigError,
};
use rand::Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tracing::{Span, debug, info, instrument, warn};

#[derive(Debug, Error)]
pub(crate) enum JobError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),
    #[error("Reference pulse error: {0}")]
    Reference(FilterError),
    #[error("{kind} filter error: {source}")]
    Filter { kind: FilterKind, source: FilterError },
    #[error("No filters configured")]
    NoFilters,
}

/// Truth of one evaluated window and the error of each filter on it.
#[derive(Clone, Debug)]
pub(crate) struct Estimate {
    pub(crate) amplitude: Real,
    pub(crate) phase: Real,
    pub(crate) errors: Vec<Real>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ErrorStatistics {
    pub(crate) kind: FilterKind,
    pub(crate) mean: Real,
    pub(crate) std: Real,
}

impl ErrorStatistics {
    /// Mean and population standard deviation of the finite `errors`.
    pub(crate) fn new(kind: FilterKind, errors: impl Iterator<Item = Real>) -> Self {
        let finite: Vec<Real> = errors.filter(|error| error.is_finite()).collect();
        if finite.is_empty() {
            return Self {
                kind,
                mean: Real::NAN,
                std: Real::NAN,
            };
        }
        let n = finite.len() as Real;
        let mean = finite.iter().sum::<Real>() / n;
        let variance = finite.iter().map(|error| (error - mean).powi(2)).sum::<Real>() / n;
        Self {
            kind,
            mean,
            std: variance.sqrt(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct JobResult {
    pub(crate) parameters: JobParameters,
    /// Upper end of the phase law, when it has one.
    pub(crate) phase_module: Option<Real>,
    pub(crate) kinds: Vec<FilterKind>,
    pub(crate) estimates: Vec<Estimate>,
    pub(crate) statistics: Vec<ErrorStatistics>,
}

/// Resources shared by every job of a run, loaded once.
pub(crate) struct Comparison<'a> {
    config: &'a CompareConfig,
    shape: Arc<PulseShape>,
    reference: ReferencePulse,
    noise: Option<Array2<Real>>,
}

impl<'a> Comparison<'a> {
    /// Loads the pulse shape, reference and optional noise file, resolving paths against `base_dir`.
    #[instrument(skip_all, err(level = "error"))]
    pub(crate) fn new(config: &'a CompareConfig, base_dir: &Path) -> Result<Self, JobError> {
        if config.filters.is_empty() {
            return Err(JobError::NoFilters);
        }
        let shape = config
            .pulse_shape
            .build(base_dir, config.window_size, config.sampling_rate)?;
        let reference = config.reference().map_err(JobError::Reference)?;
        let noise = config
            .noise_file
            .as_ref()
            .map(|path| read_noise_matrix(base_dir.join(path)))
            .transpose()?;
        Ok(Self {
            config,
            shape: Arc::new(shape),
            reference,
            noise,
        })
    }

    /// Runs the pile-up, design and evaluation phases of `job`.
    #[instrument(skip_all, fields(job = index), err(level = "error"))]
    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        index: usize,
        job: &JobParameters,
        rng: &mut R,
    ) -> Result<JobResult, JobError> {
        job.validate()?;
        let signal_luminosity = job.signal_luminosity();
        let pileup_luminosity = job.effective_pileup_luminosity();
        info!(
            "Processing pileup_luminosity={pileup_luminosity} pileup_occupancy={} signal_pileup_ratio={} n_events={}",
            job.pileup_occupancy, job.signal_pileup_ratio, job.n_events
        );

        let mut datasets =
            DatasetGenerator::new(job.pulse_generator.build(self.shape.clone())?);
        datasets
            .pulse_generator_mut()
            .set_amplitude_sampler(Sampler::exponential(pileup_luminosity)?);
        let dataset = datasets.generate_windowed_samples(
            rng,
            self.config.window_size,
            self.config.sampling_rate,
            job.n_events,
            job.pileup_occupancy,
        )?;
        let (train, test) = dataset.split_halves()?;
        debug!("Dataset ready");

        let generator = datasets.pulse_generator_mut();
        generator.set_amplitude_sampler(Sampler::uniform_int(
            0,
            PulseGenerator::DEFAULT_MAX_AMPLITUDE,
        )?);
        let filters = self.design_filters(generator, train, rng)?;
        debug!("Filters ready");

        generator.set_amplitude_sampler(Sampler::exponential(signal_luminosity)?);
        let estimates = evaluate(generator, &filters, test, rng)?;
        debug!("Performance test done");

        let kinds: Vec<FilterKind> = filters.iter().map(Filter::kind).collect();
        let statistics = kinds
            .iter()
            .enumerate()
            .map(|(f, &kind)| {
                ErrorStatistics::new(kind, estimates.iter().map(|estimate| estimate.errors[f]))
            })
            .collect::<Vec<_>>();
        for stats in &statistics {
            info!("{}: mean = {:.4}, std = {:.4}", stats.kind.name(), stats.mean, stats.std);
        }

        Ok(JobResult {
            parameters: job.clone(),
            phase_module: generator.phase_sampler().distribution().upper_bound(),
            kinds,
            estimates,
            statistics,
        })
    }

    /// Builds the configured filters in order.
    fn design_filters<R: Rng + ?Sized>(
        &self,
        generator: &PulseGenerator,
        train: ArrayView2<'_, Real>,
        rng: &mut R,
    ) -> Result<Vec<Filter>, JobError> {
        let parameters = &self.config.filter_parameters;
        let reference = &self.reference;
        let pedestal = generator.pedestal();
        self.config
            .filters
            .iter()
            .map(|&kind| {
                let filter: Result<Filter, FilterError> = match kind {
                    FilterKind::Blue => {
                        let noise = self.noise.as_ref().map_or(train, |noise| noise.view());
                        Blue::new(reference, Some(noise)).map(Filter::from)
                    }
                    FilterKind::Of2 => Cof::of2(reference, pedestal).map(Filter::from),
                    FilterKind::Cof => {
                        Cof::new(reference, parameters.threshold, pedestal).map(Filter::from)
                    }
                    FilterKind::Mae => {
                        Mae::new(reference, parameters.threshold, pedestal).map(Filter::from)
                    }
                    FilterKind::Sparse => {
                        Ok(Sparse::new(reference, parameters.k, parameters.e).into())
                    }
                    FilterKind::SparseCof => Ok(SparseCof::new(
                        reference,
                        parameters.k,
                        parameters.e,
                        parameters.cof_threshold,
                    )
                    .into()),
                    FilterKind::Wiener => {
                        Wiener::train(train, generator, parameters.using_bias, rng)
                            .map(Filter::from)
                    }
                };
                let filter = filter.map_err(|source| JobError::Filter { kind, source })?;
                debug!("{}", filter.describe());
                Ok(filter)
            })
            .collect()
    }
}

/// Adds one bare pulse to each `test` row, then applies every filter to each signal.
///
/// Pulses are drawn sequentially so the random stream does not depend on scheduling; filters are
/// applied to the rows in parallel.
#[instrument(skip_all, fields(rows = test.nrows()), err(level = "error"))]
fn evaluate<R: Rng + ?Sized>(
    generator: &PulseGenerator,
    filters: &[Filter],
    test: ArrayView2<'_, Real>,
    rng: &mut R,
) -> Result<Vec<Estimate>, JobError> {
    let signals = test
        .rows()
        .into_iter()
        .map(|row| {
            let pulse = generator.generate_pulse_with(rng, &PulseOverrides::bare());
            let samples = Array1::from(pulse.digital_samples(rng));
            (&row + &samples, pulse.amplitude, pulse.phase)
        })
        .collect::<Vec<_>>();

    let span = Span::current();
    signals
        .into_par_iter()
        .map(|(signal, amplitude, phase)| {
            span.in_scope(|| -> Result<Estimate, JobError> {
                let errors = filters
                    .iter()
                    .map(|filter| Ok(estimate(filter, &signal)? - amplitude))
                    .collect::<Result<Vec<_>, JobError>>()?;
                Ok(Estimate {
                    amplitude,
                    phase,
                    errors,
                })
            })
        })
        .collect::<Vec<Result<_, JobError>>>()
        .into_iter()
        .collect()
}

/// Applies `filter`, mapping a Sparse program without optimum to NaN.
fn estimate(filter: &Filter, signal: &Array1<Real>) -> Result<Real, JobError> {
    match filter.apply(signal.view()) {
        Ok(value) => Ok(value),
        Err(FilterError::LinearProgram(status)) => {
            warn!("{} filter found no optimum: {status}", filter.kind().name());
            Ok(Real::NAN)
        }
        Err(source) => Err(JobError::Filter {
            kind: filter.kind(),
            source,
        }),
    }
}
