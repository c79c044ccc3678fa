use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    category::Category,
    error::HveError,
    mortality::MortalityTally,
    parameters::{validate_inputs, Params},
    population::generate_population,
    timeline::build_timelines,
    vaccination::{Cancellations, DoseSchedule},
};

#[cfg(feature = "profiling")]
use crate::profiling::{
    add_to_named_count, increment_named_count, open_span, DEATH_CANCELLATION_LABEL,
    DOSE_ADMINISTERED_LABEL, HVE_CANCELLATION_LABEL,
};

/// Everything a single run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub tally: MortalityTally,
    /// Deaths per `figure_per` person-years per category; NaN where undefined.
    pub rates: Vec<f64>,
    pub cancellations: Cancellations,
    /// People who received each dose, indexed by `dose - 1`.
    pub administered: Vec<u64>,
    /// People who died during follow-up.
    pub died: u64,
    /// Deaths whose flag week fell past the end of follow-up and so count in no category.
    pub censored_deaths: u64,
}

/// Runs one simulation: generate deaths, schedule doses, build timelines and tally mortality.
/// `params` must already be validated.
/// # Errors
/// - If a dose week distribution cannot be built
pub fn run_simulation(params: &Params, rng: &mut impl Rng) -> Result<RunResult, HveError> {
    let schedule = DoseSchedule::new(params)?;

    let mut population = {
        #[cfg(feature = "profiling")]
        let _span = open_span("generate population");
        generate_population(params, rng)
    };

    let counts = {
        #[cfg(feature = "profiling")]
        let _span = open_span("schedule vaccination");
        schedule.schedule(&mut population, rng)
    };

    let timelines = {
        #[cfg(feature = "profiling")]
        let _span = open_span("build timelines");
        build_timelines(
            &population,
            params.n_weeks,
            params.split_week,
            params.death_flag_policy,
            rng,
        )
    };

    let tally = {
        #[cfg(feature = "profiling")]
        let _span = open_span("aggregate mortality");
        MortalityTally::from_timelines(&timelines, params.category_space())
    };

    let died = population.n_died() as u64;
    let censored_deaths = died - tally.total_deaths();
    let rates = tally.rates(params.figure_per);

    #[cfg(feature = "profiling")]
    record_run_counts(&counts);

    debug!(
        "Run finished: {died} deaths ({censored_deaths} censored), {} death-related and {} HVE cancellations",
        counts.cancellations.death, counts.cancellations.hve
    );

    Ok(RunResult {
        tally,
        rates,
        cancellations: counts.cancellations,
        administered: counts.administered,
        died,
        censored_deaths,
    })
}

#[cfg(feature = "profiling")]
#[allow(clippy::cast_possible_truncation)]
fn record_run_counts(counts: &crate::vaccination::VaccinationCounts) {
    increment_named_count("run");
    add_to_named_count(
        DOSE_ADMINISTERED_LABEL,
        counts.administered.iter().sum::<u64>() as usize,
    );
    add_to_named_count(DEATH_CANCELLATION_LABEL, counts.cancellations.death as usize);
    add_to_named_count(HVE_CANCELLATION_LABEL, counts.cancellations.hve as usize);
}

/// Seed of run `run` in a batch.
#[must_use]
pub fn run_seed(base_seed: u64, run: usize) -> u64 {
    base_seed.wrapping_add(run as u64)
}

/// Validates `params` and runs `params.n_runs` independent simulations in parallel. Results are
/// in run order, and run `i` is seeded with `seed + i`, so the batch does not depend on the
/// number of threads.
/// # Errors
/// - If the parameters are invalid; no run is started
/// - If any run fails
pub fn run_simulations(params: &Params) -> Result<Vec<RunResult>, HveError> {
    validate_inputs(params)?;
    info!(
        "Starting {} runs of {} people over {} weeks",
        params.n_runs, params.n_people, params.n_weeks
    );
    let results = (0..params.n_runs)
        .into_par_iter()
        .map(|run| {
            let mut rng = StdRng::seed_from_u64(run_seed(params.seed, run));
            run_simulation(params, &mut rng)
        })
        .collect::<Result<Vec<_>, HveError>>()?;
    info!("Finished {} runs", results.len());
    Ok(results)
}

/// Mean and standard deviation of one category's rate across runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub label: String,
    /// Mean over the runs in which the rate was defined; NaN if it never was.
    pub mean: f64,
    /// Population standard deviation over the same runs.
    pub std: f64,
    /// Runs in which the category had no person-time.
    pub undefined_runs: usize,
}

/// Mean and population standard deviation. NaN for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Summarizes the per-category rates of a batch.
#[must_use]
pub fn summarize(params: &Params, results: &[RunResult]) -> Vec<CategorySummary> {
    params
        .category_space()
        .iter()
        .map(|category| {
            let index = category.index();
            let defined: Vec<f64> = results
                .iter()
                .map(|result| result.rates[index])
                .filter(|rate| !rate.is_nan())
                .collect();
            let (mean, std) = mean_and_std(&defined);
            CategorySummary {
                category,
                label: category.label(params.split_week),
                mean,
                std,
                undefined_runs: results.len() - defined.len(),
            }
        })
        .collect()
}
