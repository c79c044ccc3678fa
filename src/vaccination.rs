//! Schedules each dose for each person.
//!
//! Doses are processed in increasing order because a dose's week is an offset from the week of
//! the previous dose. For a given dose and person:
//! 1. The person takes up the dose with the configured uptake probability.
//! 2. The dose is only possible if every earlier dose was given.
//! 3. A candidate week is drawn: a normally distributed offset, rounded and clamped to at least
//!    one week (first dose) or the minimum spacing (later doses), added to the previous dose's
//!    week.
//! 4. A candidate week after the person's death is cancelled.
//! 5. A candidate week within `hve_duration` weeks of the death is withheld with probability
//!    `hve_p`. This is the healthy-vaccinee effect: people close to death are less likely to be
//!    vaccinated.
//! 6. Otherwise the dose is given at the candidate week.

use log::trace;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::{
    error::HveError,
    parameters::Params,
    population::{Population, Week},
};

/// Why a dose that would have been given was not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseDecision {
    Administer,
    /// The candidate week is after the person's death.
    CancelledByDeath,
    /// The candidate week is close enough to death that the dose may be withheld.
    InHveWindow,
}

/// Decides the fate of a dose drawn for `candidate`, ignoring the random withholding draw.
#[must_use]
pub fn dose_decision(candidate: Week, death_week: Option<Week>, hve_duration: usize) -> DoseDecision {
    match death_week {
        None => DoseDecision::Administer,
        Some(death) if candidate > death => DoseDecision::CancelledByDeath,
        Some(death) if death.abs_diff(candidate) < hve_duration => DoseDecision::InHveWindow,
        Some(_) => DoseDecision::Administer,
    }
}

/// Converts a sampled offset into an absolute week: round half to even, clamp to
/// `[min_offset, max_offset]` and add the previous dose week.
///
/// Any offset above `max_offset` lands past the horizon either way, so capping it never changes
/// an outcome but keeps extreme samples from overflowing the week arithmetic.
#[must_use]
pub fn candidate_week(
    sample: f64,
    min_offset: usize,
    max_offset: usize,
    previous_week: Option<Week>,
) -> Week {
    let rounded = sample.round_ties_even();
    #[allow(clippy::cast_precision_loss)]
    let offset = if rounded.is_nan() || rounded < min_offset as f64 {
        min_offset
    } else if rounded >= max_offset as f64 {
        max_offset
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let offset = rounded as usize;
        offset
    };
    previous_week.unwrap_or(0).saturating_add(offset)
}

/// Counts of doses that were not given for reasons other than uptake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cancellations {
    pub death: u64,
    pub hve: u64,
}

impl Cancellations {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.death + self.hve
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaccinationCounts {
    pub cancellations: Cancellations,
    /// Number of people who received each dose, indexed by `dose - 1`.
    pub administered: Vec<u64>,
}

struct DoseTiming {
    uptake: f64,
    offset: Normal<f64>,
}

/// Per-dose uptake and timing distributions, built once per run.
pub struct DoseSchedule {
    doses: Vec<DoseTiming>,
    min_time: usize,
    /// Largest offset kept from a sample; one week past the horizon.
    max_offset: usize,
    hve_duration: usize,
    hve_p: f64,
}

impl DoseSchedule {
    /// # Errors
    /// - If a week distribution cannot be constructed (non-finite mean or invalid std)
    pub fn new(params: &Params) -> Result<Self, HveError> {
        let doses = params
            .dose_uptake
            .iter()
            .zip(&params.dose_week_distributions)
            .enumerate()
            .map(|(i, (&uptake, distribution))| {
                let offset = Normal::new(distribution.mean, distribution.std).map_err(|e| {
                    HveError::Distribution {
                        dose: u8::try_from(i + 1).unwrap_or(u8::MAX),
                        reason: e.to_string(),
                    }
                })?;
                Ok(DoseTiming { uptake, offset })
            })
            .collect::<Result<Vec<_>, HveError>>()?;
        Ok(Self {
            doses,
            min_time: params.min_time,
            max_offset: params.n_weeks + 1,
            hve_duration: params.hve_duration,
            hve_p: params.hve_p,
        })
    }

    /// Fills in the dose weeks of `population`, dose by dose.
    pub fn schedule(&self, population: &mut Population, rng: &mut impl Rng) -> VaccinationCounts {
        let mut counts = VaccinationCounts {
            administered: vec![0; self.doses.len()],
            ..VaccinationCounts::default()
        };
        for (i, timing) in self.doses.iter().enumerate() {
            let dose = u8::try_from(i + 1).unwrap_or(u8::MAX);
            let min_offset = if dose == 1 { 1 } else { self.min_time };
            for person in 0..population.len() {
                if !rng.random_bool(timing.uptake) {
                    continue;
                }
                let previous_week = if dose == 1 {
                    None
                } else {
                    match population.dose_week(dose - 1, person) {
                        // Earlier doses are given in order, so the previous dose implies all
                        // earlier ones.
                        Some(week) => Some(week),
                        None => continue,
                    }
                };
                let sample = timing.offset.sample(rng);
                let candidate = candidate_week(sample, min_offset, self.max_offset, previous_week);
                let death_week = population.death_week(person);

                match dose_decision(candidate, death_week, self.hve_duration) {
                    DoseDecision::CancelledByDeath => {
                        trace!(
                            "Person {person}: dose {dose} at week {candidate} cancelled, died in week {death_week:?}"
                        );
                        counts.cancellations.death += 1;
                        continue;
                    }
                    DoseDecision::InHveWindow if rng.random_bool(self.hve_p) => {
                        trace!(
                            "Person {person}: dose {dose} at week {candidate} withheld, dies in week {death_week:?}"
                        );
                        counts.cancellations.hve += 1;
                        continue;
                    }
                    DoseDecision::InHveWindow | DoseDecision::Administer => {}
                }
                population.set_dose_week(dose, person, candidate);
                counts.administered[i] += 1;
            }
        }
        counts
    }
}
