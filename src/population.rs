use log::debug;
use rand::Rng;

use crate::parameters::Params;

/// Weeks are 1-based: week 1 is the first week of follow-up.
pub type Week = usize;

/// The synthetic population of a single run: when (if ever) each person dies and when they
/// received each dose. Indexed by person, and for doses by `dose - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    death_weeks: Vec<Option<Week>>,
    dose_weeks: Vec<Vec<Option<Week>>>,
}

impl Population {
    /// A population with the given death weeks and nobody vaccinated.
    #[must_use]
    pub fn with_death_weeks(death_weeks: Vec<Option<Week>>, n_doses: u8) -> Self {
        let n_people = death_weeks.len();
        Self {
            death_weeks,
            dose_weeks: vec![vec![None; n_people]; usize::from(n_doses)],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.death_weeks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.death_weeks.is_empty()
    }

    #[must_use]
    pub fn n_doses(&self) -> u8 {
        u8::try_from(self.dose_weeks.len()).unwrap_or(u8::MAX)
    }

    #[must_use]
    pub fn death_week(&self, person: usize) -> Option<Week> {
        self.death_weeks[person]
    }

    #[must_use]
    pub fn death_weeks(&self) -> &[Option<Week>] {
        &self.death_weeks
    }

    /// Week `person` received `dose` (1-based), if they received it.
    #[must_use]
    pub fn dose_week(&self, dose: u8, person: usize) -> Option<Week> {
        self.dose_weeks[usize::from(dose) - 1][person]
    }

    pub fn set_dose_week(&mut self, dose: u8, person: usize, week: Week) {
        self.dose_weeks[usize::from(dose) - 1][person] = Some(week);
    }

    /// Doses received by `person`, in dose order, as `(dose, week)`.
    pub fn doses_of(&self, person: usize) -> impl Iterator<Item = (u8, Week)> + '_ {
        (1..=self.n_doses())
            .filter_map(move |dose| self.dose_week(dose, person).map(|week| (dose, week)))
    }

    #[must_use]
    pub fn n_died(&self) -> usize {
        self.death_weeks.iter().flatten().count()
    }
}

/// Draws whether each person dies during the follow-up, and if so in which week. Every week in
/// `1..=n_weeks` is equally likely.
pub fn generate_population(params: &Params, rng: &mut impl Rng) -> Population {
    let p_death = params.p_death();
    let death_weeks: Vec<Option<Week>> = (0..params.n_people)
        .map(|_| {
            if rng.random_bool(p_death) {
                Some(rng.random_range(1..=params.n_weeks))
            } else {
                None
            }
        })
        .collect();
    let population = Population::with_death_weeks(death_weeks, params.n_doses());
    debug!(
        "Generated {} people, {} of whom die during follow-up",
        population.len(),
        population.n_died()
    );
    population
}
