use serde::Serialize;

use crate::{
    category::{Category, CategorySpace},
    timeline::{Timelines, DEAD},
};

/// Average number of weeks in a year.
pub const WEEKS_PER_YEAR: f64 = 365.25 / 7.0;

/// Deaths and person-time per category for one run, indexed by the category's dense index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MortalityTally {
    pub deaths: Vec<u64>,
    pub person_weeks: Vec<u64>,
    /// Person-weeks spent dead; these count towards no category.
    pub dead_weeks: u64,
}

impl MortalityTally {
    /// Counts deaths and person-weeks per category.
    ///
    /// A death is attributed to the category of the week before the first dead week. A person
    /// marked dead from week 1 had no earlier week and is attributed to `Unvaccinated`.
    #[must_use]
    pub fn from_timelines(timelines: &Timelines, space: CategorySpace) -> Self {
        let mut deaths = vec![0; space.len()];
        for row in timelines.rows() {
            if let Some(first_dead) = row.iter().position(|&cell| cell == DEAD) {
                let category = match first_dead {
                    0 => Category::Unvaccinated.index(),
                    _ => usize::from(row[first_dead - 1]),
                };
                deaths[category] += 1;
            }
        }

        let mut cell_counts = [0u64; 256];
        for &cell in timelines.cells() {
            cell_counts[usize::from(cell)] += 1;
        }
        let person_weeks = cell_counts[..space.len()].to_vec();

        Self {
            deaths,
            person_weeks,
            dead_weeks: cell_counts[usize::from(DEAD)],
        }
    }

    #[must_use]
    pub fn total_deaths(&self) -> u64 {
        self.deaths.iter().sum()
    }

    #[must_use]
    pub fn total_person_weeks(&self) -> u64 {
        self.person_weeks.iter().sum()
    }

    /// Deaths per `figure_per` person-years, per category. NaN where a category had no
    /// person-time.
    #[must_use]
    pub fn rates(&self, figure_per: f64) -> Vec<f64> {
        self.deaths
            .iter()
            .zip(&self.person_weeks)
            .map(|(&deaths, &weeks)| mortality_rate(deaths, weeks, figure_per))
            .collect()
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn person_years(person_weeks: u64) -> f64 {
    person_weeks as f64 / WEEKS_PER_YEAR
}

/// Deaths per `figure_per` person-years. Undefined (NaN) when there is no person-time, so that
/// "no data" is never confused with "no risk".
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mortality_rate(deaths: u64, person_weeks: u64, figure_per: f64) -> f64 {
    if person_weeks == 0 {
        return f64::NAN;
    }
    deaths as f64 / person_years(person_weeks) * figure_per
}

#[cfg(test)]
mod test {
    use super::{mortality_rate, MortalityTally, WEEKS_PER_YEAR};
    use crate::{
        category::{Category, CategorySpace},
        population::Population,
        timeline::{build_timelines, category_cell, DeathFlagPolicy, Timelines, DEAD},
    };
    use rand::{rngs::StdRng, SeedableRng};
    use statrs::assert_almost_eq;

    #[test]
    fn test_single_dose_person_weeks() {
        let space = CategorySpace::new(1);
        let mut population = Population::with_death_weeks(vec![None; 10], 1);
        for person in 0..10 {
            population.set_dose_week(1, person, 3);
        }
        let mut rng = StdRng::seed_from_u64(0);
        let timelines = build_timelines(&population, 10, 4, DeathFlagPolicy::FollowingWeek, &mut rng);
        let tally = MortalityTally::from_timelines(&timelines, space);
        assert_eq!(tally.person_weeks, vec![20, 40, 40]);
        assert_eq!(tally.total_person_weeks(), 100);
        assert_eq!(tally.dead_weeks, 0);
        assert_eq!(tally.total_deaths(), 0);
    }

    #[test]
    fn test_death_attributed_to_status_before_flag() {
        let space = CategorySpace::new(1);
        let population = Population::with_death_weeks(vec![Some(5)], 1);
        let mut rng = StdRng::seed_from_u64(0);
        let timelines = build_timelines(&population, 10, 4, DeathFlagPolicy::FollowingWeek, &mut rng);
        let tally = MortalityTally::from_timelines(&timelines, space);
        assert_eq!(tally.deaths, vec![1, 0, 0]);
        assert_eq!(tally.person_weeks, vec![5, 0, 0]);
        assert_eq!(tally.dead_weeks, 5);
    }

    #[test]
    fn test_death_attributed_to_recent_dose() {
        let space = CategorySpace::new(1);
        let mut population = Population::with_death_weeks(vec![Some(4)], 1);
        population.set_dose_week(1, 0, 2);
        let mut rng = StdRng::seed_from_u64(0);
        let timelines = build_timelines(&population, 8, 4, DeathFlagPolicy::FollowingWeek, &mut rng);
        let tally = MortalityTally::from_timelines(&timelines, space);
        assert_eq!(tally.deaths, vec![0, 1, 0]);
    }

    #[test]
    fn test_dead_from_first_week() {
        let space = CategorySpace::new(1);
        let mut timelines = Timelines::new(1, 4);
        timelines.fill_from(0, 1, DEAD);
        let tally = MortalityTally::from_timelines(&timelines, space);
        assert_eq!(tally.deaths, vec![1, 0, 0]);
        assert_eq!(tally.dead_weeks, 4);
    }

    #[test]
    fn test_person_time_sums_to_grid() {
        let space = CategorySpace::new(2);
        let mut timelines = Timelines::new(3, 6);
        timelines.fill_from(0, 2, category_cell(Category::Recent(1)));
        timelines.fill_from(1, 3, category_cell(Category::Elapsed(2)));
        timelines.fill_from(1, 5, DEAD);
        let tally = MortalityTally::from_timelines(&timelines, space);
        assert_eq!(tally.total_person_weeks() + tally.dead_weeks, 18);
        assert_eq!(tally.deaths[Category::Elapsed(2).index()], 1);
    }

    #[test]
    fn test_rates() {
        let weeks = 1_000_000;
        let rate = mortality_rate(10, weeks, 1e5);
        assert_almost_eq!(rate, 10.0 / (1e6 / WEEKS_PER_YEAR) * 1e5, 1e-9);
        assert_almost_eq!(mortality_rate(0, weeks, 1e5), 0.0, 1e-12);
        assert!(mortality_rate(0, 0, 1e5).is_nan());
    }

    #[test]
    fn test_tally_rates_report_undefined_categories() {
        let tally = MortalityTally {
            deaths: vec![2, 0, 0],
            person_weeks: vec![522, 0, 10],
            dead_weeks: 0,
        };
        let rates = tally.rates(1e5);
        assert!(rates[0].is_finite());
        assert!(rates[1].is_nan());
        assert_almost_eq!(rates[2], 0.0, 1e-12);
    }
}
