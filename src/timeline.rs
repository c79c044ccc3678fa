//! Week-by-week vaccination status of every person in a run.
//!
//! A timeline starts out unvaccinated. Each dose, in dose order, overwrites the weeks from its
//! week onward with its recent category and the weeks from `week + split_week` onward with its
//! elapsed category. Death is applied last and overwrites everything from the death-flag week
//! onward with the dead marker.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    category::{Category, CategorySpace},
    population::{Population, Week},
};

/// Cell value marking a person as dead. Distinct from every category index.
pub const DEAD: u8 = u8::MAX;

/// Which week a death is first marked in the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathFlagPolicy {
    /// Mark the week after the death week, so the death week keeps the status the person died
    /// with.
    #[default]
    FollowingWeek,
    /// Mark either the death week or the week after, with equal probability.
    Jittered,
}

impl DeathFlagPolicy {
    pub fn flag_week(self, death_week: Week, rng: &mut impl Rng) -> Week {
        match self {
            DeathFlagPolicy::FollowingWeek => death_week + 1,
            DeathFlagPolicy::Jittered => {
                if rng.random_bool(0.5) {
                    death_week
                } else {
                    death_week + 1
                }
            }
        }
    }
}

/// What a timeline cell holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Alive(Category),
    Dead,
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn category_cell(category: Category) -> u8 {
    // `CategorySpace` caps the number of doses so every index fits below `DEAD`.
    category.index() as u8
}

/// The person-by-week grid of a run, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timelines {
    n_weeks: usize,
    cells: Vec<u8>,
}

impl Timelines {
    /// Every person unvaccinated for every week.
    #[must_use]
    pub fn new(n_people: usize, n_weeks: usize) -> Self {
        Self {
            n_weeks,
            cells: vec![category_cell(Category::Unvaccinated); n_people * n_weeks],
        }
    }

    #[must_use]
    pub fn n_weeks(&self) -> usize {
        self.n_weeks
    }

    #[must_use]
    pub fn n_people(&self) -> usize {
        if self.n_weeks == 0 {
            0
        } else {
            self.cells.len() / self.n_weeks
        }
    }

    /// Timeline of `person`; element `w - 1` is week `w`.
    #[must_use]
    pub fn row(&self, person: usize) -> &[u8] {
        &self.cells[person * self.n_weeks..(person + 1) * self.n_weeks]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks_exact(self.n_weeks.max(1))
    }

    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Sets every week of `person` from `week` (1-based) to the end of follow-up to `cell`.
    /// Weeks past the horizon are ignored.
    pub fn fill_from(&mut self, person: usize, week: Week, cell: u8) {
        let start = week.saturating_sub(1);
        if start >= self.n_weeks {
            return;
        }
        let row_start = person * self.n_weeks;
        self.cells[row_start + start..row_start + self.n_weeks].fill(cell);
    }

    /// Status of `person` in `week` (1-based). `None` if the cell is not a valid category of
    /// `space` or the marker.
    #[must_use]
    pub fn status(&self, space: CategorySpace, person: usize, week: Week) -> Option<Status> {
        decode_cell(space, self.row(person)[week - 1])
    }
}

#[must_use]
pub fn decode_cell(space: CategorySpace, cell: u8) -> Option<Status> {
    if cell == DEAD {
        Some(Status::Dead)
    } else {
        space.from_index(usize::from(cell)).map(Status::Alive)
    }
}

/// Builds the timelines of every person in `population`.
pub fn build_timelines(
    population: &Population,
    n_weeks: usize,
    split_week: usize,
    policy: DeathFlagPolicy,
    rng: &mut impl Rng,
) -> Timelines {
    let mut timelines = Timelines::new(population.len(), n_weeks);
    for person in 0..population.len() {
        // `doses_of` yields doses in increasing order, so higher doses overwrite lower ones.
        for (dose, week) in population.doses_of(person) {
            timelines.fill_from(person, week, category_cell(Category::Recent(dose)));
            timelines.fill_from(
                person,
                week.saturating_add(split_week),
                category_cell(Category::Elapsed(dose)),
            );
        }
        if let Some(death_week) = population.death_week(person) {
            let flag_week = policy.flag_week(death_week, rng);
            timelines.fill_from(person, flag_week, DEAD);
        }
    }
    timelines
}
