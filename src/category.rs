//! The finite set of vaccination categories a person-week can fall into.
//!
//! There is one `Unvaccinated` category, and for each dose `d` a pair of categories: one for the
//! weeks shortly after the dose (`Recent`) and one for the weeks after the split threshold has
//! elapsed (`Elapsed`). With `D` configured doses there are exactly `2D + 1` categories.
//!
//! Each category has two stable integer representations:
//! - a dense index in `0..=2D`, used to address per-category arrays and timeline cells;
//! - a two-digit code (`d * 10 + 1` for recent, `d * 10` for elapsed, `0` for unvaccinated), used
//!   in reports. Code `1` is reserved for the dead marker.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Largest number of doses whose dense indices still fit in a timeline cell.
pub const MAX_DOSES: u8 = 126;

/// Report code of the dead marker. Never produced by a category.
pub const DEAD_CODE: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Unvaccinated,
    /// Fewer than the split threshold of weeks have passed since this dose.
    Recent(u8),
    /// At least the split threshold of weeks have passed since this dose.
    Elapsed(u8),
}

impl Category {
    /// Category of a person whose most recent dose is `dose` (1-based).
    #[must_use]
    pub fn for_dose(dose: u8, below_threshold: bool) -> Self {
        if below_threshold {
            Category::Recent(dose)
        } else {
            Category::Elapsed(dose)
        }
    }

    #[must_use]
    pub fn dose(self) -> Option<u8> {
        match self {
            Category::Unvaccinated => None,
            Category::Recent(dose) | Category::Elapsed(dose) => Some(dose),
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Category::Unvaccinated => 0,
            Category::Recent(dose) => 2 * usize::from(dose) - 1,
            Category::Elapsed(dose) => 2 * usize::from(dose),
        }
    }

    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Category::Unvaccinated => 0,
            Category::Recent(dose) => u16::from(dose) * 10 + 1,
            Category::Elapsed(dose) => u16::from(dose) * 10,
        }
    }

    /// Human readable label; `split_week` is the recent/elapsed threshold in weeks.
    #[must_use]
    pub fn label(self, split_week: usize) -> String {
        match self {
            Category::Unvaccinated => "Unvaccinated".to_string(),
            Category::Recent(dose) => format!("< {split_week} weeks from dose {dose}"),
            Category::Elapsed(dose) => format!("≥ {split_week} weeks from dose {dose}"),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Unvaccinated => write!(f, "Unvaccinated"),
            Category::Recent(dose) => write!(f, "Dose{dose}Recent"),
            Category::Elapsed(dose) => write!(f, "Dose{dose}Elapsed"),
        }
    }
}

/// The category space for a fixed number of doses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySpace {
    n_doses: u8,
}

impl CategorySpace {
    /// # Panics
    /// If `n_doses` exceeds [`MAX_DOSES`]. Parameter validation rejects such configurations.
    #[must_use]
    pub fn new(n_doses: u8) -> Self {
        assert!(
            n_doses <= MAX_DOSES,
            "At most {MAX_DOSES} doses can be encoded, got {n_doses}."
        );
        Self { n_doses }
    }

    #[must_use]
    pub fn n_doses(self) -> u8 {
        self.n_doses
    }

    /// Number of categories, `2D + 1`.
    #[must_use]
    pub fn len(self) -> usize {
        2 * usize::from(self.n_doses) + 1
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(self, category: Category) -> bool {
        match category.dose() {
            None => true,
            Some(dose) => (1..=self.n_doses).contains(&dose),
        }
    }

    #[must_use]
    pub fn from_index(self, index: usize) -> Option<Category> {
        if index == 0 {
            return Some(Category::Unvaccinated);
        }
        if index >= self.len() {
            return None;
        }
        let dose = u8::try_from(index.div_ceil(2)).ok()?;
        Some(Category::for_dose(dose, index % 2 == 1))
    }

    #[must_use]
    pub fn from_code(self, code: u16) -> Option<Category> {
        if code == 0 {
            return Some(Category::Unvaccinated);
        }
        let dose = u8::try_from(code / 10).ok()?;
        let category = match code % 10 {
            0 => Category::Elapsed(dose),
            1 => Category::Recent(dose),
            _ => return None,
        };
        (dose >= 1 && self.contains(category)).then_some(category)
    }

    /// Categories in dense index order.
    pub fn iter(self) -> impl Iterator<Item = Category> {
        std::iter::once(Category::Unvaccinated).chain(
            (1..=self.n_doses)
                .flat_map(|dose| [Category::Recent(dose), Category::Elapsed(dose)]),
        )
    }

    #[must_use]
    pub fn labels(self, split_week: usize) -> Vec<String> {
        self.iter().map(|category| category.label(split_week)).collect()
    }
}
