use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    category::{CategorySpace, MAX_DOSES},
    error::HveError,
    reports::ReportType,
    timeline::DeathFlagPolicy,
};

/// Normal distribution of the week a dose is given. For the first dose this is the absolute
/// week; for later doses it is the offset from the previous dose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeekDistribution {
    pub mean: f64,
    pub std: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {
    /// Number of individuals in each simulated population.
    pub n_people: usize,
    /// Expected number of deaths over the simulated period; sets the per-person death probability.
    pub n_deaths: usize,
    /// Length of the simulated period in weeks.
    pub n_weeks: usize,
    /// How many independent runs to average over.
    pub n_runs: usize,
    /// Base random seed. Run `i` is seeded with `seed + i`.
    pub seed: u64,
    /// Probability of taking each dose, in dose order. For doses after the first this is
    /// the uptake among those who received the previous dose.
    pub dose_uptake: Vec<f64>,
    /// Timing of each dose, in dose order.
    pub dose_week_distributions: Vec<WeekDistribution>,
    /// Minimum number of weeks between consecutive doses.
    pub min_time: usize,
    /// Width, in weeks, of the window around death in which doses may be withheld.
    pub hve_duration: usize,
    /// Probability that a dose inside the window is withheld. Zero disables the effect.
    pub hve_p: f64,
    /// Weeks after a dose before a person moves from the recent to the elapsed category.
    pub split_week: usize,
    /// Rates are reported per this many person-years.
    pub figure_per: f64,
    /// Which week a death is first marked in a timeline.
    #[serde(default)]
    pub death_flag_policy: DeathFlagPolicy,
    /// Reports to write at the end of a batch.
    #[serde(default)]
    pub reports: Vec<ReportType>,
}

impl Params {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn p_death(&self) -> f64 {
        self.n_deaths as f64 / self.n_people as f64
    }

    /// Number of configured doses. Only meaningful once the parameters are validated.
    #[must_use]
    pub fn n_doses(&self) -> u8 {
        u8::try_from(self.dose_uptake.len()).unwrap_or(u8::MAX)
    }

    #[must_use]
    pub fn category_space(&self) -> CategorySpace {
        CategorySpace::new(self.n_doses())
    }

    /// Reads parameters from a JSON file and validates them.
    /// # Errors
    /// - If the file cannot be read or parsed
    /// - If any parameter fails validation
    pub fn from_json_file(path: &Path) -> Result<Self, HveError> {
        let parameters = Self::read_json_file(path)?;
        validate_inputs(&parameters)?;
        Ok(parameters)
    }

    /// Reads parameters from a JSON file without validating them, so that command-line
    /// overrides can be applied first.
    /// # Errors
    /// - If the file cannot be read or parsed
    pub fn read_json_file(path: &Path) -> Result<Self, HveError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Replaces the run count and seed where an override is given.
    #[must_use]
    pub fn with_overrides(mut self, n_runs: Option<usize>, seed: Option<u64>) -> Self {
        if let Some(n_runs) = n_runs {
            self.n_runs = n_runs;
        }
        if let Some(seed) = seed {
            self.seed = seed;
        }
        self
    }
}

fn invalid(msg: &str) -> HveError {
    HveError::InvalidParameter(msg.to_string())
}

/// Check the parameters against the invariants the simulation relies on, so that a bad input
/// file is rejected before any run starts rather than producing meaningless rates.
/// # Errors
/// - If any parameter is out of range; the message names the violated constraint
pub fn validate_inputs(parameters: &Params) -> Result<(), HveError> {
    if parameters.n_deaths == 0 || parameters.n_deaths >= parameters.n_people {
        return Err(invalid(
            "The number of deaths must be positive and smaller than the number of people.",
        ));
    }
    if parameters.n_weeks == 0 {
        return Err(invalid("The number of weeks must be positive."));
    }
    if parameters.n_runs == 0 {
        return Err(invalid("The number of runs must be positive."));
    }
    if parameters.dose_uptake.is_empty() {
        return Err(invalid("At least one dose must be configured."));
    }
    if parameters.dose_uptake.len() > usize::from(MAX_DOSES) {
        return Err(HveError::InvalidParameter(format!(
            "At most {MAX_DOSES} doses can be configured."
        )));
    }
    if parameters.dose_uptake.len() != parameters.dose_week_distributions.len() {
        return Err(HveError::InvalidParameter(format!(
            "Every dose needs both an uptake and a week distribution; got {} uptakes and {} distributions.",
            parameters.dose_uptake.len(),
            parameters.dose_week_distributions.len()
        )));
    }
    if !parameters
        .dose_uptake
        .iter()
        .all(|p| (0.0..=1.0).contains(p))
    {
        return Err(invalid("All dose uptakes must be between 0 and 1."));
    }
    #[allow(clippy::cast_precision_loss)]
    let n_weeks = parameters.n_weeks as f64;
    for (i, distribution) in parameters.dose_week_distributions.iter().enumerate() {
        if !(distribution.mean > 0.0 && distribution.mean < n_weeks) {
            return Err(HveError::InvalidParameter(format!(
                "The week distribution mean of dose {} must be greater than 0 and smaller than the number of weeks.",
                i + 1
            )));
        }
        if !(distribution.std.is_finite() && distribution.std >= 0.0) {
            return Err(HveError::InvalidParameter(format!(
                "The week distribution std of dose {} must be finite and non-negative.",
                i + 1
            )));
        }
    }
    if !(0.0..=1.0).contains(&parameters.hve_p) {
        return Err(invalid("The HVE probability must be between 0 and 1."));
    }
    if parameters.split_week == 0 || parameters.split_week >= parameters.n_weeks {
        return Err(invalid(
            "The split week must be greater than 0 and smaller than the number of weeks.",
        ));
    }
    if parameters.hve_duration == 0 || parameters.hve_duration >= parameters.n_weeks {
        return Err(invalid(
            "The HVE duration must be greater than 0 and smaller than the number of weeks.",
        ));
    }
    if parameters.min_time == 0 || parameters.min_time >= parameters.n_weeks {
        return Err(invalid(
            "The minimum time between doses must be greater than 0 and smaller than the number of weeks.",
        ));
    }
    if !(parameters.figure_per > 0.0 && parameters.figure_per.is_finite()) {
        return Err(invalid("The person-year normalization must be positive."));
    }

    let mut report_names = HashSet::new();
    for report in &parameters.reports {
        let name = report.name();
        if name.is_empty() {
            return Err(invalid("Report names must not be empty."));
        }
        if !report_names.insert(name) {
            return Err(HveError::InvalidParameter(format!(
                "Report name {name} is used more than once."
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use super::{validate_inputs, Params, WeekDistribution};
    use crate::{error::HveError, reports::ReportType, timeline::DeathFlagPolicy};

    pub(crate) fn default_params() -> Params {
        Params {
            n_people: 1_000,
            n_deaths: 100,
            n_weeks: 104,
            n_runs: 4,
            seed: 0,
            dose_uptake: vec![0.82, 0.96, 0.82],
            dose_week_distributions: vec![
                WeekDistribution {
                    mean: 20.0,
                    std: 3.0
                };
                3
            ],
            min_time: 4,
            hve_duration: 26,
            hve_p: 0.5,
            split_week: 4,
            figure_per: 1e5,
            death_flag_policy: DeathFlagPolicy::FollowingWeek,
            reports: vec![],
        }
    }

    fn assert_invalid(parameters: &Params, expected: &str) {
        match validate_inputs(parameters).err() {
            Some(HveError::InvalidParameter(msg)) => assert_eq!(msg, expected),
            Some(ue) => panic!(
                "Expected an invalid parameter error. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, validation passed with no errors."),
        }
    }

    #[test]
    fn test_default_input_file() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("input/input.json");
        let parameters = Params::from_json_file(&path).expect("Could not load input file");
        assert_eq!(parameters.n_doses(), 3);
        assert_eq!(parameters.category_space().len(), 7);
    }

    #[test]
    fn test_overrides_applied_before_validation() {
        let mut parameters = default_params();
        parameters.n_runs = 0;
        let file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer(file.as_file(), &parameters).unwrap();

        assert!(matches!(
            Params::from_json_file(file.path()),
            Err(HveError::InvalidParameter(_))
        ));
        let parameters = Params::read_json_file(file.path())
            .unwrap()
            .with_overrides(Some(10), Some(7));
        assert!(validate_inputs(&parameters).is_ok());
        assert_eq!(parameters.n_runs, 10);
        assert_eq!(parameters.seed, 7);

        let unchanged = parameters.clone().with_overrides(None, None);
        assert_eq!(unchanged.n_runs, 10);
        assert_eq!(unchanged.seed, 7);
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(validate_inputs(&default_params()).is_ok());
    }

    #[test]
    fn test_p_death() {
        let parameters = default_params();
        statrs::assert_almost_eq!(parameters.p_death(), 0.1, 1e-12);
    }

    #[test]
    fn test_validate_deaths() {
        let mut parameters = default_params();
        parameters.n_deaths = 0;
        assert_invalid(
            &parameters,
            "The number of deaths must be positive and smaller than the number of people.",
        );
        parameters.n_deaths = parameters.n_people;
        assert_invalid(
            &parameters,
            "The number of deaths must be positive and smaller than the number of people.",
        );
    }

    #[test]
    fn test_validate_missing_distribution() {
        let mut parameters = default_params();
        parameters.dose_week_distributions.pop();
        assert_invalid(
            &parameters,
            "Every dose needs both an uptake and a week distribution; got 3 uptakes and 2 distributions.",
        );
    }

    #[test]
    fn test_validate_uptake_range() {
        let mut parameters = default_params();
        parameters.dose_uptake[1] = 1.2;
        assert_invalid(&parameters, "All dose uptakes must be between 0 and 1.");
    }

    #[test]
    fn test_validate_distribution() {
        let mut parameters = default_params();
        parameters.dose_week_distributions[2].mean = 104.0;
        assert_invalid(
            &parameters,
            "The week distribution mean of dose 3 must be greater than 0 and smaller than the number of weeks.",
        );
        let mut parameters = default_params();
        parameters.dose_week_distributions[0].std = -1.0;
        assert_invalid(
            &parameters,
            "The week distribution std of dose 1 must be finite and non-negative.",
        );
    }

    #[test]
    fn test_validate_hve() {
        let mut parameters = default_params();
        parameters.hve_p = -0.1;
        assert_invalid(&parameters, "The HVE probability must be between 0 and 1.");
        let mut parameters = default_params();
        parameters.hve_duration = 104;
        assert_invalid(
            &parameters,
            "The HVE duration must be greater than 0 and smaller than the number of weeks.",
        );
    }

    #[test]
    fn test_validate_split_and_min_time() {
        let mut parameters = default_params();
        parameters.split_week = 0;
        assert_invalid(
            &parameters,
            "The split week must be greater than 0 and smaller than the number of weeks.",
        );
        let mut parameters = default_params();
        parameters.min_time = 0;
        assert_invalid(
            &parameters,
            "The minimum time between doses must be greater than 0 and smaller than the number of weeks.",
        );
    }

    #[test]
    fn test_validate_no_doses() {
        let mut parameters = default_params();
        parameters.dose_uptake.clear();
        parameters.dose_week_distributions.clear();
        assert_invalid(&parameters, "At least one dose must be configured.");
    }

    #[test]
    fn test_validate_duplicate_reports() {
        let mut parameters = default_params();
        parameters.reports = vec![
            ReportType::MortalitySummary {
                name: "out.csv".to_string(),
            },
            ReportType::RunMortality {
                name: "out.csv".to_string(),
            },
        ];
        assert_invalid(&parameters, "Report name out.csv is used more than once.");
    }

    #[test]
    fn test_deserialization_policy_default() {
        let json = serde_json::to_value(default_params()).unwrap();
        let mut object = json.as_object().unwrap().clone();
        object.remove("death_flag_policy");
        object.remove("reports");
        let parameters: Params = serde_json::from_value(object.into()).unwrap();
        assert_eq!(parameters.death_flag_policy, DeathFlagPolicy::FollowingWeek);
        assert!(parameters.reports.is_empty());
    }
}
