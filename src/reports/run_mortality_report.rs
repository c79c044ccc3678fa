use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::HveError, mortality::person_years, parameters::Params, simulation::RunResult};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RunMortalityRow {
    run: usize,
    code: u16,
    label: String,
    deaths: u64,
    person_weeks: u64,
    person_years: f64,
    rate: f64,
}

pub fn write(path: &Path, params: &Params, results: &[RunResult]) -> Result<(), HveError> {
    let mut writer = csv::Writer::from_path(path)?;
    let space = params.category_space();
    for (run, result) in results.iter().enumerate() {
        for category in space.iter() {
            let index = category.index();
            writer.serialize(RunMortalityRow {
                run,
                code: category.code(),
                label: category.label(params.split_week),
                deaths: result.tally.deaths[index],
                person_weeks: result.tally.person_weeks[index],
                person_years: person_years(result.tally.person_weeks[index]),
                rate: result.rates[index],
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{write, RunMortalityRow};
    use crate::{
        mortality::MortalityTally, parameters::test::default_params, simulation::RunResult,
        vaccination::Cancellations,
    };

    #[test]
    fn test_undefined_rate_written_as_nan() {
        let mut params = default_params();
        params.dose_uptake = vec![1.0];
        params.dose_week_distributions.truncate(1);
        let tally = MortalityTally {
            deaths: vec![3, 0, 0],
            person_weeks: vec![522, 0, 100],
            dead_weeks: 10,
        };
        let result = RunResult {
            rates: tally.rates(params.figure_per),
            tally,
            cancellations: Cancellations::default(),
            administered: vec![0],
            died: 3,
            censored_deaths: 0,
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), &params, &[result]).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.starts_with("run,code,label,deaths,person_weeks,person_years,rate\n"));
        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let rows: Vec<RunMortalityRow> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].deaths, 3);
        assert!(rows[0].rate > 0.0);
        assert!(rows[1].rate.is_nan());
        assert_eq!(rows[2].code, 10);
    }
}
