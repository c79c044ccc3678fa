use std::path::Path;

use crate::{error::HveError, parameters::Params, simulation::RunResult};

/// One row per run. The number of administered-dose columns depends on the number of doses, so
/// the header is written by hand.
pub fn write(path: &Path, params: &Params, results: &[RunResult]) -> Result<(), HveError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![
        "run".to_string(),
        "died".to_string(),
        "censored_deaths".to_string(),
        "death_cancellations".to_string(),
        "hve_cancellations".to_string(),
    ];
    header.extend((1..=params.n_doses()).map(|dose| format!("dose_{dose}_administered")));
    writer.write_record(&header)?;

    for (run, result) in results.iter().enumerate() {
        let mut record = vec![
            run.to_string(),
            result.died.to_string(),
            result.censored_deaths.to_string(),
            result.cancellations.death.to_string(),
            result.cancellations.hve.to_string(),
        ];
        record.extend(result.administered.iter().map(u64::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
