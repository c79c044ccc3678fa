use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::HveError,
    parameters::Params,
    simulation::{summarize, RunResult},
};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    index: usize,
    code: u16,
    label: String,
    mean: f64,
    std: f64,
    undefined_runs: usize,
}

pub fn write(path: &Path, params: &Params, results: &[RunResult]) -> Result<(), HveError> {
    let mut writer = csv::Writer::from_path(path)?;
    for summary in summarize(params, results) {
        writer.serialize(SummaryRow {
            index: summary.category.index(),
            code: summary.category.code(),
            label: summary.label,
            mean: summary.mean,
            std: summary.std,
            undefined_runs: summary.undefined_runs,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{write, SummaryRow};
    use crate::{parameters::test::default_params, simulation::run_simulations};

    #[test]
    fn test_summary_rows() {
        let mut params = default_params();
        params.n_runs = 3;
        let results = run_simulations(&params).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), &params, &results).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let rows: Vec<SummaryRow> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].label, "Unvaccinated");
        assert_eq!(rows[0].code, 0);
        assert_eq!(rows[1].label, "< 4 weeks from dose 1");
        assert_eq!(rows[1].code, 11);
        assert_eq!(rows[6].label, "≥ 4 weeks from dose 3");
        assert_eq!(rows[6].code, 30);
        assert!(rows.iter().all(|row| row.undefined_runs <= 3));
        assert!(rows[0].mean > 0.0);
    }
}
