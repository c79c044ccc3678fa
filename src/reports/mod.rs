use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::HveError, parameters::Params, simulation::RunResult};

pub mod cancellation_report;
pub mod run_mortality_report;
pub mod summary_report;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum ReportType {
    /// Mean and std of each category's rate across runs.
    MortalitySummary { name: String },
    /// Deaths, person-time and rate of each category in each run.
    RunMortality { name: String },
    /// Dose cancellations and deaths of each run.
    Cancellations { name: String },
}

impl ReportType {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ReportType::MortalitySummary { name }
            | ReportType::RunMortality { name }
            | ReportType::Cancellations { name } => name,
        }
    }
}

/// Writes every report requested in `params` into `output_directory`.
/// # Errors
/// - If the directory cannot be created or a report cannot be written
pub fn write_reports(
    output_directory: &Path,
    params: &Params,
    results: &[RunResult],
) -> Result<(), HveError> {
    std::fs::create_dir_all(output_directory)?;
    for report in &params.reports {
        let path = output_directory.join(report.name());
        match report {
            ReportType::MortalitySummary { .. } => summary_report::write(&path, params, results)?,
            ReportType::RunMortality { .. } => run_mortality_report::write(&path, params, results)?,
            ReportType::Cancellations { .. } => cancellation_report::write(&path, params, results)?,
        }
        info!("Wrote {}", path.display());
    }
    Ok(())
}
