// Re-export commonly used types at the crate root
pub use category::{Category, CategorySpace};
pub use error::HveError;
pub use parameters::{Params, WeekDistribution};
pub use simulation::{run_simulation, run_simulations, summarize, CategorySummary, RunResult};
pub use timeline::DeathFlagPolicy; // Module declarations
pub mod category;
pub mod error;
pub mod mortality;
pub mod parameters;
pub mod population;
#[cfg(feature = "profiling")]
pub mod profiling;
pub mod reports;
pub mod simulation;
pub mod timeline;
pub mod vaccination;
