//! Query executor module.

mod project;
mod runner;
mod scan;

pub use project::ProjectExecutor;
pub use runner::{execute, execute_resolved, DataSource};
pub use scan::TableScanExecutor;
