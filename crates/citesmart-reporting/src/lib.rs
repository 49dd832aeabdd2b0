pub mod export;
pub mod types;

pub use export::{ExportError, export_results, render};
pub use types::{ExportFormat, Report, metadata_fields};
