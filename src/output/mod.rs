//! Output module for persisting harvest results
//!
//! This module handles:
//! - Creating the output directory tree
//! - Exporting records as CSV
//! - Exporting records into a SQLite database

mod csv_output;
mod sqlite_output;

pub use csv_output::{write_csv, CSV_COLUMNS};
pub use sqlite_output::SqliteExporter;

use crate::config::OutputConfig;
use crate::records::EnrichedRecord;
use crate::Result;

/// Writes the records to every configured export target
///
/// # Arguments
///
/// * `records` - The enriched records to persist
/// * `config` - Output locations
///
/// # Returns
///
/// * `Ok(())` - CSV and SQLite exports written
/// * `Err(ShelfrankError)` - Any export failed
pub fn export_all(records: &[EnrichedRecord], config: &OutputConfig) -> Result<()> {
    std::fs::create_dir_all(&config.dir)?;

    write_csv(records, &config.csv_path())?;

    let mut exporter = SqliteExporter::new(&config.db_path())?;
    exporter.write_records(records)?;

    Ok(())
}
