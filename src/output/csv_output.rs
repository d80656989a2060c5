//! CSV export
//!
//! Writes the enriched records with a fixed column order: the core listing
//! and detail columns first, then the supplementary columns in
//! lexicographic order. Collection-valued fields are embedded as JSON so
//! the file stays one row per record.

use crate::records::EnrichedRecord;
use crate::Result;
use std::path::Path;

/// Column order of the export, core columns then lexicographic extras
pub const CSV_COLUMNS: [&str; 13] = [
    "rank",
    "name",
    "brand",
    "price",
    "rating",
    "category",
    "url",
    "ingredients",
    "reviews",
    "extraction_error",
    "full_info",
    "image_path",
    "image_url",
];

/// Writes all records to a CSV file at the given path
///
/// # Arguments
///
/// * `records` - The enriched records to export
/// * `path` - Destination file, overwritten if present
///
/// # Returns
///
/// * `Ok(())` - All records written and flushed
/// * `Err(ShelfrankError)` - IO, CSV, or JSON encoding failure
pub fn write_csv(records: &[EnrichedRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_COLUMNS)?;

    for record in records {
        writer.write_record(csv_row(record)?)?;
    }

    writer.flush()?;
    tracing::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// One record as CSV fields, in [`CSV_COLUMNS`] order
fn csv_row(record: &EnrichedRecord) -> Result<Vec<String>> {
    let listing = &record.listing;
    let detail = &record.detail;

    Ok(vec![
        listing.rank.to_string(),
        listing.display_name().to_string(),
        listing.display_brand().to_string(),
        listing.price.to_string(),
        format!("{:.1}", listing.rating),
        listing.category.clone(),
        listing.detail_url.clone(),
        serde_json::to_string(&detail.ingredients)?,
        serde_json::to_string(&detail.reviews)?,
        detail.extraction_error.clone().unwrap_or_default(),
        serde_json::to_string(&detail.full_info)?,
        record.image_path.clone().unwrap_or_default(),
        listing.image_url.clone().unwrap_or_default(),
    ])
}
