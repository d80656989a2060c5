//! SQLite export
//!
//! Persists the enriched records into a `products` table. The table is
//! recreated on every run: the database holds the latest snapshot, not an
//! accumulating history. Collection-valued fields are stored as JSON text.

use crate::records::EnrichedRecord;
use crate::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite export backend
pub struct SqliteExporter {
    conn: Connection,
}

impl SqliteExporter {
    /// Opens (or creates) the database and recreates the products table
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteExporter)` - Database ready for inserts
    /// * `Err(ShelfrankError)` - Failed to open or initialize
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts all records in one transaction
    pub fn write_records(&mut self, records: &[EnrichedRecord]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (
                    rank, name, brand, price, rating, category, url, goods_no,
                    image_url, image_path, ingredients, additional_info,
                    reviews, extraction_error, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;

            for record in records {
                let listing = &record.listing;
                let detail = &record.detail;

                stmt.execute(params![
                    listing.rank,
                    listing.display_name(),
                    listing.display_brand(),
                    listing.price,
                    listing.rating as f64,
                    listing.category,
                    listing.detail_url,
                    listing.goods_no.as_deref().unwrap_or(crate::records::UNKNOWN_ID),
                    listing.image_url,
                    record.image_path,
                    serde_json::to_string(&detail.ingredients)?,
                    serde_json::to_string(&detail.full_info)?,
                    serde_json::to_string(&detail.reviews)?,
                    detail.extraction_error,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!("stored {} records in products table", records.len());
        Ok(())
    }

    /// Number of rows currently in the products table
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Drops and recreates the products table
fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS products;
        CREATE TABLE products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rank INTEGER NOT NULL,
            name TEXT NOT NULL,
            brand TEXT NOT NULL,
            price INTEGER NOT NULL,
            rating REAL NOT NULL,
            category TEXT NOT NULL,
            url TEXT NOT NULL,
            goods_no TEXT NOT NULL,
            image_url TEXT,
            image_path TEXT,
            ingredients TEXT NOT NULL,
            additional_info TEXT NOT NULL,
            reviews TEXT NOT NULL,
            extraction_error TEXT,
            created_at TEXT NOT NULL
        );
    ",
    )
}
