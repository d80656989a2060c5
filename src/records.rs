//! Record types flowing through the pipeline
//!
//! A crawl produces one [`ListingRecord`] per item container on a listing
//! page. Enrichment attaches a [`DetailInfo`] to each, yielding an
//! [`EnrichedRecord`]. Absent fields are `None` internally; the sentinel
//! values the external storage formats expect (`"Unknown"`, `0`, `0.0`,
//! `goodsNo=UNKNOWN`) are applied only at the persistence boundary.

use serde::Serialize;
use std::collections::BTreeMap;

/// Sentinel text persisted for an unrecoverable name or brand
pub const UNKNOWN_TEXT: &str = "Unknown";

/// Sentinel identifier persisted when the item link carried no goods number
pub const UNKNOWN_ID: &str = "UNKNOWN";

/// One item as extracted from a static listing page.
///
/// Immutable once produced; consumed by the detail extractor and the
/// persistence layer.
#[derive(Debug, Clone, Serialize)]
pub struct ListingRecord {
    /// 1-based position of the item container on its listing page
    pub rank: u32,

    /// Product name, if the name element was present
    pub name: Option<String>,

    /// Brand name, if the brand element was present
    pub brand: Option<String>,

    /// Price in currency minor units, 0 when unparseable
    pub price: u32,

    /// Rating in [0, 5], 0.0 when unparseable
    pub rating: f32,

    /// Fixed category label for this pipeline
    pub category: String,

    /// Goods identifier recovered from the item's primary link, if any
    pub goods_no: Option<String>,

    /// Absolute detail-page URL (carries the `UNKNOWN` identifier sentinel
    /// when no goods number was recovered)
    pub detail_url: String,

    /// Absolute image URL, if an image element was present
    pub image_url: Option<String>,
}

impl ListingRecord {
    /// Name as persisted, with the documented sentinel for absence
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_TEXT)
    }

    /// Brand as persisted, with the documented sentinel for absence
    pub fn display_brand(&self) -> &str {
        self.brand.as_deref().unwrap_or(UNKNOWN_TEXT)
    }
}

/// Detail-page data recovered by the browser stage.
///
/// Always produced, possibly partially: a failed stage leaves its fields
/// empty and a failed extraction records the fault in `extraction_error`
/// while keeping whatever was gathered before it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetailInfo {
    /// Ingredient tokens split from the well-known disclosure row
    pub ingredients: Vec<String>,

    /// Disclosure label -> value, whitespace collapsed
    pub full_info: BTreeMap<String, String>,

    /// Review texts, at most the caller-supplied cap
    pub reviews: Vec<String>,

    /// Present iff the detail stage failed for this item
    pub extraction_error: Option<String>,
}

/// A listing record plus whatever detail data was recovered for it.
///
/// Enrichment is additive: a record that was never enriched, or whose
/// enrichment failed, still carries every listing field.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub listing: ListingRecord,

    #[serde(flatten)]
    pub detail: DetailInfo,

    /// Local path of the downloaded product image, if any
    pub image_path: Option<String>,
}

impl EnrichedRecord {
    /// Wraps a listing record with empty detail data
    pub fn bare(listing: ListingRecord) -> Self {
        Self {
            listing,
            detail: DetailInfo::default(),
            image_path: None,
        }
    }
}
