//! Crawling pipeline
//!
//! The static half of the pipeline: the rate-limited fetcher, the listing
//! parser, and the orchestrator that drives both stages plus image
//! downloads. [`run_pipeline`] wires everything together for the binary.

mod fetcher;
mod orchestrator;
mod parser;

pub use fetcher::{build_http_client, RateLimitedFetcher};
pub use orchestrator::CrawlOrchestrator;
pub use parser::{
    absolutize_image_url, extract_goods_no, normalize_price, normalize_rating, validate_records,
    ListingParser,
};

use crate::config::Config;
use crate::detail::{BrowserSession, DetailExtractor};
use crate::records::EnrichedRecord;
use crate::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Per-run knobs, set from the command line
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Listing pages to walk at most
    pub max_pages: u32,
    /// Reviews to keep per item
    pub max_reviews: usize,
    /// Skip the browser stage entirely
    pub skip_details: bool,
    /// Skip image downloads
    pub skip_images: bool,
}

/// Runs the full pipeline: crawl, enrich, download images
///
/// The browser session is launched once for the whole batch and closed on
/// every exit path. Failing to launch it is the one enrichment fault that
/// ends the run; everything after that point degrades per item instead.
pub async fn run_pipeline(
    config: Arc<Config>,
    options: &PipelineOptions,
    cancel: Arc<AtomicBool>,
) -> Result<Vec<EnrichedRecord>> {
    let orchestrator = CrawlOrchestrator::new(Arc::clone(&config), cancel)?;

    let records = orchestrator.crawl(options.max_pages).await;
    tracing::info!("listing stage collected {} records", records.len());
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let mut enriched = if options.skip_details {
        records.into_iter().map(EnrichedRecord::bare).collect()
    } else {
        let session = BrowserSession::launch(&config.detail, &config.fetcher).await?;
        let extractor = DetailExtractor::new(&session, config.detail.clone());
        let enriched = orchestrator
            .enrich(&extractor, records, options.max_reviews)
            .await;
        session.close().await;
        enriched
    };

    if !options.skip_images && config.output.download_images {
        orchestrator.download_images(&mut enriched).await?;
    }

    Ok(enriched)
}
