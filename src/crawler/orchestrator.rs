//! Crawl orchestration
//!
//! This module contains the main crawl loop that coordinates the pipeline
//! stages, including:
//! - Walking listing pages until the catalog is exhausted
//! - Enriching each record through a detail source, isolating failures
//! - Downloading item images alongside the records
//! - Honoring a cancellation flag between units of work

use crate::config::Config;
use crate::crawler::fetcher::RateLimitedFetcher;
use crate::crawler::parser::ListingParser;
use crate::detail::DetailSource;
use crate::records::{EnrichedRecord, ListingRecord};
use crate::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Main pipeline orchestrator
pub struct CrawlOrchestrator {
    config: Arc<Config>,
    fetcher: RateLimitedFetcher,
    parser: ListingParser,
    cancel: Arc<AtomicBool>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator, building its fetcher and parser
    ///
    /// # Arguments
    ///
    /// * `config` - The pipeline configuration
    /// * `cancel` - Flag polled between pages and between items
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOrchestrator)` - Successfully created orchestrator
    /// * `Err(ShelfrankError)` - Client build or selector compilation failed
    pub fn new(config: Arc<Config>, cancel: Arc<AtomicBool>) -> Result<Self> {
        let fetcher = RateLimitedFetcher::new(&config.fetcher)?;
        let parser = ListingParser::new(&config.listing)?;

        Ok(Self {
            config,
            fetcher,
            parser,
            cancel,
        })
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Crawls listing pages in order until the catalog is exhausted
    ///
    /// Stops at `max_pages`, at the first page that yields no records, or
    /// at the first page that cannot be fetched. A failed page ends the
    /// listing; pages already collected are kept.
    pub async fn crawl(&self, max_pages: u32) -> Vec<ListingRecord> {
        let endpoint = self.config.listing.listing_endpoint();
        let timeout = self.config.fetcher.timeout();
        let mut records = Vec::new();

        for page in 1..=max_pages {
            if self.cancelled() {
                tracing::info!(
                    "cancellation requested, {} pages crawled",
                    page - 1
                );
                break;
            }

            let params = self.config.listing.page_params(page);
            let Some(body) = self.fetcher.get_text(&endpoint, &params, timeout).await else {
                tracing::warn!("page {} unavailable, treating as end of listing", page);
                break;
            };

            let page_records = self.parser.parse_listing(&body);
            if page_records.is_empty() {
                tracing::info!("page {} is empty, listing exhausted", page);
                break;
            }

            tracing::info!(page, records = page_records.len(), "listing page parsed");
            records.extend(page_records);
        }

        records
    }

    /// Enriches records one at a time through a detail source
    ///
    /// A record whose extraction reports a fault still comes back with its
    /// listing fields intact; one bad item never affects its neighbors.
    /// After cancellation the remaining records pass through bare, so the
    /// output always holds every input record.
    pub async fn enrich<S: DetailSource>(
        &self,
        source: &S,
        records: Vec<ListingRecord>,
        max_reviews: usize,
    ) -> Vec<EnrichedRecord> {
        let total = records.len();
        let mut enriched = Vec::with_capacity(total);

        for (index, record) in records.into_iter().enumerate() {
            if self.cancelled() {
                tracing::info!(
                    "cancellation requested, passing {} records through bare",
                    total - index
                );
                enriched.push(EnrichedRecord::bare(record));
                continue;
            }

            tracing::info!(
                "enriching {}/{}: {}",
                index + 1,
                total,
                record.display_name()
            );

            let detail = source.fetch_detail(&record, max_reviews).await;
            if let Some(error) = &detail.extraction_error {
                tracing::warn!("{} enriched with fault: {}", record.display_name(), error);
            }
            enriched.push(EnrichedRecord { listing: record, detail, image_path: None });

            if index + 1 < total {
                tokio::time::sleep(self.config.detail.item_pause()).await;
            }
        }

        enriched
    }

    /// Downloads each record's image to `<images-dir>/<goods-no>.jpg`
    ///
    /// Records without an identifier or an image URL are skipped. An image
    /// already on disk is not fetched again, so reruns only fill gaps. A
    /// failed download leaves its record without an image path and moves
    /// on.
    pub async fn download_images(&self, records: &mut [EnrichedRecord]) -> Result<()> {
        let dir = self.config.output.images_path();
        std::fs::create_dir_all(&dir)?;

        let timeout = self.config.fetcher.timeout();
        let rate_limited = self.config.output.rate_limit_images;

        for record in records.iter_mut() {
            if self.cancelled() {
                tracing::info!("cancellation requested, stopping image downloads");
                break;
            }

            let (Some(goods_no), Some(image_url)) =
                (&record.listing.goods_no, &record.listing.image_url)
            else {
                continue;
            };

            let path = dir.join(format!("{}.jpg", goods_no));
            if path.exists() {
                tracing::debug!("image for {} already on disk", goods_no);
                record.image_path = Some(path_string(&path));
                continue;
            }

            let bytes = if rate_limited {
                self.fetcher.get_bytes(image_url, timeout).await
            } else {
                self.fetcher.get_bytes_unlimited(image_url, timeout).await
            };

            match bytes {
                Some(bytes) => {
                    if let Err(e) = std::fs::write(&path, bytes) {
                        tracing::warn!("failed to write image for {}: {}", goods_no, e);
                        continue;
                    }
                    record.image_path = Some(path_string(&path));
                }
                None => {
                    tracing::warn!("image download failed for {}", goods_no);
                }
            }
        }

        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
