//! Listing-page parser
//!
//! Turns one static listing page's markup into candidate records. Each item
//! container yields exactly one record: rank is the container's 1-based
//! position in document order, and every missing field degrades to an
//! absent value instead of failing the container. The documented storage
//! sentinels are applied later, at the persistence boundary.

use crate::config::ListingConfig;
use crate::records::{ListingRecord, UNKNOWN_ID};
use crate::ShelfrankError;
use scraper::{ElementRef, Html, Selector};

/// Query-parameter key carrying the goods identifier in item links
const GOODS_NO_KEY: &str = "goodsNo=";

/// Parser for ranked listing pages, with pre-compiled selectors
pub struct ListingParser {
    container: Selector,
    name: Selector,
    brand: Selector,
    price: Selector,
    rating: Selector,
    link: Selector,
    image: Selector,
    listing: ListingConfig,
}

impl ListingParser {
    /// Compiles the configured selectors
    ///
    /// # Returns
    ///
    /// * `Ok(ListingParser)` - All selectors compiled
    /// * `Err(ShelfrankError)` - A selector failed to parse
    pub fn new(config: &ListingConfig) -> Result<Self, ShelfrankError> {
        let selectors = &config.selectors;
        Ok(Self {
            container: compile(&selectors.container)?,
            name: compile(&selectors.name)?,
            brand: compile(&selectors.brand)?,
            price: compile(&selectors.price)?,
            rating: compile(&selectors.rating)?,
            link: compile(&selectors.link)?,
            image: compile(&selectors.image)?,
            listing: config.clone(),
        })
    }

    /// Extracts one record per item container, in document order
    ///
    /// A container with missing fields still produces a record; nothing a
    /// single container contains can abort parsing of the rest.
    pub fn parse_listing(&self, markup: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(markup);

        document
            .select(&self.container)
            .enumerate()
            .map(|(index, item)| self.extract_record(index as u32 + 1, &item))
            .collect()
    }

    /// Extracts a single record from one item container
    fn extract_record(&self, rank: u32, item: &ElementRef) -> ListingRecord {
        let name = self.select_text(item, &self.name);
        let brand = self.select_text(item, &self.brand);

        let price = normalize_price(self.select_text(item, &self.price).as_deref().unwrap_or(""));
        let rating =
            normalize_rating(self.select_text(item, &self.rating).as_deref().unwrap_or(""));

        let goods_no = item
            .select(&self.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(extract_goods_no);

        let detail_url = self
            .listing
            .detail_url(goods_no.as_deref().unwrap_or(UNKNOWN_ID));

        let image_url = item
            .select(&self.image)
            .next()
            .and_then(|img| {
                // data-src carries the real URL when the image lazy-loads
                img.value()
                    .attr("data-src")
                    .or_else(|| img.value().attr("src"))
            })
            .map(|src| absolutize_image_url(src, &self.listing.image_host));

        ListingRecord {
            rank,
            name,
            brand,
            price,
            rating,
            category: self.listing.category.clone(),
            goods_no,
            detail_url,
            image_url,
        }
    }

    /// First-match text for a selector, trimmed; empty text counts as absent
    fn select_text(&self, item: &ElementRef, selector: &Selector) -> Option<String> {
        item.select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn compile(selector: &str) -> Result<Selector, ShelfrankError> {
    Selector::parse(selector).map_err(|e| ShelfrankError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Strips everything but digits from a price string; empty result is 0
///
/// Idempotent: a normalized value re-normalizes to itself.
pub fn normalize_price(text: &str) -> u32 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Keeps digits and the first decimal separator; empty result is 0.0
///
/// The result is clamped to the rating scale [0, 5].
pub fn normalize_rating(text: &str) -> f32 {
    let mut seen_separator = false;
    let filtered: String = text
        .chars()
        .filter(|c| {
            if c.is_ascii_digit() {
                true
            } else if *c == '.' && !seen_separator {
                seen_separator = true;
                true
            } else {
                false
            }
        })
        .collect();

    filtered.parse::<f32>().unwrap_or(0.0).clamp(0.0, 5.0)
}

/// Recovers the goods identifier from an item link target
///
/// Takes the substring between `goodsNo=` and the next `&` (or end of
/// string). A missing key, or a key with an empty value, yields `None`.
pub fn extract_goods_no(href: &str) -> Option<String> {
    let start = href.find(GOODS_NO_KEY)? + GOODS_NO_KEY.len();
    let rest = &href[start..];
    let value = match rest.find('&') {
        Some(end) => &rest[..end],
        None => rest,
    };

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Converts an image source attribute to an absolute URL
pub fn absolutize_image_url(src: &str, image_host: &str) -> String {
    if src.starts_with("http") {
        src.to_string()
    } else if src.starts_with("//") {
        format!("https:{}", src)
    } else {
        format!("{}{}", image_host, src)
    }
}

/// Filters out records without a name or with a non-positive price
///
/// For callers that need "complete" records only. The default enrichment
/// path does not apply this: it enriches every record it is given.
pub fn validate_records(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    records
        .into_iter()
        .filter(|r| r.name.is_some() && r.price > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListingConfig;

    fn parser() -> ListingParser {
        ListingParser::new(&ListingConfig::default()).unwrap()
    }

    const FULL_ITEM: &str = r#"
        <div class="prd_info">
            <a href="/store/goods/getGoodsDetail.do?goodsNo=A000000222698&dispCatNo=90000010001"></a>
            <img src="//image.oliveyoung.co.kr/uploads/images/goods/222698.jpg">
            <p class="tx_name">수분 크림</p>
            <span class="tx_brand">올리브영</span>
            <span class="tx_cur">29,900원</span>
            <span class="rating">4.5</span>
        </div>
    "#;

    #[test]
    fn test_parse_full_item() {
        let records = parser().parse_listing(FULL_ITEM);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.rank, 1);
        assert_eq!(record.name.as_deref(), Some("수분 크림"));
        assert_eq!(record.brand.as_deref(), Some("올리브영"));
        assert_eq!(record.price, 29900);
        assert_eq!(record.rating, 4.5);
        assert_eq!(record.category, "스킨케어");
        assert_eq!(record.goods_no.as_deref(), Some("A000000222698"));
        assert_eq!(
            record.detail_url,
            "https://www.oliveyoung.co.kr/store/goods/getGoodsDetail.do?goodsNo=A000000222698"
        );
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://image.oliveyoung.co.kr/uploads/images/goods/222698.jpg")
        );
    }

    #[test]
    fn test_missing_fields_still_produce_one_record() {
        let html = r#"<div class="prd_info"><a href="/somewhere"></a></div>"#;
        let records = parser().parse_listing(html);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.rank, 1);
        assert!(record.name.is_none());
        assert!(record.brand.is_none());
        assert_eq!(record.price, 0);
        assert_eq!(record.rating, 0.0);
        assert!(record.goods_no.is_none());
        assert!(record.detail_url.ends_with("goodsNo=UNKNOWN"));
        assert!(record.image_url.is_none());
    }

    #[test]
    fn test_rank_follows_container_order() {
        let html = r#"
            <div class="prd_info"><p class="tx_name">first</p></div>
            <div class="prd_info"></div>
            <div class="prd_info"><p class="tx_name">third</p></div>
        "#;
        let records = parser().parse_listing(html);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].rank, 1);
        assert_eq!(records[1].rank, 2);
        assert_eq!(records[2].rank, 3);
        // Rank is positional, independent of what the container holds
        assert!(records[1].name.is_none());
        assert_eq!(records[2].name.as_deref(), Some("third"));
    }

    #[test]
    fn test_empty_markup_yields_no_records() {
        assert!(parser().parse_listing("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_normalize_price() {
        assert_eq!(normalize_price("29,900원"), 29900);
        assert_eq!(normalize_price(""), 0);
        assert_eq!(normalize_price("free"), 0);
        // Idempotence on an already-normalized value
        assert_eq!(normalize_price("29900"), 29900);
        assert_eq!(normalize_price(&normalize_price("29,900원").to_string()), 29900);
    }

    #[test]
    fn test_normalize_rating() {
        assert_eq!(normalize_rating("4.5"), 4.5);
        assert_eq!(normalize_rating("N/A"), 0.0);
        assert_eq!(normalize_rating(""), 0.0);
        assert_eq!(normalize_rating("5"), 5.0);
        // Only the first separator survives
        assert_eq!(normalize_rating("1.2.3"), 1.23);
        // Out-of-scale values clamp to the rating range
        assert_eq!(normalize_rating("99"), 5.0);
    }

    #[test]
    fn test_extract_goods_no() {
        assert_eq!(
            extract_goods_no("/store/goods/getGoodsDetail.do?goodsNo=A123&x=1"),
            Some("A123".to_string())
        );
        assert_eq!(
            extract_goods_no("https://example.com/detail?goodsNo=B999"),
            Some("B999".to_string())
        );
        assert_eq!(extract_goods_no("/store/goods/getGoodsDetail.do"), None);
        assert_eq!(extract_goods_no("?goodsNo=&x=1"), None);
    }

    #[test]
    fn test_absolutize_image_url() {
        let host = "https://image.oliveyoung.co.kr";
        assert_eq!(
            absolutize_image_url("https://cdn.example.com/a.jpg", host),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(
            absolutize_image_url("//image.oliveyoung.co.kr/a.jpg", host),
            "https://image.oliveyoung.co.kr/a.jpg"
        );
        assert_eq!(
            absolutize_image_url("/uploads/a.jpg", host),
            "https://image.oliveyoung.co.kr/uploads/a.jpg"
        );
    }

    #[test]
    fn test_validate_records_filters_incomplete() {
        let html = r#"
            <div class="prd_info">
                <p class="tx_name">complete</p>
                <span class="tx_cur">1,000원</span>
            </div>
            <div class="prd_info"><span class="tx_cur">2,000원</span></div>
            <div class="prd_info"><p class="tx_name">free item</p></div>
        "#;
        let records = parser().parse_listing(html);
        assert_eq!(records.len(), 3);

        let valid = validate_records(records);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].name.as_deref(), Some("complete"));
    }
}
