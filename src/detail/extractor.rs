//! Script-rendered detail-page extraction
//!
//! Enriches one listing record from its detail page: activates the
//! disclosure control, reads the revealed label/value table, splits the
//! ingredient list out of it, then opens the review tab, drains the lazy
//! loader, and collects review texts from behind the encapsulation
//! boundaries.
//!
//! Extraction never fails a record. Whatever stage breaks, the stages that
//! already ran keep their results and the fault is recorded on the record
//! itself.

use crate::config::DetailConfig;
use crate::detail::locator::Locator;
use crate::detail::session::BrowserSession;
use crate::detail::walk::{collect_by_tag, find_first_by_tag, subtree_text, DomNode};
use crate::records::{DetailInfo, ListingRecord};
use crate::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Source of per-record detail data
///
/// The orchestrator enriches through this seam so batch behavior can be
/// tested without a browser.
#[async_trait]
pub trait DetailSource {
    /// Extracts detail data for one record; never fails the record
    async fn fetch_detail(&self, record: &ListingRecord, max_reviews: usize) -> DetailInfo;
}

/// Script evaluation against a rendered page
///
/// The extraction stages talk to the page only through this seam, so the
/// stage sequence can be driven by a scripted stand-in in tests. A script
/// with no result yields `Value::Null`.
#[async_trait]
pub trait PageScripting {
    async fn eval(&self, script: String) -> Result<Value>;
}

#[async_trait]
impl PageScripting for Page {
    async fn eval(&self, script: String) -> Result<Value> {
        let result = self.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

/// Browser-backed detail extractor
pub struct DetailExtractor<'a> {
    session: &'a BrowserSession,
    config: DetailConfig,
}

impl<'a> DetailExtractor<'a> {
    pub fn new(session: &'a BrowserSession, config: DetailConfig) -> Self {
        Self { session, config }
    }
}

#[async_trait]
impl DetailSource for DetailExtractor<'_> {
    async fn fetch_detail(&self, record: &ListingRecord, max_reviews: usize) -> DetailInfo {
        let mut info = DetailInfo::default();

        let page = match self.session.open(&record.detail_url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("failed to open {}: {}", record.detail_url, e);
                info.extraction_error = Some(e.to_string());
                return info;
            }
        };

        let stages = ExtractionStages::new(&self.config);
        if let Err(e) = stages.run(&page, &mut info, max_reviews).await {
            tracing::warn!(
                "detail extraction for {} stopped early: {}",
                record.display_name(),
                e
            );
            info.extraction_error = Some(e.to_string());
        }

        if let Err(e) = page.close().await {
            tracing::debug!("page close failed: {}", e);
        }

        info
    }
}

/// The per-item stage sequence, independent of any concrete page type
struct ExtractionStages<'c> {
    config: &'c DetailConfig,
}

impl<'c> ExtractionStages<'c> {
    fn new(config: &'c DetailConfig) -> Self {
        Self { config }
    }

    /// Ordered locators for the collapsed disclosure control
    fn disclosure_button_locators(&self) -> Vec<Locator> {
        vec![
            Locator::Structural(self.config.disclosure_button_css.clone()),
            Locator::Positional(self.config.disclosure_button_xpath.clone()),
        ]
    }

    /// Ordered locators for the revealed disclosure table
    fn disclosure_table_locators(&self) -> Vec<Locator> {
        vec![
            Locator::Structural(self.config.disclosure_table_css.clone()),
            Locator::Positional(self.config.disclosure_table_xpath.clone()),
        ]
    }

    /// Ordered locators for the review tab control
    fn review_tab_locators(&self) -> Vec<Locator> {
        vec![
            Locator::Structural(self.config.review_tab_css.clone()),
            Locator::Positional(self.config.review_tab_xpath.clone()),
        ]
    }

    /// Runs all extraction stages against an open page
    async fn run<P: PageScripting + Sync>(
        &self,
        page: &P,
        info: &mut DetailInfo,
        max_reviews: usize,
    ) -> Result<()> {
        tokio::time::sleep(self.config.settle()).await;

        if self
            .activate(page, &self.disclosure_button_locators(), "disclosure control")
            .await?
        {
            info.full_info = self.read_disclosure(page).await?;
            info.ingredients = self.ingredients_from(&info.full_info);
        } else {
            tracing::warn!("disclosure control not found, skipping table read");
        }

        // No review tab means no reviews; that is the page's answer, not a
        // fault
        if !self
            .activate(page, &self.review_tab_locators(), "review tab")
            .await?
        {
            tracing::warn!("review tab not found, skipping reviews");
            return Ok(());
        }

        self.drain_lazy_load(page).await?;
        info.reviews = self.collect_reviews(page, max_reviews).await?;

        Ok(())
    }

    /// Tries each locator in order: wait for presence, then click
    ///
    /// Returns whether any locator landed a click. A locator whose script
    /// errors is skipped in favor of the next one.
    async fn activate<P: PageScripting + Sync>(
        &self,
        page: &P,
        locators: &[Locator],
        what: &str,
    ) -> Result<bool> {
        for locator in locators {
            if !self.wait_for(page, locator).await {
                tracing::debug!("{} not present via {}", what, locator);
                continue;
            }

            match page.eval(locator.click_script()).await {
                Ok(result) => {
                    if result.as_bool().unwrap_or(false) {
                        tracing::debug!("activated {} via {}", what, locator);
                        tokio::time::sleep(self.config.settle()).await;
                        return Ok(true);
                    }
                }
                Err(e) => {
                    tracing::debug!("click via {} failed: {}", locator, e);
                }
            }
        }

        Ok(false)
    }

    /// Polls a locator's presence until it appears or the budget runs out
    async fn wait_for<P: PageScripting + Sync>(&self, page: &P, locator: &Locator) -> bool {
        let deadline = Instant::now() + self.config.locator_wait();
        loop {
            match page.eval(locator.probe_script()).await {
                Ok(result) => {
                    if result.as_bool().unwrap_or(false) {
                        return true;
                    }
                }
                Err(e) => {
                    tracing::debug!("probe via {} failed: {}", locator, e);
                    return false;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.config.locator_poll()).await;
        }
    }

    /// Reads label/value rows from the revealed disclosure table
    async fn read_disclosure<P: PageScripting + Sync>(
        &self,
        page: &P,
    ) -> Result<BTreeMap<String, String>> {
        for locator in self.disclosure_table_locators() {
            let value = match page.eval(locator.rows_script()).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!("table read via {} failed: {}", locator, e);
                    continue;
                }
            };

            if let Some(rows) = serde_json::from_value::<Option<BTreeMap<String, String>>>(value)? {
                return Ok(rows
                    .into_iter()
                    .map(|(k, v)| (collapse_whitespace(&k), collapse_whitespace(&v)))
                    .filter(|(k, _)| !k.is_empty())
                    .collect());
            }
        }

        tracing::warn!("disclosure table not found after activation");
        Ok(BTreeMap::new())
    }

    /// Pulls the ingredient tokens out of the disclosure rows
    fn ingredients_from(&self, full_info: &BTreeMap<String, String>) -> Vec<String> {
        full_info
            .iter()
            .find(|(label, _)| label.contains(&self.config.ingredients_label))
            .map(|(_, value)| split_ingredients(value, &self.config.ingredient_delimiter))
            .unwrap_or_default()
    }

    /// Scrolls to the bottom until the page height stops growing
    async fn drain_lazy_load<P: PageScripting + Sync>(&self, page: &P) -> Result<()> {
        let mut last_height: i64 = -1;

        for attempt in 0..self.config.max_scroll_attempts {
            page.eval("window.scrollTo(0, document.body.scrollHeight);".to_string())
                .await?;
            tokio::time::sleep(self.config.scroll_settle()).await;

            let height = serde_json::from_value::<i64>(
                page.eval("document.body.scrollHeight".to_string()).await?,
            )?;

            if height == last_height {
                tracing::debug!(attempts = attempt + 1, "lazy load drained");
                return Ok(());
            }
            last_height = height;
        }

        tracing::debug!(
            attempts = self.config.max_scroll_attempts,
            "scroll attempt ceiling reached"
        );
        Ok(())
    }

    /// Snapshots the review-list subtree and collects item texts from it
    ///
    /// Every review item found is considered; the cap applies to the
    /// extracted texts, so an item without a paragraph does not use up a
    /// review slot.
    async fn collect_reviews<P: PageScripting + Sync>(
        &self,
        page: &P,
        max_reviews: usize,
    ) -> Result<Vec<String>> {
        let script = snapshot_script(&self.config.review_list_selector, self.config.max_walk_depth);
        let snapshot = serde_json::from_value::<Option<DomNode>>(page.eval(script).await?)?;

        let Some(root) = snapshot else {
            tracing::warn!(
                "review container '{}' not found",
                self.config.review_list_selector
            );
            return Ok(Vec::new());
        };

        let depth = self.config.max_walk_depth;
        let items = collect_by_tag(&root, &self.config.review_item_tag, depth, usize::MAX);

        // Each item's text is its first paragraph; items without one
        // contribute nothing
        Ok(items
            .into_iter()
            .filter_map(|item| find_first_by_tag(item, "p", depth))
            .map(|paragraph| collapse_whitespace(&subtree_text(paragraph, depth)))
            .filter(|text| !text.is_empty())
            .take(max_reviews)
            .collect())
    }
}

/// Script serializing the review-list subtree into a [`DomNode`] tree
///
/// Element nodes become tree nodes with their direct text; a node's shadow
/// root, when present, is attached under `shadow`. Returns `null` when the
/// container is absent.
fn snapshot_script(selector: &str, max_depth: usize) -> String {
    format!(
        "(() => {{\n\
           const MAX = {max_depth};\n\
           const snap = (node, depth) => {{\n\
             if (depth > MAX) return null;\n\
             const out = {{\n\
               tag: (node.tagName || '').toLowerCase(),\n\
               text: '',\n\
               children: [],\n\
               shadow: null,\n\
             }};\n\
             for (const child of node.childNodes) {{\n\
               if (child.nodeType === Node.TEXT_NODE) {{\n\
                 out.text += child.textContent;\n\
               }} else if (child.nodeType === Node.ELEMENT_NODE) {{\n\
                 const c = snap(child, depth + 1);\n\
                 if (c !== null) out.children.push(c);\n\
               }}\n\
             }}\n\
             out.text = out.text.trim();\n\
             if (node.shadowRoot) out.shadow = snap(node.shadowRoot, depth + 1);\n\
             return out;\n\
           }};\n\
           const host = document.querySelector({selector:?});\n\
           return host === null ? null : snap(host, 0);\n\
         }})()"
    )
}

/// Collapses runs of whitespace to single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits an ingredient value on the configured delimiter
///
/// Tokens are trimmed and empty tokens dropped, so doubled delimiters and
/// trailing ones do not produce phantom ingredients.
pub fn split_ingredients(value: &str, delimiter: &str) -> Vec<String> {
    value
        .split(delimiter)
        .map(collapse_whitespace)
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Configuration with the waits shrunk for fast tests
    fn fast_config() -> DetailConfig {
        let mut config = DetailConfig::default();
        config.settle_ms = 0;
        config.locator_wait_ms = 5;
        config.locator_poll_ms = 1;
        config.scroll_settle_ms = 0;
        config.max_scroll_attempts = 5;
        config
    }

    /// Snapshot of a review list with three items, the first paragraph-less
    fn review_snapshot() -> Value {
        let item = |texts: Vec<Value>| {
            json!({
                "tag": "oy-review-review-item",
                "text": "",
                "children": texts,
                "shadow": null
            })
        };
        json!({
            "tag": "oy-review-review-in-product",
            "text": "",
            "children": [],
            "shadow": {
                "tag": "",
                "text": "",
                "children": [
                    item(vec![json!({"tag": "span", "text": "5 stars", "children": [], "shadow": null})]),
                    item(vec![json!({"tag": "p", "text": "second", "children": [], "shadow": null})]),
                    item(vec![json!({"tag": "p", "text": "third", "children": [], "shadow": null})]),
                ],
                "shadow": null
            }
        })
    }

    /// Page on which no locator ever resolves
    struct BarrenPage;

    #[async_trait]
    impl PageScripting for BarrenPage {
        async fn eval(&self, _script: String) -> Result<Value> {
            Ok(Value::Bool(false))
        }
    }

    /// Page that answers every stage script of a healthy detail page
    struct ScriptedPage;

    #[async_trait]
    impl PageScripting for ScriptedPage {
        async fn eval(&self, script: String) -> Result<Value> {
            if script.contains("querySelectorAll('tr')") {
                return Ok(json!({
                    "화장품법에 따라 기재해야 하는 모든 성분": "정제수, 글리세린",
                    "용량": " 50\nml "
                }));
            }
            if script.contains("const MAX =") {
                return Ok(review_snapshot());
            }
            if script.contains("window.scrollTo") {
                return Ok(Value::Null);
            }
            if script == "document.body.scrollHeight" {
                return Ok(json!(1200));
            }
            // Probes and clicks all succeed
            Ok(Value::Bool(true))
        }
    }

    #[tokio::test]
    async fn test_unlocatable_disclosure_leaves_info_empty() {
        let config = fast_config();
        let stages = ExtractionStages::new(&config);
        let mut info = DetailInfo::default();

        stages.run(&BarrenPage, &mut info, 5).await.unwrap();

        assert!(info.full_info.is_empty());
        assert!(info.ingredients.is_empty());
        assert!(info.reviews.is_empty());
        assert!(info.extraction_error.is_none());
    }

    #[tokio::test]
    async fn test_full_stage_sequence() {
        let config = fast_config();
        let stages = ExtractionStages::new(&config);
        let mut info = DetailInfo::default();

        stages.run(&ScriptedPage, &mut info, 10).await.unwrap();

        assert_eq!(info.full_info.get("용량").map(String::as_str), Some("50 ml"));
        assert_eq!(info.ingredients, vec!["정제수", "글리세린"]);
        assert_eq!(info.reviews, vec!["second", "third"]);
        assert!(info.extraction_error.is_none());
    }

    #[tokio::test]
    async fn test_paragraph_less_item_does_not_use_a_review_slot() {
        let config = fast_config();
        let stages = ExtractionStages::new(&config);

        // Three items, the first without a paragraph; the cap applies to
        // the texts, so both remaining texts come back
        let reviews = stages.collect_reviews(&ScriptedPage, 2).await.unwrap();
        assert_eq!(reviews, vec!["second", "third"]);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n b\t c  "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("already clean"), "already clean");
    }

    #[test]
    fn test_split_ingredients() {
        assert_eq!(
            split_ingredients("정제수, 글리세린,  나이아신아마이드", ","),
            vec!["정제수", "글리세린", "나이아신아마이드"]
        );
        assert_eq!(
            split_ingredients("water,,oil,", ","),
            vec!["water", "oil"]
        );
        assert!(split_ingredients("", ",").is_empty());
    }

    #[test]
    fn test_snapshot_script_embeds_bounds() {
        let script = snapshot_script("oy-review-review-in-product", 300);
        assert!(script.contains("const MAX = 300;"));
        assert!(script.contains("document.querySelector(\"oy-review-review-in-product\")"));
        assert!(script.contains("node.shadowRoot"));
    }

    #[test]
    fn test_snapshot_output_feeds_the_walk() {
        // What the page script emits must deserialize into the walk's node
        // type and keep shadow subtrees reachable
        let root: DomNode = serde_json::from_value(review_snapshot()).unwrap();
        let items = collect_by_tag(&root, "oy-review-review-item", 300, usize::MAX);
        assert_eq!(items.len(), 3);

        // Review text is the item's first paragraph, not the whole subtree
        let texts: Vec<String> = items
            .into_iter()
            .filter_map(|item| find_first_by_tag(item, "p", 300))
            .map(|p| subtree_text(p, 300))
            .collect();
        assert_eq!(texts, vec!["second", "third"]);
    }
}
