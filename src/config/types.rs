use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for shelfrank
///
/// Every field defaults to the values the target catalog needs, so the
/// binary runs without a config file; a TOML file overrides per-section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub listing: ListingConfig,
    pub detail: DetailConfig,
    pub output: OutputConfig,
}

/// HTTP fetcher behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Referer header sent with every request
    pub referer: String,

    /// Minimum interval between issued requests (milliseconds)
    pub rate_limit_ms: u64,

    /// Maximum automatic retries on transient failures
    pub max_retries: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    pub backoff_base_ms: u64,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://www.oliveyoung.co.kr/".to_string(),
            rate_limit_ms: 1000,
            max_retries: 3,
            backoff_base_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl FetcherConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Listing-page endpoint and extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ListingConfig {
    /// Store origin, no trailing slash
    pub base_url: String,

    /// Path of the paginated ranking endpoint
    pub best_list_path: String,

    /// Path of the detail endpoint (takes a `goodsNo` query parameter)
    pub detail_path: String,

    /// Category label stamped onto every record
    pub category: String,

    /// Fixed query parameters sent with every listing fetch; the page index
    /// parameter is appended per request
    pub params: BTreeMap<String, String>,

    /// Name of the 1-based page index query parameter
    pub page_param: String,

    /// Host prepended to host-less image paths
    pub image_host: String,

    pub selectors: ListingSelectors,
}

impl Default for ListingConfig {
    fn default() -> Self {
        let mut params = BTreeMap::new();
        params.insert("dispCatNo".to_string(), "900000100100001".to_string());
        params.insert("fltDispCatNo".to_string(), "10000010001".to_string());
        params.insert("rowsPerPage".to_string(), "8".to_string());
        params.insert("t_page".to_string(), "랭킹".to_string());
        params.insert("t_click".to_string(), "판매랭킹_스킨케어".to_string());

        Self {
            base_url: "https://www.oliveyoung.co.kr".to_string(),
            best_list_path: "/store/main/getBestList.do".to_string(),
            detail_path: "/store/goods/getGoodsDetail.do".to_string(),
            category: "스킨케어".to_string(),
            params,
            page_param: "pageIdx".to_string(),
            image_host: "https://image.oliveyoung.co.kr".to_string(),
            selectors: ListingSelectors::default(),
        }
    }
}

impl ListingConfig {
    /// Full URL of the paginated listing endpoint
    pub fn listing_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.best_list_path)
    }

    /// Absolute detail-page URL for a goods identifier
    pub fn detail_url(&self, goods_no: &str) -> String {
        format!("{}{}?goodsNo={}", self.base_url, self.detail_path, goods_no)
    }

    /// Query parameters for one listing page
    pub fn page_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.push((self.page_param.clone(), page.to_string()));
        params
    }
}

/// CSS selectors for the parts of a listing item container
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ListingSelectors {
    /// Item container selector
    pub container: String,
    /// Product name selector within the container
    pub name: String,
    /// Brand selector within the container
    pub brand: String,
    /// Price selector within the container
    pub price: String,
    /// Rating selector within the container
    pub rating: String,
    /// Primary link selector within the container
    pub link: String,
    /// Image selector within the container
    pub image: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: "div.prd_info".to_string(),
            name: "p.tx_name".to_string(),
            brand: "span.tx_brand".to_string(),
            price: "span.tx_cur".to_string(),
            rating: "span.rating".to_string(),
            link: "a".to_string(),
            image: "img".to_string(),
        }
    }
}

/// Browser-session extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetailConfig {
    /// Run the browser without a visible window
    pub headless: bool,

    /// Pause after navigation and after each activation, for client-side
    /// rendering to settle (milliseconds)
    pub settle_ms: u64,

    /// Per-locator wait budget when resolving a control (milliseconds)
    pub locator_wait_ms: u64,

    /// Poll interval while a locator wait budget runs down (milliseconds)
    pub locator_poll_ms: u64,

    /// Pause after each scroll step of the lazy-load drain (milliseconds)
    pub scroll_settle_ms: u64,

    /// Maximum scroll-to-bottom iterations per item
    pub max_scroll_attempts: u32,

    /// Depth ceiling for the encapsulation-crossing tree walk
    pub max_walk_depth: usize,

    /// Pause between items during batch enrichment (milliseconds)
    pub item_pause_ms: u64,

    /// Disclosure row label whose value holds the ingredient list
    pub ingredients_label: String,

    /// Token delimiter within the ingredient value
    pub ingredient_delimiter: String,

    /// Structural locator for the collapsed disclosure control
    pub disclosure_button_css: String,
    /// Positional fallback for the collapsed disclosure control
    pub disclosure_button_xpath: String,

    /// Structural locator for the revealed disclosure table container
    pub disclosure_table_css: String,
    /// Positional fallback for the revealed disclosure table container
    pub disclosure_table_xpath: String,

    /// Structural locator for the review tab control
    pub review_tab_css: String,
    /// Positional fallback for the review tab control
    pub review_tab_xpath: String,

    /// Selector of the review-list container (light DOM)
    pub review_list_selector: String,

    /// Tag name of one review item inside the encapsulated subtrees
    pub review_item_tag: String,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            headless: true,
            settle_ms: 2000,
            locator_wait_ms: 5000,
            locator_poll_ms: 250,
            scroll_settle_ms: 1000,
            max_scroll_attempts: 20,
            max_walk_depth: 300,
            item_pause_ms: 1000,
            ingredients_label: "화장품법에 따라 기재해야 하는 모든 성분".to_string(),
            ingredient_delimiter: ",".to_string(),
            disclosure_button_css: "button.Accordion_accordion-btn__IYjKm".to_string(),
            disclosure_button_xpath: "//*[@id=\"tab-panels\"]/section/ul/li[1]/button".to_string(),
            disclosure_table_css: ".Accordion_content__aIya4".to_string(),
            disclosure_table_xpath: "//*[@id=\"tab-panels\"]/section/ul/li[1]/div".to_string(),
            review_tab_css: "button[class*=\"GoodsDetailTabs_tab-item\"]:nth-child(2)".to_string(),
            review_tab_xpath:
                "//*[@id=\"main\"]/div[2]/div/div[3]/div[2]/div[1]/div/div/button[1]".to_string(),
            review_list_selector: "oy-review-review-in-product".to_string(),
            review_item_tag: "oy-review-review-item".to_string(),
        }
    }
}

impl DetailConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn locator_wait(&self) -> Duration {
        Duration::from_millis(self.locator_wait_ms)
    }

    pub fn locator_poll(&self) -> Duration {
        Duration::from_millis(self.locator_poll_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn item_pause(&self) -> Duration {
        Duration::from_millis(self.item_pause_ms)
    }
}

/// Output locations and export behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory all exports land in (created if missing)
    pub dir: String,

    /// CSV filename inside the output directory
    pub csv_filename: String,

    /// SQLite filename inside the output directory
    pub db_filename: String,

    /// Image subdirectory inside the output directory
    pub images_dir: String,

    /// Download product images during a run
    pub download_images: bool,

    /// Route image downloads through the shared rate-limit clock
    pub rate_limit_images: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            csv_filename: "products.csv".to_string(),
            db_filename: "products.db".to_string(),
            images_dir: "images".to_string(),
            download_images: true,
            rate_limit_images: true,
        }
    }
}

impl OutputConfig {
    pub fn csv_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.dir).join(&self.csv_filename)
    }

    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.dir).join(&self.db_filename)
    }

    pub fn images_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.dir).join(&self.images_dir)
    }
}
