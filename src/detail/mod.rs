//! Detail-page enrichment
//!
//! Everything that needs a live browser lives here: the managed session,
//! the locator scripts, the extractor that walks a detail page through its
//! disclosure and review stages, and the encapsulation-crossing tree
//! search the review stage relies on.

mod extractor;
mod locator;
mod session;
mod walk;

pub use extractor::{
    collapse_whitespace, split_ingredients, DetailExtractor, DetailSource, PageScripting,
};
pub use locator::Locator;
pub use session::BrowserSession;
pub use walk::{collect_by_tag, find_first_by_tag, subtree_text, DomNode, TreeNode};
