//! Page-element locators and the scripts that resolve them
//!
//! Every interactive control on a detail page is found through an ordered
//! list of locators: a structural CSS selector first, then a positional
//! XPath fallback for when a markup change breaks the structural one. Each
//! locator variant compiles to small scripts evaluated in the page; the
//! scripts resolve the element the same way regardless of variant, so the
//! caller only sees "found" or "not found".

use std::fmt;

/// One way of finding an element in the live page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector tied to the page's structure (classes, attributes)
    Structural(String),
    /// XPath tied to the page's element positions
    Positional(String),
}

impl Locator {
    /// JS expression resolving this locator to an element or `null`
    fn resolve_expr(&self) -> String {
        match self {
            Locator::Structural(css) => format!("document.querySelector({:?})", css),
            Locator::Positional(xpath) => format!(
                "document.evaluate({:?}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                xpath
            ),
        }
    }

    /// Script returning `true` when the element is present
    pub fn probe_script(&self) -> String {
        format!("(() => {{ return {} !== null; }})()", self.resolve_expr())
    }

    /// Script that scrolls the element into view and clicks it
    ///
    /// Returns `true` when the click landed, `false` when the element was
    /// not found.
    pub fn click_script(&self) -> String {
        format!(
            "(() => {{\n\
               const el = {};\n\
               if (el === null) return false;\n\
               el.scrollIntoView({{ block: 'center' }});\n\
               el.click();\n\
               return true;\n\
             }})()",
            self.resolve_expr()
        )
    }

    /// Script reading label/value rows out of the element's subtree
    ///
    /// Pairs each `th` with the `td` beside it and returns them as a JSON
    /// object, or `null` when the element is not found.
    pub fn rows_script(&self) -> String {
        format!(
            "(() => {{\n\
               const el = {};\n\
               if (el === null) return null;\n\
               const rows = {{}};\n\
               for (const tr of el.querySelectorAll('tr')) {{\n\
                 const th = tr.querySelector('th');\n\
                 const td = tr.querySelector('td');\n\
                 if (th && td) rows[th.textContent] = td.textContent;\n\
               }}\n\
               return rows;\n\
             }})()",
            self.resolve_expr()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Structural(css) => write!(f, "css '{}'", css),
            Locator::Positional(xpath) => write!(f, "xpath '{}'", xpath),
        }
    }
}
