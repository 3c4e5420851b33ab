//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a query descriptor, not a node handle: building one does
//! no I/O, and every read or action re-resolves it against the live DOM.
//!
//! # Design Philosophy
//!
//! - **Deferred**: resolution happens in [`Locator::resolve`], on every call
//! - **Lenient**: a locator that matches nothing is valid, it just resolves empty
//! - **Composable**: `locator(child)`, `nth(i)` and `with_text(t)` derive new locators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::driver::{ElementSnapshot, StudioDriver};
use crate::result::{StudioError, StudioResult};

/// Default timeout for expectations built from a locator (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for expectations (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// A point in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box for an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside this bounding box
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Whether the box has a drawable area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
    /// Descendants of every match of `parent` that match `child`
    Scoped {
        /// Outer selector
        parent: Box<Selector>,
        /// CSS selector evaluated inside each parent match
        child: String,
    },
    /// The `index`-th match of `inner`, or nothing
    Nth {
        /// Selector being indexed
        inner: Box<Selector>,
        /// Zero-based index
        index: usize,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// JavaScript expression evaluating to an `Array` of matched elements
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::TestId(id) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_string(&format!("[data-testid=\"{id}\"]"))
            ),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => (el.textContent || '').includes({}))",
                js_string(css),
                js_string(text)
            ),
            Self::Scoped { parent, child } => format!(
                "({}).flatMap(p => Array.from(p.querySelectorAll({})))",
                parent.to_query_all(),
                js_string(child)
            ),
            Self::Nth { inner, index } => format!(
                "((els) => els.length > {index} ? [els[{index}]] : [])({})",
                inner.to_query_all()
            ),
        }
    }

    /// Canonical key for diagnostics and for the mock DOM
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::TestId(id) => write!(f, "[data-testid=\"{id}\"]"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
            Self::Scoped { parent, child } => write!(f, "{parent} >> {child}"),
            Self::Nth { inner, index } => write!(f, "{inner} >> nth={index}"),
        }
    }
}

/// Quote a string as a JavaScript string literal
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

/// Locator options for customizing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for expectations built from this locator
    pub timeout: Duration,
    /// Polling interval for expectations built from this locator
    pub poll_interval: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// A deferred reference to zero or more DOM nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// The selector for finding elements
    selector: Selector,
    /// Options for locator behavior
    options: LocatorOptions,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            options: LocatorOptions::default(),
        }
    }

    /// Create a locator on the `data-testid` attribute
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Filter by text content
    ///
    /// Only CSS locators can be text-filtered; other forms are returned as-is.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let selector = match self.selector {
            Selector::Css(css) => Selector::CssWithText {
                css,
                text: text.into(),
            },
            other => other,
        };
        Self {
            selector,
            options: self.options,
        }
    }

    /// Descendants matching `child` inside every match of this locator
    #[must_use]
    pub fn locator(&self, child: impl Into<String>) -> Self {
        Self {
            selector: Selector::Scoped {
                parent: Box::new(self.selector.clone()),
                child: child.into(),
            },
            options: self.options,
        }
    }

    /// The `index`-th match (zero-based)
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self {
            selector: Selector::Nth {
                inner: Box::new(self.selector.clone()),
                index,
            },
            options: self.options,
        }
    }

    /// The first match
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Set a custom timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Set a custom polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Canonical selector key
    #[must_use]
    pub fn key(&self) -> String {
        self.selector.key()
    }

    /// Query the live DOM for every current match
    pub async fn resolve(&self, driver: &dyn StudioDriver) -> StudioResult<Vec<ElementSnapshot>> {
        driver.resolve(&self.selector).await
    }

    /// Number of current matches
    pub async fn count(&self, driver: &dyn StudioDriver) -> StudioResult<usize> {
        Ok(self.resolve(driver).await?.len())
    }

    /// Snapshot of the first match, if any
    pub async fn snapshot(&self, driver: &dyn StudioDriver) -> StudioResult<Option<ElementSnapshot>> {
        Ok(self.resolve(driver).await?.into_iter().next())
    }

    /// Snapshot of the first match, or `ElementNotFound`
    pub async fn require(&self, driver: &dyn StudioDriver) -> StudioResult<ElementSnapshot> {
        self.snapshot(driver)
            .await?
            .ok_or_else(|| StudioError::ElementNotFound { selector: self.key() })
    }

    /// Whether any match is visible
    pub async fn is_visible(&self, driver: &dyn StudioDriver) -> StudioResult<bool> {
        Ok(self.resolve(driver).await?.iter().any(|el| el.visible))
    }

    /// Attribute of the first match
    pub async fn attribute(
        &self,
        driver: &dyn StudioDriver,
        name: &str,
    ) -> StudioResult<Option<String>> {
        Ok(self
            .snapshot(driver)
            .await?
            .and_then(|el| el.attribute(name).map(str::to_string)))
    }

    /// Trimmed text content of the first match
    pub async fn text(&self, driver: &dyn StudioDriver) -> StudioResult<Option<String>> {
        Ok(self
            .snapshot(driver)
            .await?
            .map(|el| el.text.trim().to_string()))
    }

    /// Click the first match
    pub async fn click(&self, driver: &dyn StudioDriver) -> StudioResult<()> {
        driver.click(&self.selector).await
    }

    /// Replace the value of the first match
    pub async fn fill(&self, driver: &dyn StudioDriver, text: &str) -> StudioResult<()> {
        driver.fill(&self.selector, text).await
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.selector.fmt(f)
    }
}

/// Composite key of one contract-test row.
///
/// The parts are free-form strings; nothing checks them against the loaded
/// API document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    /// Request path, e.g. `/pets/{id}`
    pub path: String,
    /// HTTP method, e.g. `GET`
    pub method: String,
    /// Response code, e.g. `200`
    pub response: String,
}

impl RowKey {
    /// Create a new row key
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        method: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            response: response.into(),
        }
    }

    /// CSS fragment matching a `tr` carrying all three key cells
    #[must_use]
    pub fn row_filter(&self) -> String {
        format!(
            ":has(> td[data-key=\"path\"][data-value=\"{}\"]):has(> td[data-key=\"method\"][data-value=\"{}\"]):has(> td[data-key=\"response\"][data-value=\"{}\"])",
            css_escape(&self.path),
            css_escape(&self.method),
            css_escape(&self.response)
        )
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.path, self.response)
    }
}

/// Escape a value for use inside a double-quoted CSS attribute selector
fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let query = Selector::css("button.primary").to_query_all();
            assert!(query.contains("querySelectorAll"));
            assert!(query.contains("\"button.primary\""));
        }

        #[test]
        fn test_test_id_query() {
            let selector = Selector::test_id("score");
            assert!(selector.to_query_all().contains("data-testid"));
            assert_eq!(selector.key(), "[data-testid=\"score\"]");
        }

        #[test]
        fn test_scoped_query_nests_parent() {
            let selector = Selector::Scoped {
                parent: Box::new(Selector::css("tr")),
                child: "input".into(),
            };
            let query = selector.to_query_all();
            assert!(query.contains("flatMap"));
            assert!(query.contains("\"tr\""));
            assert!(query.contains("\"input\""));
            assert_eq!(selector.key(), "tr >> input");
        }

        #[test]
        fn test_nth_query() {
            let selector = Selector::Nth {
                inner: Box::new(Selector::css("li")),
                index: 3,
            };
            assert!(selector.to_query_all().contains("els.length > 3"));
            assert_eq!(selector.key(), "li >> nth=3");
        }

        #[test]
        fn test_text_filter_is_escaped() {
            let selector = Selector::CssWithText {
                css: "span".into(),
                text: "say \"hi\"".into(),
            };
            assert!(selector.to_query_all().contains("\\\"hi\\\""));
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_derived_locators_compose() {
            let cell = Locator::new("tbody tr").nth(2).locator("td[data-key=\"result\"]");
            assert_eq!(cell.key(), "tbody tr >> nth=2 >> td[data-key=\"result\"]");
        }

        #[test]
        fn test_first_is_nth_zero() {
            let locator = Locator::new("li");
            assert_eq!(locator.first(), locator.nth(0));
        }

        #[test]
        fn test_with_text_only_on_css() {
            let css = Locator::new("button").with_text("Run");
            assert!(matches!(css.selector(), Selector::CssWithText { .. }));

            let scoped = Locator::new("form").locator("button").with_text("Run");
            assert!(matches!(scoped.selector(), Selector::Scoped { .. }));
        }

        #[test]
        fn test_options_carry_through_derivation() {
            let locator = Locator::new("li")
                .with_timeout(Duration::from_secs(9))
                .with_poll_interval(Duration::from_millis(20));
            let derived = locator.nth(1).locator("span");
            assert_eq!(derived.options().timeout, Duration::from_secs(9));
            assert_eq!(derived.options().poll_interval, Duration::from_millis(20));
        }
    }

    mod row_key_tests {
        use super::*;

        #[test]
        fn test_display() {
            let key = RowKey::new("/pets", "GET", "200");
            assert_eq!(key.to_string(), "GET /pets -> 200");
        }

        #[test]
        fn test_row_filter_contains_all_parts() {
            let filter = RowKey::new("/pets/{id}", "DELETE", "404").row_filter();
            assert!(filter.contains("[data-value=\"/pets/{id}\"]"));
            assert!(filter.contains("[data-value=\"DELETE\"]"));
            assert!(filter.contains("[data-value=\"404\"]"));
        }

        #[test]
        fn test_row_filter_escapes_quotes() {
            let filter = RowKey::new("/a\"b", "GET", "200").row_filter();
            assert!(filter.contains("/a\\\"b"));
        }
    }

    mod bounding_box_tests {
        use super::*;

        #[test]
        fn test_center_and_contains() {
            let bbox = BoundingBox::new(10.0, 20.0, 100.0, 40.0);
            let center = bbox.center();
            assert_eq!(center, Point::new(60.0, 40.0));
            assert!(bbox.contains(&center));
            assert!(!bbox.contains(&Point::new(0.0, 0.0)));
        }

        #[test]
        fn test_is_empty() {
            assert!(BoundingBox::new(0.0, 0.0, 0.0, 10.0).is_empty());
            assert!(!BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_empty());
        }
    }
}
