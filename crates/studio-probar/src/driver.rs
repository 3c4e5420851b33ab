//! StudioDriver - Abstract Browser Automation Trait
//!
//! Page objects talk to the browser only through [`StudioDriver`]. Two
//! implementations exist:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StudioDriver (async trait)                                   │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────┐   ┌───────────────────────────┐  │
//! │  │  ChromiumDriver         │   │  MockDriver               │  │
//! │  │  (feature `browser`)    │   │  (unit tests)             │  │
//! │  │  CDP via chromiumoxide  │   │  in-memory fake DOM       │  │
//! │  └─────────────────────────┘   └───────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use crate::locator::{BoundingBox, Locator, Selector};
use crate::result::{StudioError, StudioResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What one resolution reports about one matched node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    /// Lower-case tag name
    pub tag: String,
    /// Rendered text content
    pub text: String,
    /// Current value for form controls
    pub value: Option<String>,
    /// All attributes
    pub attributes: BTreeMap<String, String>,
    /// Whether the node is rendered with a non-empty box
    pub visible: bool,
    /// Whether the `disabled` property is unset
    pub enabled: bool,
    /// Checked state for checkboxes and radios
    pub checked: bool,
    /// Box in page coordinates, if rendered
    pub bounding_box: Option<BoundingBox>,
    /// Whether the topmost node at the box centre is this node or a descendant
    pub receives_pointer: bool,
}

impl ElementSnapshot {
    /// Get an attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the `class` attribute contains `needle`
    #[must_use]
    pub fn class_contains(&self, needle: &str) -> bool {
        self.attribute("class").is_some_and(|c| c.contains(needle))
    }

    /// Enabled both natively and through the `data-enabled` flag
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.attribute("data-enabled") != Some("false")
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Timestamp when screenshot was taken
    pub timestamp: std::time::SystemTime,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: std::time::SystemTime::now(),
        }
    }

    /// Fill width and height from the PNG header, if present
    #[must_use]
    pub fn with_png_dimensions(mut self) -> Self {
        if self.data.len() >= 24 && self.data.starts_with(b"\x89PNG") {
            let read = |at: usize| {
                u32::from_be_bytes([
                    self.data[at],
                    self.data[at + 1],
                    self.data[at + 2],
                    self.data[at + 3],
                ])
            };
            self.width = read(16);
            self.height = read(20);
        }
        self
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot is valid (has data)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() && self.width > 0 && self.height > 0
    }
}

/// Abstract driver trait for browser automation
///
/// Every method re-queries the page; implementations must not cache nodes.
#[async_trait]
pub trait StudioDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> StudioResult<()>;

    /// Get current URL
    async fn current_url(&self) -> StudioResult<String>;

    /// Snapshot every node currently matching the selector
    async fn resolve(&self, selector: &Selector) -> StudioResult<Vec<ElementSnapshot>>;

    /// Click the first node matching the selector
    async fn click(&self, selector: &Selector) -> StudioResult<()>;

    /// Replace the value of the first node matching the selector
    async fn fill(&self, selector: &Selector, text: &str) -> StudioResult<()>;

    /// Take screenshot
    async fn screenshot(&self) -> StudioResult<Screenshot>;
}

// ============================================================================
// Mock driver
// ============================================================================

/// Element in the mock DOM
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    /// Tag name
    pub tag: String,
    /// Text content
    pub text: String,
    /// Form value
    pub value: Option<String>,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Rendered
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Checked
    pub checked: bool,
    /// Covered by another node at its centre
    pub obstructed: bool,
    /// Box in page coordinates
    pub bounding_box: BoundingBox,
    /// Descendants, keyed by the CSS used to scope into this element
    pub children: HashMap<String, Vec<MockElement>>,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: String::new(),
            value: None,
            attributes: BTreeMap::new(),
            visible: true,
            enabled: true,
            checked: false,
            obstructed: false,
            bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 20.0),
            children: HashMap::new(),
        }
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set form value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Mark as not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set checked state
    #[must_use]
    pub const fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Mark as covered by another node
    #[must_use]
    pub const fn obstructed(mut self) -> Self {
        self.obstructed = true;
        self
    }

    /// Add a descendant reachable through `css`
    #[must_use]
    pub fn child(mut self, css: impl Into<String>, element: Self) -> Self {
        self.children.entry(css.into()).or_default().push(element);
        self
    }

    /// Snapshot as the chromium driver would report it
    #[must_use]
    pub fn to_snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            tag: self.tag.clone(),
            text: self.text.clone(),
            value: self.value.clone(),
            attributes: self.attributes.clone(),
            visible: self.visible,
            enabled: self.enabled,
            checked: self.checked,
            bounding_box: self.visible.then_some(self.bounding_box),
            receives_pointer: self.visible && !self.obstructed,
        }
    }
}

/// In-memory DOM backing [`MockDriver`]
#[derive(Debug, Default)]
pub struct MockDom {
    elements: HashMap<String, Vec<MockElement>>,
    frames: HashMap<String, VecDeque<Vec<MockElement>>>,
    history: Vec<String>,
    url: String,
}

impl MockDom {
    /// Replace the matches of a locator
    pub fn set(&mut self, locator: &Locator, elements: Vec<MockElement>) {
        let key = locator.key();
        let _ = self.frames.remove(&key);
        let _ = self.elements.insert(key, elements);
    }

    /// Remove every match of a locator
    pub fn clear(&mut self, locator: &Locator) {
        let key = locator.key();
        let _ = self.frames.remove(&key);
        let _ = self.elements.remove(&key);
    }

    /// Queue successive resolutions; the last frame repeats forever
    pub fn push_frames(&mut self, locator: &Locator, frames: Vec<Vec<MockElement>>) {
        self.frames
            .entry(locator.key())
            .or_default()
            .extend(frames);
    }

    /// Mutable access to the registered matches of a locator
    pub fn get_mut(&mut self, locator: &Locator) -> Option<&mut Vec<MockElement>> {
        self.elements.get_mut(&locator.key())
    }

    /// Current matches of a locator
    pub fn resolve(&mut self, selector: &Selector) -> Vec<MockElement> {
        let key = selector.key();
        if let Some(queue) = self.frames.get_mut(&key) {
            if queue.len() > 1 {
                if let Some(frame) = queue.pop_front() {
                    return frame;
                }
            }
            if let Some(last) = queue.front() {
                return last.clone();
            }
        }
        if let Some(found) = self.elements.get(&key) {
            return found.clone();
        }
        match selector {
            Selector::Nth { inner, index } => {
                self.resolve(inner).into_iter().nth(*index).into_iter().collect()
            }
            Selector::Scoped { parent, child } => self
                .resolve(parent)
                .into_iter()
                .flat_map(|p| p.children.get(child).cloned().unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Record a call
    pub fn record(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
    }
}

type Reaction = Box<dyn FnMut(&mut MockDom) + Send>;

struct MockState {
    dom: MockDom,
    reactions: HashMap<String, Vec<Reaction>>,
    screenshot: Option<Screenshot>,
}

/// Mock driver for unit testing
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver").finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                dom: MockDom::default(),
                reactions: HashMap::new(),
                screenshot: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure against the DOM
    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MockDom) -> R) -> R {
        f(&mut self.lock().dom)
    }

    /// Replace the matches of a locator
    pub fn set(&self, locator: &Locator, elements: Vec<MockElement>) {
        self.with_dom(|dom| dom.set(locator, elements));
    }

    /// Queue successive resolutions for a locator
    pub fn push_frames(&self, locator: &Locator, frames: Vec<Vec<MockElement>>) {
        self.with_dom(|dom| dom.push_frames(locator, frames));
    }

    /// Run `reaction` every time `locator` is clicked
    pub fn on_click(&self, locator: &Locator, reaction: impl FnMut(&mut MockDom) + Send + 'static) {
        self.lock()
            .reactions
            .entry(locator.key())
            .or_default()
            .push(Box::new(reaction));
    }

    /// Set mock screenshot
    pub fn set_screenshot(&self, screenshot: Screenshot) {
        self.lock().screenshot = Some(screenshot);
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().dom.history.clone()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().dom.history.iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl StudioDriver for MockDriver {
    async fn navigate(&self, url: &str) -> StudioResult<()> {
        let mut state = self.lock();
        state.dom.record(format!("navigate:{url}"));
        state.dom.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> StudioResult<String> {
        Ok(self.lock().dom.url.clone())
    }

    async fn resolve(&self, selector: &Selector) -> StudioResult<Vec<ElementSnapshot>> {
        Ok(self
            .lock()
            .dom
            .resolve(selector)
            .iter()
            .map(MockElement::to_snapshot)
            .collect())
    }

    async fn click(&self, selector: &Selector) -> StudioResult<()> {
        let key = selector.key();
        let mut guard = self.lock();
        let MockState { dom, reactions, .. } = &mut *guard;
        if dom.resolve(selector).is_empty() {
            return Err(StudioError::ElementNotFound { selector: key });
        }
        dom.record(format!("click:{key}"));
        if let Some(handlers) = reactions.get_mut(&key) {
            for handler in handlers.iter_mut() {
                handler(dom);
            }
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> StudioResult<()> {
        let key = selector.key();
        let mut state = self.lock();
        if state.dom.resolve(selector).is_empty() {
            return Err(StudioError::ElementNotFound { selector: key });
        }
        state.dom.record(format!("fill:{key}={text}"));
        if let Some(first) = state
            .dom
            .elements
            .get_mut(&key)
            .and_then(|els| els.first_mut())
        {
            first.value = Some(text.to_string());
        }
        Ok(())
    }

    async fn screenshot(&self) -> StudioResult<Screenshot> {
        let mut state = self.lock();
        state.dom.record("screenshot");
        Ok(state
            .screenshot
            .clone()
            .unwrap_or_else(|| Screenshot::new(vec![0x89, 0x50, 0x4E, 0x47], 1, 1)))
    }
}
