//! Spec browser: the specification tree and the tab bar of an opened spec.

use crate::assertion::expect;
use crate::context::StudioContext;
use crate::driver::StudioDriver;
use crate::locator::Locator;
use crate::page_object::{click_when_actionable, PageObject};
use crate::result::StudioResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tabs of an opened specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudioTab {
    /// Specification source
    Spec,
    /// Contract tests
    Test,
    /// Mock server
    Mock,
    /// Examples
    Examples,
    /// Spec configuration
    Config,
}

impl StudioTab {
    /// Every tab, in bar order
    pub const ALL: [Self; 5] = [Self::Spec, Self::Test, Self::Mock, Self::Examples, Self::Config];

    /// `data-key` of the tab
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Test => "test",
            Self::Mock => "mock",
            Self::Examples => "examples",
            Self::Config => "config",
        }
    }

    /// Tab with this `data-key`
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.key() == key)
    }
}

impl fmt::Display for StudioTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Locators of the spec browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecBrowserLocators;

impl SpecBrowserLocators {
    /// Specification tree
    #[must_use]
    pub fn tree(self) -> Locator {
        Locator::new("#spec-tree")
    }

    /// Every file entry in the tree
    #[must_use]
    pub fn spec_files(self) -> Locator {
        Locator::new("#spec-tree li[data-type=\"file\"]")
    }

    /// File entry by name
    #[must_use]
    pub fn spec_file(self, name: &str) -> Locator {
        Locator::new(format!("#spec-tree li[data-type=\"file\"][data-key=\"{name}\"]"))
    }

    /// Tab bar, shown once a spec is open
    #[must_use]
    pub fn tab_bar(self) -> Locator {
        Locator::new("#tabs")
    }

    /// One tab
    #[must_use]
    pub fn tab(self, tab: StudioTab) -> Locator {
        Locator::new(format!("#tabs li[data-type=\"tab\"][data-key=\"{}\"]", tab.key()))
    }

    /// Currently active tab
    #[must_use]
    pub fn active_tab(self) -> Locator {
        Locator::new("#tabs li[data-type=\"tab\"][data-active=\"true\"]")
    }

    /// Rendered specification source
    #[must_use]
    pub fn content(self) -> Locator {
        Locator::new("#spec-content")
    }
}

/// Spec browser page
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecBrowserPage {
    locators: SpecBrowserLocators,
}

impl PageObject for SpecBrowserPage {
    fn name(&self) -> &'static str {
        "spec browser"
    }

    fn route(&self) -> &str {
        "/"
    }

    fn ready_marker(&self) -> Locator {
        self.locators.tree()
    }
}

impl SpecBrowserPage {
    /// Create the page object
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locators: SpecBrowserLocators,
        }
    }

    /// Locator registry
    #[must_use]
    pub const fn locators(&self) -> SpecBrowserLocators {
        self.locators
    }

    /// Names of the listed specifications
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn spec_names(&self, driver: &dyn StudioDriver) -> StudioResult<Vec<String>> {
        Ok(self
            .locators
            .spec_files()
            .resolve(driver)
            .await?
            .into_iter()
            .map(|el| {
                el.attribute("data-key")
                    .map_or_else(|| el.text.trim().to_string(), str::to_string)
            })
            .collect())
    }

    /// Open a specification and wait for its tab bar
    ///
    /// # Errors
    ///
    /// Returns error if the entry cannot be clicked or the tabs never show
    pub async fn open_spec(&self, ctx: &mut StudioContext, name: &str) -> StudioResult<()> {
        click_when_actionable(ctx, &self.locators.spec_file(name), &format!("spec {name}")).await?;
        let options = ctx.timeouts().action();
        let tabs = self.locators.tab_bar();
        let shown = expect(ctx.driver(), &tabs)
            .with_options(options)
            .to_be_visible()
            .await;
        ctx.enrich(&format!("open spec {name}"), shown).await?;
        ctx.note(format!("opened spec {name}"));
        Ok(())
    }

    /// Switch tab and wait until it is active
    ///
    /// # Errors
    ///
    /// Returns error if the tab cannot be clicked or never activates
    pub async fn select_tab(&self, ctx: &mut StudioContext, tab: StudioTab) -> StudioResult<()> {
        let locator = self.locators.tab(tab);
        click_when_actionable(ctx, &locator, &format!("{tab} tab")).await?;
        let options = ctx.timeouts().action();
        let active = expect(ctx.driver(), &locator)
            .with_options(options)
            .to_have_attribute("data-active", "true")
            .await;
        ctx.enrich(&format!("select {tab} tab"), active).await
    }

    /// Active tab, if any
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn active_tab(&self, driver: &dyn StudioDriver) -> StudioResult<Option<StudioTab>> {
        Ok(self
            .locators
            .active_tab()
            .attribute(driver, "data-key")
            .await?
            .as_deref()
            .and_then(StudioTab::from_key))
    }

    /// Rendered source of the open specification
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn spec_content(&self, driver: &dyn StudioDriver) -> StudioResult<Option<String>> {
        self.locators.content().text(driver).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::page_object;
    use crate::testing::Studio;

    #[test]
    fn test_tab_keys_round_trip() {
        for tab in StudioTab::ALL {
            assert_eq!(StudioTab::from_key(tab.key()), Some(tab));
        }
        assert_eq!(StudioTab::from_key("billing"), None);
    }

    #[tokio::test]
    async fn test_open_spec_and_switch_tabs() {
        let studio = Studio::new();
        let mut ctx = studio.context();
        let page = SpecBrowserPage::new();
        page_object::open(&mut ctx, &page).await.unwrap();

        let names = page.spec_names(studio.driver()).await.unwrap();
        assert!(names.contains(&Studio::SPEC_FILE.to_string()));
        assert_eq!(page.active_tab(studio.driver()).await.unwrap(), None);

        page.open_spec(&mut ctx, Studio::SPEC_FILE).await.unwrap();
        assert_eq!(page.active_tab(studio.driver()).await.unwrap(), Some(StudioTab::Spec));
        assert!(page
            .spec_content(studio.driver())
            .await
            .unwrap()
            .unwrap()
            .starts_with("openapi:"));

        page.select_tab(&mut ctx, StudioTab::Mock).await.unwrap();
        assert_eq!(page.active_tab(studio.driver()).await.unwrap(), Some(StudioTab::Mock));
    }

    #[tokio::test]
    async fn test_open_unknown_spec_is_precondition() {
        let studio = Studio::new();
        let mut ctx = studio.context();
        let err = SpecBrowserPage::new()
            .open_spec(&mut ctx, "missing.yaml")
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }
}
