//! Spec config page: the YAML editor attached to an opened specification.

use crate::context::StudioContext;
use crate::driver::StudioDriver;
use crate::locator::Locator;
use crate::page_object::{click_when_actionable, AlertBanner, PageObject};
use crate::result::StudioResult;

/// Locators of the spec config page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecConfigLocators;

impl SpecConfigLocators {
    /// Page container
    #[must_use]
    pub fn page(self) -> Locator {
        Locator::new("#spec-config")
    }

    /// Editor
    #[must_use]
    pub fn editor(self) -> Locator {
        Locator::new("#spec-config textarea")
    }

    /// Save button
    #[must_use]
    pub fn save_button(self) -> Locator {
        Locator::new("#spec-config button[data-action=\"save\"]")
    }

    /// Reset button
    #[must_use]
    pub fn reset_button(self) -> Locator {
        Locator::new("#spec-config button[data-action=\"reset\"]")
    }
}

/// Spec config page
#[derive(Debug, Clone, Default)]
pub struct SpecConfigPage {
    locators: SpecConfigLocators,
    alert: AlertBanner,
}

impl PageObject for SpecConfigPage {
    fn name(&self) -> &'static str {
        "spec config"
    }

    fn route(&self) -> &str {
        "/spec-config"
    }

    fn ready_marker(&self) -> Locator {
        self.locators.editor()
    }
}

impl SpecConfigPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator registry
    #[must_use]
    pub const fn locators(&self) -> SpecConfigLocators {
        self.locators
    }

    /// Current editor contents
    ///
    /// # Errors
    ///
    /// Returns error if the editor is missing
    pub async fn config_text(&self, driver: &dyn StudioDriver) -> StudioResult<String> {
        let editor = self.locators.editor().require(driver).await?;
        Ok(editor.value.unwrap_or(editor.text))
    }

    /// Replace the editor contents
    ///
    /// # Errors
    ///
    /// Returns error if the editor is missing
    pub async fn replace_config(&self, ctx: &mut StudioContext, text: &str) -> StudioResult<()> {
        let filled = self.locators.editor().fill(ctx.driver(), text).await;
        ctx.enrich("edit spec config", filled).await
    }

    /// Save and return the confirmation alert
    ///
    /// # Errors
    ///
    /// Returns error if the button cannot be clicked or no alert shows
    pub async fn save(&self, ctx: &mut StudioContext) -> StudioResult<String> {
        click_when_actionable(ctx, &self.locators.save_button(), "save config button").await?;
        let options = ctx.timeouts().action();
        let message = self.alert.wait_for_message(ctx.driver(), &options).await;
        let message = ctx.enrich("save spec config", message).await?;
        ctx.note(format!("config saved: {message}"));
        let dismissed = self.alert.dismiss(ctx.driver()).await;
        ctx.enrich("dismiss alert", dismissed).await?;
        Ok(message)
    }

    /// Discard unsaved edits
    ///
    /// # Errors
    ///
    /// Returns error if the button cannot be clicked
    pub async fn reset(&self, ctx: &mut StudioContext) -> StudioResult<()> {
        click_when_actionable(ctx, &self.locators.reset_button(), "reset config button").await
    }
}
