//! Example generation page.

use crate::aggregate::{parse_count, VALUE_ATTRIBUTE};
use crate::assertion::expect;
use crate::context::StudioContext;
use crate::driver::StudioDriver;
use crate::locator::{Locator, RowKey};
use crate::page_object::{click_when_actionable, PageObject};
use crate::result::StudioResult;
use crate::wait::RunStatePoller;
use serde::{Deserialize, Serialize};

/// Counters of the examples summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleTotals {
    /// Examples generated
    pub generated: u64,
    /// Examples that validated
    pub valid: u64,
    /// Examples that failed validation
    pub invalid: u64,
}

/// Locators of the example generation page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExampleLocators;

impl ExampleLocators {
    /// Page container
    #[must_use]
    pub fn page(self) -> Locator {
        Locator::new("#examples")
    }

    /// Row of an operation
    #[must_use]
    pub fn row(self, key: &RowKey) -> Locator {
        Locator::new(format!("#examples table tbody tr{}", key.row_filter()))
    }

    /// Per-row generate button
    #[must_use]
    pub fn generate_button(self, key: &RowKey) -> Locator {
        self.row(key).locator("button[data-action=\"generate\"]")
    }

    /// Link to a row's generated example
    #[must_use]
    pub fn example_link(self, key: &RowKey) -> Locator {
        self.row(key).locator("a[data-type=\"example\"]")
    }

    /// Validation verdict of a row
    #[must_use]
    pub fn validation(self, key: &RowKey) -> Locator {
        self.row(key).locator("[data-type=\"validation\"]")
    }

    /// Generate-all button
    #[must_use]
    pub fn bulk_generate_button(self) -> Locator {
        Locator::new("#examples button[data-action=\"bulk-generate\"]")
    }

    /// Validate-all button
    #[must_use]
    pub fn validate_button(self) -> Locator {
        Locator::new("#examples button[data-action=\"validate\"]")
    }

    /// Running flag of bulk jobs
    #[must_use]
    pub fn job_status(self) -> Locator {
        Locator::new("#examples [data-running]")
    }

    /// Summary counter (`generated`, `valid` or `invalid`)
    #[must_use]
    pub fn summary_counter(self, kind: &str) -> Locator {
        Locator::new(format!("#examples-summary li[data-type=\"{kind}\"]"))
    }
}

/// Example generation page
#[derive(Debug, Clone)]
pub struct ExampleGenerationPage {
    locators: ExampleLocators,
    jobs: RunStatePoller,
}

impl Default for ExampleGenerationPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PageObject for ExampleGenerationPage {
    fn name(&self) -> &'static str {
        "example generation"
    }

    fn route(&self) -> &str {
        "/examples"
    }

    fn ready_marker(&self) -> Locator {
        self.locators.page()
    }
}

impl ExampleGenerationPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self {
            locators: ExampleLocators,
            jobs: RunStatePoller::new(ExampleLocators.job_status()),
        }
    }

    /// Locator registry
    #[must_use]
    pub const fn locators(&self) -> ExampleLocators {
        self.locators
    }

    /// Generate an example for one operation and return its name
    ///
    /// # Errors
    ///
    /// Returns error if the button cannot be clicked or no example shows
    pub async fn generate_for(&self, ctx: &mut StudioContext, key: &RowKey) -> StudioResult<String> {
        let button = self.locators.generate_button(key);
        click_when_actionable(ctx, &button, &format!("generate {key}")).await?;

        let options = ctx.timeouts().action();
        let link = self.locators.example_link(key);
        let shown = expect(ctx.driver(), &link)
            .with_options(options)
            .to_be_visible()
            .await;
        ctx.enrich(&format!("generate example for {key}"), shown).await?;

        let name = self.generated_example(ctx.driver(), key).await;
        let name = ctx.enrich("read example name", name).await?;
        Ok(name.unwrap_or_default())
    }

    /// Name of a row's generated example, if shown
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn generated_example(
        &self,
        driver: &dyn StudioDriver,
        key: &RowKey,
    ) -> StudioResult<Option<String>> {
        let link = self.locators.example_link(key);
        if !link.is_visible(driver).await? {
            return Ok(None);
        }
        link.text(driver).await
    }

    async fn run_job(&self, ctx: &mut StudioContext, button: &Locator, name: &str) -> StudioResult<()> {
        click_when_actionable(ctx, button, name).await?;
        let start_options = ctx.timeouts().run_start();
        let started = self.jobs.wait_for_started(ctx.driver(), &start_options).await;
        let _ = ctx.enrich(&format!("wait for {name} to start"), started).await?;

        let finish_options = ctx.timeouts().run_finish();
        let finished = self.jobs.wait_for_finished(ctx.driver(), &finish_options).await;
        ctx.enrich(&format!("wait for {name} to finish"), finished).await?;
        ctx.note(format!("{name} finished"));
        Ok(())
    }

    /// Generate examples for every operation and wait for the job
    ///
    /// # Errors
    ///
    /// Returns error if the button cannot be clicked or the job never
    /// finishes
    pub async fn generate_all(&self, ctx: &mut StudioContext) -> StudioResult<()> {
        self.run_job(ctx, &self.locators.bulk_generate_button(), "bulk generation")
            .await
    }

    /// Validate every example and wait for the job
    ///
    /// # Errors
    ///
    /// Returns error if the button cannot be clicked or the job never
    /// finishes
    pub async fn validate_all(&self, ctx: &mut StudioContext) -> StudioResult<()> {
        self.run_job(ctx, &self.locators.validate_button(), "validation")
            .await
    }

    /// Verdict of a row's validation (`valid`, `invalid`), if shown
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn validation_verdict(
        &self,
        driver: &dyn StudioDriver,
        key: &RowKey,
    ) -> StudioResult<Option<String>> {
        self.locators
            .validation(key)
            .attribute(driver, VALUE_ATTRIBUTE)
            .await
    }

    /// Counters of the examples summary
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn example_totals(&self, driver: &dyn StudioDriver) -> StudioResult<ExampleTotals> {
        let read = |kind: &'static str| {
            let locator = self.locators.summary_counter(kind);
            async move {
                let raw = locator.attribute(driver, VALUE_ATTRIBUTE).await?;
                Ok::<_, crate::result::StudioError>(parse_count(raw.as_deref()))
            }
        };
        let (generated, valid, invalid) =
            futures::future::try_join3(read("generated"), read("valid"), read("invalid")).await?;
        Ok(ExampleTotals {
            generated,
            valid,
            invalid,
        })
    }
}
