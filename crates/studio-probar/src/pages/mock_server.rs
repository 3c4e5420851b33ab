//! Mock server page.
//!
//! The mock's `#mock-status` element carries `data-running` only once the
//! mock has been started, so [`RunState`] reads `NotStarted` before the
//! first start, `Running` while serving and `Finished` after a stop.

use crate::context::StudioContext;
use crate::driver::StudioDriver;
use crate::locator::Locator;
use crate::page_object::{click_when_actionable, PageObject};
use crate::result::StudioResult;
use crate::wait::{await_condition, JobSample, RunState, RunStatePoller};

/// Locators of the mock server page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockServerLocators;

impl MockServerLocators {
    /// Page container
    #[must_use]
    pub fn page(self) -> Locator {
        Locator::new("#mock-server")
    }

    /// Port input
    #[must_use]
    pub fn port_input(self) -> Locator {
        Locator::new("#mock-port")
    }

    /// Start button
    #[must_use]
    pub fn start_button(self) -> Locator {
        Locator::new("#mock-server button[data-action=\"start-mock\"]")
    }

    /// Stop button
    #[must_use]
    pub fn stop_button(self) -> Locator {
        Locator::new("#mock-server button[data-action=\"stop-mock\"]")
    }

    /// Status element, once it carries a running flag
    #[must_use]
    pub fn status(self) -> Locator {
        Locator::new("#mock-status[data-running]")
    }

    /// Address the mock serves on
    #[must_use]
    pub fn url(self) -> Locator {
        Locator::new("#mock-url")
    }

    /// Prerequisite error banner
    #[must_use]
    pub fn prereq_error(self) -> Locator {
        Locator::new("#mock-server .prereq-error")
    }
}

/// How a mock start ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Mock is serving
    Running {
        /// Address shown by the page
        url: Option<String>,
    },
    /// Prerequisite banner shown
    Errored {
        /// Banner text
        message: String,
    },
}

impl MockOutcome {
    /// Whether the mock is serving
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Mock server page
#[derive(Debug, Clone)]
pub struct MockServerPage {
    locators: MockServerLocators,
    poller: RunStatePoller,
}

impl Default for MockServerPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PageObject for MockServerPage {
    fn name(&self) -> &'static str {
        "mock server"
    }

    fn route(&self) -> &str {
        "/mock-server"
    }

    fn ready_marker(&self) -> Locator {
        self.locators.page()
    }
}

impl MockServerPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self {
            locators: MockServerLocators,
            poller: RunStatePoller::new(MockServerLocators.status()),
        }
    }

    /// Locator registry
    #[must_use]
    pub const fn locators(&self) -> MockServerLocators {
        self.locators
    }

    /// Enter the port to serve on
    ///
    /// # Errors
    ///
    /// Returns error if the input is missing
    pub async fn set_port(&self, ctx: &mut StudioContext, port: u16) -> StudioResult<()> {
        let filled = self
            .locators
            .port_input()
            .fill(ctx.driver(), &port.to_string())
            .await;
        ctx.enrich("set mock port", filled).await
    }

    /// Start the mock and wait until it serves or is rejected
    ///
    /// # Errors
    ///
    /// Returns error if the start button cannot be clicked or the mock
    /// neither runs nor errors within the action budget
    pub async fn start(&self, ctx: &mut StudioContext) -> StudioResult<MockOutcome> {
        click_when_actionable(ctx, &self.locators.start_button(), "start mock button").await?;

        let start_options = ctx.timeouts().run_start();
        let banner = self.locators.prereq_error();
        let started = self
            .poller
            .wait_for_started_or_rejected(ctx.driver(), &banner, &start_options)
            .await;
        let started = ctx.enrich("wait for mock to start", started).await?;
        let sample = match started {
            Some(sample) => sample,
            None => {
                let options = ctx.timeouts().action();
                let served = {
                    let driver = ctx.driver();
                    let poller = &self.poller;
                    let banner = &banner;
                    await_condition(
                        "mock to serve",
                        &options,
                        move || poller.sample_with_banner(driver, banner),
                        JobSample::is_started,
                    )
                    .await
                };
                ctx.enrich("wait for mock to serve", served).await?
            }
        };
        if let Some(message) = sample.prereq_error {
            ctx.note(format!("mock rejected: {message}"));
            return Ok(MockOutcome::Errored { message });
        }

        let url = self.mock_url(ctx.driver()).await;
        let url = ctx.enrich("read mock url", url).await?;
        ctx.note(format!("mock running at {}", url.as_deref().unwrap_or("?")));
        ctx.transition("mock running").await;
        Ok(MockOutcome::Running { url })
    }

    /// Stop the mock and wait for it to report stopped
    ///
    /// # Errors
    ///
    /// Returns error if the stop button cannot be clicked or the mock keeps
    /// running
    pub async fn stop(&self, ctx: &mut StudioContext) -> StudioResult<()> {
        click_when_actionable(ctx, &self.locators.stop_button(), "stop mock button").await?;
        let options = ctx.timeouts().action();
        let stopped = self.poller.wait_for_finished(ctx.driver(), &options).await;
        ctx.enrich("wait for mock to stop", stopped).await?;
        ctx.transition("mock stopped").await;
        Ok(())
    }

    /// Current mock state
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn status(&self, driver: &dyn StudioDriver) -> StudioResult<RunState> {
        self.poller.poll(driver).await
    }

    /// Address the mock serves on
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn mock_url(&self, driver: &dyn StudioDriver) -> StudioResult<Option<String>> {
        Ok(self
            .locators
            .url()
            .text(driver)
            .await?
            .filter(|url| !url.is_empty()))
    }
}
