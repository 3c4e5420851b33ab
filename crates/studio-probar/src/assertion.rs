//! Assertions for test validation.
//!
//! Locator expectations poll the live DOM until they hold, the same way the
//! page objects wait for UI transitions.

mod soft;

pub use soft::{AssertionFailure, AssertionSummary, SoftAssertions};

use crate::driver::StudioDriver;
use crate::locator::Locator;
use crate::result::StudioResult;
use crate::wait::{await_condition, WaitOptions};

/// Start an expectation on a locator
#[must_use]
pub fn expect<'a>(driver: &'a dyn StudioDriver, locator: &'a Locator) -> LocatorExpectation<'a> {
    let opts = locator.options();
    LocatorExpectation {
        driver,
        locator,
        options: WaitOptions::new()
            .with_timeout(u64::try_from(opts.timeout.as_millis()).unwrap_or(u64::MAX))
            .with_poll_interval(u64::try_from(opts.poll_interval.as_millis()).unwrap_or(u64::MAX)),
    }
}

/// Polling expectation over a locator
#[derive(Clone, Copy)]
pub struct LocatorExpectation<'a> {
    driver: &'a dyn StudioDriver,
    locator: &'a Locator,
    options: WaitOptions,
}

impl std::fmt::Debug for LocatorExpectation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocatorExpectation")
            .field("locator", &self.locator)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> LocatorExpectation<'a> {
    /// Override the wait budget
    #[must_use]
    pub const fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Some match is visible
    pub async fn to_be_visible(self) -> StudioResult<()> {
        let Self { driver, locator, options } = self;
        await_condition(
            &format!("{locator} to be visible"),
            &options,
            move || locator.is_visible(driver),
            |visible| *visible,
        )
        .await
        .map(|_| ())
    }

    /// No match is visible
    pub async fn to_be_hidden(self) -> StudioResult<()> {
        let Self { driver, locator, options } = self;
        await_condition(
            &format!("{locator} to be hidden"),
            &options,
            move || locator.is_visible(driver),
            |visible| !*visible,
        )
        .await
        .map(|_| ())
    }

    /// Exactly `expected` matches
    pub async fn to_have_count(self, expected: usize) -> StudioResult<()> {
        let Self { driver, locator, options } = self;
        await_condition(
            &format!("{locator} to have {expected} match(es)"),
            &options,
            move || locator.count(driver),
            |count| *count == expected,
        )
        .await
        .map(|_| ())
    }

    /// First match has exactly this trimmed text
    pub async fn to_have_text(self, expected: &str) -> StudioResult<()> {
        let Self { driver, locator, options } = self;
        await_condition(
            &format!("{locator} to have text {expected:?}"),
            &options,
            move || locator.text(driver),
            |text| text.as_deref() == Some(expected),
        )
        .await
        .map(|_| ())
    }

    /// First match contains this text
    pub async fn to_contain_text(self, expected: &str) -> StudioResult<()> {
        let Self { driver, locator, options } = self;
        await_condition(
            &format!("{locator} to contain text {expected:?}"),
            &options,
            move || locator.text(driver),
            |text| text.as_deref().is_some_and(|t| t.contains(expected)),
        )
        .await
        .map(|_| ())
    }

    /// First match has `name="value"`
    pub async fn to_have_attribute(self, name: &str, value: &str) -> StudioResult<()> {
        let Self { driver, locator, options } = self;
        await_condition(
            &format!("{locator} to have {name}={value:?}"),
            &options,
            move || locator.attribute(driver, name),
            |actual| actual.as_deref() == Some(value),
        )
        .await
        .map(|_| ())
    }
}
