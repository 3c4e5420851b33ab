//! Page Object Model support.
//!
//! Every studio area is a page object: a registry of locators plus the
//! actions a scenario performs there. This module holds what they share:
//! opening a page, the actionability guard run before every click, and the
//! alert banner.

use crate::assertion::expect;
use crate::context::StudioContext;
use crate::driver::{ElementSnapshot, StudioDriver};
use crate::locator::Locator;
use crate::result::{StudioError, StudioResult};
use crate::wait::{await_condition, WaitOptions};

/// A page or area of the studio.
///
/// # Example
///
/// ```ignore
/// struct SettingsPage;
///
/// impl PageObject for SettingsPage {
///     fn name(&self) -> &'static str {
///         "settings"
///     }
///
///     fn route(&self) -> &str {
///         "/settings"
///     }
///
///     fn ready_marker(&self) -> Locator {
///         Locator::new("#settings")
///     }
/// }
///
/// page_object::open(&mut ctx, &SettingsPage).await?;
/// ```
pub trait PageObject {
    /// Page name for logging
    fn name(&self) -> &'static str;

    /// Route appended to the base URL
    fn route(&self) -> &str;

    /// Element that is visible once the page can be used
    fn ready_marker(&self) -> Locator;

    /// Readiness budget; `None` uses the configured navigation timeout
    fn load_timeout_ms(&self) -> Option<u64> {
        None
    }
}

/// Navigate to a page and wait for its ready marker
///
/// # Errors
///
/// Returns error if navigation fails or the marker never shows
pub async fn open<P: PageObject + ?Sized>(ctx: &mut StudioContext, page: &P) -> StudioResult<()> {
    let url = ctx.config().url_for(page.route());
    let mut options = ctx.timeouts().navigation();
    if let Some(timeout_ms) = page.load_timeout_ms() {
        options = options.with_timeout(timeout_ms);
    }
    ctx.note(format!("open {} at {url}", page.name()));

    let marker = page.ready_marker();
    let result = async {
        ctx.driver().navigate(&url).await?;
        expect(ctx.driver(), &marker)
            .with_options(options)
            .to_be_visible()
            .await
    }
    .await;
    ctx.enrich(&format!("open {}", page.name()), result).await
}

// ============================================================================
// Actionability
// ============================================================================

/// Why a control cannot be clicked, or `None` when it can
#[must_use]
pub fn blocker(snapshot: Option<&ElementSnapshot>) -> Option<&'static str> {
    match snapshot {
        None => Some("not present"),
        Some(el) if !el.visible => Some("not visible"),
        Some(el) if !el.is_enabled() => Some("disabled"),
        Some(el) if !el.receives_pointer => Some("obstructed by another element"),
        Some(_) => None,
    }
}

async fn sample_blocker(
    driver: &dyn StudioDriver,
    control: &Locator,
) -> StudioResult<Option<&'static str>> {
    Ok(blocker(control.snapshot(driver).await?.as_ref()))
}

/// Check once that a control can be clicked
///
/// # Errors
///
/// Returns [`StudioError::Precondition`] naming the first violated condition
pub async fn ensure_actionable(
    driver: &dyn StudioDriver,
    control: &Locator,
    name: &str,
) -> StudioResult<ElementSnapshot> {
    let snapshot = control.snapshot(driver).await?;
    let reason = blocker(snapshot.as_ref());
    match (reason, snapshot) {
        (None, Some(el)) => Ok(el),
        _ => Err(StudioError::precondition(
            name,
            format!("{} ({control})", reason.unwrap_or("not present")),
        )),
    }
}

/// Wait for a control to become actionable, then click it
///
/// The control gets the action budget to settle. If it is still blocked
/// afterwards the click is never attempted.
///
/// # Errors
///
/// Returns [`StudioError::Precondition`] if the control stays blocked, or
/// the driver's error if the click fails
pub async fn click_when_actionable(
    ctx: &mut StudioContext,
    control: &Locator,
    name: &str,
) -> StudioResult<()> {
    let options = ctx.timeouts().action();
    let result = click_guarded(ctx.driver(), control, name, &options).await;
    ctx.enrich(&format!("click {name}"), result).await
}

async fn click_guarded(
    driver: &dyn StudioDriver,
    control: &Locator,
    name: &str,
    options: &WaitOptions,
) -> StudioResult<()> {
    let settled = await_condition(
        &format!("{name} to be actionable"),
        options,
        move || sample_blocker(driver, control),
        Option::is_none,
    )
    .await;
    match settled {
        Ok(_) => {}
        Err(err) if err.is_timeout() => {
            let _ = ensure_actionable(driver, control, name).await?;
        }
        Err(err) => return Err(err),
    }
    tracing::info!(control = name, "click");
    control.click(driver).await
}

// ============================================================================
// Alert banner
// ============================================================================

/// Alert and toast messages shown above every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertBanner {
    root: Locator,
}

impl Default for AlertBanner {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBanner {
    /// Banner at `#alert-container`
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Locator::new("#alert-container .alert"),
        }
    }

    /// Every alert element
    #[must_use]
    pub const fn alert(&self) -> &Locator {
        &self.root
    }

    /// Message text element of the first alert
    #[must_use]
    pub fn message_text(&self) -> Locator {
        self.root.first().locator(".alert-message")
    }

    /// Dismiss button of the first alert
    #[must_use]
    pub fn dismiss_button(&self) -> Locator {
        self.root.first().locator("button[data-action=\"dismiss\"]")
    }

    /// Current message, if an alert is visible
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn message(&self, driver: &dyn StudioDriver) -> StudioResult<Option<String>> {
        if !self.root.is_visible(driver).await? {
            return Ok(None);
        }
        Ok(self
            .message_text()
            .text(driver)
            .await?
            .filter(|text| !text.is_empty()))
    }

    /// Wait for a non-empty message
    ///
    /// # Errors
    ///
    /// Returns a timeout error if no message shows in time
    pub async fn wait_for_message(
        &self,
        driver: &dyn StudioDriver,
        options: &WaitOptions,
    ) -> StudioResult<String> {
        let message = await_condition(
            "alert message",
            options,
            move || self.message(driver),
            Option::is_some,
        )
        .await?;
        Ok(message.unwrap_or_default())
    }

    /// Close the first alert, if one is shown
    ///
    /// # Errors
    ///
    /// Returns error if the click fails
    pub async fn dismiss(&self, driver: &dyn StudioDriver) -> StudioResult<()> {
        let button = self.dismiss_button();
        if button.is_visible(driver).await? {
            button.click(driver).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::testing::{fast_context, Studio};

    struct DummyPage;

    impl PageObject for DummyPage {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn route(&self) -> &str {
            "/dummy"
        }

        fn ready_marker(&self) -> Locator {
            Locator::new("#dummy")
        }
    }

    mod open_tests {
        use super::*;

        #[tokio::test]
        async fn test_open_navigates_and_waits() {
            let driver = MockDriver::new();
            driver.push_frames(
                &Locator::new("#dummy"),
                vec![vec![], vec![MockElement::new("main")]],
            );
            let (driver, mut ctx, _dir) = fast_context(driver);
            open(&mut ctx, &DummyPage).await.unwrap();
            assert!(driver.was_called("navigate:http://localhost:9000/dummy"));
        }

        #[tokio::test]
        async fn test_open_times_out_with_screenshot() {
            let (_driver, mut ctx, _dir) = fast_context(MockDriver::new());
            let err = open(&mut ctx, &DummyPage).await.unwrap_err();
            assert!(err.is_timeout());
            assert!(matches!(err, StudioError::Action { screenshot: Some(_), .. }));
        }
    }

    mod actionability_tests {
        use super::*;

        #[test]
        fn test_blocker_order() {
            assert_eq!(blocker(None), Some("not present"));
            let hidden = MockElement::new("button").hidden().disabled().to_snapshot();
            assert_eq!(blocker(Some(&hidden)), Some("not visible"));
            let disabled = MockElement::new("button").disabled().to_snapshot();
            assert_eq!(blocker(Some(&disabled)), Some("disabled"));
            let flagged = MockElement::new("button")
                .attr("data-enabled", "false")
                .to_snapshot();
            assert_eq!(blocker(Some(&flagged)), Some("disabled"));
            let covered = MockElement::new("button").obstructed().to_snapshot();
            assert_eq!(blocker(Some(&covered)), Some("obstructed by another element"));
            let ready = MockElement::new("button").to_snapshot();
            assert_eq!(blocker(Some(&ready)), None);
        }

        #[tokio::test]
        async fn test_ensure_actionable_reports_control() {
            let driver = MockDriver::new();
            let button = Locator::new("button.run");
            driver.set(&button, vec![MockElement::new("button").obstructed()]);
            let err = ensure_actionable(&driver, &button, "run button")
                .await
                .unwrap_err();
            match err {
                StudioError::Precondition { control, reason } => {
                    assert_eq!(control, "run button");
                    assert!(reason.starts_with("obstructed"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_click_waits_for_control_to_enable() {
            let driver = MockDriver::new();
            let button = Locator::new("button.run");
            driver.push_frames(
                &button,
                vec![
                    vec![MockElement::new("button").disabled()],
                    vec![MockElement::new("button")],
                ],
            );
            let (driver, mut ctx, _dir) = fast_context(driver);
            click_when_actionable(&mut ctx, &button, "run button")
                .await
                .unwrap();
            assert!(driver.was_called("click:button.run"));
        }

        #[tokio::test]
        async fn test_click_never_attempted_on_disabled_control() {
            let driver = MockDriver::new();
            let button = Locator::new("button.run");
            driver.set(&button, vec![MockElement::new("button").disabled()]);
            let (driver, mut ctx, _dir) = fast_context(driver);
            let err = click_when_actionable(&mut ctx, &button, "run button")
                .await
                .unwrap_err();
            assert!(err.is_precondition());
            assert!(!driver.was_called("click:"));
        }
    }

    mod alert_tests {
        use super::*;

        #[tokio::test]
        async fn test_message_and_dismiss() {
            let studio = Studio::new();
            let banner = AlertBanner::new();
            assert_eq!(banner.message(studio.driver()).await.unwrap(), None);

            studio.show_alert("Saved");
            let message = banner
                .wait_for_message(studio.driver(), &WaitOptions::new().with_timeout(100))
                .await
                .unwrap();
            assert_eq!(message, "Saved");

            banner.dismiss(studio.driver()).await.unwrap();
            assert_eq!(banner.message(studio.driver()).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_wait_for_message_times_out() {
            let driver = MockDriver::new();
            let err = AlertBanner::new()
                .wait_for_message(&driver, &WaitOptions::new().with_timeout(20).with_poll_interval(5))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }
    }
}
