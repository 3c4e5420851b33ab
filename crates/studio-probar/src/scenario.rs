//! Scenarios: user journeys composed from page objects.
//!
//! Each [`Scenario`] is a named, tagged async function over a
//! [`StudioContext`]. Independent checks inside a scenario are collected
//! with [`SoftAssertions`] so one run reports every mismatch; steps that
//! later steps depend on use `?`.

use crate::aggregate::{aggregate_row_counts, Counter, Totals};
use crate::assertion::{expect, SoftAssertions};
use crate::context::StudioContext;
use crate::locator::RowKey;
use crate::page_object::{self, AlertBanner};
use crate::pages::contract_test::EXCLUDED_ATTRIBUTE;
use crate::pages::{
    ContractTestPage, ExampleGenerationPage, MockOutcome, MockServerPage, RunOutcome,
    SpecBrowserPage, SpecConfigPage, StudioTab, MIXED_OPERATION_ERROR,
};
use crate::result::{StudioError, StudioResult};
use crate::wait::RunState;
use futures::future::BoxFuture;
use futures::FutureExt;

/// Body of a scenario
pub type ScenarioFn = for<'a> fn(&'a mut StudioContext) -> BoxFuture<'a, StudioResult<()>>;

/// A named, tagged user journey
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Unique name
    pub name: &'static str,
    /// Tags used for selection
    pub tags: &'static [&'static str],
    /// One-line description
    pub description: &'static str,
    /// Body
    pub run: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// Whether the scenario carries `tag`
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether the scenario is selected by any of `tags` (all when empty)
    /// and its name contains `name_filter`
    #[must_use]
    pub fn matches(&self, tags: &[String], name_filter: Option<&str>) -> bool {
        let tagged = tags.is_empty() || tags.iter().any(|t| self.has_tag(t));
        let named = name_filter.map_or(true, |f| self.name.contains(f));
        tagged && named
    }
}

/// Built-in scenarios
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "summary-consistency",
            tags: &["contract"],
            description: "row totals and column totals agree with the summary header",
            run: summary_consistency,
        },
        Scenario {
            name: "exclusion-round-trip",
            tags: &["contract", "exclusion"],
            description: "excluding a row moves its counts to excluded; including restores them",
            run: exclusion_round_trip,
        },
        Scenario {
            name: "mixed-operation-error",
            tags: &["contract", "exclusion"],
            description: "a selection mixing excluded and included rows is rejected",
            run: mixed_operation_error,
        },
        Scenario {
            name: "drill-down-count",
            tags: &["contract", "drilldown"],
            description: "a row's drill-down lists one expandable entry per failure",
            run: drill_down_count,
        },
        Scenario {
            name: "disabled-filter",
            tags: &["contract"],
            description: "a disabled summary filter cannot be applied",
            run: disabled_filter,
        },
        Scenario {
            name: "mock-start-stop",
            tags: &["mocking"],
            description: "the mock server starts on the configured port and stops",
            run: mock_start_stop,
        },
        Scenario {
            name: "example-generation",
            tags: &["examples"],
            description: "examples are generated and every generated example is validated",
            run: example_generation,
        },
        Scenario {
            name: "spec-config-save",
            tags: &["config"],
            description: "spec config edits are saved and restored",
            run: spec_config_save,
        },
    ]
}

/// Scenarios matching the tags and name filter, in catalog order
#[must_use]
pub fn select(catalog: &[Scenario], tags: &[String], name_filter: Option<&str>) -> Vec<Scenario> {
    catalog
        .iter()
        .filter(|s| s.matches(tags, name_filter))
        .copied()
        .collect()
}

// ============================================================================
// Contract scenarios
// ============================================================================

/// Open the contract page and complete a run with the configured inputs
async fn completed_run(ctx: &mut StudioContext) -> StudioResult<ContractTestPage> {
    let inputs = ctx.config().inputs.clone();
    let mut page = ContractTestPage::new();
    page_object::open(ctx, &page).await?;
    page.configure(ctx, &inputs.service_url, inputs.generative)
        .await?;
    match page.run_tests(ctx).await? {
        RunOutcome::Completed { elapsed } => {
            ctx.note(format!("contract run completed in {}ms", elapsed.as_millis()));
        }
        RunOutcome::Errored { message } => {
            return Err(StudioError::assertion(format!(
                "contract run errored: {message}"
            )));
        }
    }
    let state = page.run_state(ctx.driver()).await?;
    if state != RunState::Finished {
        return Err(StudioError::invalid_state(format!(
            "run reported {state} after completing"
        )));
    }
    Ok(page)
}

fn summary_consistency(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let page = completed_run(ctx).await?;
        let driver = ctx.driver();
        let rows = page.aggregate_row_totals(driver).await?;
        let header = page.summary_totals(driver).await?;
        let paths = page.distinct_column_values(driver, "path").await?;
        let path_total = page.column_total(driver, "path").await?;

        let mut soft = SoftAssertions::new();
        for counter in Counter::ALL {
            soft.assert_eq(
                &rows.get(counter),
                &header.get(counter),
                &format!("{counter} (rows vs header)"),
            );
        }
        soft.assert_eq(&path_total, &(paths.len() as u64), "path column total");
        ctx.note(format!("summary {header}"));
        ctx.enrich("verify summary totals", soft.verify()).await
    }
    .boxed()
}

fn expected_after_exclusion(before: &Totals, row: &Totals) -> Totals {
    let mut expected = Totals::default();
    for counter in Counter::ALL {
        *expected.get_mut(counter) = before.get(counter).saturating_sub(row.get(counter));
    }
    expected.excluded += 1;
    expected.total += 1;
    expected
}

fn exclusion_round_trip(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let key = ctx.config().inputs.sample_row.clone();
        let page = completed_run(ctx).await?;
        let before = page.summary_totals(ctx.driver()).await?;
        let row = aggregate_row_counts(ctx.driver(), &page.locators().result_cell(&key), &Counter::ALL)
            .await?;

        page.exclude_row(ctx, &key).await?;
        let excluded = page.summary_totals(ctx.driver()).await?;
        let flagged = page.is_row_excluded(ctx.driver(), &key).await?;

        page.include_row(ctx, &key).await?;
        let restored = page.summary_totals(ctx.driver()).await?;

        let mut soft = SoftAssertions::new();
        soft.assert_true(flagged, &format!("{key} flagged as excluded"));
        soft.assert_eq(
            &excluded,
            &expected_after_exclusion(&before, &row),
            "totals after exclusion",
        );
        soft.assert_eq(&restored, &before, "totals after inclusion");
        ctx.enrich("verify exclusion round trip", soft.verify()).await
    }
    .boxed()
}

fn mixed_operation_error(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let key = ctx.config().inputs.sample_row.clone();
        let page = completed_run(ctx).await?;
        let other: RowKey = page
            .row_keys(ctx.driver())
            .await?
            .into_iter()
            .find(|k| *k != key)
            .ok_or_else(|| StudioError::assertion("need a second row to mix operations"))?;

        page.exclude_row(ctx, &key).await?;
        page.toggle_row_selection(ctx, &key).await?;
        page.toggle_row_selection(ctx, &other).await?;
        page.exclude_selected(ctx).await?;
        let message = page.mixed_operation_error(ctx).await?;

        let mut soft = SoftAssertions::new();
        soft.assert_contains(&message, MIXED_OPERATION_ERROR, "mixed operation alert");

        AlertBanner::new().dismiss(ctx.driver()).await?;
        page.toggle_row_selection(ctx, &other).await?;
        page.include_selected(ctx).await?;
        let options = ctx.timeouts().action();
        let row = page.locators().row(&key);
        let restored = expect(ctx.driver(), &row)
            .with_options(options)
            .to_have_attribute(EXCLUDED_ATTRIBUTE, "false")
            .await;
        ctx.enrich(&format!("restore {key}"), restored).await?;

        ctx.enrich("verify mixed operation error", soft.verify()).await
    }
    .boxed()
}

fn drill_down_count(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let page = completed_run(ctx).await?;
        let mut target = None;
        for key in page.row_keys(ctx.driver()).await? {
            let cell = page.locators().result_cell(&key);
            let failed = aggregate_row_counts(ctx.driver(), &cell, &[Counter::Failed])
                .await?
                .failed;
            if failed > 0 {
                target = Some((key, failed));
                break;
            }
        }
        let Some((key, failed)) = target else {
            return Err(StudioError::nothing_to_check("no row has failures to drill into"));
        };

        let shown = page.open_remark(ctx, &key).await?;
        let entries = page.drill_down_count(ctx.driver()).await?;
        let mut soft = SoftAssertions::new();
        soft.assert_eq(&shown, &failed, &format!("remark count of {key}"));
        soft.assert_eq(&(entries as u64), &failed, &format!("drill-down entries of {key}"));

        for index in 0..entries {
            page.expand_drill_down(ctx, index).await?;
            let detail = page.drill_down_detail(ctx.driver(), index).await?;
            soft.assert_true(detail.request_visible, &format!("entry {index} request shown"));
            soft.assert_true(detail.response_visible, &format!("entry {index} response shown"));
            soft.assert_true(detail.verdict.is_some(), &format!("entry {index} verdict shown"));
        }
        page.close_drill_down(ctx).await?;
        ctx.enrich("verify drill-down", soft.verify()).await
    }
    .boxed()
}

fn disabled_filter(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let page = completed_run(ctx).await?;
        let mut disabled = None;
        for counter in Counter::ALL {
            let filter = page.locators().summary_counter(counter);
            if let Some(el) = filter.snapshot(ctx.driver()).await? {
                if el.class_contains("disabled") {
                    disabled = Some(counter);
                    break;
                }
            }
        }
        let Some(counter) = disabled else {
            return Err(StudioError::nothing_to_check("every summary filter is enabled"));
        };

        match page.apply_summary_filter(ctx, counter).await {
            Err(err) if err.is_precondition() => {
                ctx.note(format!("{counter} filter rejected: {err}"));
                Ok(())
            }
            Ok(()) => Err(StudioError::assertion(format!(
                "disabled {counter} filter was applied"
            ))),
            Err(err) => Err(err),
        }
    }
    .boxed()
}

// ============================================================================
// Mock, examples and config scenarios
// ============================================================================

fn mock_start_stop(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let port = ctx.config().inputs.mock_port;
        let page = MockServerPage::new();
        page_object::open(ctx, &page).await?;
        page.set_port(ctx, port).await?;

        let url = match page.start(ctx).await? {
            MockOutcome::Running { url } => url.unwrap_or_default(),
            MockOutcome::Errored { message } => {
                return Err(StudioError::assertion(format!("mock did not start: {message}")));
            }
        };
        let mut soft = SoftAssertions::new();
        soft.assert_contains(&url, &port.to_string(), "mock url carries the port");
        soft.assert_eq(&page.status(ctx.driver()).await?, &RunState::Running, "mock status");

        page.stop(ctx).await?;
        soft.assert_eq(&page.status(ctx.driver()).await?, &RunState::Finished, "mock status after stop");
        ctx.enrich("verify mock lifecycle", soft.verify()).await
    }
    .boxed()
}

fn example_generation(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let key = ctx.config().inputs.sample_row.clone();
        let page = ExampleGenerationPage::new();
        page_object::open(ctx, &page).await?;

        let name = page.generate_for(ctx, &key).await?;
        page.generate_all(ctx).await?;
        page.validate_all(ctx).await?;
        let totals = page.example_totals(ctx.driver()).await?;
        let verdict = page.validation_verdict(ctx.driver(), &key).await?;

        let mut soft = SoftAssertions::new();
        soft.assert_true(!name.is_empty(), &format!("example named for {key}"));
        soft.assert_true(totals.generated >= 1, "at least one example generated");
        soft.assert_eq(
            &(totals.valid + totals.invalid),
            &totals.generated,
            "every generated example validated",
        );
        soft.assert_true(verdict.is_some(), &format!("verdict shown for {key}"));
        ctx.note(format!(
            "examples: {} generated, {} valid, {} invalid",
            totals.generated, totals.valid, totals.invalid
        ));
        ctx.enrich("verify examples", soft.verify()).await
    }
    .boxed()
}

fn spec_config_save(ctx: &mut StudioContext) -> BoxFuture<'_, StudioResult<()>> {
    async move {
        let inputs = ctx.config().inputs.clone();
        let browser = SpecBrowserPage::new();
        page_object::open(ctx, &browser).await?;
        browser.open_spec(ctx, &inputs.spec_file).await?;
        browser.select_tab(ctx, StudioTab::Config).await?;

        let page = SpecConfigPage::new();
        let options = ctx.timeouts().action();
        let editor = page.locators().editor();
        let shown = expect(ctx.driver(), &editor)
            .with_options(options)
            .to_be_visible()
            .await;
        ctx.enrich("show spec config", shown).await?;

        let original = page.config_text(ctx.driver()).await?;
        let edited = format!("{original}{}", inputs.config_patch);
        page.replace_config(ctx, &edited).await?;
        let message = page.save(ctx).await?;
        let saved = page.config_text(ctx.driver()).await?;

        page.replace_config(ctx, &original).await?;
        let _ = page.save(ctx).await?;

        let mut soft = SoftAssertions::new();
        soft.assert_true(!message.is_empty(), "save confirmed");
        soft.assert_eq(&saved, &edited, "saved config text");
        ctx.enrich("verify spec config", soft.verify()).await
    }
    .boxed()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::Studio;

    mod selection_tests {
        use super::*;

        #[test]
        fn test_catalog_names_unique() {
            let all = catalog();
            let mut names: Vec<&str> = all.iter().map(|s| s.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), all.len());
        }

        #[test]
        fn test_select_by_tag() {
            let all = catalog();
            let mocking = select(&all, &["mocking".to_string()], None);
            assert_eq!(mocking.len(), 1);
            assert_eq!(mocking[0].name, "mock-start-stop");

            let contract = select(&all, &["CONTRACT".to_string()], None);
            assert_eq!(contract.len(), 5);

            assert_eq!(select(&all, &[], None).len(), all.len());
        }

        #[test]
        fn test_select_by_tag_and_filter() {
            let all = catalog();
            let picked = select(&all, &["exclusion".to_string()], Some("mixed"));
            assert_eq!(picked.len(), 1);
            assert_eq!(picked[0].name, "mixed-operation-error");
            assert!(select(&all, &[], Some("nope")).is_empty());
        }

        #[test]
        fn test_expected_after_exclusion() {
            let before = Studio::initial_totals();
            let row = Totals::default().with(Counter::Success, 12).with(Counter::Total, 12);
            assert_eq!(
                expected_after_exclusion(&before, &row),
                Totals {
                    success: 0,
                    failed: 20,
                    error: 0,
                    notcovered: 5,
                    excluded: 1,
                    total: 26,
                }
            );
        }
    }

    mod catalog_tests {
        use super::*;

        async fn run(name: &str) -> StudioResult<()> {
            run_on(&Studio::new(), name).await
        }

        async fn run_on(studio: &Studio, name: &str) -> StudioResult<()> {
            let scenario = catalog().into_iter().find(|s| s.name == name).unwrap();
            let mut ctx = studio.context();
            (scenario.run)(&mut ctx).await
        }

        #[tokio::test]
        async fn test_summary_consistency() {
            run("summary-consistency").await.unwrap();
        }

        #[tokio::test]
        async fn test_exclusion_round_trip() {
            run("exclusion-round-trip").await.unwrap();
        }

        #[tokio::test]
        async fn test_mixed_operation_error() {
            run("mixed-operation-error").await.unwrap();
        }

        #[tokio::test]
        async fn test_mixed_operation_error_with_prefixed_alert() {
            let studio = Studio::new();
            studio.prefix_mixed_alert("Error: ");
            run_on(&studio, "mixed-operation-error").await.unwrap();
        }

        #[tokio::test]
        async fn test_drill_down_count() {
            run("drill-down-count").await.unwrap();
        }

        #[tokio::test]
        async fn test_drill_down_without_failures_has_nothing_to_check() {
            let studio = Studio::new();
            studio.resolve_failures();
            let err = run_on(&studio, "drill-down-count").await.unwrap_err();
            assert!(err.is_nothing_to_check());
            assert!(err.to_string().contains("no row has failures"));
        }

        #[tokio::test]
        async fn test_disabled_filter() {
            run("disabled-filter").await.unwrap();
        }

        #[tokio::test]
        async fn test_disabled_filter_without_disabled_filters_has_nothing_to_check() {
            let studio = Studio::new();
            studio.enable_every_filter();
            let err = run_on(&studio, "disabled-filter").await.unwrap_err();
            assert!(err.is_nothing_to_check());
            assert!(err.to_string().contains("every summary filter is enabled"));
        }

        #[tokio::test]
        async fn test_mock_start_stop() {
            run("mock-start-stop").await.unwrap();
        }

        #[tokio::test]
        async fn test_example_generation() {
            run("example-generation").await.unwrap();
        }

        #[tokio::test]
        async fn test_spec_config_save() {
            run("spec-config-save").await.unwrap();
        }

        #[tokio::test]
        async fn test_unreachable_service_fails_contract_scenarios() {
            let studio = Studio::new();
            let mut config = crate::testing::fast_config();
            config.inputs.service_url = Studio::UNREACHABLE.to_string();
            let mut ctx = studio.context_with(config);
            let err = (catalog()[0].run)(&mut ctx).await.unwrap_err();
            assert!(err.to_string().contains("contract run errored"));
        }
    }
}
