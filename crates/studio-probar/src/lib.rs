//! Studio Probar: page-object end-to-end testing for an API tooling studio.
//!
//! Scenarios drive the studio through page objects built on composable
//! [`Locator`]s. Every wait is a bounded poll, every failure carries a
//! typed [`StudioError`], and table totals are cross-checked against the
//! summary header by the [`aggregate`](aggregate_row_counts) helpers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Scenario    │───►│ Page objects │───►│ StudioDriver │
//! │  catalog     │    │ + locators   │    │ (CDP / mock) │
//! └──────────────┘    └──────────────┘    └──────────────┘
//!        │                    │
//!        ▼                    ▼
//! ┌──────────────┐    ┌──────────────┐
//! │  Reporter    │◄───│ StudioContext│
//! │ (JSON/JUnit) │    │ + artifacts  │
//! └──────────────┘    └──────────────┘
//! ```
//!
//! The real browser backend lives behind the `browser` feature; without it
//! [`MockDriver`] is the only driver.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod aggregate;
mod assertion;
mod browser;
mod config;
mod context;
mod driver;
mod locator;
mod page_object;
mod reporter;
mod result;
mod tracing_support;
mod wait;

/// Page objects, one per studio area
pub mod pages;

/// Built-in scenarios and selection
pub mod scenario;

#[cfg(test)]
mod testing;

pub use aggregate::{
    aggregate_row_counts, distinct_column_values, parse_count, read_summary_header_totals,
    verify_totals, Counter, Totals, TYPE_ATTRIBUTE, VALUE_ATTRIBUTE,
};
pub use assertion::{
    expect, AssertionFailure, AssertionSummary, LocatorExpectation, SoftAssertions,
};
pub use browser::{BrowserConfig, ChromiumDriver, StudioBrowser};
pub use config::{
    EnvironmentOverride, ScenarioInputs, StudioConfig, Timeouts, DEFAULT_ARTIFACTS_DIR,
    DEFAULT_BASE_URL,
};
pub use context::StudioContext;
pub use driver::{ElementSnapshot, MockDom, MockDriver, MockElement, Screenshot, StudioDriver};
pub use locator::{BoundingBox, Locator, LocatorOptions, Point, RowKey, Selector};
pub use page_object::{
    blocker, click_when_actionable, ensure_actionable, open, AlertBanner, PageObject,
};
pub use reporter::{
    slugify, ArtifactStore, Attachment, AttachmentKind, FailureMode, LogEntry, Reporter,
    ScenarioReport, ScenarioStatus,
};
pub use result::{StudioError, StudioResult};
pub use scenario::{catalog, select, Scenario, ScenarioFn};
pub use tracing_support::{init_logging, LogFormat, LoggingConfig};
pub use wait::{
    await_condition, wait_until, JobSample, RunState, RunStateMonitor, RunStatePoller, WaitOptions,
    RUNNING_ATTRIBUTE,
};

/// Prelude for scenario authors
pub mod prelude {
    pub use crate::pages::*;
    pub use crate::{
        expect, open, Counter, Locator, PageObject, RowKey, SoftAssertions, StudioConfig,
        StudioContext, StudioDriver, StudioError, StudioResult, Totals,
    };
}
