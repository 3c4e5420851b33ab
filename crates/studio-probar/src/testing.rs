//! In-memory studio for unit tests.
//!
//! [`Studio`] keeps a small model of the application (rows, exclusions,
//! selections, alerts, mock and example jobs) and re-renders it into a
//! [`MockDriver`] after every click, so page objects and scenarios run
//! against the same locators they use in a real browser.

#![allow(clippy::unwrap_used)]

use crate::aggregate::{Counter, Totals, VALUE_ATTRIBUTE};
use crate::config::{StudioConfig, Timeouts};
use crate::context::StudioContext;
use crate::driver::{MockDom, MockDriver, MockElement};
use crate::locator::{Locator, RowKey};
use crate::page_object::AlertBanner;
use crate::pages::contract_test::{ContractTestLocators, MIXED_OPERATION_ERROR};
use crate::pages::example_generation::ExampleLocators;
use crate::pages::mock_server::MockServerLocators;
use crate::pages::spec_browser::{SpecBrowserLocators, StudioTab};
use crate::pages::spec_config::SpecConfigLocators;
use crate::reporter::{ArtifactStore, ScenarioReport};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One contract-test row of the fake
#[derive(Debug, Clone, Copy)]
pub(crate) struct FakeRow {
    pub path: &'static str,
    pub method: &'static str,
    pub response: &'static str,
    pub success: u64,
    pub failed: u64,
    pub notcovered: u64,
    pub example_valid: bool,
}

impl FakeRow {
    pub fn key(&self) -> RowKey {
        RowKey::new(self.path, self.method, self.response)
    }

    fn counts(&self, excluded: bool, failures_resolved: bool) -> Totals {
        if excluded {
            return Totals::default()
                .with(Counter::Excluded, 1)
                .with(Counter::Total, 1);
        }
        let (success, failed) = if failures_resolved {
            (self.success + self.failed, 0)
        } else {
            (self.success, self.failed)
        };
        Totals {
            success,
            failed,
            error: 0,
            notcovered: self.notcovered,
            excluded: 0,
            total: self.success + self.failed + self.notcovered,
        }
    }

    fn example_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.path.trim_start_matches('/').replace('/', "_"),
            self.method,
            self.response
        )
    }
}

pub(crate) const SAMPLE_ROW: FakeRow = FakeRow {
    path: "/products",
    method: "POST",
    response: "201",
    success: 12,
    failed: 0,
    notcovered: 0,
    example_valid: true,
};

pub(crate) const OTHER_ROW: FakeRow = FakeRow {
    path: "/orders",
    method: "GET",
    response: "200",
    success: 0,
    failed: 3,
    notcovered: 0,
    example_valid: true,
};

const THIRD_ROW: FakeRow = FakeRow {
    path: "/orders",
    method: "POST",
    response: "400",
    success: 0,
    failed: 17,
    notcovered: 5,
    example_valid: false,
};

const ROWS: [FakeRow; 3] = [SAMPLE_ROW, OTHER_ROW, THIRD_ROW];

/// Key of the row the default scenario inputs point at
pub(crate) fn sample_row() -> RowKey {
    SAMPLE_ROW.key()
}

/// Timeouts short enough for unit tests
pub(crate) fn fast_config() -> StudioConfig {
    StudioConfig {
        timeouts: Timeouts {
            action_ms: 150,
            navigation_ms: 150,
            run_start_ms: 60,
            run_finish_ms: 1_000,
            poll_interval_ms: 5,
        },
        capture_transitions: false,
        ..StudioConfig::default()
    }
}

/// Context over a bare mock driver
pub(crate) fn fast_context(driver: MockDriver) -> (Arc<MockDriver>, StudioContext, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(driver);
    let ctx = StudioContext::new(
        driver.clone(),
        Arc::new(fast_config()),
        ArtifactStore::at(dir.path()),
        ScenarioReport::new("unit", &[]),
    );
    (driver, ctx, dir)
}

#[derive(Debug, Default)]
struct Model {
    excluded: BTreeSet<usize>,
    selected: BTreeSet<usize>,
    generative: bool,
    filter: Option<Counter>,
    alert: Option<String>,
    mixed_alert_prefix: String,
    failures_resolved: bool,
    filters_enabled: bool,
    prereq_error: Option<String>,
    drill: Option<usize>,
    expanded: BTreeSet<usize>,
    spec_open: bool,
    active_tab: Option<StudioTab>,
    mock_running: Option<bool>,
    mock_port: u16,
    mock_error: Option<String>,
    examples: BTreeSet<usize>,
    validated: bool,
    saved_config: String,
}

type Shared = Arc<Mutex<Model>>;

fn text_el(tag: &str, text: impl Into<String>) -> MockElement {
    MockElement::new(tag).text(text)
}

fn counter_el(kind: &str, value: u64) -> MockElement {
    MockElement::new("li")
        .attr("data-type", kind)
        .attr(VALUE_ATTRIBUTE, value.to_string())
}

fn running_el(running: bool) -> MockElement {
    MockElement::new("div").attr("data-running", running.to_string())
}

fn first_value(dom: &mut MockDom, locator: &Locator) -> String {
    dom.resolve(locator.selector())
        .first()
        .and_then(|el| el.value.clone())
        .unwrap_or_default()
}

fn render(m: &Model, dom: &mut MockDom) {
    render_contract(m, dom);
    render_spec_browser(m, dom);
    render_mock(m, dom);
    render_examples(m, dom);

    let alert = AlertBanner::new();
    match &m.alert {
        Some(message) => dom.set(
            alert.alert(),
            vec![MockElement::new("div")
                .attr("class", "alert")
                .child(".alert-message", text_el("span", message.clone()))
                .child(
                    "button[data-action=\"dismiss\"]",
                    MockElement::new("button"),
                )],
        ),
        None => dom.clear(alert.alert()),
    }
}

fn render_contract(m: &Model, dom: &mut MockDom) {
    let l = ContractTestLocators::new();
    dom.set(
        &l.generative_toggle(),
        vec![MockElement::new("input").checked(m.generative)],
    );

    let mut header = Totals::default();
    let mut rows = Vec::new();
    for (i, row) in ROWS.iter().enumerate() {
        let excluded = m.excluded.contains(&i);
        let counts = row.counts(excluded, m.failures_resolved);
        header += counts;

        let result = Counter::ALL.iter().fold(MockElement::new("td"), |td, c| {
            td.child(
                c.sub_selector(),
                MockElement::new("span").attr(VALUE_ATTRIBUTE, counts.get(*c).to_string()),
            )
        });
        let el = MockElement::new("tr")
            .attr("data-excluded", excluded.to_string())
            .child(
                "td[data-key=\"path\"]",
                MockElement::new("td").attr(VALUE_ATTRIBUTE, row.path),
            )
            .child(
                "td[data-key=\"method\"]",
                MockElement::new("td").attr(VALUE_ATTRIBUTE, row.method),
            )
            .child(
                "td[data-key=\"response\"]",
                MockElement::new("td").attr(VALUE_ATTRIBUTE, row.response),
            )
            .child("td[data-key=\"result\"]", result)
            .child(
                "td[data-key=\"remark\"]",
                text_el("td", format!("{} failed", counts.failed))
                    .attr(VALUE_ATTRIBUTE, counts.failed.to_string()),
            )
            .child(
                "input[type=\"checkbox\"]",
                MockElement::new("input").checked(m.selected.contains(&i)),
            );
        dom.set(&l.row(&row.key()), vec![el.clone()]);
        rows.push(el);
    }
    dom.set(&l.rows(), rows);

    for counter in Counter::ALL {
        let value = header.get(counter);
        let class = if value == 0 && !m.filters_enabled {
            "summary-item disabled"
        } else {
            "summary-item"
        };
        let active = m.filter == Some(counter);
        dom.set(
            &l.summary_counter(counter),
            vec![counter_el(counter.key(), value)
                .attr("class", class)
                .attr("data-active", active.to_string())],
        );
    }

    let paths: BTreeSet<&str> = ROWS.iter().map(|r| r.path).collect();
    let methods: BTreeSet<&str> = ROWS.iter().map(|r| r.method).collect();
    dom.set(
        &l.column_header("path"),
        vec![MockElement::new("th").attr(VALUE_ATTRIBUTE, paths.len().to_string())],
    );
    dom.set(
        &l.column_header("method"),
        vec![MockElement::new("th").attr(VALUE_ATTRIBUTE, methods.len().to_string())],
    );

    match &m.prereq_error {
        Some(message) => dom.set(&l.prereq_error(), vec![text_el("div", message.clone())]),
        None => dom.clear(&l.prereq_error()),
    }

    match m.drill {
        Some(row) => {
            let failures = if m.failures_resolved { 0 } else { ROWS[row].failed };
            let entries = (0..failures as usize)
                .map(|index| {
                    let request = text_el("pre", format!("{} {}", ROWS[row].method, ROWS[row].path));
                    let response = text_el("pre", "HTTP/1.1 500");
                    let (request, response) = if m.expanded.contains(&index) {
                        (request, response)
                    } else {
                        (request.hidden(), response.hidden())
                    };
                    MockElement::new("li")
                        .child(".scenario-header", text_el("div", format!("Scenario {index}")))
                        .child(".request", request)
                        .child(".response", response)
                        .child(".pill", MockElement::new("span").attr("data-type", "failed"))
                })
                .collect();
            dom.set(&l.drill_downs(), entries);
            dom.set(&l.back_button(), vec![MockElement::new("button")]);
        }
        None => {
            dom.clear(&l.drill_downs());
            dom.clear(&l.back_button());
        }
    }
}

fn render_spec_browser(m: &Model, dom: &mut MockDom) {
    let l = SpecBrowserLocators;
    if !m.spec_open {
        return;
    }
    dom.set(&l.tab_bar(), vec![MockElement::new("ul")]);
    for tab in StudioTab::ALL {
        let active = m.active_tab == Some(tab);
        dom.set(
            &l.tab(tab),
            vec![MockElement::new("li")
                .attr("data-key", tab.key())
                .attr("data-active", active.to_string())],
        );
    }
    match m.active_tab {
        Some(tab) => dom.set(
            &l.active_tab(),
            vec![MockElement::new("li").attr("data-key", tab.key())],
        ),
        None => dom.clear(&l.active_tab()),
    }
    dom.set(
        &l.content(),
        vec![text_el("pre", "openapi: 3.0.0\ninfo:\n  title: Order API\n")],
    );
}

fn render_mock(m: &Model, dom: &mut MockDom) {
    let l = MockServerLocators;
    match m.mock_running {
        Some(running) => dom.set(&l.status(), vec![running_el(running)]),
        None => dom.clear(&l.status()),
    }
    if m.mock_running == Some(true) {
        dom.set(
            &l.url(),
            vec![text_el("span", format!("http://localhost:{}", m.mock_port))],
        );
    } else {
        dom.clear(&l.url());
    }
    let stop = MockElement::new("button");
    let stop = if m.mock_running == Some(true) {
        stop
    } else {
        stop.disabled()
    };
    dom.set(&l.stop_button(), vec![stop]);
    match &m.mock_error {
        Some(message) => dom.set(&l.prereq_error(), vec![text_el("div", message.clone())]),
        None => dom.clear(&l.prereq_error()),
    }
}

fn render_examples(m: &Model, dom: &mut MockDom) {
    let l = ExampleLocators;
    let mut valid = 0;
    for (i, row) in ROWS.iter().enumerate() {
        let mut el = MockElement::new("tr").child(
            "button[data-action=\"generate\"]",
            MockElement::new("button"),
        );
        if m.examples.contains(&i) {
            el = el.child("a[data-type=\"example\"]", text_el("a", row.example_name()));
            if m.validated {
                let verdict = if row.example_valid { "valid" } else { "invalid" };
                if row.example_valid {
                    valid += 1;
                }
                el = el.child(
                    "[data-type=\"validation\"]",
                    MockElement::new("span").attr(VALUE_ATTRIBUTE, verdict),
                );
            }
        }
        dom.set(&l.row(&row.key()), vec![el]);
    }
    let generated = m.examples.len() as u64;
    let (valid, invalid) = if m.validated {
        (valid, generated - valid)
    } else {
        (0, 0)
    };
    dom.set(&l.summary_counter("generated"), vec![counter_el("generated", generated)]);
    dom.set(&l.summary_counter("valid"), vec![counter_el("valid", valid)]);
    dom.set(&l.summary_counter("invalid"), vec![counter_el("invalid", invalid)]);
}

/// Fake studio backed by a [`MockDriver`]
pub(crate) struct Studio {
    driver: Arc<MockDriver>,
    model: Shared,
    dir: TempDir,
}

impl Studio {
    pub const SPEC_FILE: &'static str = "api_order_v3.yaml";
    pub const UNREACHABLE: &'static str = "http://unreachable.invalid";
    pub const BUSY_PORT: u16 = 9002;
    const INITIAL_CONFIG: &'static str = "mock:\n  delay_ms: 0\n";

    pub fn new() -> Self {
        let driver = Arc::new(MockDriver::new());
        let model: Shared = Arc::new(Mutex::new(Model {
            saved_config: Self::INITIAL_CONFIG.to_string(),
            ..Model::default()
        }));
        let studio = Self {
            driver,
            model,
            dir: tempfile::tempdir().unwrap(),
        };
        studio.set_static();
        studio.wire_contract();
        studio.wire_spec_browser();
        studio.wire_mock();
        studio.wire_examples();
        studio.wire_config();
        studio.rerender();
        studio
    }

    pub fn driver(&self) -> &MockDriver {
        &self.driver
    }

    pub fn context_with(&self, config: StudioConfig) -> StudioContext {
        StudioContext::new(
            self.driver.clone(),
            Arc::new(config),
            ArtifactStore::at(self.dir.path()),
            ScenarioReport::new("fake studio", &[]),
        )
    }

    pub fn context(&self) -> StudioContext {
        self.context_with(fast_config())
    }

    pub fn context_capturing_transitions(&self) -> StudioContext {
        self.context_with(StudioConfig {
            capture_transitions: true,
            ..fast_config()
        })
    }

    pub fn initial_totals() -> Totals {
        Totals {
            success: 12,
            failed: 20,
            error: 0,
            notcovered: 5,
            excluded: 0,
            total: 37,
        }
    }

    pub fn generative(&self) -> bool {
        self.model.lock().unwrap().generative
    }

    pub fn show_alert(&self, message: &str) {
        self.model.lock().unwrap().alert = Some(message.to_string());
        self.rerender();
    }

    /// Prefix the mixed-selection alert, as a styled banner would
    pub fn prefix_mixed_alert(&self, prefix: &str) {
        self.model.lock().unwrap().mixed_alert_prefix = prefix.to_string();
    }

    /// Report every check of every row as passed
    pub fn resolve_failures(&self) {
        self.model.lock().unwrap().failures_resolved = true;
        self.rerender();
    }

    /// Render every summary filter as enabled, even at zero
    pub fn enable_every_filter(&self) {
        self.model.lock().unwrap().filters_enabled = true;
        self.rerender();
    }

    pub fn disable_run_button(&self) {
        self.driver.set(
            &ContractTestLocators::new().run_button(),
            vec![MockElement::new("button").disabled()],
        );
    }

    fn rerender(&self) {
        let model = self.model.lock().unwrap();
        self.driver.with_dom(|dom| render(&model, dom));
    }

    /// Register a click reaction that updates the model and re-renders
    fn react(&self, locator: &Locator, mut update: impl FnMut(&mut Model, &mut MockDom) + Send + 'static) {
        let model = self.model.clone();
        self.driver.on_click(locator, move |dom| {
            let mut m = model.lock().unwrap();
            update(&mut m, dom);
            render(&m, dom);
        });
    }

    fn set_static(&self) {
        let contract = ContractTestLocators::new();
        let d = &self.driver;
        d.set(&contract.page(), vec![MockElement::new("section")]);
        d.set(&contract.service_url_input(), vec![MockElement::new("input").value("")]);
        d.set(&contract.run_button(), vec![MockElement::new("button")]);
        d.set(&contract.select_all(), vec![MockElement::new("input")]);
        d.set(&contract.exclude_button(), vec![MockElement::new("button")]);
        d.set(&contract.include_button(), vec![MockElement::new("button")]);

        let browser = SpecBrowserLocators;
        d.set(&browser.tree(), vec![MockElement::new("ul")]);
        d.set(
            &browser.spec_files(),
            vec![
                MockElement::new("li").attr("data-key", Self::SPEC_FILE),
                MockElement::new("li").attr("data-key", "petstore.yaml"),
            ],
        );
        d.set(&browser.spec_file(Self::SPEC_FILE), vec![MockElement::new("li")]);

        let mock = MockServerLocators;
        d.set(&mock.page(), vec![MockElement::new("section")]);
        d.set(&mock.port_input(), vec![MockElement::new("input").value("9001")]);
        d.set(&mock.start_button(), vec![MockElement::new("button")]);

        let examples = ExampleLocators;
        d.set(&examples.page(), vec![MockElement::new("section")]);
        d.set(&examples.bulk_generate_button(), vec![MockElement::new("button")]);
        d.set(&examples.validate_button(), vec![MockElement::new("button")]);

        let config = SpecConfigLocators;
        d.set(&config.page(), vec![MockElement::new("section")]);
        d.set(
            &config.editor(),
            vec![MockElement::new("textarea").value(Self::INITIAL_CONFIG)],
        );
        d.set(&config.save_button(), vec![MockElement::new("button")]);
        d.set(&config.reset_button(), vec![MockElement::new("button")]);
    }

    fn wire_contract(&self) {
        let l = ContractTestLocators::new();

        self.react(&l.generative_toggle(), |m, _| m.generative = !m.generative);

        let service = l.service_url_input();
        let status = l.run_status();
        self.react(&l.run_button(), move |m, dom| {
            let url = first_value(dom, &service);
            m.prereq_error = None;
            if url == Self::UNREACHABLE {
                m.prereq_error = Some(format!("Service {url} is not reachable"));
                return;
            }
            dom.clear(&status);
            dom.push_frames(
                &status,
                vec![
                    vec![running_el(true)],
                    vec![running_el(true)],
                    vec![running_el(false)],
                ],
            );
        });

        for (i, row) in ROWS.iter().enumerate() {
            self.react(&l.exclusion_checkbox(&row.key()), move |m, _| {
                if !m.selected.remove(&i) {
                    let _ = m.selected.insert(i);
                }
            });
            self.react(&l.remark_cell(&row.key()), move |m, _| {
                m.drill = Some(i);
                m.expanded.clear();
            });
        }

        self.react(&l.select_all(), |m, _| {
            if m.selected.len() == ROWS.len() {
                m.selected.clear();
            } else {
                m.selected = (0..ROWS.len()).collect();
            }
        });

        for exclude in [true, false] {
            let button = if exclude {
                l.exclude_button()
            } else {
                l.include_button()
            };
            self.react(&button, move |m, _| {
                let any_excluded = m.selected.iter().any(|i| m.excluded.contains(i));
                let any_included = m.selected.iter().any(|i| !m.excluded.contains(i));
                if any_excluded && any_included {
                    m.alert = Some(format!("{}{MIXED_OPERATION_ERROR}", m.mixed_alert_prefix));
                    return;
                }
                let selected = std::mem::take(&mut m.selected);
                if exclude {
                    m.excluded.extend(selected);
                } else {
                    m.excluded.retain(|i| !selected.contains(i));
                }
            });
        }

        for counter in Counter::ALL {
            self.react(&l.summary_counter(counter), move |m, _| m.filter = Some(counter));
        }

        let most_failures = ROWS.iter().map(|r| r.failed as usize).max().unwrap_or(0);
        for index in 0..most_failures {
            self.react(&l.drill_down_header(index), move |m, _| {
                let _ = m.expanded.insert(index);
            });
        }
        self.react(&l.back_button(), |m, _| {
            m.drill = None;
            m.expanded.clear();
        });
        self.react(&AlertBanner::new().dismiss_button(), |m, _| {
            m.alert = None;
        });
    }

    fn wire_spec_browser(&self) {
        let l = SpecBrowserLocators;
        self.react(&l.spec_file(Self::SPEC_FILE), |m, _| {
            m.spec_open = true;
            m.active_tab = Some(StudioTab::Spec);
        });
        for tab in StudioTab::ALL {
            self.react(&l.tab(tab), move |m, _| m.active_tab = Some(tab));
        }
    }

    fn wire_mock(&self) {
        let l = MockServerLocators;
        let port_input = l.port_input();
        self.react(&l.start_button(), move |m, dom| {
            let port: u16 = first_value(dom, &port_input).parse().unwrap_or(0);
            if port == Self::BUSY_PORT {
                m.mock_error = Some(format!("Port {port} is already in use"));
                return;
            }
            m.mock_error = None;
            m.mock_port = port;
            m.mock_running = Some(true);
        });
        self.react(&l.stop_button(), |m, _| m.mock_running = Some(false));
    }

    fn wire_examples(&self) {
        let l = ExampleLocators;
        for (i, row) in ROWS.iter().enumerate() {
            self.react(&l.generate_button(&row.key()), move |m, _| {
                let _ = m.examples.insert(i);
            });
        }
        let jobs = l.job_status();
        let bulk_jobs = jobs.clone();
        self.react(&l.bulk_generate_button(), move |m, dom| {
            m.examples = (0..ROWS.len()).collect();
            dom.clear(&bulk_jobs);
            dom.push_frames(&bulk_jobs, vec![vec![running_el(true)], vec![running_el(false)]]);
        });
        self.react(&l.validate_button(), move |m, dom| {
            m.validated = true;
            dom.clear(&jobs);
            dom.push_frames(&jobs, vec![vec![running_el(true)], vec![running_el(false)]]);
        });
    }

    fn wire_config(&self) {
        let l = SpecConfigLocators;
        let editor = l.editor();
        self.react(&l.save_button(), move |m, dom| {
            m.saved_config = first_value(dom, &editor);
            m.alert = Some("Configuration saved".to_string());
        });
        let editor = l.editor();
        self.react(&l.reset_button(), move |m, dom| {
            if let Some(el) = dom.get_mut(&editor).and_then(|els| els.first_mut()) {
                el.value = Some(m.saved_config.clone());
            }
        });
    }
}
