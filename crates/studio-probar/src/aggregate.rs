//! Row and header totals.
//!
//! The contract-test table shows per-row result counters and a summary
//! header. These helpers read both sides so a scenario can check that the
//! header equals the sum of the visible rows.

use crate::assertion::SoftAssertions;
use crate::driver::StudioDriver;
use crate::locator::Locator;
use crate::result::{StudioError, StudioResult};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, AddAssign};

/// Attribute holding a counter or cell value
pub const VALUE_ATTRIBUTE: &str = "data-value";

/// Attribute naming a counter sub-element
pub const TYPE_ATTRIBUTE: &str = "data-type";

/// Result counters shown by the contract-test table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    /// Passed tests
    Success,
    /// Failed tests
    Failed,
    /// Tests that errored
    Error,
    /// Operations without tests
    NotCovered,
    /// Excluded operations
    Excluded,
    /// Everything above
    Total,
}

impl Counter {
    /// Every counter, in display order
    pub const ALL: [Self; 6] = [
        Self::Success,
        Self::Failed,
        Self::Error,
        Self::NotCovered,
        Self::Excluded,
        Self::Total,
    ];

    /// Wire key used in `data-type`
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::NotCovered => "notcovered",
            Self::Excluded => "excluded",
            Self::Total => "total",
        }
    }

    /// Selector for this counter's sub-element inside a cell
    #[must_use]
    pub fn sub_selector(self) -> String {
        format!("[{TYPE_ATTRIBUTE}=\"{}\"]", self.key())
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Named counter values; missing counters read as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    /// Passed tests
    pub success: u64,
    /// Failed tests
    pub failed: u64,
    /// Errored tests
    pub error: u64,
    /// Operations without tests
    pub notcovered: u64,
    /// Excluded operations
    pub excluded: u64,
    /// Sum of the above
    pub total: u64,
}

impl Totals {
    /// Value of one counter
    #[must_use]
    pub const fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Success => self.success,
            Counter::Failed => self.failed,
            Counter::Error => self.error,
            Counter::NotCovered => self.notcovered,
            Counter::Excluded => self.excluded,
            Counter::Total => self.total,
        }
    }

    /// Mutable access to one counter
    pub fn get_mut(&mut self, counter: Counter) -> &mut u64 {
        match counter {
            Counter::Success => &mut self.success,
            Counter::Failed => &mut self.failed,
            Counter::Error => &mut self.error,
            Counter::NotCovered => &mut self.notcovered,
            Counter::Excluded => &mut self.excluded,
            Counter::Total => &mut self.total,
        }
    }

    /// Set one counter
    #[must_use]
    pub fn with(mut self, counter: Counter, value: u64) -> Self {
        *self.get_mut(counter) = value;
        self
    }

    /// Counters whose values differ, as `(counter, self, other)`
    #[must_use]
    pub fn mismatches(&self, other: &Self) -> Vec<(Counter, u64, u64)> {
        Counter::ALL
            .into_iter()
            .filter(|c| self.get(*c) != other.get(*c))
            .map(|c| (c, self.get(c), other.get(c)))
            .collect()
    }
}

impl Add for Totals {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        for counter in Counter::ALL {
            *self.get_mut(counter) += rhs.get(counter);
        }
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Counter::ALL
            .iter()
            .map(|c| format!("{c}={}", self.get(*c)))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Parse a displayed count; missing or unparseable values are zero
#[must_use]
pub fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Sum the counters of every visible match of `cells`.
///
/// Each counter is read from the cell's `[data-type="<counter>"]`
/// sub-element. The reads of all cells are issued concurrently, and the
/// result does not depend on row order.
pub async fn aggregate_row_counts(
    driver: &dyn StudioDriver,
    cells: &Locator,
    counters: &[Counter],
) -> StudioResult<Totals> {
    let matched = cells.resolve(driver).await?;
    let reads = matched
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.visible)
        .flat_map(|(index, _)| counters.iter().map(move |counter| (index, *counter)))
        .map(|(index, counter)| async move {
            let value = cells
                .nth(index)
                .locator(counter.sub_selector())
                .attribute(driver, VALUE_ATTRIBUTE)
                .await?;
            Ok::<_, StudioError>((counter, parse_count(value.as_deref())))
        });

    let mut totals = Totals::default();
    for (counter, value) in try_join_all(reads).await? {
        *totals.get_mut(counter) += value;
    }
    tracing::debug!(cells = %cells, rows = matched.len(), %totals, "aggregated row counts");
    Ok(totals)
}

/// Read the summary header counters
pub async fn read_summary_header_totals<F>(
    driver: &dyn StudioDriver,
    header_counter: F,
    counters: &[Counter],
) -> StudioResult<Totals>
where
    F: Fn(Counter) -> Locator,
{
    let reads = counters.iter().map(|counter| {
        let locator = header_counter(*counter);
        async move {
            let value = locator.attribute(driver, VALUE_ATTRIBUTE).await?;
            Ok::<_, StudioError>((*counter, parse_count(value.as_deref())))
        }
    });

    let mut totals = Totals::default();
    for (counter, value) in try_join_all(reads).await? {
        *totals.get_mut(counter) = value;
    }
    Ok(totals)
}

/// Distinct `data-value`s of the visible cells of a column
pub async fn distinct_column_values(
    driver: &dyn StudioDriver,
    cells: &Locator,
) -> StudioResult<BTreeSet<String>> {
    Ok(cells
        .resolve(driver)
        .await?
        .into_iter()
        .filter(|cell| cell.visible)
        .map(|cell| {
            cell.attribute(VALUE_ATTRIBUTE)
                .map_or_else(|| cell.text.trim().to_string(), str::to_string)
        })
        .collect())
}

/// Compare every counter, reporting all mismatches together
pub fn verify_totals(rows: &Totals, header: &Totals) -> StudioResult<()> {
    let mut soft = SoftAssertions::new();
    for counter in Counter::ALL {
        soft.assert_eq(
            &rows.get(counter),
            &header.get(counter),
            &format!("{counter} (rows vs header)"),
        );
    }
    soft.verify()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use proptest::prelude::*;

    fn result_cell(counts: &[(Counter, u64)]) -> MockElement {
        counts.iter().fold(MockElement::new("td"), |cell, (c, v)| {
            cell.child(
                c.sub_selector(),
                MockElement::new("span").attr(VALUE_ATTRIBUTE, v.to_string()),
            )
        })
    }

    mod parse_count_tests {
        use super::*;

        #[test]
        fn test_parse_count() {
            assert_eq!(parse_count(Some(" 12 ")), 12);
            assert_eq!(parse_count(Some("n/a")), 0);
            assert_eq!(parse_count(Some("")), 0);
            assert_eq!(parse_count(None), 0);
        }
    }

    mod totals_tests {
        use super::*;

        #[test]
        fn test_add_and_mismatches() {
            let a = Totals::default().with(Counter::Success, 12).with(Counter::Total, 12);
            let b = Totals::default().with(Counter::Failed, 20).with(Counter::Total, 20);
            let sum = a + b;
            assert_eq!(sum.total, 32);
            assert_eq!(sum.mismatches(&sum), vec![]);
            assert_eq!(
                a.mismatches(&b),
                vec![
                    (Counter::Success, 12, 0),
                    (Counter::Failed, 0, 20),
                    (Counter::Total, 12, 20)
                ]
            );
        }

        #[test]
        fn test_display_and_serde_keys() {
            let totals = Totals::default().with(Counter::NotCovered, 5);
            assert!(totals.to_string().contains("notcovered=5"));
            let json = serde_json::to_value(totals).unwrap();
            assert_eq!(json["notcovered"], 5);
            let parsed: Totals = serde_json::from_str(r#"{"failed": 3}"#).unwrap();
            assert_eq!(parsed, Totals::default().with(Counter::Failed, 3));
        }

        #[test]
        fn test_verify_totals_reports_all() {
            let rows = Totals::default().with(Counter::Success, 1).with(Counter::Total, 1);
            let header = Totals::default();
            match verify_totals(&rows, &header).unwrap_err() {
                StudioError::SoftAssertions { count, failures } => {
                    assert_eq!(count, 2);
                    assert!(failures[0].starts_with("success"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(verify_totals(&rows, &rows).is_ok());
        }
    }

    mod aggregation_tests {
        use super::*;

        #[tokio::test]
        async fn test_sums_visible_rows_only() {
            let driver = MockDriver::new();
            let cells = Locator::new("tbody tr td[data-key=\"result\"]");
            driver.set(
                &cells,
                vec![
                    result_cell(&[(Counter::Success, 12), (Counter::Total, 12)]),
                    result_cell(&[(Counter::Failed, 20), (Counter::Total, 20)]),
                    result_cell(&[(Counter::Failed, 99), (Counter::Total, 99)]).hidden(),
                    result_cell(&[(Counter::NotCovered, 5), (Counter::Total, 5)]),
                ],
            );
            let totals = aggregate_row_counts(&driver, &cells, &Counter::ALL).await.unwrap();
            assert_eq!(
                totals,
                Totals {
                    success: 12,
                    failed: 20,
                    error: 0,
                    notcovered: 5,
                    excluded: 0,
                    total: 37,
                }
            );
        }

        #[tokio::test]
        async fn test_no_rows_is_zero() {
            let driver = MockDriver::new();
            let totals = aggregate_row_counts(&driver, &Locator::new("td"), &Counter::ALL)
                .await
                .unwrap();
            assert_eq!(totals, Totals::default());
        }

        #[tokio::test]
        async fn test_header_totals_match_rows() {
            let driver = MockDriver::new();
            let header = |c: Counter| Locator::new(format!("ul.summary li[data-type=\"{c}\"]"));
            driver.set(
                &header(Counter::Failed),
                vec![MockElement::new("li").attr(VALUE_ATTRIBUTE, "20")],
            );
            driver.set(
                &header(Counter::Total),
                vec![MockElement::new("li").attr(VALUE_ATTRIBUTE, "20")],
            );
            let totals = read_summary_header_totals(&driver, header, &Counter::ALL)
                .await
                .unwrap();
            assert_eq!(totals, Totals::default().with(Counter::Failed, 20).with(Counter::Total, 20));
        }

        #[tokio::test]
        async fn test_distinct_column_values() {
            let driver = MockDriver::new();
            let cells = Locator::new("tbody tr td[data-key=\"path\"]");
            driver.set(
                &cells,
                vec![
                    MockElement::new("td").attr(VALUE_ATTRIBUTE, "/pets"),
                    MockElement::new("td").attr(VALUE_ATTRIBUTE, "/pets"),
                    MockElement::new("td").attr(VALUE_ATTRIBUTE, "/owners"),
                    MockElement::new("td").attr(VALUE_ATTRIBUTE, "/hidden").hidden(),
                ],
            );
            let values = distinct_column_values(&driver, &cells).await.unwrap();
            assert_eq!(values.len(), 2);
            assert!(values.contains("/owners"));
        }
    }

    proptest! {
        #[test]
        fn prop_aggregation_ignores_row_order(
            rows in proptest::collection::vec((0_u64..50, 0_u64..50, 0_u64..50), 0..8),
            seed in any::<u64>(),
        ) {
            let cells = Locator::new("td[data-key=\"result\"]");
            let build = |rows: &[(u64, u64, u64)]| {
                rows.iter()
                    .map(|(s, f, n)| result_cell(&[
                        (Counter::Success, *s),
                        (Counter::Failed, *f),
                        (Counter::NotCovered, *n),
                    ]))
                    .collect::<Vec<_>>()
            };
            let mut shuffled = rows.clone();
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left(usize::try_from(seed % len as u64).unwrap());
                shuffled.reverse();
            }

            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let (a, b) = runtime.block_on(async {
                let first = MockDriver::new();
                first.set(&cells, build(&rows));
                let second = MockDriver::new();
                second.set(&cells, build(&shuffled));
                (
                    aggregate_row_counts(&first, &cells, &Counter::ALL).await.unwrap(),
                    aggregate_row_counts(&second, &cells, &Counter::ALL).await.unwrap(),
                )
            });
            prop_assert_eq!(a, b);
            prop_assert_eq!(a.success, rows.iter().map(|r| r.0).sum::<u64>());
        }
    }
}
