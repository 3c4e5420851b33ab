//! Soft Assertions
//!
//! Collect several independent check failures and report them together,
//! so one scenario run shows every mismatching counter instead of the first.

use crate::result::{StudioError, StudioResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A single assertion failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// Message describing the failure
    pub message: String,
    /// Index of the assertion in the sequence
    pub index: usize,
}

/// Soft assertions collector
///
/// ```ignore
/// let mut soft = SoftAssertions::new();
/// soft.assert_eq(&rows.failed, &header.failed, "failed");
/// soft.assert_eq(&rows.success, &header.success, "success");
/// soft.verify()?;
/// ```
#[derive(Debug, Default)]
pub struct SoftAssertions {
    failures: Vec<AssertionFailure>,
    assertion_count: usize,
}

impl SoftAssertions {
    /// Create a new soft assertions collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert two values are equal
    pub fn assert_eq<T: PartialEq + Debug>(&mut self, actual: &T, expected: &T, message: &str) {
        self.assertion_count += 1;
        if actual != expected {
            self.record_failure(format!("{message}: expected {expected:?}, got {actual:?}"));
        }
    }

    /// Assert a condition is true
    pub fn assert_true(&mut self, condition: bool, message: &str) {
        self.assertion_count += 1;
        if !condition {
            self.record_failure(format!("{message}: expected true, got false"));
        }
    }

    /// Assert a string contains a substring
    pub fn assert_contains(&mut self, haystack: &str, needle: &str, message: &str) {
        self.assertion_count += 1;
        if !haystack.contains(needle) {
            self.record_failure(format!(
                "{message}: expected '{haystack}' to contain '{needle}'"
            ));
        }
    }

    /// Record the outcome of a hard check without stopping
    pub fn check<T>(&mut self, result: StudioResult<T>, message: &str) -> Option<T> {
        self.assertion_count += 1;
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record_failure(format!("{message}: {err}"));
                None
            }
        }
    }

    /// Record a custom failure
    pub fn fail(&mut self, message: impl Into<String>) {
        self.assertion_count += 1;
        self.record_failure(message.into());
    }

    fn record_failure(&mut self, message: String) {
        tracing::debug!(%message, "soft assertion failed");
        let index = self.failures.len();
        self.failures.push(AssertionFailure { message, index });
    }

    /// Get all failures
    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    /// Get the number of failures
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Get the total number of assertions checked
    #[must_use]
    pub const fn assertion_count(&self) -> usize {
        self.assertion_count
    }

    /// Check if all assertions passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Verify all assertions passed
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::SoftAssertions`] listing every failure
    pub fn verify(&self) -> StudioResult<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(StudioError::SoftAssertions {
                count: self.failures.len(),
                failures: self.failures.iter().map(|f| f.message.clone()).collect(),
            })
        }
    }

    /// Get a summary of the assertions
    #[must_use]
    pub fn summary(&self) -> AssertionSummary {
        AssertionSummary {
            total: self.assertion_count,
            passed: self.assertion_count - self.failures.len(),
            failed: self.failures.len(),
        }
    }
}

/// Summary of assertion results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionSummary {
    /// Total assertions checked
    pub total: usize,
    /// Assertions that passed
    pub passed: usize,
    /// Assertions that failed
    pub failed: usize,
}
