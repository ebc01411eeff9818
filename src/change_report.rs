// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Human-readable reasons why a resource was judged changed.
//!
//! A report is created per reconciled kind, filled by the comparators, and logged
//! once when it goes out of scope. It never influences control flow.

use tracing::info;

/// Append-only list of change reasons for one reconciled kind.
#[derive(Debug, Default)]
pub struct ChangeReport {
    title: String,
    changes: Vec<String>,
}

impl ChangeReport {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            changes: Vec::new(),
        }
    }

    /// Record a change reason.
    pub fn add(&mut self, change: impl Into<String>) {
        self.changes.push(change.into());
    }

    /// Record `change` when `changed` is true, and return `changed`.
    ///
    /// Lets comparators chain checks as `report.check("Image changed", a != b)`.
    pub fn check(&mut self, change: &str, changed: bool) -> bool {
        if changed {
            self.add(change);
        }
        changed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn changes(&self) -> &[String] {
        &self.changes
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl std::fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.changes.join(", "))
    }
}

impl Drop for ChangeReport {
    fn drop(&mut self) {
        if !self.changes.is_empty() {
            info!(report = %self.title, changes = ?self.changes, "Changes detected");
        }
    }
}
