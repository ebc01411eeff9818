// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Create-if-absent, update-if-changed.
//!
//! Every reconciled kind goes through [`reconcile_owned`]: the step supplies the
//! object seen at fetch time, the desired object and the kind's comparator.

use crate::change_report::ChangeReport;
use crate::errors::Result;
use crate::reconcilers::client::{ClusterClient, ManagedResource};
use crate::reconcilers::helper::ClientHelper;
use kube::ResourceExt;
use tracing::debug;

/// What a reconcile step did to its object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Converge one object towards `desired`.
///
/// - `current` is `None`: create `desired`, the comparator does not run.
/// - `changed(existing, desired, report)` is true: replace the existing object.
/// - otherwise nothing is written.
///
/// Reasons go to a [`ChangeReport`] titled after the object, logged when the step ends.
///
/// # Errors
///
/// Returns the create or update error unchanged.
pub async fn reconcile_owned<C, K, F>(
    helper: &ClientHelper<C>,
    current: Option<&K>,
    desired: K,
    changed: F,
) -> Result<Outcome>
where
    C: ClusterClient,
    K: ManagedResource,
    F: FnOnce(&K, &K, &mut ChangeReport) -> bool,
{
    let Some(existing) = current else {
        helper.create_owned(desired).await?;
        return Ok(Outcome::Created);
    };

    let mut report = ChangeReport::new(format!("{} {}", K::kind_name(), desired.name_any()));
    if changed(existing, &desired, &mut report) {
        helper.update_owned(existing, desired).await?;
        return Ok(Outcome::Updated);
    }
    debug!(kind = %K::kind_name(), name = %desired.name_any(), "Up to date");
    Ok(Outcome::Unchanged)
}

#[cfg(test)]
#[path = "generic_tests.rs"]
mod generic_tests;
