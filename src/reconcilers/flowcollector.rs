// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `FlowCollector` reconciliation entry point.
//!
//! Each pass builds a fresh [`ConsolePluginReconciler`] bound to the collector as
//! owner and to a child of the shutdown token, moves the plugin if the target
//! namespace changed, then reports the outcome in the collector status.

use crate::constants::KIND_FLOW_COLLECTOR;
use crate::context::Context;
use crate::crd::FlowCollector;
use crate::errors::Error;
use crate::metrics;
use crate::reconcilers::consoleplugin::ConsolePluginReconciler;
use crate::reconcilers::helper::ClientHelper;
use crate::reconcilers::status::FlowCollectorStatusUpdater;
use anyhow::{Context as _, Result};
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const CONDITION_READY: &str = "Ready";
pub const REASON_RECONCILED: &str = "Reconciled";
pub const REASON_DISABLED: &str = "PluginDisabled";
pub const REASON_FAILED: &str = "ReconcileFailed";

/// Namespace the plugin was last deployed to, empty if never.
#[must_use]
pub fn previous_namespace(fc: &FlowCollector) -> String {
    fc.status
        .as_ref()
        .and_then(|s| s.namespace.clone())
        .unwrap_or_default()
}

/// Whether the plugin has to be removed from a namespace it no longer targets.
#[must_use]
pub fn namespace_changed(fc: &FlowCollector) -> bool {
    let previous = previous_namespace(fc);
    !previous.is_empty() && previous != fc.spec.namespace
}

/// Record the pass outcome on the status updater.
pub fn record_outcome(
    updater: &mut FlowCollectorStatusUpdater,
    fc: &FlowCollector,
    outcome: &Result<(), Error>,
) {
    match outcome {
        Ok(()) => {
            let (reason, message) = if fc.spec.console_plugin.enable {
                (REASON_RECONCILED, "Console plugin reconciled")
            } else {
                (REASON_DISABLED, "Console plugin disabled")
            };
            updater.set_condition(CONDITION_READY, "True", reason, message);
            updater.set_namespace(&fc.spec.namespace);
            updater.set_observed_generation(fc.metadata.generation);
        }
        Err(e) => {
            updater.set_condition(CONDITION_READY, "False", REASON_FAILED, &e.to_string());
        }
    }
}

/// Reconcile one `FlowCollector`.
///
/// # Errors
///
/// Returns the pass error, or the status patch error.
pub async fn reconcile_flowcollector(ctx: Arc<Context>, fc: FlowCollector) -> Result<()> {
    let start = Instant::now();
    let name = fc.name_any();
    let namespace = fc.spec.namespace.clone();
    debug!(name = %name, namespace = %namespace, "Reconciling FlowCollector");

    let helper = ClientHelper::new(
        ctx.cluster_client(),
        fc.controller_owner_ref(&()),
        ctx.shutdown.child_token(),
    );
    let reconciler = ConsolePluginReconciler::new(
        helper,
        namespace.clone(),
        previous_namespace(&fc),
        ctx.config.plugin_image.clone(),
        ctx.available_apis,
        Arc::clone(&ctx.cert_watcher),
    );

    if namespace_changed(&fc) {
        let deleted = reconciler.cleanup_namespace().await;
        info!(name = %name, deleted, "Previous namespace cleaned up");
    }

    let outcome = if fc.spec.console_plugin.enable {
        reconciler.reconcile(&fc).await
    } else {
        reconciler.disable().await
    };

    if let Err(e) = &outcome {
        metrics::record_reconciliation_error(KIND_FLOW_COLLECTOR, start.elapsed());
        metrics::record_error(KIND_FLOW_COLLECTOR, e.category());
        if matches!(e, Error::Cancelled) {
            warn!(name = %name, "Reconciliation cancelled");
            return Err(Error::Cancelled.into());
        }
    }

    let mut updater = FlowCollectorStatusUpdater::new(&fc);
    record_outcome(&mut updater, &fc, &outcome);
    updater
        .apply(&ctx.client)
        .await
        .with_context(|| format!("Failed to update status of FlowCollector {name}"))?;

    outcome.with_context(|| format!("Failed to reconcile FlowCollector {name}"))?;
    metrics::record_reconciliation_success(KIND_FLOW_COLLECTOR, start.elapsed());
    Ok(())
}

#[cfg(test)]
#[path = "flowcollector_tests.rs"]
mod flowcollector_tests;
