// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `FlowCollector`.
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! # Example
//!
//! ```rust,no_run
//! use flowconsole::reconcilers::status::create_condition;
//!
//! let condition = create_condition("Ready", "True", "Reconciled", "Console plugin ready");
//! assert_eq!(condition.status, "True");
//! ```

use crate::constants::{API_GROUP_VERSION, KIND_FLOW_COLLECTOR};
use crate::crd::{Condition, FlowCollector, FlowCollectorStatus};
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved while the status stays the same.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
            curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Collects status changes during a pass and writes them in one patch.
///
/// Writing only when something changed keeps status updates from retriggering the
/// controller in a loop.
pub struct FlowCollectorStatusUpdater {
    name: String,
    current_status: Option<FlowCollectorStatus>,
    new_status: FlowCollectorStatus,
}

impl FlowCollectorStatusUpdater {
    #[must_use]
    pub fn new(flow_collector: &FlowCollector) -> Self {
        let current_status = flow_collector.status.clone();
        let new_status = current_status.clone().unwrap_or_default();
        Self {
            name: flow_collector.name_any(),
            current_status,
            new_status,
        }
    }

    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    /// Record the namespace the plugin is now deployed to.
    pub fn set_namespace(&mut self, namespace: &str) {
        self.new_status.namespace = Some(namespace.to_string());
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    #[must_use]
    pub fn status(&self) -> &FlowCollectorStatus {
        &self.new_status
    }

    /// Whether the collected status differs semantically from the current one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.namespace != self.new_status.namespace
                    || current.observed_generation != self.new_status.observed_generation
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    /// Patch the status subresource, skipping the call when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails.
    pub async fn apply(&self, client: &Client) -> Result<(), kube::Error> {
        if !self.has_changes() {
            debug!("FlowCollector {} status unchanged, skipping update", self.name);
            return Ok(());
        }

        let api: Api<FlowCollector> = Api::all(client.clone());
        let patch = json!({
            "apiVersion": API_GROUP_VERSION,
            "kind": KIND_FLOW_COLLECTOR,
            "status": self.new_status,
        });
        api.patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(
            "Updated FlowCollector {} status: {} condition(s)",
            self.name,
            self.new_status.conditions.len()
        );
        Ok(())
    }
}
