// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants stamped on every resource the operator creates.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_NETOBSERV: &str = "netobserv-operator";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_FLOWCONSOLE: &str = "flowconsole";

/// Component value for the console plugin
pub const COMPONENT_CONSOLE_PLUGIN: &str = "console-plugin";

// ============================================================================
// Selector Labels
// ============================================================================

/// Pod selector label shared by the Deployment, Service and `ServiceMonitor`
pub const APP_LABEL: &str = "app";

/// Build the labels carried by every console plugin child resource.
///
/// The selector label is included so the same map can label pods.
#[must_use]
pub fn plugin_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), app.to_string()),
        (K8S_COMPONENT.to_string(), COMPONENT_CONSOLE_PLUGIN.to_string()),
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_FLOWCONSOLE.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_NETOBSERV.to_string()),
    ])
}

/// Build the pod selector for the console plugin.
#[must_use]
pub fn plugin_selector(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), app.to_string())])
}
