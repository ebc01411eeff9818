// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the console plugin operator.
//!
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Fully qualified API version (group/version) of the `FlowCollector` CRD
pub const API_GROUP_VERSION: &str = "flows.netobserv.io/v1beta1";

/// Kind name for `FlowCollector` resource
pub const KIND_FLOW_COLLECTOR: &str = "FlowCollector";

/// API group serving `ServiceMonitor`, checked by capability discovery
pub const MONITORING_API_GROUP: &str = "monitoring.coreos.com";

/// Kind name for the Prometheus operator `ServiceMonitor`
pub const KIND_SERVICE_MONITOR: &str = "ServiceMonitor";

// ============================================================================
// Console Plugin Constants
// ============================================================================

/// Name shared by every child resource of the console plugin unit
pub const PLUGIN_NAME: &str = "netobserv-plugin";

/// Name of the generated plugin configuration `ConfigMap`
pub const PLUGIN_CONFIG_MAP_NAME: &str = "console-plugin-config";

/// Key of the plugin configuration inside the `ConfigMap`
pub const PLUGIN_CONFIG_FILE: &str = "config.yaml";

/// Directory the configuration volume is mounted at
pub const PLUGIN_CONFIG_MOUNT_PATH: &str = "/opt/app-root/config";

/// Name of the serving certificate secret (provisioned by the service CA)
pub const PLUGIN_CERT_SECRET_NAME: &str = "console-serving-cert";

/// Directory the serving certificate is mounted at
pub const PLUGIN_CERT_MOUNT_PATH: &str = "/var/serving-cert";

/// Default HTTPS port of the plugin server
pub const DEFAULT_PLUGIN_PORT: i32 = 9001;

/// Name of the plugin container port
pub const PLUGIN_PORT_NAME: &str = "main";

/// Display name shown in the console for the plugin
pub const PLUGIN_DISPLAY_NAME: &str = "NetObserv plugin";

/// Default namespace the unit is deployed to
pub const DEFAULT_NAMESPACE: &str = "netobserv";

/// Name of the cluster-scoped console operator configuration
pub const CONSOLE_CONFIG_NAME: &str = "cluster";

// ============================================================================
// Annotation Constants
// ============================================================================

/// Pod template annotation carrying the configuration digest
pub const CONFIG_DIGEST_ANNOTATION: &str = "flows.netobserv.io/plugin-config";

/// Prefix of pod template annotations carrying watched certificate digests
pub const WATCHED_CERT_ANNOTATION_PREFIX: &str = "flows.netobserv.io/watched-";

/// Annotation asking the service CA to provision the serving certificate
pub const SERVING_CERT_ANNOTATION: &str = "service.beta.openshift.io/serving-cert-secret-name";

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Default requeue interval after a successful pass (5 minutes)
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 300;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address of the metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";
