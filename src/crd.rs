// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the network flow collector.
//!
//! The operator only acts on the console plugin section of [`FlowCollector`]; the
//! Loki section is read to render the plugin configuration and to locate the
//! client certificates mounted into the plugin pod.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowconsole::crd::{FlowCollectorConsolePlugin, FlowCollectorSpec};
//!
//! let spec = FlowCollectorSpec {
//!     namespace: "netobserv".to_string(),
//!     console_plugin: FlowCollectorConsolePlugin {
//!         replicas: 2,
//!         ..FlowCollectorConsolePlugin::default()
//!     },
//!     ..FlowCollectorSpec::default()
//! };
//! assert!(spec.console_plugin.enable);
//! ```

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_PLUGIN_PORT};
use k8s_openapi::api::autoscaling::v2::MetricSpec;
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard Kubernetes condition, shared by all status subresources.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. The operator reports `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `FlowCollector` is the cluster-wide declaration of the network observability stack.
///
/// # Example
///
/// ```yaml
/// apiVersion: flows.netobserv.io/v1beta1
/// kind: FlowCollector
/// metadata:
///   name: cluster
/// spec:
///   namespace: netobserv
///   consolePlugin:
///     register: true
///     port: 9001
///     autoscaler:
///       status: Enabled
///       minReplicas: 1
///       maxReplicas: 3
///   loki:
///     url: http://loki.netobserv.svc:3100/
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "flows.netobserv.io",
    version = "v1beta1",
    kind = "FlowCollector",
    shortname = "fc",
    doc = "FlowCollector is the schema for the network flows collection API. The console plugin section drives the deployment of the web console plugin that browses the collected flows."
)]
#[kube(status = "FlowCollectorStatus")]
#[kube(printcolumn = r#"{"name":"Namespace","type":"string","jsonPath":".status.namespace"}"#)]
#[serde(rename_all = "camelCase")]
pub struct FlowCollectorSpec {
    /// Namespace where the console plugin and its companions are deployed.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Console plugin settings.
    #[serde(default)]
    pub console_plugin: FlowCollectorConsolePlugin,

    /// Loki settings, used by the plugin to query flows.
    #[serde(default)]
    pub loki: FlowCollectorLoki,
}

/// `FlowCollector` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowCollectorStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Namespace the unit was last deployed to; a different spec namespace triggers
    /// the cleanup of this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Console plugin settings.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowCollectorConsolePlugin {
    /// Deploy the console plugin. When false, the operator removes it.
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Register the plugin in the console operator configuration.
    #[serde(default = "default_true")]
    pub register: bool,

    /// Number of replicas. Ignored while the autoscaler is enabled.
    #[serde(default = "default_replicas")]
    #[schemars(range(min = 0))]
    pub replicas: i32,

    /// HTTPS port served by the plugin.
    #[serde(default = "default_port")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: i32,

    /// Image pull policy of the plugin container.
    #[serde(default = "default_pull_policy")]
    pub image_pull_policy: String,

    /// Compute resources of the plugin container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Log level of the plugin backend.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Horizontal pod autoscaler settings.
    #[serde(default)]
    pub autoscaler: FlowCollectorHpa,

    /// Friendly names shown instead of well-known port numbers.
    #[serde(default)]
    pub port_naming: ConsolePluginPortConfig,

    /// Preset filters offered in the console.
    #[serde(default)]
    pub quick_filters: Vec<QuickFilter>,
}

impl Default for FlowCollectorConsolePlugin {
    fn default() -> Self {
        Self {
            enable: true,
            register: true,
            replicas: default_replicas(),
            port: default_port(),
            image_pull_policy: default_pull_policy(),
            resources: None,
            log_level: default_log_level(),
            autoscaler: FlowCollectorHpa::default(),
            port_naming: ConsolePluginPortConfig::default(),
            quick_filters: Vec::new(),
        }
    }
}

/// Autoscaler toggle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum HpaStatus {
    #[default]
    Disabled,
    Enabled,
}

/// Horizontal pod autoscaler settings.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowCollectorHpa {
    #[serde(default)]
    pub status: HpaStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub min_replicas: Option<i32>,

    #[serde(default = "default_max_replicas")]
    #[schemars(range(min = 1))]
    pub max_replicas: i32,

    /// Metrics the autoscaler scales on (autoscaling/v2 format).
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

impl Default for FlowCollectorHpa {
    fn default() -> Self {
        Self {
            status: HpaStatus::Disabled,
            min_replicas: None,
            max_replicas: default_max_replicas(),
            metrics: Vec::new(),
        }
    }
}

impl FlowCollectorHpa {
    /// Whether the autoscaler must be absent and replicas are driven by the spec.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.status == HpaStatus::Disabled
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsolePluginPortConfig {
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Port number to display name, e.g. `"3100": "loki"`.
    #[serde(default)]
    pub port_names: BTreeMap<String, String>,
}

impl Default for ConsolePluginPortConfig {
    fn default() -> Self {
        Self {
            enable: true,
            port_names: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuickFilter {
    pub name: String,
    pub filter: BTreeMap<String, String>,
    #[serde(default)]
    pub default: bool,
}

/// How the plugin forwards user tokens to Loki.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum LokiAuthToken {
    #[default]
    Disabled,
    Host,
    Forward,
}

/// Loki settings.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowCollectorLoki {
    /// Base URL of Loki, used for both ingestion and queries unless overridden.
    #[serde(default = "default_loki_url")]
    pub url: String,

    /// Query frontend URL. Falls back to `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub querier_url: Option<String>,

    /// URL of the Loki status endpoints. Falls back to the querier URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,

    #[serde(default = "default_tenant_id", rename = "tenantID")]
    pub tenant_id: String,

    /// Query timeout, as a duration string (e.g. `10s`).
    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default)]
    pub auth_token: LokiAuthToken,

    /// TLS settings of the query endpoint.
    #[serde(default)]
    pub tls: ClientTls,

    /// TLS settings of the status endpoint.
    #[serde(default)]
    pub status_tls: ClientTls,
}

impl Default for FlowCollectorLoki {
    fn default() -> Self {
        Self {
            url: default_loki_url(),
            querier_url: None,
            status_url: None,
            tenant_id: default_tenant_id(),
            timeout: default_timeout(),
            auth_token: LokiAuthToken::Disabled,
            tls: ClientTls::default(),
            status_tls: ClientTls::default(),
        }
    }
}

impl FlowCollectorLoki {
    /// URL used to run flow queries.
    #[must_use]
    pub fn querier_url(&self) -> &str {
        match self.querier_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => &self.url,
        }
    }

    /// URL used to read Loki readiness and build info.
    #[must_use]
    pub fn status_url(&self) -> &str {
        match self.status_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => self.querier_url(),
        }
    }
}

/// Client TLS settings for an outgoing connection.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientTls {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Certificate authority used to verify the server.
    #[serde(default)]
    pub ca_cert: CertificateReference,

    /// Client certificate for mutual TLS.
    #[serde(default)]
    pub user_cert: CertificateReference,
}

impl ClientTls {
    /// Certificate references that must be mounted and watched. Disabled blocks have none.
    #[must_use]
    pub fn certificate_refs(&self) -> Vec<&CertificateReference> {
        if !self.enable {
            return Vec::new();
        }
        [&self.ca_cert, &self.user_cert]
            .into_iter()
            .filter(|r| !r.name.is_empty())
            .collect()
    }
}

/// Kind of object holding a certificate.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MountableType {
    #[default]
    #[serde(rename = "configmap")]
    ConfigMap,
    Secret,
}

impl std::fmt::Display for MountableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigMap => write!(f, "configmap"),
            Self::Secret => write!(f, "secret"),
        }
    }
}

/// Reference to a certificate stored in a `ConfigMap` or `Secret`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CertificateReference {
    #[serde(default)]
    pub r#type: MountableType,

    /// Name of the `ConfigMap` or `Secret`. Empty means no certificate.
    #[serde(default)]
    pub name: String,

    /// Namespace of the object. Defaults to the plugin namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Entry holding the certificate.
    #[serde(default)]
    pub cert_file: String,

    /// Entry holding the private key, for client certificates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_key: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_replicas() -> i32 {
    1
}

fn default_port() -> i32 {
    DEFAULT_PLUGIN_PORT
}

fn default_pull_policy() -> String {
    "IfNotPresent".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_replicas() -> i32 {
    3
}

fn default_loki_url() -> String {
    "http://loki:3100/".to_string()
}

fn default_tenant_id() -> String {
    "netobserv".to_string()
}

fn default_timeout() -> String {
    "10s".to_string()
}

impl Default for FlowCollectorSpec {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            console_plugin: FlowCollectorConsolePlugin::default(),
            loki: FlowCollectorLoki::default(),
        }
    }
}
