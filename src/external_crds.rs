// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed views of custom resources owned by other controllers.
//!
//! Their CRDs are installed by the console operator and the Prometheus operator, so
//! schema generation is disabled. Only the fields the operator reads or writes are
//! typed; unknown spec fields are kept verbatim so a read-modify-write never drops
//! data written by the owning controller.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registration of a dynamic plugin with the web console.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[kube(
    group = "console.openshift.io",
    version = "v1alpha1",
    kind = "ConsolePlugin",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ConsolePluginSpec {
    pub display_name: String,
    pub service: ConsolePluginService,
}

/// Service the console proxies plugin assets from.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsolePluginService {
    pub name: String,
    pub namespace: String,
    pub port: i32,
    pub base_path: String,
}

/// Console operator configuration, a cluster singleton named `cluster`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[kube(
    group = "operator.openshift.io",
    version = "v1",
    kind = "Console",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSpec {
    /// Names of the enabled console plugins.
    #[serde(default)]
    pub plugins: Vec<String>,

    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// Prometheus operator scrape configuration.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[kube(
    group = "monitoring.coreos.com",
    version = "v1",
    kind = "ServiceMonitor",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMonitorSpec {
    #[serde(default)]
    pub endpoints: Vec<ServiceMonitorEndpoint>,

    #[serde(default)]
    pub namespace_selector: NamespaceSelector,

    pub selector: LabelSelector,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMonitorEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<EndpointTlsConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointTlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,

    #[serde(default)]
    pub insecure_skip_verify: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_names: Vec<String>,
}
