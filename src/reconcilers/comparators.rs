// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-kind change detection between an existing object and its desired build.
//!
//! Each comparator looks at a fixed set of fields and appends a reason to the
//! [`ChangeReport`] when it returns `true`. Fields the API server or other
//! controllers set (status, defaults, extra labels and annotations) are ignored:
//! desired values only have to be *contained* in the existing object, see
//! [`is_derivative`].

use crate::change_report::ChangeReport;
use crate::external_crds::{ConsolePlugin, ServiceMonitor};
use crate::quantity::{canonical, quantities_equal};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscaler, MetricSpec, MetricTarget};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, PodTemplateSpec, ResourceRequirements, Service,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Whether every value set in `desired` is present and equal in `existing`.
///
/// `null` in `desired` means "not set" and matches anything. Objects match when
/// each desired key matches; arrays must have the same length and match
/// element-wise; scalars must be equal.
#[must_use]
pub fn is_derivative(desired: &Value, existing: &Value) -> bool {
    match (desired, existing) {
        (Value::Null, _) => true,
        (Value::Object(d), Value::Object(e)) => d
            .iter()
            .all(|(k, dv)| is_derivative(dv, e.get(k).unwrap_or(&Value::Null))),
        (Value::Array(d), Value::Array(e)) => {
            d.len() == e.len() && d.iter().zip(e).all(|(dv, ev)| is_derivative(dv, ev))
        }
        _ => desired == existing,
    }
}

/// [`is_derivative`] over typed values. Values that fail to serialize never match.
#[must_use]
pub fn derives<T: Serialize>(desired: &T, existing: &T) -> bool {
    match (serde_json::to_value(desired), serde_json::to_value(existing)) {
        (Ok(d), Ok(e)) => is_derivative(&d, &e),
        _ => false,
    }
}

fn map_contained(
    desired: Option<&BTreeMap<String, String>>,
    existing: Option<&BTreeMap<String, String>>,
) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    desired
        .iter()
        .all(|(k, v)| existing.and_then(|e| e.get(k)) == Some(v))
}

/// Service: unchanged as long as one port serves `port` over TCP.
///
/// Other fields are not compared, so changes made by other controllers are left alone.
pub fn service_needs_update(service: &Service, port: i32, report: &mut ChangeReport) -> bool {
    let matches = service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .is_some_and(|ports| {
            ports
                .iter()
                .any(|p| p.port == port && p.protocol.as_deref().unwrap_or("TCP") == "TCP")
        });
    report.check("Port changed", !matches)
}

/// Console plugin registration: only the service port and namespace are compared.
///
/// The namespace follows a move of the plugin; the old namespace's Service is
/// deleted by the move. Display name and base path are left to other controllers.
pub fn plugin_needs_update(
    existing: &ConsolePlugin,
    desired: &ConsolePlugin,
    report: &mut ChangeReport,
) -> bool {
    report.check(
        "Port changed",
        existing.spec.service.port != desired.spec.service.port,
    ) || report.check(
        "Service namespace changed",
        existing.spec.service.namespace != desired.spec.service.namespace,
    )
}

/// Config map: structural equality of the data entries. Missing data equals empty data.
pub fn config_map_changed(
    existing: &ConfigMap,
    desired: &ConfigMap,
    report: &mut ChangeReport,
) -> bool {
    let empty = BTreeMap::new();
    let old = existing.data.as_ref().unwrap_or(&empty);
    let new = desired.data.as_ref().unwrap_or(&empty);
    report.check("Config changed", old != new)
}

/// Every desired quantity is present in `existing` with the same value.
fn quantities_contained(
    desired: Option<&BTreeMap<String, Quantity>>,
    existing: Option<&BTreeMap<String, Quantity>>,
) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    desired.iter().all(|(name, quantity)| {
        existing
            .and_then(|e| e.get(name))
            .is_some_and(|current| quantities_equal(quantity, current))
    })
}

/// Requests and limits compared by value; the API server canonicalizes them.
fn resources_changed(
    existing: Option<&ResourceRequirements>,
    desired: Option<&ResourceRequirements>,
) -> bool {
    let Some(desired) = desired else {
        return false;
    };
    !quantities_contained(
        desired.limits.as_ref(),
        existing.and_then(|e| e.limits.as_ref()),
    ) || !quantities_contained(
        desired.requests.as_ref(),
        existing.and_then(|e| e.requests.as_ref()),
    ) || !derives(&desired.claims, &existing.and_then(|e| e.claims.clone()))
}

fn find_container<'a>(template: &'a PodTemplateSpec, name: &str) -> Option<&'a Container> {
    template
        .spec
        .as_ref()
        .and_then(|s| s.containers.iter().find(|c| c.name == name))
}

fn container_changed(
    existing: &Container,
    desired: &Container,
    report: &mut ChangeReport,
) -> bool {
    report.check("Image changed", existing.image != desired.image)
        || report.check("Args changed", existing.args != desired.args)
        || report.check("Env changed", !derives(&desired.env, &existing.env))
        || report.check(
            "Resources changed",
            resources_changed(existing.resources.as_ref(), desired.resources.as_ref()),
        )
        || report.check(
            "Pull policy changed",
            desired.image_pull_policy.is_some()
                && existing.image_pull_policy != desired.image_pull_policy,
        )
        || report.check("Ports changed", !derives(&desired.ports, &existing.ports))
        || report.check(
            "Volume mounts changed",
            !derives(&desired.volume_mounts, &existing.volume_mounts),
        )
}

/// Pod template: annotations and labels (desired subset), volumes, service
/// account, and the named container.
pub fn pod_changed(
    existing: &PodTemplateSpec,
    desired: &PodTemplateSpec,
    container: &str,
    report: &mut ChangeReport,
) -> bool {
    let existing_meta = existing.metadata.as_ref();
    let desired_meta = desired.metadata.as_ref();
    if report.check(
        "Annotations changed",
        !map_contained(
            desired_meta.and_then(|m| m.annotations.as_ref()),
            existing_meta.and_then(|m| m.annotations.as_ref()),
        ),
    ) || report.check(
        "Labels changed",
        !map_contained(
            desired_meta.and_then(|m| m.labels.as_ref()),
            existing_meta.and_then(|m| m.labels.as_ref()),
        ),
    ) {
        return true;
    }

    let existing_spec = existing.spec.as_ref();
    let desired_spec = desired.spec.as_ref();
    if report.check(
        "Volumes changed",
        !derives(
            &desired_spec.and_then(|s| s.volumes.clone()),
            &existing_spec.and_then(|s| s.volumes.clone()),
        ),
    ) || report.check(
        "Service account changed",
        desired_spec.and_then(|s| s.service_account_name.as_ref())
            != existing_spec.and_then(|s| s.service_account_name.as_ref()),
    ) {
        return true;
    }

    match (
        find_container(existing, container),
        find_container(desired, container),
    ) {
        (Some(old), Some(new)) => container_changed(old, new, report),
        (None, Some(_)) => report.check("Container missing", true),
        _ => false,
    }
}

/// Deployment: pod template, plus the replica count when `check_replicas` is set.
///
/// With autoscaling enabled the caller passes `check_replicas = false`; the
/// autoscaler owns the replica count.
pub fn deployment_changed(
    existing: &Deployment,
    desired: &Deployment,
    container: &str,
    check_replicas: bool,
    desired_replicas: i32,
    report: &mut ChangeReport,
) -> bool {
    let (Some(old_spec), Some(new_spec)) = (existing.spec.as_ref(), desired.spec.as_ref()) else {
        return report.check("Spec missing", existing.spec.is_none());
    };
    if pod_changed(&old_spec.template, &new_spec.template, container, report) {
        return true;
    }
    let current_replicas = old_spec.replicas.unwrap_or(1);
    if check_replicas && current_replicas != desired_replicas {
        debug!(
            current = current_replicas,
            desired = desired_replicas,
            "Replicas changed"
        );
        return report.check("Replicas changed", true);
    }
    false
}

fn canonical_target(target: &mut MetricTarget) {
    for quantity in [&mut target.value, &mut target.average_value]
        .into_iter()
        .flatten()
    {
        *quantity = canonical(quantity);
    }
}

/// Metrics with their target quantities in value form.
fn canonical_metrics(metrics: Option<&Vec<MetricSpec>>) -> Option<Vec<MetricSpec>> {
    let mut metrics = metrics.cloned()?;
    for metric in &mut metrics {
        let targets = [
            metric.resource.as_mut().map(|m| &mut m.target),
            metric.container_resource.as_mut().map(|m| &mut m.target),
            metric.pods.as_mut().map(|m| &mut m.target),
            metric.object.as_mut().map(|m| &mut m.target),
            metric.external.as_mut().map(|m| &mut m.target),
        ];
        for target in targets.into_iter().flatten() {
            canonical_target(target);
        }
    }
    Some(metrics)
}

/// Autoscaler: replica bounds, target and metrics. Metric target quantities are
/// compared by value.
pub fn autoscaler_changed(
    existing: &HorizontalPodAutoscaler,
    desired: &HorizontalPodAutoscaler,
    report: &mut ChangeReport,
) -> bool {
    let (Some(old), Some(new)) = (existing.spec.as_ref(), desired.spec.as_ref()) else {
        return report.check("Spec missing", existing.spec.is_none());
    };
    report.check(
        "Min replicas changed",
        old.min_replicas.unwrap_or(1) != new.min_replicas.unwrap_or(1),
    ) || report.check("Max replicas changed", old.max_replicas != new.max_replicas)
        || report.check(
            "Scale target changed",
            old.scale_target_ref != new.scale_target_ref,
        )
        || report.check(
            "Metrics changed",
            !derives(
                &canonical_metrics(new.metrics.as_ref()),
                &canonical_metrics(old.metrics.as_ref()),
            ),
        )
}

/// Service monitor: desired spec and labels contained in the existing object.
pub fn service_monitor_changed(
    existing: &ServiceMonitor,
    desired: &ServiceMonitor,
    report: &mut ChangeReport,
) -> bool {
    report.check("Spec changed", !derives(&desired.spec, &existing.spec))
        || report.check(
            "Labels changed",
            !map_contained(
                desired.metadata.labels.as_ref(),
                existing.metadata.labels.as_ref(),
            ),
        )
}

pub fn cluster_role_changed(
    existing: &ClusterRole,
    desired: &ClusterRole,
    report: &mut ChangeReport,
) -> bool {
    report.check("Rules changed", !derives(&desired.rules, &existing.rules))
        || report.check(
            "Labels changed",
            !map_contained(
                desired.metadata.labels.as_ref(),
                existing.metadata.labels.as_ref(),
            ),
        )
}

/// `roleRef` is immutable: a change here needs the binding recreated.
#[must_use]
pub fn role_ref_changed(existing: &ClusterRoleBinding, desired: &ClusterRoleBinding) -> bool {
    existing.role_ref != desired.role_ref
}

pub fn cluster_role_binding_changed(
    existing: &ClusterRoleBinding,
    desired: &ClusterRoleBinding,
    report: &mut ChangeReport,
) -> bool {
    report.check("Role ref changed", role_ref_changed(existing, desired))
        || report.check(
            "Subjects changed",
            !derives(&desired.subjects, &existing.subjects),
        )
}

#[cfg(test)]
#[path = "comparators_tests.rs"]
mod comparators_tests;
