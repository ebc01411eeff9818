// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Console plugin Kubernetes resource builders
//!
//! [`PluginBuilder`] turns a `FlowCollector` spec into the child resources of the
//! console plugin unit. All functions are pure: no cluster access, no side effects.
//! Owner references are stamped later, when the objects are written.

use crate::constants::{
    CONFIG_DIGEST_ANNOTATION, PLUGIN_CERT_MOUNT_PATH, PLUGIN_CERT_SECRET_NAME,
    PLUGIN_CONFIG_FILE, PLUGIN_CONFIG_MAP_NAME, PLUGIN_CONFIG_MOUNT_PATH, PLUGIN_DISPLAY_NAME,
    PLUGIN_NAME, PLUGIN_PORT_NAME, SERVING_CERT_ANNOTATION,
};
use crate::crd::{
    CertificateReference, ClientTls, FlowCollectorSpec, LokiAuthToken, MountableType,
    QuickFilter,
};
use crate::errors::{Error, Result};
use crate::external_crds::{
    ConsolePlugin, ConsolePluginService, ConsolePluginSpec, EndpointTlsConfig, NamespaceSelector,
    ServiceMonitor, ServiceMonitorEndpoint, ServiceMonitorSpec,
};
use crate::labels::{plugin_labels, plugin_selector};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, PodSpec, PodTemplateSpec,
    SecretVolumeSource, Service, ServiceAccount, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Certificates of the Loki query endpoint.
pub const LOKI_CERTS_PREFIX: &str = "loki-certs";

/// Certificates of the Loki status endpoint.
pub const LOKI_STATUS_CERTS_PREFIX: &str = "loki-status-certs";

/// Builds desired console plugin resources for one namespace, image and spec.
pub struct PluginBuilder<'a> {
    namespace: String,
    image: String,
    spec: &'a FlowCollectorSpec,
    labels: BTreeMap<String, String>,
    selector: BTreeMap<String, String>,
}

impl<'a> PluginBuilder<'a> {
    #[must_use]
    pub fn new(namespace: &str, image: &str, spec: &'a FlowCollectorSpec) -> Self {
        Self {
            namespace: namespace.to_string(),
            image: image.to_string(),
            spec,
            labels: plugin_labels(PLUGIN_NAME),
            selector: plugin_selector(PLUGIN_NAME),
        }
    }

    fn meta(&self, name: &str, namespaced: bool) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespaced.then(|| self.namespace.clone()),
            labels: Some(self.labels.clone()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn service_account(&self) -> ServiceAccount {
        ServiceAccount {
            metadata: self.meta(PLUGIN_NAME, true),
            ..Default::default()
        }
    }

    /// Permissions the plugin backend needs to check the identity of console users.
    #[must_use]
    pub fn cluster_role(&self) -> ClusterRole {
        ClusterRole {
            metadata: self.meta(PLUGIN_NAME, false),
            rules: Some(vec![
                PolicyRule {
                    api_groups: Some(vec!["authentication.k8s.io".to_string()]),
                    resources: Some(vec!["tokenreviews".to_string()]),
                    verbs: vec!["create".to_string()],
                    ..Default::default()
                },
                PolicyRule {
                    api_groups: Some(vec!["authorization.k8s.io".to_string()]),
                    resources: Some(vec!["subjectaccessreviews".to_string()]),
                    verbs: vec!["create".to_string()],
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn cluster_role_binding(&self) -> ClusterRoleBinding {
        ClusterRoleBinding {
            metadata: self.meta(PLUGIN_NAME, false),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "ClusterRole".to_string(),
                name: PLUGIN_NAME.to_string(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: PLUGIN_NAME.to_string(),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            }]),
        }
    }

    #[must_use]
    pub fn console_plugin(&self) -> ConsolePlugin {
        ConsolePlugin {
            metadata: self.meta(PLUGIN_NAME, false),
            spec: ConsolePluginSpec {
                display_name: PLUGIN_DISPLAY_NAME.to_string(),
                service: ConsolePluginService {
                    name: PLUGIN_NAME.to_string(),
                    namespace: self.namespace.clone(),
                    port: self.spec.console_plugin.port,
                    base_path: "/".to_string(),
                },
            },
        }
    }

    /// Plugin configuration and the digest of its content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration cannot be rendered.
    pub fn config_map(&self) -> Result<(ConfigMap, String)> {
        let content = serde_yaml::to_string(&self.plugin_config())
            .map_err(|e| Error::Configuration(format!("failed to render plugin config: {e}")))?;
        let digest = BASE64.encode(Sha256::digest(content.as_bytes()));
        let config_map = ConfigMap {
            metadata: self.meta(PLUGIN_CONFIG_MAP_NAME, true),
            data: Some(BTreeMap::from([(PLUGIN_CONFIG_FILE.to_string(), content)])),
            ..Default::default()
        };
        Ok((config_map, digest))
    }

    fn plugin_config(&self) -> PluginConfig<'_> {
        let plugin = &self.spec.console_plugin;
        let loki = &self.spec.loki;
        let port_naming = if plugin.port_naming.enable {
            plugin.port_naming.port_names.clone()
        } else {
            BTreeMap::new()
        };
        PluginConfig {
            server: ServerConfig {
                port: plugin.port,
                cert_path: format!("{PLUGIN_CERT_MOUNT_PATH}/tls.crt"),
                key_path: format!("{PLUGIN_CERT_MOUNT_PATH}/tls.key"),
            },
            loki: LokiConfig {
                url: loki.querier_url(),
                status_url: loki.status_url(),
                tenant_id: &loki.tenant_id,
                timeout: &loki.timeout,
                forward_user_token: loki.auth_token == LokiAuthToken::Forward,
                tls: tls_config(LOKI_CERTS_PREFIX, &loki.tls),
                status_tls: tls_config(LOKI_STATUS_CERTS_PREFIX, &loki.status_tls),
            },
            frontend: FrontendConfig {
                port_naming,
                quick_filters: &plugin.quick_filters,
            },
        }
    }

    /// Plugin deployment. `config_digest` lands on the pod template so a config
    /// change rolls the pods.
    #[must_use]
    pub fn deployment(&self, config_digest: &str) -> Deployment {
        let plugin = &self.spec.console_plugin;
        let config_path = format!("{PLUGIN_CONFIG_MOUNT_PATH}/{PLUGIN_CONFIG_FILE}");

        let mut volumes = vec![
            Volume {
                name: "config-volume".to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: PLUGIN_CONFIG_MAP_NAME.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Volume {
                name: PLUGIN_CERT_SECRET_NAME.to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(PLUGIN_CERT_SECRET_NAME.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];
        let mut volume_mounts = vec![
            VolumeMount {
                name: "config-volume".to_string(),
                mount_path: PLUGIN_CONFIG_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: PLUGIN_CERT_SECRET_NAME.to_string(),
                mount_path: PLUGIN_CERT_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
        ];
        for (prefix, tls) in [
            (LOKI_CERTS_PREFIX, &self.spec.loki.tls),
            (LOKI_STATUS_CERTS_PREFIX, &self.spec.loki.status_tls),
        ] {
            for (role, reference) in tls_refs(tls) {
                let name = format!("{prefix}-{role}");
                volumes.push(cert_volume(&name, reference));
                volume_mounts.push(VolumeMount {
                    name: name.clone(),
                    mount_path: format!("/var/{name}"),
                    read_only: Some(true),
                    ..Default::default()
                });
            }
        }

        let container = Container {
            name: PLUGIN_NAME.to_string(),
            image: Some(self.image.clone()),
            image_pull_policy: Some(plugin.image_pull_policy.clone()),
            args: Some(vec![
                "-loglevel".to_string(),
                plugin.log_level.clone(),
                "-config".to_string(),
                config_path,
            ]),
            ports: Some(vec![ContainerPort {
                name: Some(PLUGIN_PORT_NAME.to_string()),
                container_port: plugin.port,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            resources: plugin.resources.clone(),
            volume_mounts: Some(volume_mounts),
            ..Default::default()
        };

        Deployment {
            metadata: self.meta(PLUGIN_NAME, true),
            spec: Some(DeploymentSpec {
                replicas: Some(plugin.replicas),
                selector: LabelSelector {
                    match_labels: Some(self.selector.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(self.labels.clone()),
                        annotations: Some(BTreeMap::from([(
                            CONFIG_DIGEST_ANNOTATION.to_string(),
                            config_digest.to_string(),
                        )])),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        volumes: Some(volumes),
                        service_account_name: Some(PLUGIN_NAME.to_string()),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn service_ports(&self) -> Vec<ServicePort> {
        let port = self.spec.console_plugin.port;
        vec![ServicePort {
            name: Some(PLUGIN_PORT_NAME.to_string()),
            port,
            target_port: Some(IntOrString::Int(port)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]
    }

    /// Plugin service. An existing service is kept as is, except for its ports.
    #[must_use]
    pub fn service(&self, existing: Option<&Service>) -> Service {
        if let Some(existing) = existing {
            let mut service = existing.clone();
            service.status = None;
            service.spec.get_or_insert_with(ServiceSpec::default).ports = Some(self.service_ports());
            return service;
        }
        let mut metadata = self.meta(PLUGIN_NAME, true);
        metadata.annotations = Some(BTreeMap::from([(
            SERVING_CERT_ANNOTATION.to_string(),
            PLUGIN_CERT_SECRET_NAME.to_string(),
        )]));
        Service {
            metadata,
            spec: Some(ServiceSpec {
                selector: Some(self.selector.clone()),
                ports: Some(self.service_ports()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn service_monitor(&self) -> ServiceMonitor {
        ServiceMonitor {
            metadata: self.meta(PLUGIN_NAME, true),
            spec: ServiceMonitorSpec {
                endpoints: vec![ServiceMonitorEndpoint {
                    port: Some(PLUGIN_PORT_NAME.to_string()),
                    interval: Some("30s".to_string()),
                    scheme: Some("https".to_string()),
                    path: Some("/metrics".to_string()),
                    tls_config: Some(EndpointTlsConfig {
                        server_name: Some(format!("{PLUGIN_NAME}.{}.svc", self.namespace)),
                        ca_file: Some(
                            "/etc/prometheus/configmaps/serving-certs-ca-bundle/service-ca.crt"
                                .to_string(),
                        ),
                        insecure_skip_verify: false,
                    }),
                }],
                namespace_selector: NamespaceSelector {
                    match_names: vec![self.namespace.clone()],
                },
                selector: LabelSelector {
                    match_labels: Some(self.selector.clone()),
                    ..Default::default()
                },
            },
        }
    }

    #[must_use]
    pub fn auto_scaler(&self) -> HorizontalPodAutoscaler {
        let autoscaler = &self.spec.console_plugin.autoscaler;
        HorizontalPodAutoscaler {
            metadata: self.meta(PLUGIN_NAME, true),
            spec: Some(HorizontalPodAutoscalerSpec {
                min_replicas: autoscaler.min_replicas,
                max_replicas: autoscaler.max_replicas,
                metrics: (!autoscaler.metrics.is_empty()).then(|| autoscaler.metrics.clone()),
                scale_target_ref: CrossVersionObjectReference {
                    api_version: Some("apps/v1".to_string()),
                    kind: "Deployment".to_string(),
                    name: PLUGIN_NAME.to_string(),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn tls_refs(tls: &ClientTls) -> Vec<(&'static str, &CertificateReference)> {
    if !tls.enable {
        return Vec::new();
    }
    [("ca", &tls.ca_cert), ("user", &tls.user_cert)]
        .into_iter()
        .filter(|(_, r)| !r.name.is_empty())
        .collect()
}

fn cert_volume(name: &str, reference: &CertificateReference) -> Volume {
    match reference.r#type {
        MountableType::ConfigMap => Volume {
            name: name.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: reference.name.clone(),
                ..Default::default()
            }),
            ..Default::default()
        },
        MountableType::Secret => Volume {
            name: name.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(reference.name.clone()),
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}

fn tls_config(prefix: &str, tls: &ClientTls) -> Option<TlsConfig> {
    if !tls.enable {
        return None;
    }
    let mut config = TlsConfig {
        insecure_skip_verify: tls.insecure_skip_verify,
        ..TlsConfig::default()
    };
    for (role, reference) in tls_refs(tls) {
        let dir = format!("/var/{prefix}-{role}");
        match role {
            "ca" => config.ca_path = Some(format!("{dir}/{}", reference.cert_file)),
            _ => {
                config.user_cert_path = Some(format!("{dir}/{}", reference.cert_file));
                config.user_key_path = Some(format!("{dir}/{}", reference.cert_key));
            }
        }
    }
    Some(config)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PluginConfig<'a> {
    server: ServerConfig,
    loki: LokiConfig<'a>,
    frontend: FrontendConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerConfig {
    port: i32,
    cert_path: String,
    key_path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LokiConfig<'a> {
    url: &'a str,
    status_url: &'a str,
    tenant_id: &'a str,
    timeout: &'a str,
    forward_user_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls: Option<TlsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_tls: Option<TlsConfig>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct TlsConfig {
    insecure_skip_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ca_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_cert_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_key_path: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrontendConfig<'a> {
    port_naming: BTreeMap<String, String>,
    quick_filters: &'a [QuickFilter],
}

#[cfg(test)]
#[path = "console_resources_tests.rs"]
mod console_resources_tests;
