// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the console plugin reconciler

#[cfg(test)]
mod tests {
    use crate::capabilities::AvailableApis;
    use crate::certificates::CertificateWatcher;
    use crate::constants::{CONFIG_DIGEST_ANNOTATION, PLUGIN_CONFIG_MAP_NAME, PLUGIN_NAME};
    use crate::crd::{
        CertificateReference, ClientTls, FlowCollector, FlowCollectorHpa, FlowCollectorSpec,
        HpaStatus, MountableType,
    };
    use crate::errors::Error;
    use crate::external_crds::{Console, ConsolePlugin, ConsoleSpec};
    use crate::reconcilers::consoleplugin::ConsolePluginReconciler;
    use crate::reconcilers::fake_client::{FakeClusterClient, Verb};
    use crate::reconcilers::helper::ClientHelper;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
    use k8s_openapi::api::core::v1::{ConfigMap, ResourceRequirements, Service};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    const NS: &str = "netobserv";
    const IMAGE: &str = "quay.io/netobserv/network-observability-console-plugin:v1.0.0";

    fn flow_collector(spec: FlowCollectorSpec) -> FlowCollector {
        FlowCollector::new("cluster", spec)
    }

    fn reconciler(
        client: &FakeClusterClient,
        namespace: &str,
        previous: &str,
        apis: AvailableApis,
    ) -> ConsolePluginReconciler<FakeClusterClient> {
        ConsolePluginReconciler::new(
            ClientHelper::new(client.clone(), None, CancellationToken::new()),
            namespace,
            previous,
            IMAGE,
            apis,
            Arc::new(CertificateWatcher::new()),
        )
    }

    async fn pass(client: &FakeClusterClient, spec: &FlowCollectorSpec) {
        reconciler(client, NS, "", AvailableApis::default())
            .reconcile(&flow_collector(spec.clone()))
            .await
            .expect("pass succeeds");
    }

    fn enabled_autoscaler() -> FlowCollectorHpa {
        FlowCollectorHpa {
            status: HpaStatus::Enabled,
            min_replicas: Some(1),
            max_replicas: 3,
            metrics: Vec::new(),
        }
    }

    fn stored_replicas(client: &FakeClusterClient) -> Option<i32> {
        client
            .object::<Deployment>(NS, PLUGIN_NAME)
            .and_then(|d| d.spec)
            .and_then(|s| s.replicas)
    }

    #[tokio::test]
    async fn test_first_pass_creates_every_child_once() {
        let client = FakeClusterClient::new();
        pass(&client, &FlowCollectorSpec::default()).await;

        for kind in [
            "Deployment",
            "Service",
            "ConfigMap",
            "ServiceAccount",
            "ConsolePlugin",
            "ClusterRole",
            "ClusterRoleBinding",
        ] {
            assert_eq!(client.count(Verb::Create, kind), 1, "{kind} created once");
        }
        assert_eq!(client.count(Verb::Create, "HorizontalPodAutoscaler"), 0);
        assert_eq!(client.updates(), 0);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let client = FakeClusterClient::new();
        let spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;
        client.clear_calls();

        pass(&client, &spec).await;
        assert_eq!(client.updates(), 0);
        assert_eq!(client.writes(), 0);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent_with_autoscaler() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        spec.console_plugin.autoscaler = enabled_autoscaler();
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Create, "HorizontalPodAutoscaler"), 1);
        client.clear_calls();

        pass(&client, &spec).await;
        assert_eq!(client.writes(), 0);
    }

    fn limits(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    }

    #[tokio::test]
    async fn test_canonicalized_resources_do_not_trigger_updates() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        spec.console_plugin.resources = Some(ResourceRequirements {
            limits: Some(limits("1000m", "1024Mi")),
            ..Default::default()
        });
        pass(&client, &spec).await;

        // the API server stores quantities in canonical form
        let mut stored: Deployment = client.object(NS, PLUGIN_NAME).expect("deployment");
        if let Some(container) = stored
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .and_then(|p| p.containers.first_mut())
        {
            container.resources = Some(ResourceRequirements {
                limits: Some(limits("1", "1Gi")),
                ..Default::default()
            });
        }
        client.insert(stored);
        client.clear_calls();

        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Deployment"), 0);
        assert_eq!(client.writes(), 0);
    }

    #[tokio::test]
    async fn test_deleted_child_is_recreated_alone() {
        let client = FakeClusterClient::new();
        let spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;
        let helper = ClientHelper::new(client.clone(), None, CancellationToken::new());
        helper
            .delete::<Service>(NS, PLUGIN_NAME)
            .await
            .expect("delete succeeds");
        client.clear_calls();

        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Create, "Service"), 1);
        assert_eq!(client.count(Verb::Update, "Service"), 0);
        assert_eq!(client.writes(), 1);
    }

    #[tokio::test]
    async fn test_service_drift_outside_ports_is_ignored() {
        let client = FakeClusterClient::new();
        let spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;

        let mut service: Service = client.object(NS, PLUGIN_NAME).expect("service");
        service.metadata.labels = Some(BTreeMap::from([(
            "owned-by".to_string(),
            "another-controller".to_string(),
        )]));
        client.insert(service);
        client.clear_calls();

        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Service"), 0);
    }

    #[tokio::test]
    async fn test_port_change_updates_service_once() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;
        client.clear_calls();

        spec.console_plugin.port = 9443;
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Service"), 1);
        assert_eq!(client.count(Verb::Update, "ConsolePlugin"), 1);
        let plugin: ConsolePlugin = client.object("", PLUGIN_NAME).expect("plugin");
        assert_eq!(plugin.spec.service.port, 9443);
    }

    #[tokio::test]
    async fn test_replicas_ignored_while_autoscaler_enabled() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        spec.console_plugin.autoscaler = enabled_autoscaler();
        pass(&client, &spec).await;
        client.clear_calls();

        spec.console_plugin.replicas = 5;
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Deployment"), 0);
        assert_eq!(stored_replicas(&client), Some(1));
    }

    #[tokio::test]
    async fn test_autoscaler_replica_choice_survives_template_update() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        spec.console_plugin.autoscaler = enabled_autoscaler();
        pass(&client, &spec).await;

        let mut scaled: Deployment = client.object(NS, PLUGIN_NAME).expect("deployment");
        if let Some(s) = scaled.spec.as_mut() {
            s.replicas = Some(3);
        }
        client.insert(scaled);

        spec.console_plugin.log_level = "debug".to_string();
        pass(&client, &spec).await;
        assert_eq!(stored_replicas(&client), Some(3));
    }

    #[tokio::test]
    async fn test_disabling_autoscaler_applies_replicas_and_deletes_it() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        spec.console_plugin.autoscaler = enabled_autoscaler();
        pass(&client, &spec).await;
        client.clear_calls();

        spec.console_plugin.autoscaler = FlowCollectorHpa::default();
        spec.console_plugin.replicas = 5;
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Deployment"), 1);
        assert_eq!(client.count(Verb::Delete, "HorizontalPodAutoscaler"), 1);
        assert_eq!(stored_replicas(&client), Some(5));
        assert!(client
            .object::<HorizontalPodAutoscaler>(NS, PLUGIN_NAME)
            .is_none());
    }

    #[tokio::test]
    async fn test_disabled_autoscaler_without_object_makes_no_call() {
        let client = FakeClusterClient::new();
        pass(&client, &FlowCollectorSpec::default()).await;
        assert_eq!(client.count(Verb::Delete, "HorizontalPodAutoscaler"), 0);
    }

    #[tokio::test]
    async fn test_config_change_rolls_deployment() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;
        client.clear_calls();

        spec.loki.url = "http://loki-gateway.netobserv.svc:8080/".to_string();
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "ConfigMap"), 1);
        assert_eq!(client.count(Verb::Update, "Deployment"), 1);

        let deployment: Deployment = client.object(NS, PLUGIN_NAME).expect("deployment");
        let digest = deployment
            .spec
            .and_then(|s| s.template.metadata)
            .and_then(|m| m.annotations)
            .and_then(|a| a.get(CONFIG_DIGEST_ANNOTATION).cloned());
        let (_, expected) = crate::console_resources::PluginBuilder::new(NS, IMAGE, &spec)
            .config_map()
            .expect("config renders");
        assert_eq!(digest, Some(expected));
    }

    #[tokio::test]
    async fn test_service_monitor_untouched_when_unsupported() {
        let client = FakeClusterClient::new();
        let spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;
        pass(&client, &spec).await;
        assert_eq!(client.calls_for_kind("ServiceMonitor"), 0);
    }

    #[tokio::test]
    async fn test_service_monitor_reconciled_when_supported() {
        let client = FakeClusterClient::new();
        let collector = flow_collector(FlowCollectorSpec::default());
        let reconciler = reconciler(&client, NS, "", AvailableApis::new(true));
        reconciler.reconcile(&collector).await.expect("first pass");
        assert_eq!(client.count(Verb::Create, "ServiceMonitor"), 1);
        client.clear_calls();

        reconciler.reconcile(&collector).await.expect("second pass");
        assert_eq!(client.count(Verb::Get, "ServiceMonitor"), 1);
        assert_eq!(client.writes(), 0);
    }

    #[tokio::test]
    async fn test_registration_toggle() {
        let client = FakeClusterClient::new();
        client.insert(Console::new(
            "cluster",
            ConsoleSpec {
                plugins: vec![PLUGIN_NAME.to_string()],
                other: BTreeMap::new(),
            },
        ));
        let mut spec = FlowCollectorSpec::default();
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Console"), 0);

        spec.console_plugin.register = false;
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Console"), 1);

        spec.console_plugin.register = true;
        client.clear_calls();
        pass(&client, &spec).await;
        assert_eq!(client.count(Verb::Update, "Console"), 1);
        let console: Console = client.object("", "cluster").expect("console");
        assert_eq!(console.spec.plugins, [PLUGIN_NAME]);
    }

    #[tokio::test]
    async fn test_missing_certificate_aborts_before_deployment() {
        let client = FakeClusterClient::new();
        let mut spec = FlowCollectorSpec::default();
        spec.loki.tls = ClientTls {
            enable: true,
            ca_cert: CertificateReference {
                r#type: MountableType::ConfigMap,
                name: "loki-ca-bundle".to_string(),
                cert_file: "service-ca.crt".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = reconciler(&client, NS, "", AvailableApis::default())
            .reconcile(&flow_collector(spec))
            .await
            .expect_err("certificate is missing");
        assert!(matches!(err, Error::Certificate(_)));
        assert_eq!(client.count(Verb::Create, "ConfigMap"), 1);
        assert_eq!(client.count(Verb::Create, "Deployment"), 0);
        assert_eq!(client.calls_for_kind("Service"), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_aborts_pass() {
        let client = FakeClusterClient::new();
        client.fail_on(Verb::Get, "Service", 500, "InternalError");
        let err = reconciler(&client, NS, "", AvailableApis::default())
            .reconcile(&flow_collector(FlowCollectorSpec::default()))
            .await
            .expect_err("fetch fails");
        assert_eq!(err.category(), "api_error");
        assert_eq!(client.writes(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_pass_makes_no_call() {
        let client = FakeClusterClient::new();
        let token = CancellationToken::new();
        token.cancel();
        let reconciler = ConsolePluginReconciler::new(
            ClientHelper::new(client.clone(), None, token),
            NS,
            "",
            IMAGE,
            AvailableApis::default(),
            Arc::new(CertificateWatcher::new()),
        );
        let err = reconciler
            .reconcile(&flow_collector(FlowCollectorSpec::default()))
            .await
            .expect_err("cancelled");
        assert!(matches!(err, Error::Cancelled));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_namespace_move_cleans_previous_namespace() {
        let client = FakeClusterClient::new();
        let spec = FlowCollectorSpec::default();
        reconciler(&client, "old-ns", "", AvailableApis::default())
            .reconcile(&flow_collector(spec.clone()))
            .await
            .expect("pass in old namespace");

        let moved = reconciler(&client, NS, "old-ns", AvailableApis::default());
        assert_eq!(moved.cleanup_namespace().await, 4);
        moved
            .reconcile(&flow_collector(spec))
            .await
            .expect("pass in new namespace");

        assert!(client.object::<Deployment>("old-ns", PLUGIN_NAME).is_none());
        assert!(client.object::<Deployment>(NS, PLUGIN_NAME).is_some());
        let plugin: ConsolePlugin = client.object("", PLUGIN_NAME).expect("plugin");
        assert_eq!(plugin.spec.service.namespace, NS);
        assert!(client.object::<ConfigMap>(NS, PLUGIN_CONFIG_MAP_NAME).is_some());
    }

    #[tokio::test]
    async fn test_disable_removes_plugin() {
        let client = FakeClusterClient::new();
        let spec = FlowCollectorSpec::default();
        let reconciler = reconciler(&client, NS, "", AvailableApis::default());
        reconciler
            .reconcile(&flow_collector(spec))
            .await
            .expect("pass succeeds");

        reconciler.disable().await.expect("disable succeeds");
        assert!(client.object::<ConsolePlugin>("", PLUGIN_NAME).is_none());
        assert!(client.object::<Deployment>(NS, PLUGIN_NAME).is_none());
        assert!(client.object::<ConfigMap>(NS, PLUGIN_CONFIG_MAP_NAME).is_none());
        assert!(client.object::<Service>(NS, PLUGIN_NAME).is_none());
    }
}
