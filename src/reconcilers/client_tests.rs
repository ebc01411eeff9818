// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `client.rs`, run against a mocked API server.

#[cfg(test)]
mod tests {
    use crate::reconcilers::client::{ClusterClient, KubeClusterClient, ManagedResource};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::api::rbac::v1::ClusterRole;
    use kube::api::ObjectMeta;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> KubeClusterClient {
        let config = kube::Config::new(server.uri().parse().expect("mock server uri"));
        let client = kube::Client::try_from(config).expect("client from config");
        KubeClusterClient::new(client)
    }

    fn status(code: u16, reason: &str) -> ResponseTemplate {
        ResponseTemplate::new(code).set_body_json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("{reason} from mock"),
            "reason": reason,
            "code": code,
        }))
    }

    #[tokio::test]
    async fn test_get_maps_not_found_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/apis/apps/v1/namespaces/netobserv/deployments/netobserv-plugin",
            ))
            .respond_with(status(404, "NotFound"))
            .expect(1)
            .mount(&server)
            .await;

        let got = client_for(&server)
            .get::<Deployment>("netobserv", "netobserv-plugin")
            .await
            .expect("not found is not an error");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_get_returns_existing_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/api/v1/namespaces/netobserv/configmaps/console-plugin-config",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {
                    "name": "console-plugin-config",
                    "namespace": "netobserv",
                    "resourceVersion": "42"
                },
                "data": { "config.yaml": "port: 9001\n" }
            })))
            .mount(&server)
            .await;

        let cm = client_for(&server)
            .get::<ConfigMap>("netobserv", "console-plugin-config")
            .await
            .expect("get succeeds")
            .expect("object present");
        assert_eq!(cm.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(
            cm.data.and_then(|d| d.get("config.yaml").cloned()),
            Some("port: 9001\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_propagates_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/apis/apps/v1/namespaces/netobserv/deployments/netobserv-plugin",
            ))
            .respond_with(status(500, "InternalError"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .get::<Deployment>("netobserv", "netobserv-plugin")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cluster_scoped_kind_ignores_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/apis/rbac.authorization.k8s.io/v1/clusterroles/netobserv-plugin",
            ))
            .respond_with(status(404, "NotFound"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(!ClusterRole::is_namespaced());
        let got = client_for(&server)
            .get::<ClusterRole>("netobserv", "netobserv-plugin")
            .await
            .expect("not found is not an error");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_object_existed() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/namespaces/old-ns/configmaps/present"))
            .respond_with(status(200, "Success"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/namespaces/old-ns/configmaps/absent"))
            .respond_with(status(404, "NotFound"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client
            .delete::<ConfigMap>("old-ns", "present")
            .await
            .expect("delete succeeds"));
        assert!(!client
            .delete::<ConfigMap>("old-ns", "absent")
            .await
            .expect("not found is not an error"));
    }

    #[tokio::test]
    async fn test_create_surfaces_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/netobserv/configmaps"))
            .respond_with(status(409, "AlreadyExists"))
            .mount(&server)
            .await;

        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("console-plugin-config".to_string()),
                namespace: Some("netobserv".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = client_for(&server)
            .create(&cm)
            .await
            .expect_err("create must fail");
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_update_without_name_is_rejected_locally() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .update(&ConfigMap::default())
            .await
            .expect_err("nameless update must fail");
        assert_eq!(err.to_string(), "ConfigMap has no metadata.name");
    }
}
