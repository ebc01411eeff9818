// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

use flowconsole::crd::{FlowCollector, FlowCollectorSpec};
use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
    core::ObjectMeta,
};
use std::time::Duration;
use tokio::time::sleep;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a `FlowCollector`, tolerating one left over from a previous run
pub async fn create_flowcollector(
    client: &Client,
    name: &str,
    spec: FlowCollectorSpec,
) -> Result<(), Box<dyn std::error::Error>> {
    let api: Api<FlowCollector> = Api::all(client.clone());
    let fc = FlowCollector {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec,
        status: None,
    };

    match api.create(&PostParams::default(), &fc).await {
        Ok(_) => {
            println!("Created FlowCollector: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("FlowCollector already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Delete a `FlowCollector`
pub async fn delete_flowcollector(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let api: Api<FlowCollector> = Api::all(client.clone());

    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            println!("Deleted FlowCollector: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(Box::new(e)),
    }
}

/// Poll until `check` returns true or the timeout elapses
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check().await {
            return true;
        }
        sleep(Duration::from_secs(2)).await;
    }
    false
}
