// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `FlowCollector` controller.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - Kubernetes client
//! - Operator settings resolved at startup
//! - Optional APIs found by discovery
//! - The certificate watcher shared by all passes
//! - The root cancellation token

use crate::capabilities::AvailableApis;
use crate::certificates::CertificateWatcher;
use crate::reconcilers::client::KubeClusterClient;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Settings that do not change for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Console plugin container image
    pub plugin_image: String,

    /// Requeue delay after a successful pass
    pub requeue_interval: Duration,
}

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    pub config: OperatorConfig,

    /// Optional kinds served by the cluster, discovered once at startup
    pub available_apis: AvailableApis,

    pub cert_watcher: Arc<CertificateWatcher>,

    /// Cancelled on shutdown; every pass runs under a child token
    pub shutdown: CancellationToken,
}

impl Context {
    #[must_use]
    pub fn new(
        client: Client,
        config: OperatorConfig,
        available_apis: AvailableApis,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            available_apis,
            cert_watcher: Arc::new(CertificateWatcher::new()),
            shutdown,
        }
    }

    /// Cluster client used by the reconcilers.
    #[must_use]
    pub fn cluster_client(&self) -> KubeClusterClient {
        KubeClusterClient::new(self.client.clone())
    }
}
