// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Optional API kinds served by the cluster.
//!
//! Discovery runs once at startup; the result is static for the process lifetime.

use crate::constants::{KIND_SERVICE_MONITOR, MONITORING_API_GROUP};
use kube::discovery::Discovery;
use kube::Client;
use tracing::{info, warn};

/// Optional kinds the operator may manage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AvailableApis {
    service_monitor: bool,
}

impl AvailableApis {
    #[must_use]
    pub fn new(service_monitor: bool) -> Self {
        Self { service_monitor }
    }

    /// Query the API server for optional kinds.
    ///
    /// A failed discovery is logged and reported as "nothing available"; the
    /// operator keeps running without the optional kinds.
    pub async fn discover(client: Client) -> Self {
        let discovery = match Discovery::new(client)
            .filter(&[MONITORING_API_GROUP])
            .run()
            .await
        {
            Ok(discovery) => discovery,
            Err(e) => {
                warn!(error = %e, "API discovery failed, optional kinds disabled");
                return Self::default();
            }
        };

        let service_monitor = discovery
            .groups()
            .filter(|g| g.name() == MONITORING_API_GROUP)
            .flat_map(|g| g.recommended_resources())
            .any(|(ar, _caps)| ar.kind == KIND_SERVICE_MONITOR);

        info!(service_monitor, "Discovered optional APIs");
        Self { service_monitor }
    }

    /// Whether the Prometheus operator `ServiceMonitor` kind is served.
    #[must_use]
    pub fn has_service_monitor(&self) -> bool {
        self.service_monitor
    }
}
