// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Console plugin reconciliation.
//!
//! One pass converges every child resource of the plugin, in dependency order:
//!
//! 1. fetch the namespaced children
//! 2. console registration
//! 3. service account and RBAC
//! 4. `ConsolePlugin` registration resource
//! 5. configuration `ConfigMap`, producing the config digest
//! 6. `Deployment`, with the digest and certificate annotations on its pod template
//! 7. `Service`, and the `ServiceMonitor` when the cluster serves that kind
//! 8. `HorizontalPodAutoscaler`, removed while autoscaling is disabled
//!
//! The first failing step ends the pass; earlier steps are not rolled back.

use crate::capabilities::AvailableApis;
use crate::certificates::CertificateWatcher;
use crate::console_resources::PluginBuilder;
use crate::constants::{PLUGIN_CONFIG_MAP_NAME, PLUGIN_NAME};
use crate::crd::{CertificateReference, FlowCollector, FlowCollectorSpec};
use crate::errors::Result;
use crate::external_crds::{ConsolePlugin, ServiceMonitor};
use crate::reconcilers::client::ClusterClient;
use crate::reconcilers::comparators::{
    autoscaler_changed, config_map_changed, deployment_changed, plugin_needs_update,
    service_monitor_changed, service_needs_update,
};
use crate::reconcilers::generic::{reconcile_owned, Outcome};
use crate::reconcilers::helper::ClientHelper;
use crate::reconcilers::object_manager::{FetchedObjects, NamespacedObjectManager};
use crate::reconcilers::permissions::reconcile_permissions;
use crate::reconcilers::registration::reconcile_registration;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};
use std::sync::Arc;
use tracing::{debug, info};

/// Reconciler for the console plugin of one `FlowCollector`.
///
/// Built for a single pass: the object manager it hands out is fresh each time.
pub struct ConsolePluginReconciler<C: ClusterClient> {
    helper: ClientHelper<C>,
    namespace: String,
    previous_namespace: String,
    image: String,
    available_apis: AvailableApis,
    cert_watcher: Arc<CertificateWatcher>,
}

impl<C: ClusterClient> ConsolePluginReconciler<C> {
    pub fn new(
        helper: ClientHelper<C>,
        namespace: impl Into<String>,
        previous_namespace: impl Into<String>,
        image: impl Into<String>,
        available_apis: AvailableApis,
        cert_watcher: Arc<CertificateWatcher>,
    ) -> Self {
        Self {
            helper,
            namespace: namespace.into(),
            previous_namespace: previous_namespace.into(),
            image: image.into(),
            available_apis,
            cert_watcher,
        }
    }

    fn manager(&self) -> NamespacedObjectManager<C> {
        let mut manager = NamespacedObjectManager::new(
            self.helper.clone(),
            self.namespace.clone(),
            self.previous_namespace.clone(),
        );
        manager.add_managed_object::<Deployment>(PLUGIN_NAME);
        manager.add_managed_object::<Service>(PLUGIN_NAME);
        manager.add_managed_object::<HorizontalPodAutoscaler>(PLUGIN_NAME);
        manager.add_managed_object::<ServiceAccount>(PLUGIN_NAME);
        manager.add_managed_object::<ConfigMap>(PLUGIN_CONFIG_MAP_NAME);
        if self.available_apis.has_service_monitor() {
            manager.add_managed_object::<ServiceMonitor>(PLUGIN_NAME);
        }
        manager
    }

    /// Remove the plugin objects left in the previous namespace. Best-effort.
    pub async fn cleanup_namespace(&self) -> usize {
        self.manager().cleanup_previous_namespace().await
    }

    /// Run one reconciliation pass towards `desired`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn reconcile(&self, desired: &FlowCollector) -> Result<()> {
        let spec = &desired.spec;
        let manager = self.manager();
        let fetched = manager.fetch_all().await?;

        reconcile_registration(&self.helper, PLUGIN_NAME, spec.console_plugin.register).await?;

        let builder = PluginBuilder::new(&self.namespace, &self.image, spec);
        reconcile_permissions(&self.helper, &fetched, &builder).await?;
        self.reconcile_plugin(&builder).await?;
        let digest = self.reconcile_config_map(&fetched, &builder).await?;
        self.reconcile_deployment(&fetched, &builder, spec, &digest)
            .await?;
        self.reconcile_service(&fetched, &builder, spec).await?;
        self.reconcile_hpa(&fetched, &builder, spec).await?;
        Ok(())
    }

    /// Remove the plugin: unregister it, then delete its registration resource and
    /// every namespaced child.
    ///
    /// # Errors
    ///
    /// Returns the first delete error other than not-found.
    pub async fn disable(&self) -> Result<()> {
        reconcile_registration(&self.helper, PLUGIN_NAME, false).await?;
        self.helper.delete::<ConsolePlugin>("", PLUGIN_NAME).await?;
        let deleted = self.manager().delete_all().await?;
        info!(namespace = %self.namespace, deleted, "Console plugin disabled");
        Ok(())
    }

    /// The `ConsolePlugin` lives outside the namespace but points at it, so it must
    /// follow namespace moves. Only the service port and namespace are compared.
    async fn reconcile_plugin(&self, builder: &PluginBuilder<'_>) -> Result<()> {
        let current = self.helper.get::<ConsolePlugin>("", PLUGIN_NAME).await?;
        reconcile_owned(
            &self.helper,
            current.as_ref(),
            builder.console_plugin(),
            plugin_needs_update,
        )
        .await?;
        Ok(())
    }

    async fn reconcile_config_map(
        &self,
        fetched: &FetchedObjects<'_, C>,
        builder: &PluginBuilder<'_>,
    ) -> Result<String> {
        let (config_map, digest) = builder.config_map()?;
        reconcile_owned(
            &self.helper,
            fetched.current::<ConfigMap>(),
            config_map,
            config_map_changed,
        )
        .await?;
        Ok(digest)
    }

    async fn reconcile_deployment(
        &self,
        fetched: &FetchedObjects<'_, C>,
        builder: &PluginBuilder<'_>,
        spec: &FlowCollectorSpec,
        digest: &str,
    ) -> Result<()> {
        let mut desired = builder.deployment(digest);
        let refs: Vec<&CertificateReference> = spec
            .loki
            .tls
            .certificate_refs()
            .into_iter()
            .chain(spec.loki.status_tls.certificate_refs())
            .collect();
        if let Some(deployment_spec) = desired.spec.as_mut() {
            self.cert_watcher
                .annotate_pod(
                    &self.helper,
                    &self.namespace,
                    &mut deployment_spec.template,
                    &refs,
                )
                .await?;
        }

        let current = fetched.current::<Deployment>();
        let hpa_disabled = spec.console_plugin.autoscaler.is_disabled();
        if !hpa_disabled {
            // the autoscaler owns the replica count
            let existing_replicas = current.and_then(|d| d.spec.as_ref()).and_then(|s| s.replicas);
            if let (Some(replicas), Some(desired_spec)) = (existing_replicas, desired.spec.as_mut())
            {
                desired_spec.replicas = Some(replicas);
            }
        }

        let replicas = spec.console_plugin.replicas;
        let outcome = reconcile_owned(&self.helper, current, desired, |existing, desired, report| {
            deployment_changed(existing, desired, PLUGIN_NAME, hpa_disabled, replicas, report)
        })
        .await?;
        if outcome == Outcome::Unchanged {
            if let Some(existing) = current {
                self.helper.check_deployment_in_progress(existing);
            }
        }
        Ok(())
    }

    async fn reconcile_service(
        &self,
        fetched: &FetchedObjects<'_, C>,
        builder: &PluginBuilder<'_>,
        spec: &FlowCollectorSpec,
    ) -> Result<()> {
        let current = fetched.current::<Service>();
        let port = spec.console_plugin.port;
        reconcile_owned(
            &self.helper,
            current,
            builder.service(current),
            |existing, _desired, report| service_needs_update(existing, port, report),
        )
        .await?;

        if self.available_apis.has_service_monitor() {
            reconcile_owned(
                &self.helper,
                fetched.current::<ServiceMonitor>(),
                builder.service_monitor(),
                service_monitor_changed,
            )
            .await?;
        }
        Ok(())
    }

    async fn reconcile_hpa(
        &self,
        fetched: &FetchedObjects<'_, C>,
        builder: &PluginBuilder<'_>,
        spec: &FlowCollectorSpec,
    ) -> Result<()> {
        if spec.console_plugin.autoscaler.is_disabled() {
            if fetched.try_delete::<HorizontalPodAutoscaler>().await? {
                debug!(namespace = %self.namespace, "Autoscaler disabled, removed");
            }
            return Ok(());
        }
        reconcile_owned(
            &self.helper,
            fetched.current::<HorizontalPodAutoscaler>(),
            builder.auto_scaler(),
            autoscaler_changed,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "consoleplugin_tests.rs"]
mod consoleplugin_tests;
