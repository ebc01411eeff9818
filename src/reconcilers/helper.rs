// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Owner-aware writes on top of a [`ClusterClient`].
//!
//! Every call races the pass cancellation token: once the token fires, the pending
//! call is dropped and the step returns [`Error::Cancelled`]. Each create/update is a
//! single API call, so nothing is left half-applied.

use crate::errors::{Error, Result};
use crate::metrics;
use crate::reconcilers::client::{object_name, ClusterClient, ManagedResource};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Cluster client bound to one owner and one cancellation scope.
#[derive(Clone)]
pub struct ClientHelper<C: ClusterClient> {
    client: C,
    owner: Option<OwnerReference>,
    token: CancellationToken,
}

impl<C: ClusterClient> ClientHelper<C> {
    pub fn new(client: C, owner: Option<OwnerReference>, token: CancellationToken) -> Self {
        Self {
            client,
            owner,
            token,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    async fn cancellable<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Error::Cancelled),
            result = call => result,
        }
    }

    fn set_owner<K: ManagedResource>(&self, obj: &mut K) {
        let Some(owner) = &self.owner else {
            return;
        };
        let refs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);
        refs.retain(|r| r.uid != owner.uid);
        refs.push(owner.clone());
    }

    pub async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.cancellable(self.client.get::<K>(namespace, name)).await
    }

    /// Create `obj` with the owner reference set.
    pub async fn create_owned<K: ManagedResource>(&self, mut obj: K) -> Result<K> {
        let name = object_name(&obj)?;
        let namespace = obj.namespace().unwrap_or_default();
        self.set_owner(&mut obj);
        debug!(kind = %K::kind_name(), namespace = %namespace, name = %name, "Creating");
        let created = self.cancellable(self.client.create(&obj)).await?;
        metrics::record_resource_created(&K::kind_name());
        info!("Created {} {}/{}", K::kind_name(), namespace, name);
        Ok(created)
    }

    /// Replace `old` with `new` and set the owner reference.
    ///
    /// `new` carries `old`'s `resourceVersion`, so a concurrent writer makes this
    /// fail with a conflict instead of being overwritten.
    pub async fn update_owned<K: ManagedResource>(&self, old: &K, mut new: K) -> Result<K> {
        self.set_owner(&mut new);
        self.update(old, new).await
    }

    /// Replace `old` with `new`, leaving owner references as they are.
    ///
    /// Used for shared objects this operator does not own.
    pub async fn update<K: ManagedResource>(&self, old: &K, mut new: K) -> Result<K> {
        let name = object_name(&new)?;
        let namespace = new.namespace().unwrap_or_default();
        new.meta_mut()
            .resource_version
            .clone_from(&old.meta().resource_version);
        debug!(kind = %K::kind_name(), namespace = %namespace, name = %name, "Updating");
        let updated = self.cancellable(self.client.update(&new)).await?;
        metrics::record_resource_updated(&K::kind_name());
        info!("Updated {} {}/{}", K::kind_name(), namespace, name);
        Ok(updated)
    }

    /// Delete an object; not-found counts as success and returns `false`.
    pub async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<bool> {
        let deleted = self
            .cancellable(self.client.delete::<K>(namespace, name))
            .await?;
        if deleted {
            metrics::record_resource_deleted(&K::kind_name());
            info!("Deleted {} {}/{}", K::kind_name(), namespace, name);
        }
        Ok(deleted)
    }

    /// Report a rollout that has not converged yet. Observability only.
    pub fn check_deployment_in_progress(&self, deployment: &Deployment) -> bool {
        let namespace = deployment.namespace().unwrap_or_default();
        let name = deployment.name_any();
        let in_progress = deployment_in_progress(deployment);
        if in_progress {
            info!(namespace = %namespace, name = %name, "Deployment rollout in progress");
        }
        metrics::record_rollout_in_progress(&namespace, &name, in_progress);
        in_progress
    }
}

/// Whether the controller has not yet observed or completed the latest spec.
#[must_use]
pub fn deployment_in_progress(deployment: &Deployment) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return true;
    };
    let wanted = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let not_observed = match (deployment.metadata.generation, status.observed_generation) {
        (Some(generation), Some(observed)) => observed < generation,
        (Some(_), None) => true,
        _ => false,
    };
    not_observed
        || status.updated_replicas.unwrap_or(0) < wanted
        || status.available_replicas.unwrap_or(0) < wanted
}

#[cfg(test)]
#[path = "helper_tests.rs"]
mod helper_tests;
