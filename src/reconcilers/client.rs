// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed get/create/update/delete primitives over the Kubernetes API.
//!
//! The reconcilers only talk to the cluster through [`ClusterClient`], which keeps
//! them independent from `kube::Client` and lets unit tests count every call. Whether
//! a kind is namespaced or cluster-scoped is taken from its `Resource::Scope`, so the
//! same call sites serve `Deployment` and `ClusterRole` alike.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Builds the right `Api` flavour for a resource scope.
pub trait ScopeDispatch {
    /// Cluster-scoped kinds ignore the namespace they are addressed with.
    const NAMESPACED: bool;

    fn api<K>(client: Client, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = Self, DynamicType = ()>;
}

impl ScopeDispatch for NamespaceResourceScope {
    const NAMESPACED: bool = true;

    fn api<K>(client: Client, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = Self, DynamicType = ()>,
    {
        Api::namespaced(client, namespace)
    }
}

impl ScopeDispatch for ClusterResourceScope {
    const NAMESPACED: bool = false;

    fn api<K>(client: Client, _namespace: &str) -> Api<K>
    where
        K: Resource<Scope = Self, DynamicType = ()>,
    {
        Api::all(client)
    }
}

/// A statically typed Kubernetes kind the operator can read and write.
pub trait ManagedResource:
    Resource<DynamicType = (), Scope: ScopeDispatch>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind name, used in logs, metrics and errors.
    fn kind_name() -> String {
        Self::kind(&()).to_string()
    }

    /// Whether objects of this kind live in a namespace.
    fn is_namespaced() -> bool {
        <Self::Scope as ScopeDispatch>::NAMESPACED
    }
}

impl<K> ManagedResource for K where
    K: Resource<DynamicType = (), Scope: ScopeDispatch>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Name of a resource about to be written.
///
/// # Errors
///
/// Returns [`Error::MissingName`] when `metadata.name` is unset.
pub fn object_name<K: ManagedResource>(obj: &K) -> Result<String> {
    obj.meta().name.clone().ok_or_else(|| Error::MissingName {
        kind: K::kind_name(),
    })
}

/// Cluster API primitives addressed by (kind, namespace, name).
///
/// Not-found is a value, never an error: `get` yields `None` and `delete` yields
/// `false`. Everything else is returned as [`Error::Kube`].
#[async_trait]
pub trait ClusterClient: Clone + Send + Sync + 'static {
    async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Create `obj` in its `metadata.namespace`.
    async fn create<K: ManagedResource>(&self, obj: &K) -> Result<K>;

    /// Replace `obj`. A stale `resourceVersion` fails with a conflict.
    async fn update<K: ManagedResource>(&self, obj: &K) -> Result<K>;

    /// Delete the object; returns whether it existed.
    async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<bool>;
}

/// [`ClusterClient`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ManagedResource>(&self, namespace: &str) -> Api<K> {
        <K::Scope as ScopeDispatch>::api(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        match self.api::<K>(namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(kind = %K::kind_name(), namespace = %namespace, name = %name, "Not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create<K: ManagedResource>(&self, obj: &K) -> Result<K> {
        let namespace = obj.namespace().unwrap_or_default();
        let created = self
            .api::<K>(&namespace)
            .create(&PostParams::default(), obj)
            .await?;
        Ok(created)
    }

    async fn update<K: ManagedResource>(&self, obj: &K) -> Result<K> {
        let name = object_name(obj)?;
        let namespace = obj.namespace().unwrap_or_default();
        let updated = self
            .api::<K>(&namespace)
            .replace(&name, &PostParams::default(), obj)
            .await?;
        Ok(updated)
    }

    async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<bool> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
