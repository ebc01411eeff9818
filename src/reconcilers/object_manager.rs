// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tracks the namespaced child resources of one reconciliation unit.
//!
//! The manager knows which kinds the unit owns and under which name. A pass starts
//! with [`NamespacedObjectManager::fetch_all`], which returns a [`FetchedObjects`]
//! snapshot; existence checks and cached objects are only reachable through that
//! snapshot, so no decision can be taken before the fetch. The manager is built per
//! pass and never shared between passes.
//!
//! The manager also remembers the namespace the unit lived in before, and can sweep
//! it when the unit moves.

use crate::errors::Result;
use crate::reconcilers::client::{ClusterClient, ManagedResource};
use crate::reconcilers::helper::ClientHelper;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

type CachedObject = Box<dyn Any + Send + Sync>;

/// Type-erased access to one managed kind.
#[async_trait]
trait ManagedEntry<C: ClusterClient>: Send + Sync {
    fn kind(&self) -> String;

    fn name(&self) -> &str;

    fn kind_id(&self) -> TypeId;

    fn namespaced(&self) -> bool;

    async fn fetch(&self, helper: &ClientHelper<C>, namespace: &str)
        -> Result<Option<CachedObject>>;

    async fn delete(&self, helper: &ClientHelper<C>, namespace: &str) -> Result<bool>;
}

struct Entry<K> {
    name: String,
    kind: PhantomData<fn() -> K>,
}

#[async_trait]
impl<C: ClusterClient, K: ManagedResource> ManagedEntry<C> for Entry<K> {
    fn kind(&self) -> String {
        K::kind_name()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind_id(&self) -> TypeId {
        TypeId::of::<K>()
    }

    fn namespaced(&self) -> bool {
        K::is_namespaced()
    }

    async fn fetch(
        &self,
        helper: &ClientHelper<C>,
        namespace: &str,
    ) -> Result<Option<CachedObject>> {
        let current = helper.get::<K>(namespace, &self.name).await?;
        Ok(current.map(|obj| Box::new(obj) as CachedObject))
    }

    async fn delete(&self, helper: &ClientHelper<C>, namespace: &str) -> Result<bool> {
        helper.delete::<K>(namespace, &self.name).await
    }
}

/// Registry of the kinds owned by one unit in one namespace.
pub struct NamespacedObjectManager<C: ClusterClient> {
    helper: ClientHelper<C>,
    namespace: String,
    previous_namespace: String,
    entries: Vec<Box<dyn ManagedEntry<C>>>,
}

impl<C: ClusterClient> NamespacedObjectManager<C> {
    pub fn new(
        helper: ClientHelper<C>,
        namespace: impl Into<String>,
        previous_namespace: impl Into<String>,
    ) -> Self {
        Self {
            helper,
            namespace: namespace.into(),
            previous_namespace: previous_namespace.into(),
            entries: Vec::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn previous_namespace(&self) -> &str {
        &self.previous_namespace
    }

    /// Register kind `K` under `name`. Registering a kind twice keeps the last name.
    pub fn add_managed_object<K: ManagedResource>(&mut self, name: impl Into<String>) {
        let type_id = TypeId::of::<K>();
        self.entries.retain(|e| e.kind_id() != type_id);
        self.entries.push(Box::new(Entry::<K> {
            name: name.into(),
            kind: PhantomData,
        }));
    }

    fn entry(&self, type_id: TypeId) -> Option<&dyn ManagedEntry<C>> {
        self.entries
            .iter()
            .find(|e| e.kind_id() == type_id)
            .map(|e| &**e)
    }

    /// Read every managed kind from the current namespace.
    ///
    /// Not-found objects are recorded as absent.
    ///
    /// # Errors
    ///
    /// Any other read error aborts the fetch.
    pub async fn fetch_all(&self) -> Result<FetchedObjects<'_, C>> {
        let mut objects = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            let fetched = entry.fetch(&self.helper, &self.namespace).await?;
            debug!(
                kind = %entry.kind(),
                namespace = %self.namespace,
                name = %entry.name(),
                exists = fetched.is_some(),
                "Fetched managed object"
            );
            if let Some(obj) = fetched {
                objects.insert(entry.kind_id(), obj);
            }
        }
        Ok(FetchedObjects {
            manager: self,
            objects,
        })
    }

    /// Delete every managed object left in the previous namespace.
    ///
    /// Best-effort: failures are logged and skipped. Returns the number of objects
    /// deleted. Cluster-scoped kinds are never touched.
    pub async fn cleanup_previous_namespace(&self) -> usize {
        let previous = self.previous_namespace.as_str();
        if previous.is_empty() || previous == self.namespace {
            return 0;
        }
        info!(
            previous_namespace = %previous,
            namespace = %self.namespace,
            "Namespace changed, cleaning up previous namespace"
        );
        let mut deleted = 0;
        for entry in self.entries.iter().filter(|e| e.namespaced()) {
            match self.sweep(&**entry, previous).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    kind = %entry.kind(),
                    namespace = %previous,
                    name = %entry.name(),
                    error = %e,
                    "Failed to clean up object in previous namespace"
                ),
            }
        }
        deleted
    }

    async fn sweep(&self, entry: &dyn ManagedEntry<C>, namespace: &str) -> Result<bool> {
        if entry.fetch(&self.helper, namespace).await?.is_none() {
            return Ok(false);
        }
        entry.delete(&self.helper, namespace).await
    }

    /// Delete every managed object in the current namespace.
    ///
    /// # Errors
    ///
    /// Stops at the first delete failure other than not-found.
    pub async fn delete_all(&self) -> Result<usize> {
        let mut deleted = 0;
        for entry in &self.entries {
            if entry.delete(&self.helper, &self.namespace).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Snapshot of the managed objects taken at the start of a pass.
pub struct FetchedObjects<'a, C: ClusterClient> {
    manager: &'a NamespacedObjectManager<C>,
    objects: HashMap<TypeId, CachedObject>,
}

impl<C: ClusterClient> FetchedObjects<'_, C> {
    #[must_use]
    pub fn exists<K: ManagedResource>(&self) -> bool {
        self.objects.contains_key(&TypeId::of::<K>())
    }

    /// Object of kind `K` as read by the fetch, if it exists.
    #[must_use]
    pub fn current<K: ManagedResource>(&self) -> Option<&K> {
        self.objects
            .get(&TypeId::of::<K>())
            .and_then(|obj| obj.downcast_ref::<K>())
    }

    /// Delete the object of kind `K` if the fetch saw it. Not-found is success.
    ///
    /// # Errors
    ///
    /// Any other delete error is returned.
    pub async fn try_delete<K: ManagedResource>(&self) -> Result<bool> {
        if !self.exists::<K>() {
            return Ok(false);
        }
        let Some(entry) = self.manager.entry(TypeId::of::<K>()) else {
            return Ok(false);
        };
        entry
            .delete(&self.manager.helper, &self.manager.namespace)
            .await
    }
}

#[cfg(test)]
#[path = "object_manager_tests.rs"]
mod object_manager_tests;
