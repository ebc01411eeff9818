// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterClient`] for unit tests.
//!
//! Objects are stored as JSON keyed by (kind, namespace, name). Every call made
//! through the trait is recorded so tests can assert exact create/update/delete
//! counts per kind. Seeding with [`FakeClusterClient::insert`] is not recorded.

use crate::errors::{Error, Result};
use crate::reconcilers::client::{object_name, ClusterClient, ManagedResource};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Clone, Debug)]
pub struct Call {
    pub verb: Verb,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

type ObjectKey = (String, String, String);

struct Failure {
    verb: Verb,
    kind: String,
    code: u16,
    reason: String,
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<ObjectKey, serde_json::Value>,
    calls: Vec<Call>,
    failures: Vec<Failure>,
    next_version: u64,
}

#[derive(Clone, Default)]
pub struct FakeClusterClient {
    state: Arc<Mutex<FakeState>>,
}

pub fn api_error(code: u16, reason: &str) -> Error {
    Error::Kube(kube::Error::Api(
        kube::core::Status::failure(&format!("{reason} (injected)"), reason)
            .with_code(code)
            .boxed(),
    ))
}

fn key<K: ManagedResource>(namespace: &str, name: &str) -> ObjectKey {
    let namespace = if K::is_namespaced() { namespace } else { "" };
    (K::kind_name(), namespace.to_string(), name.to_string())
}

fn to_json<K: ManagedResource>(obj: &K) -> Result<serde_json::Value> {
    serde_json::to_value(obj).map_err(|source| Error::Serialization {
        kind: K::kind_name(),
        source,
    })
}

fn from_json<K: ManagedResource>(value: serde_json::Value) -> Result<K> {
    serde_json::from_value(value).map_err(|source| Error::Serialization {
        kind: K::kind_name(),
        source,
    })
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake client state poisoned")
    }

    /// Seed an object, as if another actor had created it.
    pub fn insert<K: ManagedResource>(&self, mut obj: K) {
        let name = obj.name_any();
        let namespace = obj.namespace().unwrap_or_default();
        let mut state = self.lock();
        state.next_version += 1;
        obj.meta_mut().resource_version = Some(state.next_version.to_string());
        let value = to_json(&obj).expect("seed object serializes");
        state.objects.insert(key::<K>(&namespace, &name), value);
    }

    /// Read an object without recording a call.
    pub fn object<K: ManagedResource>(&self, namespace: &str, name: &str) -> Option<K> {
        let value = self.lock().objects.get(&key::<K>(namespace, name)).cloned()?;
        Some(from_json(value).expect("stored object deserializes"))
    }

    /// Make every future `verb` call on `kind` fail with the given API status.
    pub fn fail_on(&self, verb: Verb, kind: &str, code: u16, reason: &str) {
        self.lock().failures.push(Failure {
            verb,
            kind: kind.to_string(),
            code,
            reason: reason.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn count(&self, verb: Verb, kind: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.verb == verb && c.kind == kind)
            .count()
    }

    /// Number of calls of any verb that touched `kind`.
    pub fn calls_for_kind(&self, kind: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.kind == kind).count()
    }

    /// Number of create, update and delete calls across all kinds.
    pub fn writes(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.verb != Verb::Get)
            .count()
    }

    pub fn updates(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.verb == Verb::Update)
            .count()
    }

    fn record<K: ManagedResource>(&self, verb: Verb, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call {
            verb,
            kind: K::kind_name(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        let kind = K::kind_name();
        match state
            .failures
            .iter()
            .find(|f| f.verb == verb && f.kind == kind)
        {
            Some(f) => Err(api_error(f.code, &f.reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.record::<K>(Verb::Get, namespace, name)?;
        let value = self.lock().objects.get(&key::<K>(namespace, name)).cloned();
        value.map(from_json).transpose()
    }

    async fn create<K: ManagedResource>(&self, obj: &K) -> Result<K> {
        let name = object_name(obj)?;
        let namespace = obj.namespace().unwrap_or_default();
        self.record::<K>(Verb::Create, &namespace, &name)?;

        let mut state = self.lock();
        let key = key::<K>(&namespace, &name);
        if state.objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.next_version += 1;
        let mut created = obj.clone();
        created.meta_mut().resource_version = Some(state.next_version.to_string());
        state.objects.insert(key, to_json(&created)?);
        Ok(created)
    }

    async fn update<K: ManagedResource>(&self, obj: &K) -> Result<K> {
        let name = object_name(obj)?;
        let namespace = obj.namespace().unwrap_or_default();
        self.record::<K>(Verb::Update, &namespace, &name)?;

        let mut state = self.lock();
        let key = key::<K>(&namespace, &name);
        let Some(stored) = state.objects.get(&key) else {
            return Err(api_error(404, "NotFound"));
        };
        let stored_version = stored
            .pointer("/metadata/resourceVersion")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if let Some(version) = obj.meta().resource_version.as_deref() {
            if stored_version.as_deref() != Some(version) {
                return Err(api_error(409, "Conflict"));
            }
        }
        state.next_version += 1;
        let mut updated = obj.clone();
        updated.meta_mut().resource_version = Some(state.next_version.to_string());
        state.objects.insert(key, to_json(&updated)?);
        Ok(updated)
    }

    async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<bool> {
        self.record::<K>(Verb::Delete, namespace, name)?;
        Ok(self
            .lock()
            .objects
            .remove(&key::<K>(namespace, name))
            .is_some())
    }
}
