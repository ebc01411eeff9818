// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate watcher.
//!
//! Pods mount certificates from `ConfigMap`s and `Secret`s; a rotated certificate
//! must restart them. The watcher reads each referenced certificate through the API,
//! hashes it, and stores the hash as a pod template annotation. A changed
//! certificate thus changes the template, which the deployment comparator sees.

use crate::constants::WATCHED_CERT_ANNOTATION_PREFIX;
use crate::crd::{CertificateReference, MountableType};
use crate::errors::{Error, Result};
use crate::reconcilers::client::ClusterClient;
use crate::reconcilers::helper::ClientHelper;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k8s_openapi::api::core::v1::{ConfigMap, PodTemplateSpec, Secret};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::{debug, info};

/// Annotation key recording the digest of one certificate reference.
#[must_use]
pub fn watch_annotation(reference: &CertificateReference) -> String {
    format!(
        "{WATCHED_CERT_ANNOTATION_PREFIX}{}-{}",
        reference.r#type, reference.name
    )
}

/// Hashes watched certificates into pod template annotations.
///
/// Shared by all passes; the digest cache is only used to log rotations.
#[derive(Debug, Default)]
pub struct CertificateWatcher {
    digests: Mutex<HashMap<String, String>>,
}

impl CertificateWatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotate `template` with the digest of every named certificate in `refs`.
    ///
    /// References without a namespace are read from `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] when an object or one of its entries is missing,
    /// and propagates API errors.
    pub async fn annotate_pod<C: ClusterClient>(
        &self,
        helper: &ClientHelper<C>,
        namespace: &str,
        template: &mut PodTemplateSpec,
        refs: &[&CertificateReference],
    ) -> Result<()> {
        for reference in refs.iter().filter(|r| !r.name.is_empty()) {
            let ns = reference.namespace.as_deref().unwrap_or(namespace);
            let digest = self.digest(helper, ns, reference).await?;
            let key = watch_annotation(reference);
            self.remember(&key, &digest);
            template
                .metadata
                .get_or_insert_with(Default::default)
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(key, digest);
        }
        Ok(())
    }

    async fn digest<C: ClusterClient>(
        &self,
        helper: &ClientHelper<C>,
        namespace: &str,
        reference: &CertificateReference,
    ) -> Result<String> {
        let entries = read_entries(helper, namespace, reference).await?;
        let mut hasher = Sha256::new();
        for file in [&reference.cert_file, &reference.cert_key] {
            if file.is_empty() {
                continue;
            }
            let content = entries.get(file.as_str()).ok_or_else(|| {
                Error::Certificate(format!(
                    "{} {namespace}/{} has no entry '{file}'",
                    reference.r#type, reference.name
                ))
            })?;
            hasher.update(content);
        }
        Ok(BASE64.encode(hasher.finalize()))
    }

    fn remember(&self, key: &str, digest: &str) {
        let Ok(mut digests) = self.digests.lock() else {
            return;
        };
        match digests.insert(key.to_string(), digest.to_string()) {
            Some(previous) if previous != digest => {
                info!(certificate = %key, "Watched certificate changed");
            }
            None => debug!(certificate = %key, "Watching certificate"),
            _ => {}
        }
    }
}

async fn read_entries<C: ClusterClient>(
    helper: &ClientHelper<C>,
    namespace: &str,
    reference: &CertificateReference,
) -> Result<HashMap<String, Vec<u8>>> {
    let missing = || {
        Error::Certificate(format!(
            "{} {namespace}/{} not found",
            reference.r#type, reference.name
        ))
    };
    match reference.r#type {
        MountableType::Secret => {
            let secret = helper
                .get::<Secret>(namespace, &reference.name)
                .await?
                .ok_or_else(missing)?;
            Ok(secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.0))
                .collect())
        }
        MountableType::ConfigMap => {
            let config_map = helper
                .get::<ConfigMap>(namespace, &reference.name)
                .await?
                .ok_or_else(missing)?;
            let text = config_map
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.into_bytes()));
            let binary = config_map
                .binary_data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.0));
            Ok(text.chain(binary).collect())
        }
    }
}

#[cfg(test)]
#[path = "certificates_tests.rs"]
mod certificates_tests;
