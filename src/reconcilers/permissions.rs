// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Plugin identity and RBAC.
//!
//! The service account is created once and never updated. The cluster role and its
//! binding are cluster-scoped and shared, so they are read directly in each pass and
//! always brought back to the desired state.

use crate::console_resources::PluginBuilder;
use crate::constants::PLUGIN_NAME;
use crate::errors::Result;
use crate::reconcilers::client::ClusterClient;
use crate::reconcilers::comparators::{
    cluster_role_binding_changed, cluster_role_changed, role_ref_changed,
};
use crate::reconcilers::generic::{reconcile_owned, Outcome};
use crate::reconcilers::helper::ClientHelper;
use crate::reconcilers::object_manager::FetchedObjects;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use tracing::info;

/// Reconcile the service account, cluster role and cluster role binding.
///
/// # Errors
///
/// Returns the first API error.
pub async fn reconcile_permissions<C: ClusterClient>(
    helper: &ClientHelper<C>,
    fetched: &FetchedObjects<'_, C>,
    builder: &PluginBuilder<'_>,
) -> Result<()> {
    if !fetched.exists::<ServiceAccount>() {
        match helper.create_owned(builder.service_account()).await {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e),
        }
    }

    let role = helper.get::<ClusterRole>("", PLUGIN_NAME).await?;
    reconcile_owned(
        helper,
        role.as_ref(),
        builder.cluster_role(),
        cluster_role_changed,
    )
    .await?;

    reconcile_binding(helper, builder.cluster_role_binding()).await?;
    Ok(())
}

/// `roleRef` cannot be updated in place; a binding pointing at another role is
/// deleted and created again.
async fn reconcile_binding<C: ClusterClient>(
    helper: &ClientHelper<C>,
    desired: ClusterRoleBinding,
) -> Result<Outcome> {
    let current = helper.get::<ClusterRoleBinding>("", PLUGIN_NAME).await?;
    if let Some(existing) = current.as_ref() {
        if role_ref_changed(existing, &desired) {
            info!(name = %PLUGIN_NAME, "Role ref changed, recreating cluster role binding");
            helper.delete::<ClusterRoleBinding>("", PLUGIN_NAME).await?;
            helper.create_owned(desired).await?;
            return Ok(Outcome::Updated);
        }
    }
    reconcile_owned(
        helper,
        current.as_ref(),
        desired,
        cluster_role_binding_changed,
    )
    .await
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod permissions_tests;
