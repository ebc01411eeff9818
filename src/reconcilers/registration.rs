// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Plugin registration in the cluster console.
//!
//! The console operator config (`consoles.operator.openshift.io/cluster`) holds the
//! list of enabled plugins. It is shared with other operators, so it is modified with
//! a single read-modify-write; a concurrent writer surfaces as a conflict and the
//! whole pass is retried.

use crate::constants::CONSOLE_CONFIG_NAME;
use crate::errors::{Error, Result};
use crate::external_crds::Console;
use crate::reconcilers::client::ClusterClient;
use crate::reconcilers::helper::ClientHelper;
use tracing::{debug, error, info, warn};

/// Add or remove `plugin` from the console plugin list.
///
/// Returns whether the list was written. An unreadable or missing console config
/// is logged and skipped.
///
/// # Errors
///
/// Returns the update error, and [`Error::Cancelled`] if the pass is cancelled.
pub async fn reconcile_registration<C: ClusterClient>(
    helper: &ClientHelper<C>,
    plugin: &str,
    register: bool,
) -> Result<bool> {
    let console = match helper.get::<Console>("", CONSOLE_CONFIG_NAME).await {
        Ok(Some(console)) => console,
        Ok(None) => {
            skipped(register, plugin, "console operator config not found");
            return Ok(false);
        }
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(e) => {
            skipped(register, plugin, &e.to_string());
            return Ok(false);
        }
    };

    let registered = console.spec.plugins.iter().any(|p| p == plugin);
    if registered == register {
        debug!(plugin = %plugin, registered, "Console registration up to date");
        return Ok(false);
    }

    let mut desired = console.clone();
    if register {
        desired.spec.plugins.push(plugin.to_string());
    } else {
        desired.spec.plugins.retain(|p| p != plugin);
    }
    helper.update(&console, desired).await?;
    info!(plugin = %plugin, registered = register, "Console registration changed");
    Ok(true)
}

fn skipped(register: bool, plugin: &str, reason: &str) {
    if register {
        error!(
            plugin = %plugin,
            reason = %reason,
            "Could not get the Console Operator resource for plugin registration. Please register manually."
        );
    } else {
        warn!(plugin = %plugin, reason = %reason, "Console registration not checked");
    }
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod registration_tests;
