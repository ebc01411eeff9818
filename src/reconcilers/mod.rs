// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for the network observability console plugin.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `FlowCollector` changes and the children labelled as plugin parts
//! 2. **Fetch** - read the current children once per pass
//! 3. **Compare** - per-kind comparators decide whether a child drifted
//! 4. **Update** - create absent children, replace drifted ones
//! 5. **Status** - report the outcome on the `FlowCollector`
//!
//! # Modules
//!
//! - [`client`] - typed cluster access behind the [`client::ClusterClient`] trait
//! - [`helper`] - owner references, optimistic concurrency, cancellation
//! - [`object_manager`] - namespaced children of one plugin, and namespace moves
//! - [`comparators`] - per-kind change detection
//! - [`generic`] - the create-or-update template every step uses
//! - [`registration`] - console operator plugin list
//! - [`permissions`] - service account and RBAC
//! - [`consoleplugin`] - the ordered reconciliation pass
//! - [`flowcollector`] - controller entry point and status
//!
//! # Example
//!
//! ```rust,no_run
//! use flowconsole::context::Context;
//! use flowconsole::crd::FlowCollector;
//! use flowconsole::reconcilers::reconcile_flowcollector;
//! use std::sync::Arc;
//!
//! async fn run_once(ctx: Arc<Context>, fc: FlowCollector) -> anyhow::Result<()> {
//!     reconcile_flowcollector(ctx, fc).await
//! }
//! ```

pub mod client;
pub mod comparators;
pub mod consoleplugin;
#[cfg(test)]
pub mod fake_client;
pub mod flowcollector;
pub mod generic;
pub mod helper;
pub mod object_manager;
pub mod permissions;
pub mod registration;
pub mod status;


pub use consoleplugin::ConsolePluginReconciler;
pub use flowcollector::reconcile_flowcollector;
