// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Flowconsole - network observability console plugin operator
//!
//! Flowconsole deploys the web console plugin of a network flow collector and keeps
//! it converged with the `FlowCollector` custom resource.
//!
//! ## Overview
//!
//! This library provides the core functionality of the operator, including:
//!
//! - The `FlowCollector` Custom Resource Definition
//! - Typed views of the console and Prometheus operator resources it writes
//! - Builders for the plugin workload, configuration, exposure and RBAC
//! - The reconciliation engine that converges them in a fixed order
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`external_crds`] - `ConsolePlugin`, `Console` and `ServiceMonitor`
//! - [`console_resources`] - desired child resources
//! - [`reconcilers`] - reconciliation logic
//! - [`certificates`] - certificate rotation tracking
//! - [`capabilities`] - optional API discovery
//! - [`quantity`] - value-based resource quantity comparison
//! - [`context`] - shared controller context
//!
//! ## Example
//!
//! ```rust,no_run
//! use flowconsole::console_resources::PluginBuilder;
//! use flowconsole::crd::FlowCollectorSpec;
//!
//! let spec = FlowCollectorSpec::default();
//! let builder = PluginBuilder::new("netobserv", "quay.io/netobserv/console-plugin:v1", &spec);
//! let (config_map, digest) = builder.config_map().expect("config renders");
//! let deployment = builder.deployment(&digest);
//! ```

pub mod capabilities;
pub mod certificates;
pub mod change_report;
pub mod console_resources;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod external_crds;
pub mod labels;
pub mod metrics;
pub mod quantity;
pub mod reconcilers;

#[cfg(test)]
mod errors_tests;
