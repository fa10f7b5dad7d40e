// SPDX-License-Identifier: MIT

//! Workflow module - graph-based step orchestration
//!
//! - [state] - merge contract and the concrete state types
//! - [graph] - graph definition, compilation and execution
//! - [router] - conditional routing between nodes
//! - [artifact] - arc-file segment parser for generated output
//! - [builder] - the developer workflow topology

pub mod artifact;
pub mod builder;
pub mod graph;
pub mod router;
pub mod state;
