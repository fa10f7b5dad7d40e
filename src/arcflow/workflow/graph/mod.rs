// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! Build a [`StateGraph`], compile it, then invoke the [`CompiledGraph`] as
//! many times as needed. Execution follows one node at a time from the entry
//! until an edge resolves to [`Target::End`].

mod definition;
pub mod executor;
pub mod types;

pub use definition::StateGraph;
pub use executor::{CompiledGraph, CompiledNode, EngineConfig, Execution, TraceEntry, DEFAULT_MAX_STEPS};
pub use types::{Edge, Node, Target};
