// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `State` - the merge contract every accumulated state implements
//! - `StateMap` - a JSON mapping with overwrite merge, for ad-hoc graphs
//! - `DevState` - the typed record threaded through the developer workflow

mod record;
mod store;

pub use record::{DevState, FileArtifact, TaskType};
pub use store::StateMap;

/// Accumulated state threaded through one invocation.
///
/// `merge` applies a step's partial update: every field present in the
/// update overwrites the current value, every other field is left as is.
/// There is no way to delete a field.
pub trait State: Clone + Send + Sync + 'static {
    /// Partial update produced by a step
    type Update: Send;

    fn merge(&mut self, update: Self::Update);
}
