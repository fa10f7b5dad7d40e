// SPDX-License-Identifier: MIT

//! Agent development kit - workflow-agnostic building blocks
//!
//! - [error] - error taxonomy shared by the engine and its steps
//! - [model] - text-generation capability and its HTTP client
//! - [step] - the contract every graph node implements

pub mod error;
pub mod model;
pub mod step;
