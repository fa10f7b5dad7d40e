// SPDX-License-Identifier: MIT

//! Arcflow - graph workflow engine and the developer workflow built on it
//!
//! - [workflow] - state, graph definition, executor, routing and the workflow builder
//! - [steps] - the developer-workflow step bodies
//! - [config] - layered settings

pub mod config;
pub mod steps;
pub mod workflow;
