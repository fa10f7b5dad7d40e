// SPDX-License-Identifier: MIT

//! Graph definition and compilation
//!
//! `StateGraph` is the mutable registry of nodes, edges and the entry point.
//! `compile` checks the structure and freezes it into a `CompiledGraph`.
//! Cycles are allowed; the executor's step budget bounds them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::adk::error::GraphBuildError;
use crate::adk::step::Step;
use crate::arcflow::workflow::router::{Router, Routes};
use crate::arcflow::workflow::state::State;

use super::executor::{CompiledGraph, CompiledNode, EngineConfig};
use super::types::{Edge, Node, Target};

/// Mutable graph under construction
pub struct StateGraph<S: State> {
    nodes: HashMap<String, Node<S>>,
    /// Registration order, for deterministic validation errors
    order: Vec<String>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
}

impl<S: State> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            entry: None,
        }
    }

    /// Register a step under a unique id
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        step: impl Step<S> + 'static,
    ) -> Result<&mut Self, GraphBuildError> {
        self.add_shared_node(id, Arc::new(step))
    }

    /// Register a step that is already behind an `Arc`
    pub fn add_shared_node(
        &mut self,
        id: impl Into<String>,
        step: Arc<dyn Step<S>>,
    ) -> Result<&mut Self, GraphBuildError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(GraphBuildError::DuplicateNode(id));
        }
        self.order.push(id.clone());
        self.nodes.insert(id.clone(), Node { id, step });
        Ok(self)
    }

    /// Set the node execution starts from
    pub fn set_entry(&mut self, id: impl Into<String>) -> Result<&mut Self, GraphBuildError> {
        let id = id.into();
        if !self.nodes.contains_key(&id) {
            return Err(GraphBuildError::UnknownNode(id));
        }
        self.entry = Some(id);
        Ok(self)
    }

    /// Always continue from `from` to `to`
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<Target>,
    ) -> Result<&mut Self, GraphBuildError> {
        let from = from.into();
        let to = to.into();
        self.check_source(&from)?;
        self.check_target(&from, &to)?;
        self.edges.insert(from, Edge::Fixed(to));
        Ok(self)
    }

    /// Continue from `from` to whatever `routes` maps the router's label to
    pub fn add_conditional_edges(
        &mut self,
        from: impl Into<String>,
        router: impl Router<S> + 'static,
        routes: Routes,
    ) -> Result<&mut Self, GraphBuildError> {
        let from = from.into();
        self.check_source(&from)?;
        if routes.is_empty() {
            return Err(GraphBuildError::EmptyRoutes(from));
        }
        for target in routes.targets() {
            self.check_target(&from, target)?;
        }
        self.edges.insert(
            from,
            Edge::Conditional {
                router: Arc::new(router),
                routes,
            },
        );
        Ok(self)
    }

    fn check_source(&self, from: &str) -> Result<(), GraphBuildError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphBuildError::UnknownNode(from.to_string()));
        }
        if self.edges.contains_key(from) {
            return Err(GraphBuildError::DuplicateEdge(from.to_string()));
        }
        Ok(())
    }

    fn check_target(&self, from: &str, target: &Target) -> Result<(), GraphBuildError> {
        match target {
            Target::End => Ok(()),
            Target::Node(id) if self.nodes.contains_key(id) => Ok(()),
            Target::Node(id) => Err(GraphBuildError::InvalidTarget {
                from: from.to_string(),
                target: id.clone(),
            }),
        }
    }

    /// Compile with the default engine configuration
    pub fn compile(self) -> Result<CompiledGraph<S>, GraphBuildError> {
        self.compile_with(EngineConfig::default())
    }

    /// Validate the structure and freeze the graph
    pub fn compile_with(self, config: EngineConfig) -> Result<CompiledGraph<S>, GraphBuildError> {
        let entry = self.entry.clone().ok_or(GraphBuildError::MissingEntry)?;
        if config.max_steps == 0 {
            return Err(GraphBuildError::ZeroStepBudget);
        }

        if let Some(id) = self.order.iter().find(|id| !self.edges.contains_key(*id)) {
            return Err(GraphBuildError::Dangling(id.clone()));
        }

        let reachable = self.reachable_from(&entry);
        if let Some(id) = self.order.iter().find(|id| !reachable.contains(id.as_str())) {
            return Err(GraphBuildError::Unreachable(id.clone()));
        }

        log::debug!(
            "Compiled graph with {} nodes, entry '{}', step budget {}",
            self.order.len(),
            entry,
            config.max_steps
        );

        let mut edges = self.edges;
        let nodes = self
            .nodes
            .into_iter()
            .filter_map(|(id, node)| {
                let edge = edges.remove(&id)?;
                let compiled = CompiledNode {
                    id: node.id,
                    step: node.step,
                    edge,
                };
                Some((id, compiled))
            })
            .collect();

        Ok(CompiledGraph::new(entry, nodes, config))
    }

    /// Breadth-first walk over every edge and every declared route
    fn reachable_from<'a>(&'a self, entry: &'a str) -> HashSet<&'a str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([entry]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(edge) = self.edges.get(id) {
                queue.extend(edge.targets().into_iter().filter_map(Target::node_id));
            }
        }
        seen
    }
}

impl<S: State> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}
