// SPDX-License-Identifier: MIT

//! Graph type definitions
//!
//! Nodes, edges and the terminal sentinel shared by the definition and the
//! compiled executor.

use std::fmt;
use std::sync::Arc;

use crate::adk::step::Step;
use crate::arcflow::workflow::router::{Router, Routes};
use crate::arcflow::workflow::state::State;

/// Where control goes after a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Continue with the named node
    Node(String),
    /// Terminal sentinel: the invocation is finished
    End,
}

impl Target {
    pub fn node(id: impl Into<String>) -> Self {
        Target::Node(id.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            Target::Node(id) => Some(id),
            Target::End => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(id) => f.write_str(id),
            Target::End => f.write_str("<end>"),
        }
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Target::Node(id.to_string())
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Target::Node(id)
    }
}

impl From<&String> for Target {
    fn from(id: &String) -> Self {
        Target::Node(id.clone())
    }
}

/// The single outgoing edge group of a node
pub enum Edge<S> {
    /// Always continue with `Target`
    Fixed(Target),
    /// Ask the router for a label and look it up
    Conditional {
        router: Arc<dyn Router<S>>,
        routes: Routes,
    },
}

impl<S> Edge<S> {
    /// Every destination this edge can lead to
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Edge::Fixed(target) => vec![target],
            Edge::Conditional { routes, .. } => routes.targets().collect(),
        }
    }
}

impl<S> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            Edge::Conditional { routes, .. } => f
                .debug_struct("Conditional")
                .field("routes", routes)
                .finish_non_exhaustive(),
        }
    }
}

/// Registered node: an id and the step it runs
pub struct Node<S: State> {
    pub id: String,
    pub step: Arc<dyn Step<S>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        let target: Target = "read_code".into();
        assert_eq!(target, Target::node("read_code"));
        assert_eq!(target.node_id(), Some("read_code"));
        assert!(!target.is_end());
    }

    #[test]
    fn test_end_is_distinct_from_any_node_id() {
        assert_ne!(Target::End, Target::node("<end>"));
        assert_ne!(Target::End, Target::node("__end__"));
        assert_eq!(Target::End.node_id(), None);
    }

    #[test]
    fn test_edge_targets() {
        let fixed: Edge<()> = Edge::Fixed(Target::End);
        assert_eq!(fixed.targets(), vec![&Target::End]);

        let router: Arc<dyn Router<()>> = Arc::new(|_: &()| "a".to_string());
        let cond: Edge<()> = Edge::Conditional {
            router,
            routes: Routes::new().route("a", "x").route("b", Target::End),
        };
        assert_eq!(cond.targets(), vec![&Target::node("x"), &Target::End]);
    }
}
