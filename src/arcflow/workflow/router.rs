// SPDX-License-Identifier: MIT

//! Conditional routing between graph nodes
//!
//! A router looks at the accumulated state and names a label; the edge
//! group's [`Routes`] turn that label into the next [`Target`]. Routers must
//! be pure functions of the state so the same state always routes the same way.

use crate::adk::error::RoutingError;
use crate::arcflow::workflow::graph::Target;

/// Picks a label from the state
pub trait Router<S>: Send + Sync {
    fn route(&self, state: &S) -> String;
}

impl<S, F> Router<S> for F
where
    F: Fn(&S) -> String + Send + Sync,
{
    fn route(&self, state: &S) -> String {
        self(state)
    }
}

/// Ordered label → target mapping of one conditional edge group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routes {
    entries: Vec<(String, Target)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a route
    pub fn route(mut self, label: impl Into<String>, target: impl Into<Target>) -> Self {
        self.insert(label.into(), target.into());
        self
    }

    fn insert(&mut self, label: String, target: Target) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = target,
            None => self.entries.push((label, target)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&Target> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, target)| target)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.entries.iter().map(|(_, t)| t)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<L, T> FromIterator<(L, T)> for Routes
where
    L: Into<String>,
    T: Into<Target>,
{
    fn from_iter<I: IntoIterator<Item = (L, T)>>(iter: I) -> Self {
        let mut routes = Routes::new();
        for (label, target) in iter {
            routes.insert(label.into(), target.into());
        }
        routes
    }
}

/// Run `router` on `state` and look the label up in `routes`
pub fn resolve<S>(
    node: &str,
    router: &dyn Router<S>,
    routes: &Routes,
    state: &S,
) -> Result<Target, RoutingError> {
    let label = router.route(state);
    match routes.get(&label) {
        Some(target) => {
            log::debug!("Router on '{}' chose '{}' -> {}", node, label, target);
            Ok(target.clone())
        }
        None => Err(RoutingError::UnknownRoute {
            node: node.to_string(),
            label,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcflow::workflow::state::StateMap;
    use serde_json::json;

    fn by_type(state: &StateMap) -> String {
        state
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("qna")
            .to_string()
    }

    #[test]
    fn test_routes_from_iter_keeps_order_and_replaces() {
        let routes: Routes = [("x", "a"), ("y", "b"), ("x", "c")].into_iter().collect();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes.labels().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(routes.get("x"), Some(&Target::node("c")));
    }

    #[test]
    fn test_resolve_known_label() {
        let routes = Routes::new()
            .route("dev", "read_code")
            .route("qna", "daily_qna");
        let state = StateMap::from(json!({"type": "dev"}));

        let target = resolve("classify", &by_type, &routes, &state).unwrap();
        assert_eq!(target, Target::node("read_code"));
    }

    #[test]
    fn test_resolve_to_end() {
        let routes = Routes::new().route("end", Target::End);
        let router = |_: &StateMap| "end".to_string();
        let target = resolve("check", &router, &routes, &StateMap::new()).unwrap();
        assert!(target.is_end());
    }

    #[test]
    fn test_resolve_unknown_label() {
        let routes: Routes = [("x", "node_a"), ("y", "node_b")].into_iter().collect();
        let router = |_: &StateMap| "z".to_string();

        let err = resolve("src", &router, &routes, &StateMap::new()).unwrap_err();
        assert_eq!(
            err,
            RoutingError::UnknownRoute {
                node: "src".to_string(),
                label: "z".to_string()
            }
        );
    }

    #[test]
    fn test_router_is_deterministic() {
        let state = StateMap::from(json!({"type": "bugfix"}));
        let first = by_type.route(&state);
        for _ in 0..10 {
            assert_eq!(by_type.route(&state), first);
        }
    }
}
