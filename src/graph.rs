//! The dependency DAG over mapped validators.
//!
//! Nodes are registered once, at configuration time, and the graph is
//! frozen (its topological order computed and cached) the first time
//! `validate` runs. Registering a node can only reference dependencies
//! that are already registered, so the acyclic invariant holds by
//! construction; [`DependencyGraph::topological_order`] still asserts it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::error::EngineError;
use crate::provider::MappedValidator;

/// Interns a registered mapped validator's identity within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Node {
    id: NodeId,
    mapped_validator: MappedValidator,
    depends_on: Vec<NodeId>,
    timeout: Option<Duration>,
}

/// An immutable, `Arc`-shareable snapshot of the graph, handed to every
/// task spawned while validating one record. Computed once, the first time
/// `validate` runs, from the frozen registration-time graph.
pub struct Plan {
    pub order: Vec<NodeId>,
    pub mapped_validators: HashMap<NodeId, MappedValidator>,
    pub dependencies: HashMap<NodeId, Vec<NodeId>>,
    pub timeouts: HashMap<NodeId, Option<Duration>>,
}

/// A directed acyclic graph whose nodes are mapped validators.
#[derive(Default)]
pub struct DependencyGraph {
    next_id: AtomicU64,
    nodes: Vec<Node>,
    plan: OnceLock<Arc<Plan>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            nodes: Vec::new(),
            plan: OnceLock::new(),
        }
    }

    /// Finds an already-registered node equal to `mapped_validator`, per
    /// the identity rule: same validator and same provider specification.
    pub fn find_equal(&self, mapped_validator: &MappedValidator) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| &n.mapped_validator == mapped_validator)
            .map(|n| n.id)
    }

    pub fn register(
        &mut self,
        mapped_validator: MappedValidator,
        depends_on: &[NodeId],
        timeout: Option<Duration>,
    ) -> Result<NodeId, EngineError> {
        if self.plan.get().is_some() {
            return Err(EngineError::Configuration(
                "cannot register new validators after the graph has been frozen by validate()"
                    .to_string(),
            ));
        }
        for dep in depends_on {
            if !self.nodes.iter().any(|n| n.id == *dep) {
                return Err(EngineError::UnknownDependency(dep.0));
            }
        }

        let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.nodes.push(Node {
            id,
            mapped_validator,
            depends_on: depends_on.to_vec(),
            timeout,
        });
        Ok(id)
    }

    pub fn mapped_validator(&self, id: NodeId) -> &MappedValidator {
        &self.node(id).mapped_validator
    }

    pub fn timeout(&self, id: NodeId) -> Option<Duration> {
        self.node(id).timeout
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).depends_on
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .expect("NodeId always refers to a node registered on this graph")
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Computes (and memoizes) a topological order in which every node
    /// appears after all of its dependencies. Ties among independent nodes
    /// are broken by registration order.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.plan().order
    }

    /// Returns the cached execution plan, computing it on first call.
    pub fn plan(&self) -> Arc<Plan> {
        self.plan
            .get_or_init(|| {
                let order = self.compute_topological_order();
                let mapped_validators = self
                    .nodes
                    .iter()
                    .map(|n| (n.id, n.mapped_validator.clone()))
                    .collect();
                let dependencies = self
                    .nodes
                    .iter()
                    .map(|n| (n.id, n.depends_on.clone()))
                    .collect();
                let timeouts = self.nodes.iter().map(|n| (n.id, n.timeout)).collect();
                Arc::new(Plan {
                    order,
                    mapped_validators,
                    dependencies,
                    timeouts,
                })
            })
            .clone()
    }

    fn compute_topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> =
            self.nodes.iter().map(|n| (n.id, n.depends_on.len())).collect();
        let mut dependents_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for n in &self.nodes {
            for dep in &n.depends_on {
                dependents_of.entry(*dep).or_default().push(n.id);
            }
        }

        let mut ready: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.depends_on.is_empty())
            .map(|n| n.id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited: HashSet<NodeId> = HashSet::new();

        while let Some(node_id) = ready.first().copied() {
            ready.remove(0);
            if !visited.insert(node_id) {
                continue;
            }
            order.push(node_id);
            if let Some(dependents) = dependents_of.get(&node_id) {
                for dependent in dependents {
                    let degree = in_degree.get_mut(dependent).expect("tracked node");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(*dependent);
                    }
                }
            }
        }

        assert_eq!(
            order.len(),
            self.nodes.len(),
            "dependency graph contains a cycle, which registration should have prevented"
        );
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;
    use crate::provider::MappedValidator;
    use crate::validator::ValidatorBuilder;
    use std::collections::HashMap as Map;

    fn mv(name: &str) -> MappedValidator {
        let validator = ValidatorBuilder::new(name)
            .param("x", crate::validator::ParamType::Str)
            .build(|_p: Parameters| async { Ok(()) })
            .unwrap();
        let mut map = Map::new();
        map.insert("x".to_string(), "x".to_string());
        MappedValidator::path_mapped(validator, vec![map]).unwrap()
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let mut graph = DependencyGraph::new();
        let a = graph.register(mv("a"), &[], None).unwrap();
        let b = graph.register(mv("b"), &[], None).unwrap();
        let c = graph.register(mv("c"), &[a, b], None).unwrap();

        let order = graph.topological_order();
        let pos = |id: NodeId| order.iter().position(|n| *n == id).unwrap();
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(c));
    }

    #[test]
    fn unregistered_dependency_is_rejected() {
        let mut graph = DependencyGraph::new();
        let bogus = NodeId(9999);
        let err = graph.register(mv("a"), &[bogus], None).unwrap_err();
        assert!(matches!(err, EngineError::UnknownDependency(_)));
    }
}
