//! Arena-backed dependency graph.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("'{node}' depends on unknown '{dependency}'")]
    UnknownDependency { node: String, dependency: String },

    #[error("Dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Duplicate node name '{0}'")]
    DuplicateNode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug)]
struct Node<T> {
    name: String,
    payload: T,
    /// Dependencies that have not been removed yet.
    remaining: BTreeSet<NodeId>,
}

/// Nodes plus their not-yet-satisfied dependencies.
///
/// Removing a node satisfies it for every dependent. A node is ready once
/// all of its dependencies have been removed.
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<Option<Node<T>>>,
    live: usize,
}

impl<T> DependencyGraph<T> {
    /// Builds a graph from `(name, dependency names, payload)` triples.
    pub fn build<I>(entries: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (String, Vec<String>, T)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();

        let mut ids = HashMap::with_capacity(entries.len());
        for (index, (name, _, _)) in entries.iter().enumerate() {
            if ids.insert(name.clone(), NodeId(index)).is_some() {
                return Err(GraphError::DuplicateNode(name.clone()));
            }
        }

        let mut nodes = Vec::with_capacity(entries.len());
        for (name, dependencies, payload) in entries {
            let mut remaining = BTreeSet::new();
            for dependency in dependencies {
                let id = ids.get(&dependency).ok_or_else(|| GraphError::UnknownDependency {
                    node: name.clone(),
                    dependency: dependency.clone(),
                })?;
                remaining.insert(*id);
            }
            nodes.push(Some(Node {
                name,
                payload,
                remaining,
            }));
        }

        let graph = Self {
            live: nodes.len(),
            nodes,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    pub fn payload(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|n| &n.payload)
    }

    /// Nodes still present whose dependencies have all been removed.
    pub fn ready(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(index, slot)| match slot {
            Some(node) if node.remaining.is_empty() => Some(NodeId(index)),
            _ => None,
        })
    }

    /// Removes `id` and strips it from every remaining node's dependencies.
    ///
    /// Removing an already removed node is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        self.live -= 1;
        for other in self.nodes.iter_mut().flatten() {
            other.remaining.remove(&id);
        }
        Some(node.payload)
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn check_acyclic(&self) -> Result<(), GraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn visit<T>(
            graph: &DependencyGraph<T>,
            id: NodeId,
            colors: &mut [Color],
            stack: &mut Vec<NodeId>,
        ) -> Result<(), GraphError> {
            colors[id.0] = Color::Gray;
            stack.push(id);

            if let Some(node) = graph.node(id) {
                for &dep in &node.remaining {
                    match colors[dep.0] {
                        Color::Gray => {
                            let start = stack.iter().position(|&s| s == dep).unwrap_or(0);
                            let mut path: Vec<String> = stack[start..]
                                .iter()
                                .filter_map(|&s| graph.name(s).map(str::to_string))
                                .collect();
                            path.extend(graph.name(dep).map(str::to_string));
                            return Err(GraphError::Cycle { path });
                        }
                        Color::White => visit(graph, dep, colors, stack)?,
                        Color::Black => {}
                    }
                }
            }

            stack.pop();
            colors[id.0] = Color::Black;
            Ok(())
        }

        let mut colors = vec![Color::White; self.nodes.len()];
        let mut stack = Vec::new();
        for index in 0..self.nodes.len() {
            if colors[index] == Color::White {
                visit(self, NodeId(index), &mut colors, &mut stack)?;
            }
        }
        Ok(())
    }
}
