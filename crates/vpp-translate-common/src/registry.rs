//! Dependency-ordered registry of translation units.
//!
//! Units register under a schema path with ordering constraints relative to
//! other registered paths. [`RegistryBuilder::build`] resolves all
//! constraints once into a single execution order (Kahn's algorithm, ties
//! broken by registration order) and indexes every owned schema path to its
//! node. Constraints naming paths nobody registered are dropped with a
//! warning; a cycle is a build error.

use crate::error::RegistryError;
use crate::path::{ConfigPath, SchemaPath};
use crate::writer::Writer;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Which configuration paths a node handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMode {
    /// Only the node path itself.
    Exact,
    /// The node path plus the listed descendant schema paths.
    Subtree(Vec<SchemaPath>),
}

/// A registered translation unit in its resolved position.
pub struct RegistryNode {
    path: SchemaPath,
    writer: Box<dyn Writer>,
    mode: MatchMode,
    dependencies: Vec<SchemaPath>,
}

impl RegistryNode {
    pub fn path(&self) -> &SchemaPath {
        &self.path
    }

    pub fn writer(&self) -> &dyn Writer {
        self.writer.as_ref()
    }

    pub fn mode(&self) -> &MatchMode {
        &self.mode
    }

    /// Registered nodes that must run before this one.
    pub fn dependencies(&self) -> &[SchemaPath] {
        &self.dependencies
    }
}

impl fmt::Debug for RegistryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryNode")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Where a configuration path is handled.
#[derive(Debug, Clone, Copy)]
pub struct Route<'a> {
    /// Position of the node in execution order.
    pub position: usize,
    pub node: &'a RegistryNode,
    /// True if the path is a descendant owned by a subtree node.
    pub nested: bool,
}

impl Route<'_> {
    /// The instance of the owning node that `path` belongs to.
    pub fn owner_instance(&self, path: &ConfigPath) -> ConfigPath {
        path.prefix(self.node.path.len())
    }
}

struct Registration {
    path: SchemaPath,
    writer: Box<dyn Writer>,
    owned: Option<Vec<SchemaPath>>,
    after: Vec<SchemaPath>,
    before: Vec<SchemaPath>,
}

fn schema_paths(paths: &[&str]) -> Vec<SchemaPath> {
    paths.iter().map(|p| SchemaPath::from(*p)).collect()
}

/// Collects registrations and resolves them into a [`WriterRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &mut self,
        path: &str,
        writer: Box<dyn Writer>,
        owned: Option<&[&str]>,
        after: &[&str],
        before: &[&str],
    ) -> &mut Self {
        let path = SchemaPath::from(path);
        let owned = owned.map(|relative| {
            relative
                .iter()
                .map(|r| path.join(&SchemaPath::from(*r)))
                .collect()
        });
        self.registrations.push(Registration {
            path,
            writer,
            owned,
            after: schema_paths(after),
            before: schema_paths(before),
        });
        self
    }

    /// Registers a unit with no ordering constraints.
    pub fn add(&mut self, path: &str, writer: Box<dyn Writer>) -> &mut Self {
        self.register(path, writer, None, &[], &[])
    }

    /// Registers a unit that runs after every path in `predecessors`.
    pub fn add_after(
        &mut self,
        path: &str,
        writer: Box<dyn Writer>,
        predecessors: &[&str],
    ) -> &mut Self {
        self.register(path, writer, None, predecessors, &[])
    }

    /// Registers a unit that runs before every path in `successors`.
    pub fn add_before(
        &mut self,
        path: &str,
        writer: Box<dyn Writer>,
        successors: &[&str],
    ) -> &mut Self {
        self.register(path, writer, None, &[], successors)
    }

    /// Registers a unit that also owns the descendant paths in `owned`,
    /// given relative to `path`.
    pub fn subtree_add(&mut self, path: &str, writer: Box<dyn Writer>, owned: &[&str]) -> &mut Self {
        self.register(path, writer, Some(owned), &[], &[])
    }

    pub fn subtree_add_after(
        &mut self,
        path: &str,
        writer: Box<dyn Writer>,
        owned: &[&str],
        predecessors: &[&str],
    ) -> &mut Self {
        self.register(path, writer, Some(owned), predecessors, &[])
    }

    pub fn subtree_add_before(
        &mut self,
        path: &str,
        writer: Box<dyn Writer>,
        owned: &[&str],
        successors: &[&str],
    ) -> &mut Self {
        self.register(path, writer, Some(owned), &[], successors)
    }

    /// Resolves all registrations into one execution order.
    pub fn build(self) -> Result<WriterRegistry, RegistryError> {
        let registrations = self.registrations;

        // schema path -> registration index, for node paths and owned paths
        let mut owners: BTreeMap<SchemaPath, usize> = BTreeMap::new();
        for (idx, reg) in registrations.iter().enumerate() {
            if owners.contains_key(&reg.path) {
                return Err(RegistryError::DuplicateWriter {
                    path: reg.path.to_string(),
                });
            }
            owners.insert(reg.path.clone(), idx);
        }
        let mut owned_paths: BTreeMap<SchemaPath, usize> = BTreeMap::new();
        for (idx, reg) in registrations.iter().enumerate() {
            for owned in reg.owned.iter().flatten() {
                if let Some(&existing) = owners.get(owned) {
                    return Err(RegistryError::OwnershipConflict {
                        path: owned.to_string(),
                        owner: registrations[existing].path.to_string(),
                        claimant: reg.path.to_string(),
                    });
                }
                owners.insert(owned.clone(), idx);
                owned_paths.insert(owned.clone(), idx);
            }
        }
        // an owned path covers its whole subtree, so no other node may sit below it
        for reg in &registrations {
            if let Some((_, &owner)) = owned_paths
                .iter()
                .find(|(owned, _)| reg.path.is_descendant_of(owned))
            {
                return Err(RegistryError::OwnershipConflict {
                    path: reg.path.to_string(),
                    owner: registrations[owner].path.to_string(),
                    claimant: reg.path.to_string(),
                });
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(registrations.len(), 0);
        let indices: Vec<NodeIndex> = (0..registrations.len()).map(|i| graph.add_node(i)).collect();

        let resolve = |target: &SchemaPath, from: &SchemaPath| -> Option<usize> {
            let found = owners.get(target).copied();
            if found.is_none() {
                warn!(node = %from, constraint = %target, "ignoring constraint on unregistered path");
            }
            found
        };
        for (idx, reg) in registrations.iter().enumerate() {
            for pred in &reg.after {
                if let Some(p) = resolve(pred, &reg.path).filter(|&p| p != idx) {
                    graph.update_edge(indices[p], indices[idx], ());
                }
            }
            for succ in &reg.before {
                if let Some(s) = resolve(succ, &reg.path).filter(|&s| s != idx) {
                    graph.update_edge(indices[idx], indices[s], ());
                }
            }
        }

        let order = toposort(&graph).map_err(|idx| RegistryError::Cycle {
            path: registrations[idx].path.to_string(),
        })?;

        let dependencies: Vec<Vec<SchemaPath>> = indices
            .iter()
            .map(|&node| {
                let mut preds: Vec<usize> = graph
                    .neighbors_directed(node, Direction::Incoming)
                    .map(|n| graph[n])
                    .collect();
                preds.sort_unstable();
                preds
                    .into_iter()
                    .map(|p| registrations[p].path.clone())
                    .collect()
            })
            .collect();

        let mut slots: Vec<Option<(Registration, Vec<SchemaPath>)>> = registrations
            .into_iter()
            .zip(dependencies)
            .map(Some)
            .collect();

        let mut nodes = Vec::with_capacity(order.len());
        let mut position_of = vec![0usize; order.len()];
        for (position, &idx) in order.iter().enumerate() {
            position_of[idx] = position;
            if let Some((reg, deps)) = slots[idx].take() {
                nodes.push(RegistryNode {
                    path: reg.path,
                    writer: reg.writer,
                    mode: match reg.owned {
                        Some(owned) => MatchMode::Subtree(owned),
                        None => MatchMode::Exact,
                    },
                    dependencies: deps,
                });
            }
        }

        let index = owners
            .into_iter()
            .map(|(path, idx)| {
                let entry = IndexEntry {
                    position: position_of[idx],
                    owned: owned_paths.contains_key(&path),
                };
                (path, entry)
            })
            .collect();

        let registry = WriterRegistry { nodes, index };
        debug!(order = ?registry.execution_order(), "writer registry built");
        Ok(registry)
    }
}

/// Kahn's algorithm. Among ready nodes the lowest registration index goes
/// first. On a cycle, returns the first registration left unsorted.
fn toposort(graph: &DiGraph<usize, ()>) -> Result<Vec<usize>, usize> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BTreeSet<usize> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(|n| graph[n])
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for succ in graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
            let degree = &mut in_degree[succ.index()];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                ready.insert(graph[succ]);
            }
        }
    }

    if order.len() != graph.node_count() {
        let stuck = in_degree
            .iter()
            .position(|&d| d > 0)
            .unwrap_or_default();
        return Err(stuck);
    }
    Ok(order)
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    position: usize,
    /// Declared as an owned descendant of a subtree node.
    owned: bool,
}

/// Immutable, resolved set of translation units.
pub struct WriterRegistry {
    nodes: Vec<RegistryNode>,
    index: BTreeMap<SchemaPath, IndexEntry>,
}

impl WriterRegistry {
    /// Nodes in execution order.
    pub fn nodes(&self) -> &[RegistryNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node paths in execution order.
    pub fn execution_order(&self) -> Vec<SchemaPath> {
        self.nodes.iter().map(|n| n.path.clone()).collect()
    }

    pub fn node(&self, path: &SchemaPath) -> Option<&RegistryNode> {
        self.index
            .get(path)
            .map(|entry| &self.nodes[entry.position])
            .filter(|node| &node.path == path)
    }

    /// Finds the node that handles `path`.
    ///
    /// A registered node path matches only itself. An owned path of a
    /// subtree node matches itself and everything below it; the nearest
    /// owned ancestor wins.
    pub fn route(&self, path: &ConfigPath) -> Option<Route<'_>> {
        let schema = path.schema();
        let entry = match self.index.get(&schema) {
            Some(entry) => *entry,
            None => (1..schema.len())
                .rev()
                .filter_map(|len| self.index.get(&schema.prefix(len)))
                .find(|entry| entry.owned)
                .copied()?,
        };
        Some(Route {
            position: entry.position,
            node: &self.nodes[entry.position],
            nested: entry.owned,
        })
    }
}

impl fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterRegistry")
            .field("nodes", &self.nodes)
            .finish()
    }
}
