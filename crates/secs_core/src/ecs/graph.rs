//! # Archetype Graph
//!
//! Directed acyclic graph of archetypes. An edge `(A, T, B)` means "adding
//! `T` to an entity in `A` moves it to `B`". Each edge is stored twice in an
//! adjacency matrix: `Forward` at `[A][B]` and `Backward` at `[B][A]`, so
//! removal of `T` from an entity in `B` finds `A` by following the same edge
//! in reverse.
//!
//! ```text
//!            +Position           +Velocity
//!   {} ----------------> {P} ----------------> {P, V}
//!    \                                           ^
//!     \ +Velocity                                |
//!      `-----------------> {V} ------------------'
//!                                +Position
//! ```
//!
//! Every forward edge adds exactly one type, so no vertex can reach itself.
//! Edges are memoized: once `(A, T)` resolves to `B` it always does.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use super::archetype::{Archetype, ArchetypeId, ArchetypeSignature};
use super::component::ComponentType;
use crate::config::RegistryConfig;
use crate::error::{EcsError, EcsResult};

/// Direction of a matrix cell relative to its row vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The row vertex gains the label to reach the column vertex.
    Forward,
    /// The row vertex loses the label to reach the column vertex.
    Backward,
}

/// One matrix cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Component type that labels the transition.
    pub label: ComponentType,
    /// Direction relative to the row vertex.
    pub direction: Direction,
}

/// Archetypes plus the memoized transitions between them.
pub struct ArchetypeGraph {
    /// Vertex `i` has id `i`.
    vertices: Vec<Archetype>,
    /// Row-major `capacity × capacity` matrix.
    edges: Vec<Option<Edge>>,
    /// Matrix dimension.
    capacity: usize,
    /// Signature → vertex, so a type-set never gets two archetypes.
    signatures: HashMap<ArchetypeSignature, ArchetypeId>,
    /// Settings handed to every new archetype.
    config: RegistryConfig,
}

impl ArchetypeGraph {
    /// Creates a graph holding only the empty archetype.
    ///
    /// A zero `graph_capacity` is treated as one.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        let capacity = config.graph_capacity.max(1);
        let root = Archetype::empty(&config);
        let mut signatures = HashMap::new();
        signatures.insert(ArchetypeSignature::empty(), ArchetypeId::EMPTY);

        let mut vertices = Vec::with_capacity(capacity);
        vertices.push(root);
        Self {
            vertices,
            edges: vec![None; capacity * capacity],
            capacity,
            signatures,
            config,
        }
    }

    /// The empty archetype.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Archetype {
        &self.vertices[ArchetypeId::EMPTY.index()]
    }

    /// The empty archetype, mutably.
    #[inline]
    pub fn root_mut(&mut self) -> &mut Archetype {
        &mut self.vertices[ArchetypeId::EMPTY.index()]
    }

    /// Number of archetypes. Always at least one.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of distinct transitions.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges
            .iter()
            .flatten()
            .filter(|edge| edge.direction == Direction::Forward)
            .count()
    }

    /// Current matrix dimension.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Looks up an archetype.
    #[inline]
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.vertices.get(id.index())
    }

    /// Looks up an archetype, failing if absent.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`].
    pub fn get(&self, id: ArchetypeId) -> EcsResult<&Archetype> {
        self.vertices
            .get(id.index())
            .ok_or(EcsError::ArchetypeNotFound(id))
    }

    /// Looks up an archetype mutably, failing if absent.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`].
    pub fn get_mut(&mut self, id: ArchetypeId) -> EcsResult<&mut Archetype> {
        self.vertices
            .get_mut(id.index())
            .ok_or(EcsError::ArchetypeNotFound(id))
    }

    /// Two distinct archetypes, both mutable.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`] if either is absent or they are the same.
    pub fn pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> EcsResult<(&mut Archetype, &mut Archetype)> {
        let (i, j) = (a.index(), b.index());
        let len = self.vertices.len();
        if i >= len {
            return Err(EcsError::ArchetypeNotFound(a));
        }
        if j >= len || i == j {
            return Err(EcsError::ArchetypeNotFound(b));
        }
        if i < j {
            let (left, right) = self.vertices.split_at_mut(j);
            Ok((&mut left[i], &mut right[0]))
        } else {
            let (left, right) = self.vertices.split_at_mut(i);
            Ok((&mut right[0], &mut left[j]))
        }
    }

    /// All archetypes in id order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.vertices.iter()
    }

    /// All archetypes in id order, mutably.
    pub fn archetypes_mut(&mut self) -> impl Iterator<Item = &mut Archetype> {
        self.vertices.iter_mut()
    }

    /// The archetype with exactly this type-set, if one exists.
    #[must_use]
    pub fn find(&self, signature: &ArchetypeSignature) -> Option<ArchetypeId> {
        self.signatures.get(signature).copied()
    }

    /// Returns the archetype for `signature`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] if a type cannot be pooled, or
    /// [`EcsError::AllocationFailed`] if the matrix cannot grow.
    pub fn add_archetype(&mut self, signature: ArchetypeSignature) -> EcsResult<ArchetypeId> {
        if let Some(id) = self.find(&signature) {
            return Ok(id);
        }

        let id = ArchetypeId::from_index(self.vertices.len());
        let archetype = Archetype::new(id, signature.clone(), &self.config)?;
        if self.vertices.len() == self.capacity {
            self.grow()?;
        }
        self.vertices.push(archetype);
        self.signatures.insert(signature, id);

        debug!(
            archetype = %id,
            components = ?self.vertices[id.index()]
                .signature()
                .types()
                .iter()
                .map(ComponentType::name)
                .collect::<Vec<_>>(),
            "archetype created"
        );
        Ok(id)
    }

    /// Follows the forward edge labelled `label` out of `from`.
    #[must_use]
    pub fn edge(&self, from: ArchetypeId, label: TypeId) -> Option<ArchetypeId> {
        self.find_in_row(from, label, Direction::Forward)
    }

    /// Follows the forward edge labelled `label` into `to` backwards, giving
    /// the archetype that lacks `label`.
    #[must_use]
    pub fn edge_into(&self, to: ArchetypeId, label: TypeId) -> Option<ArchetypeId> {
        self.find_in_row(to, label, Direction::Backward)
    }

    /// Records the forward edge `from --label--> to`.
    ///
    /// Re-adding an identical edge is a no-op.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ArchetypeNotFound`] if either vertex is absent
    /// - [`EcsError::InvalidEdge`] unless `to`'s type-set is `from`'s plus `label`
    /// - [`EcsError::EdgeConflict`] if `(from, label)` already leads elsewhere
    pub fn add_edge(
        &mut self,
        from: ArchetypeId,
        label: ComponentType,
        to: ArchetypeId,
    ) -> EcsResult<()> {
        let source = self.get(from)?;
        let target = self.get(to)?;
        if let Some(existing) = self.edge(from, label.id()) {
            if existing == to {
                return Ok(());
            }
            return Err(EcsError::EdgeConflict {
                from,
                label: label.name(),
                existing,
                requested: to,
            });
        }
        if source.signature().contains_id(label.id())
            || source.signature().with(label) != *target.signature()
        {
            return Err(EcsError::InvalidEdge {
                from,
                label: label.name(),
                to,
            });
        }

        let (f, t) = (from.index(), to.index());
        self.edges[f * self.capacity + t] = Some(Edge {
            label,
            direction: Direction::Forward,
        });
        self.edges[t * self.capacity + f] = Some(Edge {
            label,
            direction: Direction::Backward,
        });

        debug!(from = %from, to = %to, label = label.name(), "edge memoized");
        Ok(())
    }

    /// The archetype reached by adding `component` to `from`.
    ///
    /// Uses the memoized edge when present; otherwise finds or creates the
    /// archetype for the extended type-set and records the edge.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`], [`EcsError::InvalidEdge`] if `from`
    /// already has `component`, or any archetype creation error.
    pub fn extend(&mut self, from: ArchetypeId, component: ComponentType) -> EcsResult<ArchetypeId> {
        if let Some(to) = self.edge(from, component.id()) {
            return Ok(to);
        }
        let signature = self.get(from)?.signature().with(component);
        let to = self.add_archetype(signature)?;
        self.add_edge(from, component, to)?;
        Ok(to)
    }

    /// The archetype reached by removing `component` from `from`.
    ///
    /// The edge is recorded smaller → larger, so the same edge serves both
    /// directions.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`], [`EcsError::InvalidEdge`] if `from`
    /// lacks `component`, or any archetype creation error.
    pub fn reduce(&mut self, from: ArchetypeId, component: ComponentType) -> EcsResult<ArchetypeId> {
        if let Some(to) = self.edge_into(from, component.id()) {
            return Ok(to);
        }
        let signature = self.get(from)?.signature().without(component.id());
        let to = self.add_archetype(signature)?;
        self.add_edge(to, component, from)?;
        Ok(to)
    }

    /// Outgoing forward edges of `from` as `(label, to)` pairs.
    pub fn neighbours(
        &self,
        from: ArchetypeId,
    ) -> impl Iterator<Item = (ComponentType, ArchetypeId)> + '_ {
        self.row(from)
            .iter()
            .enumerate()
            .filter_map(|(to, cell)| match cell {
                Some(edge) if edge.direction == Direction::Forward => {
                    Some((edge.label, ArchetypeId::from_index(to)))
                }
                _ => None,
            })
    }

    /// Depth-first walk over forward edges starting at `from` (inclusive).
    ///
    /// Each vertex is yielded at most once.
    #[must_use]
    pub fn depth_first(&self, from: ArchetypeId) -> DepthFirst<'_> {
        let mut stack = Vec::new();
        if from.index() < self.vertices.len() {
            stack.push(from);
        }
        DepthFirst {
            graph: self,
            stack,
            visited: vec![false; self.vertices.len()],
        }
    }

    /// First archetype reachable from `from` that satisfies `predicate`.
    pub fn depth_first_search<P>(&self, from: ArchetypeId, mut predicate: P) -> Option<ArchetypeId>
    where
        P: FnMut(&Archetype) -> bool,
    {
        self.depth_first(from)
            .find(|archetype| predicate(*archetype))
            .map(Archetype::id)
    }

    fn row(&self, vertex: ArchetypeId) -> &[Option<Edge>] {
        let start = vertex.index() * self.capacity;
        self.edges
            .get(start..start + self.capacity)
            .unwrap_or_default()
    }

    fn find_in_row(
        &self,
        vertex: ArchetypeId,
        label: TypeId,
        direction: Direction,
    ) -> Option<ArchetypeId> {
        self.row(vertex)
            .iter()
            .position(|cell| {
                cell.is_some_and(|edge| edge.direction == direction && edge.label.id() == label)
            })
            .map(ArchetypeId::from_index)
    }

    /// Doubles the matrix dimension, keeping every edge.
    fn grow(&mut self) -> EcsResult<()> {
        let old = self.capacity;
        let new = old * 2;
        let cells = new * new;

        let mut edges = Vec::new();
        edges
            .try_reserve_exact(cells)
            .map_err(|_| EcsError::AllocationFailed {
                component: "archetype graph",
                bytes: cells * std::mem::size_of::<Option<Edge>>(),
            })?;
        edges.resize(cells, None);
        for row in 0..old {
            edges[row * new..row * new + old].copy_from_slice(&self.edges[row * old..(row + 1) * old]);
        }

        self.edges = edges;
        self.capacity = new;
        debug!(from = old, to = new, "archetype graph grew");
        Ok(())
    }
}

impl std::fmt::Debug for ArchetypeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchetypeGraph")
            .field("vertices", &self.vertices.len())
            .field("edges", &self.edge_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Iterator returned by [`ArchetypeGraph::depth_first`].
pub struct DepthFirst<'g> {
    graph: &'g ArchetypeGraph,
    stack: Vec<ArchetypeId>,
    visited: Vec<bool>,
}

impl<'g> Iterator for DepthFirst<'g> {
    type Item = &'g Archetype;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(vertex) = self.stack.pop() {
            if std::mem::replace(&mut self.visited[vertex.index()], true) {
                continue;
            }
            let mut next: Vec<_> = self
                .graph
                .neighbours(vertex)
                .map(|(_, to)| to)
                .filter(|to| !self.visited[to.index()])
                .collect();
            // Lowest id is explored first.
            next.reverse();
            self.stack.extend(next);
            return self.graph.archetype(vertex);
        }
        None
    }
}
