// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph owns every mutation: it validates a change, applies it, tells
//! the affected nodes, then re-settles nodes whose points or result kinds
//! may have changed as a consequence.

use crate::connection::{Connection, ConnectionId};
use crate::evaluation::EvaluationContext;
use crate::identity::IdentityPool;
use crate::node::{Node, NodeId, NodeRect, NodeRegistry};
use crate::nodes::{CustomNode, NodeKind, NodeRole};
use crate::persist::{self, BinaryReader, BinaryWriter, LoadSummary, PersistError};
use crate::port::{ConnectionPoint, PointDirection, PointId, PointKind, PointRef};
use crate::settings::GraphSettings;
use crate::value::ValueKind;
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A node graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    id_pool: IdentityPool,
    registry: Arc<NodeRegistry>,
    settings: GraphSettings,
}

impl Graph {
    /// Create a new empty graph with the built-in node types
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, GraphSettings::default())
    }

    /// Create a graph with the given settings
    pub fn with_settings(name: impl Into<String>, settings: GraphSettings) -> Self {
        Self::with_registry(name, Arc::new(NodeRegistry::default()), settings)
    }

    /// Create a graph over a custom registry
    pub fn with_registry(
        name: impl Into<String>,
        registry: Arc<NodeRegistry>,
        settings: GraphSettings,
    ) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            id_pool: IdentityPool::new(),
            registry,
            settings,
        }
    }

    /// Registered node types
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Settings
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Settings, mutably
    pub fn settings_mut(&mut self) -> &mut GraphSettings {
        &mut self.settings
    }

    /// Node id allocator
    pub fn id_pool(&self) -> &IdentityPool {
        &self.id_pool
    }

    // ---- Nodes ----

    /// Create a node of a registered type at `position`
    pub fn add_node(&mut self, type_name: &str, position: (f32, f32)) -> Result<NodeId, GraphError> {
        if self.registry.get(type_name).is_none() {
            warn!(type_name, "Refused to add node of unknown type");
            return Err(GraphError::UnknownNodeType(type_name.to_string()));
        }

        let [width, height] = self.settings.default_node_size;
        let rect = NodeRect::new(position.0, position.1, width, height);
        let id = NodeId(self.id_pool.new_id());
        let node = self
            .registry
            .create_node(type_name, id, rect)
            .ok_or_else(|| GraphError::UnknownNodeType(type_name.to_string()))?;
        self.nodes.insert(id, node);
        debug!(node = %id, type_name, "Added node");
        Ok(id)
    }

    pub(crate) fn insert_loaded_node(&mut self, node: Node) {
        let id = node.id();
        self.id_pool.mark_used(id.0);
        self.nodes.insert(id, node);
    }

    /// Remove a node, severing all of its connections and recycling its id
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphError::NodeNotFound(node_id));
        }

        let attached: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(node_id))
            .map(|c| c.id)
            .collect();
        let mut touched = Vec::new();
        for id in attached {
            if let Some(connection) = self.remove_connection(id) {
                let other = if connection.out_node == node_id {
                    connection.in_ref()
                } else {
                    connection.out_ref()
                };
                self.notify(other, false);
                touched.push(other.node);
            }
        }

        let node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        self.id_pool.recycle_id(node_id.0);
        debug!(node = %node_id, type_name = node.type_name(), "Removed node");

        self.resync(touched);
        Ok(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether a node exists
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a point by reference
    pub fn point(&self, point: PointRef) -> Option<&ConnectionPoint> {
        self.nodes.get(&point.node)?.point(point.point)
    }

    /// Drop every node and connection and reset the id pool
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.id_pool.reset();
        debug!(graph = %self.name, "Cleared graph");
    }

    // ---- Editing ----

    /// Move a node; Entry nodes stay put
    pub fn drag(&mut self, node_id: NodeId, delta: (f32, f32)) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if !node.can_drag() {
            return Err(GraphError::NotDraggable(node_id));
        }
        node.rect.translate(delta.0, delta.1);
        Ok(())
    }

    /// Copy a node's settings, without its connections, under a fresh id
    pub fn duplicate_node(&mut self, node_id: NodeId, offset: (f32, f32)) -> Result<NodeId, GraphError> {
        let source = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if !source.can_copy() {
            return Err(GraphError::NotCopyable(node_id));
        }

        let mut fields = Vec::new();
        source
            .behavior()
            .save(source.points(), &mut BinaryWriter::new(&mut fields))
            .map_err(PersistError::from)?;
        let type_name = source.type_name();
        let title = source.title.clone();
        let mut rect = source.rect;
        rect.translate(offset.0, offset.1);

        let mut copy = self
            .registry
            .create_node(type_name, NodeId(u32::MAX), rect)
            .ok_or_else(|| GraphError::UnknownNodeType(type_name.to_string()))?
            .with_title(title);
        {
            let (behavior, points) = copy.parts_mut();
            let mut slice = fields.as_slice();
            behavior.load(points, &mut BinaryReader::new(&mut slice))?;
            behavior.settle(points);
            points.take_removed();
        }

        let id = NodeId(self.id_pool.new_id());
        let copy = copy.rebind(id);
        self.nodes.insert(id, copy);
        debug!(source = %node_id, node = %id, "Duplicated node");
        Ok(id)
    }

    fn edit_kind<R>(
        &mut self,
        node_id: NodeId,
        operation: &'static str,
        edit: impl FnOnce(&mut NodeKind) -> Option<R>,
    ) -> Result<R, GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        edit(node.kind_mut()).ok_or(GraphError::UnsupportedEdit {
            node: node_id,
            operation,
        })
    }

    /// Set the value of an Int node
    pub fn set_int(&mut self, node_id: NodeId, value: i32) -> Result<(), GraphError> {
        self.edit_kind(node_id, "set_int", |kind| match kind {
            NodeKind::Int(n) => {
                n.value = value;
                Some(())
            }
            _ => None,
        })
    }

    /// Set the value of a Float node, clamped to its range when active
    pub fn set_float(&mut self, node_id: NodeId, value: f32) -> Result<(), GraphError> {
        self.edit_kind(node_id, "set_float", |kind| match kind {
            NodeKind::Float(n) => {
                n.set_value(value);
                Some(())
            }
            _ => None,
        })
    }

    /// Set the slider range of a Float node
    pub fn set_float_range(&mut self, node_id: NodeId, min: f32, max: f32) -> Result<(), GraphError> {
        self.edit_kind(node_id, "set_float_range", |kind| match kind {
            NodeKind::Float(n) => {
                n.set_range(min, max);
                Some(())
            }
            _ => None,
        })
    }

    /// Set a stored component of a Vector node
    pub fn set_vector_component(
        &mut self,
        node_id: NodeId,
        index: usize,
        value: f32,
    ) -> Result<(), GraphError> {
        self.edit_kind(node_id, "set_vector_component", |kind| match kind {
            NodeKind::Vector(n) => n.set_component(index, value).then_some(()),
            _ => None,
        })
    }

    /// Set the constant an unconnected operator slot reads
    pub fn set_slot_constant(&mut self, node_id: NodeId, index: usize, value: f32) -> Result<(), GraphError> {
        self.edit_kind(node_id, "set_slot_constant", |kind| match kind {
            NodeKind::Arithmetic(n) => n.set_constant(index, value).then_some(()),
            _ => None,
        })
    }

    /// Set a local input of a math node
    pub fn set_local_input(&mut self, node_id: NodeId, index: usize, value: f32) -> Result<(), GraphError> {
        self.edit_kind(node_id, "set_local_input", |kind| {
            let accepted = match kind {
                NodeKind::Normalize(n) => n.set_local(index, value),
                NodeKind::Unary(n) => n.set_local(index, value),
                NodeKind::Pow(n) => n.set_local(index, value),
                NodeKind::Clamp(n) => n.set_local(index, value),
                NodeKind::Distance(n) => n.set_local(index, value),
                _ => false,
            };
            accepted.then_some(())
        })
    }

    /// Set the role of an Int, Float or Vector node.
    ///
    /// Vector nodes lose their inputs in the Property role, severing any
    /// connections on them.
    pub fn set_role(&mut self, node_id: NodeId, role: NodeRole) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let (kind, points) = node.kind_and_points_mut();
        match kind {
            NodeKind::Int(n) => n.role = role,
            NodeKind::Float(n) => n.role = role,
            NodeKind::Vector(n) => n.set_role(role, points),
            _ => {
                return Err(GraphError::UnsupportedEdit {
                    node: node_id,
                    operation: "set_role",
                })
            }
        }
        debug!(node = %node_id, ?role, "Changed node role");
        self.resync([node_id]);
        Ok(())
    }

    /// Append an object input to a custom node
    pub fn add_in_point(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<PointRef, GraphError> {
        self.add_custom_point(node_id, PointDirection::In, name.into())
    }

    /// Append an object output to a custom node
    pub fn add_out_point(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<PointRef, GraphError> {
        self.add_custom_point(node_id, PointDirection::Out, name.into())
    }

    fn add_custom_point(
        &mut self,
        node_id: NodeId,
        direction: PointDirection,
        name: String,
    ) -> Result<PointRef, GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if !matches!(node.kind(), NodeKind::Custom(_)) {
            return Err(GraphError::UnsupportedEdit {
                node: node_id,
                operation: "add_point",
            });
        }
        let points = node.points_mut();
        let index = match direction {
            PointDirection::In => CustomNode::add_in_point(points, name),
            PointDirection::Out => CustomNode::add_out_point(points, name),
        };
        let point = points.list(direction)[index].id;
        debug!(node = %node_id, ?direction, index, "Added point");
        Ok(PointRef::new(node_id, point))
    }

    /// Remove a point from a custom node, severing its connections first
    pub fn remove_point(&mut self, point: PointRef) -> Result<(), GraphError> {
        let node = self.nodes.get(&point.node).ok_or(GraphError::NodeNotFound(point.node))?;
        if !matches!(node.kind(), NodeKind::Custom(_)) {
            return Err(GraphError::UnsupportedEdit {
                node: point.node,
                operation: "remove_point",
            });
        }
        if node.point(point.point).is_none() {
            return Err(GraphError::PointNotFound(point.point));
        }

        self.disconnect_point(point);
        if let Some(node) = self.nodes.get_mut(&point.node) {
            let points = node.points_mut();
            points.remove(point.point);
            points.take_removed();
        }
        debug!(node = %point.node, "Removed point");
        Ok(())
    }

    // ---- Connections ----

    /// Connect two points given in either order.
    ///
    /// Rejects self-loops, two points of the same direction, connections that
    /// would close a cycle, full points and incompatible kinds. A rejected
    /// connect leaves the graph unchanged.
    pub fn try_connect(&mut self, a: PointRef, b: PointRef) -> Result<ConnectionId, ConnectionError> {
        let (out, input) = match self.validate_connection(a, b) {
            Ok(ends) => ends,
            Err(e) => {
                warn!(error = %e, from = %a.node, to = %b.node, "Rejected connection");
                return Err(e);
            }
        };

        let connection = Connection::new(out, input);
        let id = connection.id;
        for end in [out, input] {
            if let Some(point) = self.point_mut(end) {
                point.attach(id);
            }
        }
        self.connections.insert(id, connection);
        debug!(from = %out.node, to = %input.node, "Created connection");

        self.notify(out, true);
        self.notify(input, true);
        self.resync([input.node, out.node]);
        Ok(id)
    }

    /// Connect output `out_index` of one node to input `in_index` of another
    pub fn connect_indices(
        &mut self,
        out_node: NodeId,
        out_index: usize,
        in_node: NodeId,
        in_index: usize,
    ) -> Result<ConnectionId, ConnectionError> {
        let out = self.point_at(out_node, PointDirection::Out, out_index)?;
        let input = self.point_at(in_node, PointDirection::In, in_index)?;
        self.try_connect(out, input)
    }

    fn point_at(
        &self,
        node_id: NodeId,
        direction: PointDirection,
        index: usize,
    ) -> Result<PointRef, ConnectionError> {
        let node = self.nodes.get(&node_id).ok_or(ConnectionError::NodeNotFound(node_id))?;
        let point = node
            .points()
            .list(direction)
            .get(index)
            .ok_or(ConnectionError::IndexOutOfRange {
                node: node_id,
                direction,
                index,
            })?;
        Ok(PointRef::new(node_id, point.id))
    }

    fn validate_connection(&self, a: PointRef, b: PointRef) -> Result<(PointRef, PointRef), ConnectionError> {
        if a.node == b.node {
            return Err(ConnectionError::SelfLoop);
        }
        let point_a = self.lookup(a)?;
        let point_b = self.lookup(b)?;

        let (out, input, out_point, in_point) = match (point_a.direction, point_b.direction) {
            (PointDirection::Out, PointDirection::In) => (a, b, point_a, point_b),
            (PointDirection::In, PointDirection::Out) => (b, a, point_b, point_a),
            _ => return Err(ConnectionError::DirectionMismatch),
        };

        if self.loop_check(out.node, input.node) {
            return Err(ConnectionError::CycleDetected);
        }

        for point in [out_point, in_point] {
            if point.is_full() {
                return Err(ConnectionError::CapacityExceeded(point.id));
            }
        }
        if !out_point.can_accept_connection(in_point) || !in_point.can_accept_connection(out_point) {
            return Err(ConnectionError::IncompatibleKinds {
                output: out_point.kind,
                input: in_point.kind,
            });
        }
        Ok((out, input))
    }

    fn lookup(&self, point: PointRef) -> Result<&ConnectionPoint, ConnectionError> {
        self.nodes
            .get(&point.node)
            .ok_or(ConnectionError::NodeNotFound(point.node))?
            .point(point.point)
            .ok_or(ConnectionError::PointNotFound(point.point))
    }

    fn point_mut(&mut self, point: PointRef) -> Option<&mut ConnectionPoint> {
        self.nodes.get_mut(&point.node)?.points_mut().get_mut(point.point)
    }

    /// Whether `out_node` is reachable downstream of `in_node`, meaning an
    /// edge `out_node -> in_node` would close a cycle
    pub fn loop_check(&self, out_node: NodeId, in_node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![in_node];
        while let Some(current) = stack.pop() {
            if current == out_node {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(self.downstream_nodes(current));
        }
        false
    }

    fn downstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        node.outputs()
            .iter()
            .flat_map(ConnectionPoint::connections)
            .filter_map(|id| self.connections.get(id))
            .map(|c| c.in_node)
            .collect()
    }

    /// Remove a connection, notifying both ends
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.remove_connection(connection_id)?;
        self.notify(connection.out_ref(), false);
        self.notify(connection.in_ref(), false);
        self.resync([connection.in_node, connection.out_node]);
        Some(connection)
    }

    /// Remove every connection on one point; returns how many were removed
    pub fn disconnect_point(&mut self, point: PointRef) -> usize {
        let attached: Vec<ConnectionId> = self
            .point(point)
            .map(|p| p.connections().to_vec())
            .unwrap_or_default();
        attached
            .into_iter()
            .filter_map(|id| self.disconnect(id))
            .count()
    }

    fn remove_connection(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&connection_id)?;
        for end in [connection.out_ref(), connection.in_ref()] {
            if let Some(point) = self.point_mut(end) {
                point.detach(connection_id);
            }
        }
        debug!(from = %connection.out_node, to = %connection.in_node, "Removed connection");
        Some(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections from a specific output
    pub fn connections_from(&self, point: PointRef) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.out_ref() == point)
    }

    /// Get connections to a specific input
    pub fn connections_to(&self, point: PointRef) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.in_ref() == point)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ---- Settling ----

    fn notify(&mut self, point: PointRef, connected: bool) {
        let Some(node) = self.nodes.get_mut(&point.node) else {
            return;
        };
        let Some((direction, index)) = node.points().locate(point.point) else {
            return;
        };
        let (behavior, points) = node.parts_mut();
        if connected {
            behavior.on_connect(points, direction, index);
        } else {
            behavior.on_disconnect(points, direction, index);
        }
    }

    /// Live value kinds of a node's inputs; `None` when unconnected or when
    /// the upstream value cannot be computed
    fn live_input_kinds(&self, node_id: NodeId) -> Vec<Option<ValueKind>> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let ctx = EvaluationContext::new(self);
        (0..node.inputs().len())
            .map(|index| {
                if !node.points().is_connected(PointDirection::In, index) {
                    return None;
                }
                match ctx.input_value(node, index) {
                    Ok(value) => value.map(|v| v.kind()),
                    Err(e) => {
                        debug!(node = %node_id, index, error = %e, "Input has no live kind");
                        None
                    }
                }
            })
            .collect()
    }

    /// Retype the given nodes and everything their changes reach.
    ///
    /// Points a node removed are severed here; the far ends are notified and
    /// queued in turn. A node whose result kind changed queues its
    /// downstream nodes.
    fn resync(&mut self, seeds: impl IntoIterator<Item = NodeId>) {
        let mut queue: VecDeque<NodeId> = seeds.into_iter().collect();
        while let Some(node_id) = queue.pop_front() {
            let live = self.live_input_kinds(node_id);
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            let (behavior, points) = node.parts_mut();
            let changed = behavior.retype(points, &live);
            let removed = points.take_removed();

            for point in removed {
                let severed: Vec<ConnectionId> = self
                    .connections
                    .values()
                    .filter(|c| c.involves_point(PointRef::new(node_id, point)))
                    .map(|c| c.id)
                    .collect();
                for id in severed {
                    if let Some(connection) = self.remove_connection(id) {
                        let other = if connection.out_node == node_id {
                            connection.in_ref()
                        } else {
                            connection.out_ref()
                        };
                        self.notify(other, false);
                        queue.push_back(other.node);
                    }
                }
            }

            if changed {
                queue.extend(self.downstream_nodes(node_id));
            }
        }
    }

    /// Settle point counts and result kinds of every node
    pub(crate) fn settle_all(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in &ids {
            if let Some(node) = self.nodes.get_mut(id) {
                let (behavior, points) = node.parts_mut();
                behavior.settle(points);
            }
        }
        let order = self.topological_order().unwrap_or(ids);
        self.resync(order);
    }

    /// Get nodes in topological order (upstream first)
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit all nodes that this node depends on
        for connection in self.connections_for_node(node_id) {
            if connection.in_node == node_id {
                self.visit(connection.out_node, visited, temp_mark, order)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }

    // ---- Persistence ----

    /// Write the graph in the configured format version
    pub fn save(&self, mut writer: impl Write) -> Result<(), PersistError> {
        persist::write_graph(self, &mut writer, self.settings.save_format_version)
    }

    /// Replace the graph with a saved one.
    ///
    /// The file is read into a fresh graph first; on any error the current
    /// contents are kept untouched.
    pub fn load(&mut self, mut reader: impl Read) -> Result<LoadSummary, PersistError> {
        let mut fresh = Self::with_registry(self.name.clone(), Arc::clone(&self.registry), self.settings.clone());
        match persist::read_graph(&mut fresh, &mut reader) {
            Ok(summary) => {
                *self = fresh;
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, graph = %self.name, "Failed to load graph");
                Err(e)
            }
        }
    }

    /// Save to a file
    pub fn save_to_path(&self, path: &Path) -> Result<(), PersistError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), "Wrote graph file");
        Ok(())
    }

    /// Load from a file
    pub fn load_from_path(&mut self, path: &Path) -> Result<LoadSummary, PersistError> {
        let file = std::fs::File::open(path)?;
        self.load(std::io::BufReader::new(file))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Point not found
    #[error("Point not found: {0:?}")]
    PointNotFound(PointId),

    /// No point at that index
    #[error("Node {node} has no {direction:?} point {index}")]
    IndexOutOfRange {
        /// Node
        node: NodeId,
        /// Side of the node
        direction: PointDirection,
        /// Requested index
        index: usize,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Both points face the same way
    #[error("A connection needs one output and one input")]
    DirectionMismatch,

    /// The connection would close a cycle
    #[error("Connection would create a cycle")]
    CycleDetected,

    /// A point already holds its maximum number of connections
    #[error("Point is full: {0:?}")]
    CapacityExceeded(PointId),

    /// Incompatible point kinds
    #[error("Incompatible point kinds: {output:?} -> {input:?}")]
    IncompatibleKinds {
        /// Kind of the output point
        output: PointKind,
        /// Kind of the input point
        input: PointKind,
    },
}

/// Error from a graph edit
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Point not found
    #[error("Point not found: {0:?}")]
    PointNotFound(PointId),

    /// No registered type by that name
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// The node cannot be dragged
    #[error("Node {0} cannot be dragged")]
    NotDraggable(NodeId),

    /// The node cannot be copied
    #[error("Node {0} cannot be copied")]
    NotCopyable(NodeId),

    /// The node's kind does not support the edit
    #[error("Node {node} does not support {operation}")]
    UnsupportedEdit {
        /// Node
        node: NodeId,
        /// Attempted operation
        operation: &'static str,
    },

    /// Copying node fields failed
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Error when graph contains a cycle
#[derive(Debug, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn node(graph: &mut Graph, type_name: &str) -> NodeId {
        graph.add_node(type_name, (0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_add_node_uses_pool_ids() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Int");
        let b = node(&mut graph, "Float");
        assert_eq!((a, b), (NodeId(0), NodeId(1)));
        assert!(matches!(
            graph.add_node("Teleport", (0.0, 0.0)),
            Err(GraphError::UnknownNodeType(_))
        ));

        graph.remove_node(a).unwrap();
        assert_eq!(node(&mut graph, "Int"), NodeId(0));
        assert_eq!(graph.node(b).unwrap().rect.width, 200.0);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Plus");
        let b = node(&mut graph, "Plus");
        let c = node(&mut graph, "Plus");
        graph.connect_indices(a, 0, b, 0).unwrap();
        graph.connect_indices(b, 0, c, 0).unwrap();

        let before = graph.connection_count();
        assert_eq!(
            graph.connect_indices(c, 0, a, 0),
            Err(ConnectionError::CycleDetected)
        );
        assert_eq!(graph.connection_count(), before);
        assert!(graph.topological_order().is_ok());
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Plus");
        assert_eq!(graph.connect_indices(a, 0, a, 0), Err(ConnectionError::SelfLoop));
    }

    #[test]
    fn test_direction_mismatch() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Int");
        let b = node(&mut graph, "Int");
        let out_a = graph.node(a).unwrap().output_ref(0).unwrap();
        let out_b = graph.node(b).unwrap().output_ref(0).unwrap();
        assert_eq!(graph.try_connect(out_a, out_b), Err(ConnectionError::DirectionMismatch));
    }

    #[test]
    fn test_capacity_and_kinds() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Int");
        let b = node(&mut graph, "Int");
        let sqrt = node(&mut graph, "Sqrt");
        let gravity = node(&mut graph, "Gravity");

        graph.connect_indices(a, 0, sqrt, 0).unwrap();
        assert!(matches!(
            graph.connect_indices(b, 0, sqrt, 0),
            Err(ConnectionError::CapacityExceeded(_))
        ));

        let pow = node(&mut graph, "Pow");
        assert!(matches!(
            graph.connect_indices(gravity, 0, pow, 0),
            Err(ConnectionError::IncompatibleKinds { .. })
        ));
    }

    #[test]
    fn test_either_argument_order() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Int");
        let sqrt = node(&mut graph, "Sqrt");
        let input = graph.node(sqrt).unwrap().input_ref(0).unwrap();
        let output = graph.node(a).unwrap().output_ref(0).unwrap();
        let id = graph.try_connect(input, output).unwrap();
        let connection = graph.connection(id).unwrap();
        assert_eq!(connection.out_node, a);
        assert_eq!(connection.in_node, sqrt);
    }

    #[test]
    fn test_plus_arity() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Int");
        let plus = node(&mut graph, "Plus");
        assert_eq!(graph.node(plus).unwrap().inputs().len(), 2);

        let id = graph.connect_indices(a, 0, plus, 1).unwrap();
        assert_eq!(graph.node(plus).unwrap().inputs().len(), 3);

        graph.disconnect(id).unwrap();
        assert_eq!(graph.node(plus).unwrap().inputs().len(), 2);
        assert!(graph.node(a).unwrap().output(0).unwrap().connections().is_empty());
    }

    #[test]
    fn test_retype_severs_downstream() {
        let mut graph = Graph::default();
        let i = node(&mut graph, "Int");
        let v = node(&mut graph, "Vector3");
        let plus = node(&mut graph, "Plus");
        let sqrt = node(&mut graph, "Sqrt");

        graph.connect_indices(i, 0, plus, 0).unwrap();
        graph.connect_indices(plus, 0, sqrt, 0).unwrap();
        assert_eq!(graph.connection_count(), 2);

        // Widening to Vector3 regenerates outputs and drops the old wire
        graph.connect_indices(v, 0, plus, 1).unwrap();
        let names: Vec<_> = graph.node(plus).unwrap().outputs().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, ["Vector3", "X", "Y", "Z"]);
        assert_eq!(graph.connection_count(), 2);
        assert!(!graph.node(sqrt).unwrap().points().is_connected(PointDirection::In, 0));
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Int");
        let b = node(&mut graph, "Int");
        let plus = node(&mut graph, "Plus");
        let pow = node(&mut graph, "Pow");
        graph.connect_indices(a, 0, plus, 0).unwrap();
        graph.connect_indices(b, 0, plus, 1).unwrap();
        graph.connect_indices(plus, 0, pow, 0).unwrap();
        graph.connect_indices(b, 0, pow, 1).unwrap();

        graph.remove_node(plus).unwrap();
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.connections().all(|c| !c.involves_node(plus)));
        assert!(graph.node(a).unwrap().output(0).unwrap().connections().is_empty());
        assert!(matches!(graph.remove_node(plus), Err(GraphError::NodeNotFound(_))));
    }

    #[test]
    fn test_vector_role_severs_inputs() {
        let mut graph = Graph::default();
        let f = node(&mut graph, "Float");
        let v = node(&mut graph, "Vector2");
        graph.connect_indices(f, 0, v, 1).unwrap();

        graph.set_role(v, NodeRole::Property).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.node(v).unwrap().inputs().is_empty());
        assert!(graph.node(f).unwrap().output(0).unwrap().connections().is_empty());

        graph.set_role(v, NodeRole::Constant).unwrap();
        assert_eq!(graph.node(v).unwrap().inputs().len(), 2);
    }

    #[test]
    fn test_drag_and_duplicate() {
        let mut graph = Graph::default();
        let entry = node(&mut graph, "Entry");
        let plus = node(&mut graph, "Plus");
        graph.set_slot_constant(plus, 1, 4.0).unwrap();

        assert!(matches!(graph.drag(entry, (1.0, 1.0)), Err(GraphError::NotDraggable(_))));
        assert!(matches!(
            graph.duplicate_node(entry, (0.0, 0.0)),
            Err(GraphError::NotCopyable(_))
        ));

        graph.drag(plus, (5.0, -2.0)).unwrap();
        let copy = graph.duplicate_node(plus, (10.0, 0.0)).unwrap();
        let copied = graph.node(copy).unwrap();
        assert_eq!(copied.id(), copy);
        assert_eq!(copied.rect.x, 15.0);
        assert_eq!(copied.rect.y, -2.0);
        assert_eq!(graph.output_value(copy, 0).unwrap(), Some(Value::Int(4)));
    }

    #[test]
    fn test_custom_points() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Node");
        let b = node(&mut graph, "Node");
        let out = graph.add_out_point(a, "target").unwrap();
        let input = graph.add_in_point(b, "source").unwrap();
        graph.try_connect(out, input).unwrap();

        graph.remove_point(out).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.node(a).unwrap().outputs().is_empty());

        let plus = node(&mut graph, "Plus");
        assert!(matches!(
            graph.add_in_point(plus, "x"),
            Err(GraphError::UnsupportedEdit { .. })
        ));
    }

    #[test]
    fn test_disconnect_point() {
        let mut graph = Graph::default();
        let a = node(&mut graph, "Float");
        let s1 = node(&mut graph, "Sin");
        let s2 = node(&mut graph, "Cos");
        graph.connect_indices(a, 0, s1, 0).unwrap();
        graph.connect_indices(a, 0, s2, 0).unwrap();

        let out = graph.node(a).unwrap().output_ref(0).unwrap();
        assert_eq!(graph.disconnect_point(out), 2);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_clear_resets_pool() {
        let mut graph = Graph::default();
        node(&mut graph, "Int");
        node(&mut graph, "Int");
        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(node(&mut graph, "Int"), NodeId(0));
    }
}
