// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::nodes::{NodeBehavior, NodeKind};
use crate::port::{ConnectionPoint, PointDirection, PointId, PointRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a node, allocated from the graph's identity pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position and size of a node in graph space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeRect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl NodeRect {
    /// Create a rect
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Move by a delta
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }
}

/// Ordered input and output points of a node.
///
/// Points removed through this type are remembered until the graph collects
/// them with [`NodePoints::take_removed`], so their connections can be severed.
#[derive(Debug, Clone, Default)]
pub struct NodePoints {
    inputs: Vec<ConnectionPoint>,
    outputs: Vec<ConnectionPoint>,
    removed: Vec<PointId>,
}

impl NodePoints {
    /// Input points in order
    pub fn inputs(&self) -> &[ConnectionPoint] {
        &self.inputs
    }

    /// Output points in order
    pub fn outputs(&self) -> &[ConnectionPoint] {
        &self.outputs
    }

    /// Points of one direction
    pub fn list(&self, direction: PointDirection) -> &[ConnectionPoint] {
        match direction {
            PointDirection::In => &self.inputs,
            PointDirection::Out => &self.outputs,
        }
    }

    /// Input point by index
    pub fn input(&self, index: usize) -> Option<&ConnectionPoint> {
        self.inputs.get(index)
    }

    /// Output point by index
    pub fn output(&self, index: usize) -> Option<&ConnectionPoint> {
        self.outputs.get(index)
    }

    /// Append an input point, returning its index
    pub fn push_input(&mut self, mut point: ConnectionPoint) -> usize {
        point.direction = PointDirection::In;
        self.inputs.push(point);
        self.inputs.len() - 1
    }

    /// Append an output point, returning its index
    pub fn push_output(&mut self, mut point: ConnectionPoint) -> usize {
        point.direction = PointDirection::Out;
        self.outputs.push(point);
        self.outputs.len() - 1
    }

    /// Remove the last input point
    pub fn pop_input(&mut self) -> Option<ConnectionPoint> {
        let point = self.inputs.pop()?;
        self.removed.push(point.id);
        Some(point)
    }

    /// Remove the last output point
    pub fn pop_output(&mut self) -> Option<ConnectionPoint> {
        let point = self.outputs.pop()?;
        self.removed.push(point.id);
        Some(point)
    }

    /// Remove every input point
    pub fn clear_inputs(&mut self) {
        self.removed.extend(self.inputs.drain(..).map(|p| p.id));
    }

    /// Remove every output point
    pub fn clear_outputs(&mut self) {
        self.removed.extend(self.outputs.drain(..).map(|p| p.id));
    }

    /// Remove a point by ID
    pub fn remove(&mut self, id: PointId) -> Option<ConnectionPoint> {
        let (direction, index) = self.locate(id)?;
        let point = match direction {
            PointDirection::In => self.inputs.remove(index),
            PointDirection::Out => self.outputs.remove(index),
        };
        self.removed.push(point.id);
        Some(point)
    }

    /// Direction and index of a point
    pub fn locate(&self, id: PointId) -> Option<(PointDirection, usize)> {
        if let Some(index) = self.inputs.iter().position(|p| p.id == id) {
            return Some((PointDirection::In, index));
        }
        self.outputs
            .iter()
            .position(|p| p.id == id)
            .map(|index| (PointDirection::Out, index))
    }

    /// Index of a point within one direction
    pub fn index_of(&self, direction: PointDirection, id: PointId) -> Option<usize> {
        self.list(direction).iter().position(|p| p.id == id)
    }

    /// Get a point by ID
    pub fn get(&self, id: PointId) -> Option<&ConnectionPoint> {
        self.inputs.iter().chain(self.outputs.iter()).find(|p| p.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: PointId) -> Option<&mut ConnectionPoint> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id == id)
    }

    /// Whether the point at `index` in `direction` has a connection
    pub fn is_connected(&self, direction: PointDirection, index: usize) -> bool {
        self.list(direction)
            .get(index)
            .is_some_and(ConnectionPoint::has_connections)
    }

    /// All points, inputs first
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionPoint> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Drain the IDs of points removed since the last call
    pub fn take_removed(&mut self) -> Vec<PointId> {
        std::mem::take(&mut self.removed)
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Display name (can be customized)
    pub title: String,
    /// Position and size in the graph UI
    pub rect: NodeRect,
    points: NodePoints,
    kind: NodeKind,
}

impl Node {
    /// Create a node and build its initial points
    pub fn new(id: NodeId, kind: NodeKind, rect: NodeRect) -> Self {
        let mut points = NodePoints::default();
        kind.behavior().build_points(&mut points);
        Self {
            id,
            title: kind.type_name().to_string(),
            rect,
            points,
            kind,
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Persisted type name
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Kind and its state
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Points of this node
    pub fn points(&self) -> &NodePoints {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut NodePoints {
        &mut self.points
    }

    /// Split borrow of the behavior and the points it manages
    pub(crate) fn parts_mut(&mut self) -> (&mut dyn NodeBehavior, &mut NodePoints) {
        (self.kind.behavior_mut(), &mut self.points)
    }

    pub(crate) fn kind_and_points_mut(&mut self) -> (&mut NodeKind, &mut NodePoints) {
        (&mut self.kind, &mut self.points)
    }

    /// Same node under another ID
    pub(crate) fn rebind(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub(crate) fn behavior(&self) -> &dyn NodeBehavior {
        self.kind.behavior()
    }

    /// Input points
    pub fn inputs(&self) -> &[ConnectionPoint] {
        self.points.inputs()
    }

    /// Output points
    pub fn outputs(&self) -> &[ConnectionPoint] {
        self.points.outputs()
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&ConnectionPoint> {
        self.points.input(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&ConnectionPoint> {
        self.points.output(index)
    }

    /// Graph address of an input point
    pub fn input_ref(&self, index: usize) -> Option<PointRef> {
        self.input(index).map(|p| PointRef::new(self.id, p.id))
    }

    /// Graph address of an output point
    pub fn output_ref(&self, index: usize) -> Option<PointRef> {
        self.output(index).map(|p| PointRef::new(self.id, p.id))
    }

    /// Get a point by ID
    pub fn point(&self, id: PointId) -> Option<&ConnectionPoint> {
        self.points.get(id)
    }

    /// Whether the host may drag this node
    pub fn can_drag(&self) -> bool {
        !matches!(self.kind, NodeKind::Entry(_))
    }

    /// Whether the node may be duplicated
    pub fn can_copy(&self) -> bool {
        !matches!(self.kind, NodeKind::Entry(_))
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Constants and vectors
    Value,
    /// Math operations
    Math,
    /// Event flow control
    Flow,
    /// Values supplied by the environment
    Builtin,
    /// User-defined points
    Custom,
}

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Persisted type name
    pub type_name: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Creates the kind with its default state
    pub factory: fn() -> NodeKind,
}

/// Registry of available node types
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    /// Registered node types by type name
    types: indexmap::IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.type_name.clone(), node_type);
    }

    /// Get a node type by type name
    pub fn get(&self, type_name: &str) -> Option<&NodeType> {
        self.types.get(type_name)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type name
    pub fn create_node(&self, type_name: &str, id: NodeId, rect: NodeRect) -> Option<Node> {
        self.get(type_name)
            .map(|t| Node::new(id, (t.factory)(), rect).with_title(t.name.clone()))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        crate::nodes::create_default_registry()
    }
}
