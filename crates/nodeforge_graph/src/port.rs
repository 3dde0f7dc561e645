// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection points (typed sockets) on nodes.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::value::ValueKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection limit meaning "no limit"
pub const UNLIMITED: i32 = -1;

/// Unique identifier for a connection point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointId(pub Uuid);

impl PointId {
    /// Create a new random point ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PointId {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of a point within the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointRef {
    /// Owning node
    pub node: NodeId,
    /// Point on that node
    pub point: PointId,
}

impl PointRef {
    /// Create a point reference
    pub fn new(node: NodeId, point: PointId) -> Self {
        Self { node, point }
    }
}

/// Point direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointDirection {
    /// Input point, pulls from one upstream output
    In,
    /// Output point, produces a value
    Out,
}

/// Kind tag of a point; governs which points it may connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointKind {
    /// Any numeric value
    Digit,
    /// Integer
    Int,
    /// Float
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Execution flow
    Event,
    /// Opaque object reference
    Object,
    /// Rotation.
    ///
    /// No built-in node exposes it; it stays in the compatibility matrix so
    /// saved wiring of quaternion points keeps its meaning.
    Quaternion,
}

impl PointKind {
    /// Whether this kind belongs to the numeric family
    pub fn is_digit(self) -> bool {
        matches!(
            self,
            Self::Digit | Self::Int | Self::Float | Self::Vector2 | Self::Vector3 | Self::Vector4
        )
    }

    /// Whether a point of this kind accepts a point of kind `other`.
    ///
    /// Scalar points only take scalars or untyped digits; vector and digit
    /// points take the whole numeric family.
    pub fn accepts(self, other: PointKind) -> bool {
        match self {
            Self::Digit | Self::Vector2 | Self::Vector3 | Self::Vector4 => other.is_digit(),
            Self::Int | Self::Float => matches!(other, Self::Int | Self::Float | Self::Digit),
            Self::Event | Self::Object | Self::Quaternion => self == other,
        }
    }
}

impl From<ValueKind> for PointKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int,
            ValueKind::Float => Self::Float,
            ValueKind::Vector2 => Self::Vector2,
            ValueKind::Vector3 => Self::Vector3,
            ValueKind::Vector4 => Self::Vector4,
        }
    }
}

/// What an output point yields when read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Producer {
    /// The node's main value
    Primary,
    /// One float component of the node's main value
    Component(usize),
}

/// A typed socket on a node
#[derive(Debug, Clone)]
pub struct ConnectionPoint {
    /// Unique point ID
    pub id: PointId,
    /// Label shown next to the point
    pub name: String,
    /// Point direction
    pub direction: PointDirection,
    /// Compatibility tag
    pub kind: PointKind,
    /// Connection limit, [`UNLIMITED`] for none
    pub max_connections: i32,
    /// Value source for output points
    pub producer: Option<Producer>,
    connections: Vec<ConnectionId>,
}

impl ConnectionPoint {
    /// Create a new point
    pub fn new(
        name: impl Into<String>,
        direction: PointDirection,
        kind: PointKind,
        max_connections: i32,
    ) -> Self {
        Self {
            id: PointId::new(),
            name: name.into(),
            direction,
            kind,
            max_connections,
            producer: None,
            connections: Vec::new(),
        }
    }

    /// Create an input point accepting a single connection
    pub fn input(name: impl Into<String>, kind: PointKind) -> Self {
        Self::new(name, PointDirection::In, kind, 1)
    }

    /// Create an output point with no connection limit
    pub fn output(name: impl Into<String>, kind: PointKind) -> Self {
        Self::new(name, PointDirection::Out, kind, UNLIMITED)
    }

    /// Set the connection limit
    pub fn with_max_connections(mut self, max: i32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the producer
    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Connections currently attached
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Whether any connection is attached
    pub fn has_connections(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Whether the limit has been reached
    pub fn is_full(&self) -> bool {
        self.max_connections >= 0 && self.connections.len() >= self.max_connections as usize
    }

    /// Capacity and kind check against a candidate point
    pub fn can_accept_connection(&self, candidate: &ConnectionPoint) -> bool {
        !self.is_full() && self.kind.accepts(candidate.kind)
    }

    pub(crate) fn attach(&mut self, connection: ConnectionId) {
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
    }

    pub(crate) fn detach(&mut self, connection: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| *c != connection);
        self.connections.len() != before
    }
}
