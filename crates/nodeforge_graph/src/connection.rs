// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::port::{PointId, PointRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// An edge from an output point to an input point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Node owning the output point
    pub out_node: NodeId,
    /// Output point
    pub out_point: PointId,
    /// Node owning the input point
    pub in_node: NodeId,
    /// Input point
    pub in_point: PointId,
}

impl Connection {
    /// Create a new connection
    pub fn new(out: PointRef, input: PointRef) -> Self {
        Self {
            id: ConnectionId::new(),
            out_node: out.node,
            out_point: out.point,
            in_node: input.node,
            in_point: input.point,
        }
    }

    /// The output end
    pub fn out_ref(&self) -> PointRef {
        PointRef::new(self.out_node, self.out_point)
    }

    /// The input end
    pub fn in_ref(&self) -> PointRef {
        PointRef::new(self.in_node, self.in_point)
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.out_node == node_id || self.in_node == node_id
    }

    /// Check if this connection involves a specific point
    pub fn involves_point(&self, point: PointRef) -> bool {
        self.out_ref() == point || self.in_ref() == point
    }
}
