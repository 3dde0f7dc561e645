// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lazy pull-based evaluation.
//!
//! Reading an output runs its node's producer, which pulls its inputs from
//! their upstream outputs recursively. Nothing is cached; every read walks
//! the graph again. Recursion is bounded by the configured depth.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::port::{PointDirection, PointId, PointRef, Producer};
use crate::settings::Environment;
use crate::value::{Value, ValueError};

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Point not found
    #[error("Point not found: {0:?}")]
    PointNotFound(PointId),

    /// A node has no point at the given index
    #[error("Node {node} has no {direction:?} point {index}")]
    MissingPoint {
        /// Node
        node: NodeId,
        /// Side of the node
        direction: PointDirection,
        /// Requested index
        index: usize,
    },

    /// A point lists a connection the graph does not hold
    #[error("Dangling connection: {0:?}")]
    DanglingConnection(ConnectionId),

    /// The pull chain went deeper than allowed
    #[error("Evaluation exceeded depth {0}")]
    DepthExceeded(usize),

    /// Arithmetic failure
    #[error(transparent)]
    Arithmetic(#[from] ValueError),
}

/// Context for graph evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// The graph being evaluated
    pub graph: &'a Graph,
    depth: usize,
    max_depth: usize,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context bounded by the graph's configured depth
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            depth: 0,
            max_depth: graph.settings().max_evaluation_depth,
        }
    }

    /// Override the depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Value of any point: outputs run their producer, inputs forward upstream
    pub fn point_value(&self, point: PointRef) -> Result<Option<Value>, EvaluationError> {
        let node = self
            .graph
            .node(point.node)
            .ok_or(EvaluationError::NodeNotFound(point.node))?;
        match node.points().locate(point.point) {
            Some((PointDirection::Out, index)) => self.output_value(node, index),
            Some((PointDirection::In, index)) => self.input_value(node, index),
            None => Err(EvaluationError::PointNotFound(point.point)),
        }
    }

    /// Value produced by output `index` of `node`
    pub fn output_value(&self, node: &Node, index: usize) -> Result<Option<Value>, EvaluationError> {
        let point = node.output(index).ok_or(EvaluationError::MissingPoint {
            node: node.id(),
            direction: PointDirection::Out,
            index,
        })?;
        let Some(producer) = point.producer else {
            return Ok(None);
        };

        if self.depth >= self.max_depth {
            return Err(EvaluationError::DepthExceeded(self.max_depth));
        }
        let inner = Self {
            depth: self.depth + 1,
            ..*self
        };
        let inputs = NodeInputs { node, ctx: &inner };
        let value = node.behavior().evaluate(&inputs)?;

        Ok(match producer {
            Producer::Primary => value,
            Producer::Component(i) => value.map(|v| Value::Float(v.component(i))),
        })
    }

    /// Value read by input `index` of `node`: the upstream output, or the
    /// node's default when unconnected
    pub fn input_value(&self, node: &Node, index: usize) -> Result<Option<Value>, EvaluationError> {
        let point = node.input(index).ok_or(EvaluationError::MissingPoint {
            node: node.id(),
            direction: PointDirection::In,
            index,
        })?;
        let Some(&connection_id) = point.connections().first() else {
            return Ok(node.behavior().input_default(index));
        };

        let connection = self
            .graph
            .connection(connection_id)
            .ok_or(EvaluationError::DanglingConnection(connection_id))?;
        let upstream = self
            .graph
            .node(connection.out_node)
            .ok_or(EvaluationError::NodeNotFound(connection.out_node))?;
        let upstream_index = upstream
            .points()
            .index_of(PointDirection::Out, connection.out_point)
            .ok_or(EvaluationError::PointNotFound(connection.out_point))?;
        self.output_value(upstream, upstream_index)
    }
}

/// Inputs of the node being evaluated
pub struct NodeInputs<'a> {
    node: &'a Node,
    ctx: &'a EvaluationContext<'a>,
}

impl NodeInputs<'_> {
    /// Number of input points
    pub fn len(&self) -> usize {
        self.node.inputs().len()
    }

    /// Whether the node has no inputs
    pub fn is_empty(&self) -> bool {
        self.node.inputs().is_empty()
    }

    /// Whether input `index` is connected
    pub fn is_connected(&self, index: usize) -> bool {
        self.node.points().is_connected(PointDirection::In, index)
    }

    /// Value of input `index`
    pub fn value(&self, index: usize) -> Result<Option<Value>, EvaluationError> {
        if index >= self.len() {
            return Ok(None);
        }
        self.ctx.input_value(self.node, index)
    }

    /// Value of input `index`, or `fallback` when it yields nothing
    pub fn value_or(&self, index: usize, fallback: Value) -> Result<Value, EvaluationError> {
        Ok(self.value(index)?.unwrap_or(fallback))
    }

    /// Input `index` cast to a float, zero when it yields nothing
    pub fn float(&self, index: usize) -> Result<f32, EvaluationError> {
        Ok(self.value_or(index, Value::Float(0.0))?.to_float())
    }

    /// World values supplied by the host
    pub fn environment(&self) -> &Environment {
        &self.ctx.graph.settings().environment
    }
}

impl Graph {
    /// Evaluate any point
    pub fn evaluate(&self, point: PointRef) -> Result<Option<Value>, EvaluationError> {
        EvaluationContext::new(self).point_value(point)
    }

    /// Evaluate output `index` of a node
    pub fn output_value(&self, node_id: NodeId, index: usize) -> Result<Option<Value>, EvaluationError> {
        let node = self.node(node_id).ok_or(EvaluationError::NodeNotFound(node_id))?;
        EvaluationContext::new(self).output_value(node, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_value() {
        let mut graph = Graph::default();
        let a = graph.add_node("Int", (0.0, 0.0)).unwrap();
        let b = graph.add_node("Float", (0.0, 0.0)).unwrap();
        let plus = graph.add_node("Plus", (0.0, 0.0)).unwrap();
        graph.set_int(a, 2).unwrap();
        graph.set_float(b, 1.5).unwrap();

        graph.connect_indices(a, 0, plus, 0).unwrap();
        graph.connect_indices(b, 0, plus, 1).unwrap();

        assert_eq!(graph.output_value(plus, 0).unwrap(), Some(Value::Float(3.5)));
    }

    #[test]
    fn test_depth_limit() {
        let mut graph = Graph::default();
        let mut prev = graph.add_node("Int", (0.0, 0.0)).unwrap();
        graph.set_int(prev, 1).unwrap();
        for _ in 0..4 {
            let next = graph.add_node("Plus", (0.0, 0.0)).unwrap();
            graph.connect_indices(prev, 0, next, 0).unwrap();
            prev = next;
        }

        let node = graph.node(prev).unwrap();
        let ctx = EvaluationContext::new(&graph);
        assert_eq!(ctx.output_value(node, 0).unwrap(), Some(Value::Int(1)));

        let shallow = ctx.with_max_depth(3);
        assert_eq!(shallow.output_value(node, 0), Err(EvaluationError::DepthExceeded(3)));
    }

    #[test]
    fn test_unconnected_input_reads_default() {
        let mut graph = Graph::default();
        let clamp = graph.add_node("Clamp", (0.0, 0.0)).unwrap();
        let max = graph.node(clamp).unwrap().input_ref(2).unwrap();
        assert_eq!(graph.evaluate(max).unwrap(), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_event_outputs_have_no_value() {
        let mut graph = Graph::default();
        let entry = graph.add_node("Entry", (0.0, 0.0)).unwrap();
        assert_eq!(graph.output_value(entry, 0).unwrap(), None);
    }
}
