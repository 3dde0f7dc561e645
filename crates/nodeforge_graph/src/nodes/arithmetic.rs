// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variadic arithmetic operators.
//!
//! Operators keep exactly one free trailing input slot: connecting the last
//! slot appends another, and disconnecting trims trailing free slots down to
//! two. The result kind is the widest kind among connected inputs; when it
//! changes the outputs are regenerated.

use super::NodeBehavior;
use crate::evaluation::{EvaluationError, NodeInputs};
use crate::node::NodePoints;
use crate::persist::{BinaryReader, BinaryWriter, PersistError};
use crate::port::{ConnectionPoint, PointDirection, PointKind, Producer};
use crate::value::{widest_kind, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::io;
use tracing::debug;

/// Fewest input slots an operator keeps
pub const MIN_SLOTS: usize = 2;

/// Most slots accepted from a saved graph
const MAX_LOADED_SLOTS: usize = 4096;

const COMPONENT_NAMES: [&str; 4] = ["X", "Y", "Z", "W"];

/// Operator applied across the inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    /// Sum
    Plus,
    /// First input minus the rest
    Minus,
    /// Product
    Multiply,
    /// First input divided by the rest
    Divide,
}

impl ArithmeticOp {
    /// Persisted type name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Plus => "Plus",
            Self::Minus => "Minus",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
        }
    }

    /// Point kind of slot `index`; scaling operators take scalars after the first
    fn slot_kind(self, index: usize) -> PointKind {
        match self {
            Self::Multiply | Self::Divide if index > 0 => PointKind::Float,
            _ => PointKind::Digit,
        }
    }

    /// Constant of a new slot; the identity of the operation.
    ///
    /// Only fresh slots take this value. Saved graphs keep the constants they
    /// store, so a file written with zero-valued product slots loads unchanged.
    fn identity(self) -> f32 {
        match self {
            Self::Plus | Self::Minus => 0.0,
            Self::Multiply | Self::Divide => 1.0,
        }
    }

    fn apply(self, acc: Value, rhs: Value, kind: ValueKind) -> Result<Value, EvaluationError> {
        Ok(match self {
            Self::Plus => acc.add_as(rhs, kind),
            Self::Minus => acc.sub_as(rhs, kind),
            Self::Multiply => acc.mul_as(rhs, kind),
            Self::Divide => acc.div_as(rhs, kind)?,
        })
    }
}

/// Plus, Minus, Multiply or Divide over a growing list of inputs
#[derive(Debug, Clone)]
pub struct ArithmeticNode {
    /// Operation
    pub op: ArithmeticOp,
    constants: Vec<f32>,
    result: ValueKind,
}

impl ArithmeticNode {
    /// Create an operator with two slots
    pub fn new(op: ArithmeticOp) -> Self {
        Self {
            op,
            constants: vec![op.identity(); MIN_SLOTS],
            result: ValueKind::Int,
        }
    }

    /// Current result kind
    pub fn result_kind(&self) -> ValueKind {
        self.result
    }

    /// Constants read by unconnected slots
    pub fn constants(&self) -> &[f32] {
        &self.constants
    }

    /// Set the constant of slot `index`; false when out of range
    pub fn set_constant(&mut self, index: usize, value: f32) -> bool {
        match self.constants.get_mut(index) {
            Some(c) => {
                *c = value;
                true
            }
            None => false,
        }
    }

    fn slot_point(&self, index: usize) -> ConnectionPoint {
        let name = slot_name(index);
        ConnectionPoint::input(name, self.op.slot_kind(index))
    }

    fn add_slot(&mut self, points: &mut NodePoints) {
        let index = points.inputs().len();
        points.push_input(self.slot_point(index));
        self.constants.push(self.op.identity());
        debug!(op = self.op.type_name(), slots = index + 1, "Added operator slot");
    }

    fn remove_slot(&mut self, points: &mut NodePoints) {
        points.pop_input();
        self.constants.pop();
        debug!(
            op = self.op.type_name(),
            slots = points.inputs().len(),
            "Removed operator slot"
        );
    }

    fn trim(&mut self, points: &mut NodePoints) {
        while points.inputs().len() > MIN_SLOTS
            && !points.is_connected(PointDirection::In, points.inputs().len() - 2)
        {
            self.remove_slot(points);
        }
    }

    fn push_outputs(&self, points: &mut NodePoints) {
        points.push_output(
            ConnectionPoint::output(self.result.label(), PointKind::Digit).with_producer(Producer::Primary),
        );
        if self.result.is_vector() {
            for (i, name) in COMPONENT_NAMES[..self.result.components()].iter().enumerate() {
                points.push_output(
                    ConnectionPoint::output(*name, PointKind::Digit).with_producer(Producer::Component(i)),
                );
            }
        }
    }

    fn rebuild_inputs(&self, points: &mut NodePoints) {
        points.clear_inputs();
        for index in 0..self.constants.len() {
            points.push_input(self.slot_point(index));
        }
    }
}

/// Slot label: `A`, `B`, ... `Z`, then `A1`, `B1`, ...
fn slot_name(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    match index / 26 {
        0 => letter.to_string(),
        round => format!("{letter}{round}"),
    }
}

impl NodeBehavior for ArithmeticNode {
    fn build_points(&self, points: &mut NodePoints) {
        for index in 0..self.constants.len() {
            points.push_input(self.slot_point(index));
        }
        self.push_outputs(points);
    }

    fn on_connect(&mut self, points: &mut NodePoints, direction: PointDirection, index: usize) {
        if direction == PointDirection::In && index + 1 == points.inputs().len() {
            self.add_slot(points);
        }
    }

    fn on_disconnect(&mut self, points: &mut NodePoints, direction: PointDirection, _index: usize) {
        if direction == PointDirection::In {
            self.trim(points);
        }
    }

    fn retype(&mut self, points: &mut NodePoints, live: &[Option<ValueKind>]) -> bool {
        let kind = widest_kind(live.iter().flatten().copied());
        if kind == self.result {
            return false;
        }
        debug!(
            op = self.op.type_name(),
            from = self.result.label(),
            to = kind.label(),
            "Operator result retyped"
        );
        self.result = kind;
        points.clear_outputs();
        self.push_outputs(points);
        true
    }

    fn settle(&mut self, points: &mut NodePoints) {
        let last = points.inputs().len().saturating_sub(1);
        if points.is_connected(PointDirection::In, last) {
            self.add_slot(points);
        }
        self.trim(points);
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        self.constants.get(index).map(|c| Value::Float(*c))
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        let kind = self.result;
        let (mut acc, rest) = match self.op {
            ArithmeticOp::Plus => (Value::zero(kind), 0),
            _ => (inputs.value_or(0, Value::Float(0.0))?.cast(kind), 1),
        };
        for index in rest..inputs.len() {
            let rhs = inputs.value_or(index, Value::Float(0.0))?;
            acc = self.op.apply(acc, rhs, kind)?;
        }
        Ok(Some(acc))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_len(self.constants.len())?;
        for c in &self.constants {
            writer.write_f32(*c)?;
        }
        Ok(())
    }

    fn load(&mut self, points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        let count = reader.read_len("slot count")?;
        if count > MAX_LOADED_SLOTS {
            return Err(PersistError::Malformed(format!("{count} operator slots")));
        }
        let mut constants = Vec::with_capacity(count.max(MIN_SLOTS));
        for _ in 0..count {
            constants.push(reader.read_f32()?);
        }
        constants.resize(count.max(MIN_SLOTS), self.op.identity());
        self.constants = constants;
        self.rebuild_inputs(points);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionId;
    use crate::evaluation::EvaluationError;
    use crate::graph::Graph;
    use crate::node::NodeId;
    use crate::value::ValueError;

    fn operator_over(graph: &mut Graph, type_name: &str, sources: &[NodeId]) -> NodeId {
        let op = graph.add_node(type_name, (0.0, 0.0)).unwrap();
        for (slot, source) in sources.iter().enumerate() {
            graph.connect_indices(*source, 0, op, slot).unwrap();
        }
        op
    }

    fn built(op: ArithmeticOp) -> (ArithmeticNode, NodePoints) {
        let node = ArithmeticNode::new(op);
        let mut points = NodePoints::default();
        node.build_points(&mut points);
        (node, points)
    }

    fn attach(points: &mut NodePoints, index: usize) -> ConnectionId {
        let id = ConnectionId::new();
        let point_id = points.input(index).unwrap().id;
        points.get_mut(point_id).unwrap().attach(id);
        id
    }

    #[test]
    fn test_slot_names() {
        assert_eq!(slot_name(0), "A");
        assert_eq!(slot_name(25), "Z");
        assert_eq!(slot_name(26), "A1");
    }

    #[test]
    fn test_grow_and_shrink() {
        let (mut node, mut points) = built(ArithmeticOp::Plus);
        assert_eq!(points.inputs().len(), 2);

        // Connecting the first slot does not grow
        attach(&mut points, 0);
        node.on_connect(&mut points, PointDirection::In, 0);
        assert_eq!(points.inputs().len(), 2);

        let id = attach(&mut points, 1);
        node.on_connect(&mut points, PointDirection::In, 1);
        assert_eq!(points.inputs().len(), 3);
        assert_eq!(points.input(2).unwrap().name, "C");
        assert_eq!(node.constants().len(), 3);

        let point_id = points.input(1).unwrap().id;
        points.get_mut(point_id).unwrap().detach(id);
        node.on_disconnect(&mut points, PointDirection::In, 1);
        assert_eq!(points.inputs().len(), 2);
        assert_eq!(node.constants().len(), 2);
    }

    #[test]
    fn test_retype_regenerates_outputs() {
        let (mut node, mut points) = built(ArithmeticOp::Plus);
        assert_eq!(points.outputs().len(), 1);
        assert_eq!(points.output(0).unwrap().name, "Integer");

        assert!(node.retype(&mut points, &[Some(ValueKind::Vector3), Some(ValueKind::Float), None]));
        let names: Vec<_> = points.outputs().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Vector3", "X", "Y", "Z"]);
        assert_eq!(points.take_removed().len(), 1);

        assert!(!node.retype(&mut points, &[Some(ValueKind::Vector3), None]));
        assert!(points.take_removed().is_empty());
    }

    #[test]
    fn test_multiply_slot_kinds() {
        let (_, points) = built(ArithmeticOp::Multiply);
        assert_eq!(points.input(0).unwrap().kind, PointKind::Digit);
        assert_eq!(points.input(1).unwrap().kind, PointKind::Float);
    }

    #[test]
    fn test_settle_after_bulk_changes() {
        let (mut node, mut points) = built(ArithmeticOp::Minus);
        for _ in 0..3 {
            node.add_slot(&mut points);
        }
        attach(&mut points, 0);
        node.settle(&mut points);
        assert_eq!(points.inputs().len(), 2);

        attach(&mut points, 1);
        node.settle(&mut points);
        assert_eq!(points.inputs().len(), 3);
    }

    #[test]
    fn test_minus_promotes_to_float() {
        let mut graph = Graph::default();
        let a = graph.add_node("Int", (0.0, 0.0)).unwrap();
        let b = graph.add_node("Float", (0.0, 0.0)).unwrap();
        graph.set_int(a, 10).unwrap();
        graph.set_float(b, 2.5).unwrap();

        let minus = operator_over(&mut graph, "Minus", &[a, b]);
        assert_eq!(graph.output_value(minus, 0).unwrap(), Some(Value::Float(7.5)));
        assert_eq!(graph.node(minus).unwrap().output(0).unwrap().name, "Float");
    }

    #[test]
    fn test_divide_stays_int_and_reports_zero() {
        let mut graph = Graph::default();
        let a = graph.add_node("Int", (0.0, 0.0)).unwrap();
        let b = graph.add_node("Int", (0.0, 0.0)).unwrap();
        graph.set_int(a, 10).unwrap();
        graph.set_int(b, 2).unwrap();

        let divide = operator_over(&mut graph, "Divide", &[a, b]);
        assert_eq!(graph.node(divide).unwrap().inputs().len(), 3);
        assert_eq!(graph.output_value(divide, 0).unwrap(), Some(Value::Int(5)));

        graph.set_int(b, 0).unwrap();
        assert_eq!(
            graph.output_value(divide, 0),
            Err(EvaluationError::Arithmetic(ValueError::DivideByZero))
        );
    }

    #[test]
    fn test_free_product_slot_is_neutral() {
        let mut graph = Graph::default();
        let a = graph.add_node("Float", (0.0, 0.0)).unwrap();
        let b = graph.add_node("Float", (0.0, 0.0)).unwrap();
        graph.set_float(a, 3.0).unwrap();
        graph.set_float(b, 4.0).unwrap();

        let multiply = operator_over(&mut graph, "Multiply", &[a, b]);
        assert_eq!(graph.node(multiply).unwrap().inputs().len(), 3);
        assert_eq!(graph.output_value(multiply, 0).unwrap(), Some(Value::Float(12.0)));

        let divide = operator_over(&mut graph, "Divide", &[a]);
        assert_eq!(graph.node(divide).unwrap().inputs().len(), 2);
        assert_eq!(graph.output_value(divide, 0).unwrap(), Some(Value::Float(3.0)));
    }
}
