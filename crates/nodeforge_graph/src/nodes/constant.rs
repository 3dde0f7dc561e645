// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant value nodes: Int, Float and Vector2/3/4.

use super::NodeBehavior;
use crate::evaluation::{EvaluationError, NodeInputs};
use crate::node::NodePoints;
use crate::persist::{BinaryReader, BinaryWriter, PersistError};
use crate::port::{ConnectionPoint, PointKind, Producer};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::io;

const COMPONENT_NAMES: [&str; 4] = ["X", "Y", "Z", "W"];

/// How a value node is exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeRole {
    /// Value set in the graph; vectors take their components from inputs
    #[default]
    Constant,
    /// Value exposed as a property; vectors have no inputs
    Property,
}

impl NodeRole {
    /// Persisted byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Constant => 0,
            Self::Property => 1,
        }
    }

    /// Role from its persisted byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Constant),
            1 => Some(Self::Property),
            _ => None,
        }
    }

    fn read(reader: &mut BinaryReader<'_>) -> Result<Self, PersistError> {
        let byte = reader.read_u8()?;
        Self::from_byte(byte).ok_or_else(|| PersistError::Malformed(format!("unknown node role {byte}")))
    }
}

/// Integer constant
#[derive(Debug, Clone, Default)]
pub struct IntNode {
    /// Stored value
    pub value: i32,
    /// Exposure role
    pub role: NodeRole,
}

impl NodeBehavior for IntNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_output(
            ConnectionPoint::output("Integer", PointKind::Int).with_producer(Producer::Primary),
        );
    }

    fn evaluate(&self, _inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        Ok(Some(Value::Int(self.value)))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_u8(self.role.to_byte())?;
        writer.write_i32(self.value)
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        self.role = NodeRole::read(reader)?;
        self.value = reader.read_i32()?;
        Ok(())
    }
}

/// Float constant with an optional slider range
#[derive(Debug, Clone, Default)]
pub struct FloatNode {
    value: f32,
    min: f32,
    max: f32,
    /// Exposure role
    pub role: NodeRole,
}

impl FloatNode {
    /// Stored value
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Slider range; only active when `max > min`
    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Set the value, clamped to the range when it is active
    pub fn set_value(&mut self, value: f32) {
        self.value = if self.max > self.min {
            value.clamp(self.min, self.max)
        } else {
            value
        };
    }

    /// Set the range and re-clamp the value
    pub fn set_range(&mut self, min: f32, max: f32) {
        self.min = min;
        self.max = max;
        self.set_value(self.value);
    }
}

impl NodeBehavior for FloatNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_output(
            ConnectionPoint::output("Float", PointKind::Float).with_producer(Producer::Primary),
        );
    }

    fn evaluate(&self, _inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        Ok(Some(Value::Float(self.value)))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_u8(self.role.to_byte())?;
        writer.write_f32(self.value)
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        self.role = NodeRole::read(reader)?;
        self.value = reader.read_f32()?;
        Ok(())
    }
}

/// Vector constant whose components can be driven by inputs
#[derive(Debug, Clone)]
pub struct VectorNode {
    kind: ValueKind,
    components: [f32; 4],
    role: NodeRole,
}

impl VectorNode {
    /// Create a vector node; `kind` is clamped to the vector kinds
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind: kind.max(ValueKind::Vector2),
            components: [0.0; 4],
            role: NodeRole::Constant,
        }
    }

    /// Vector kind produced
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Persisted type name
    pub fn type_name(&self) -> &'static str {
        self.kind.label()
    }

    /// Exposure role
    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Stored components (trailing ones unused for smaller vectors)
    pub fn components(&self) -> [f32; 4] {
        self.components
    }

    /// Set one stored component; false when out of range
    pub fn set_component(&mut self, index: usize, value: f32) -> bool {
        if index >= self.kind.components() {
            return false;
        }
        self.components[index] = value;
        true
    }

    /// Switch role; the Property role has no inputs
    pub fn set_role(&mut self, role: NodeRole, points: &mut NodePoints) {
        if role == self.role {
            return;
        }
        self.role = role;
        match role {
            NodeRole::Property => points.clear_inputs(),
            NodeRole::Constant => self.push_inputs(points),
        }
    }

    fn push_inputs(&self, points: &mut NodePoints) {
        for name in &COMPONENT_NAMES[..self.kind.components()] {
            points.push_input(ConnectionPoint::input(*name, PointKind::Digit));
        }
    }
}

impl NodeBehavior for VectorNode {
    fn build_points(&self, points: &mut NodePoints) {
        if self.role == NodeRole::Constant {
            self.push_inputs(points);
        }
        points.push_output(
            ConnectionPoint::output("V", PointKind::from(self.kind)).with_producer(Producer::Primary),
        );
        for (i, name) in COMPONENT_NAMES[..self.kind.components()].iter().enumerate() {
            points.push_output(
                ConnectionPoint::output(*name, PointKind::Float).with_producer(Producer::Component(i)),
            );
        }
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        self.components.get(index).map(|c| Value::Float(*c))
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        let mut components = self.components;
        for (i, c) in components[..self.kind.components()].iter_mut().enumerate() {
            if i < inputs.len() {
                *c = inputs.float(i)?;
            }
        }
        Ok(Some(Value::from_components(components, self.kind)))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_u8(self.role.to_byte())?;
        for c in &self.components[..self.kind.components()] {
            writer.write_f32(*c)?;
        }
        Ok(())
    }

    fn load(&mut self, points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        let role = NodeRole::read(reader)?;
        for i in 0..self.kind.components() {
            self.components[i] = reader.read_f32()?;
        }
        self.set_role(role, points);
        Ok(())
    }
}
