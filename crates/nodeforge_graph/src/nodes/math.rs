// SPDX-License-Identifier: MIT OR Apache-2.0
//! Math and builtin nodes.
//!
//! Math nodes keep a local value per input, read whenever that input is
//! unconnected and persisted with the node.

use super::NodeBehavior;
use crate::evaluation::{EvaluationError, NodeInputs};
use crate::node::NodePoints;
use crate::persist::{BinaryReader, BinaryWriter, PersistError};
use crate::port::{ConnectionPoint, PointKind, Producer};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::io;

fn primary_output(name: &str, kind: PointKind) -> ConnectionPoint {
    ConnectionPoint::output(name, kind).with_producer(Producer::Primary)
}

fn set_slot(slots: &mut [f32], index: usize, value: f32) -> bool {
    match slots.get_mut(index) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Unit vector of the input
#[derive(Debug, Clone)]
pub struct NormalizeNode {
    local: [f32; 4],
    kind: ValueKind,
}

impl Default for NormalizeNode {
    fn default() -> Self {
        Self {
            local: [0.0; 4],
            kind: ValueKind::Vector2,
        }
    }
}

impl NormalizeNode {
    /// Vector kind the input is normalized in
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Local vector read when `v` is unconnected
    pub fn local(&self) -> [f32; 4] {
        self.local
    }

    /// Set one local component; false when out of range
    pub fn set_local(&mut self, index: usize, value: f32) -> bool {
        set_slot(&mut self.local, index, value)
    }
}

impl NodeBehavior for NormalizeNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(ConnectionPoint::input("v", PointKind::Digit));
        points.push_output(primary_output("normalized", PointKind::Digit));
    }

    fn retype(&mut self, _points: &mut NodePoints, live: &[Option<ValueKind>]) -> bool {
        let kind = live
            .first()
            .copied()
            .flatten()
            .map_or(ValueKind::Vector2, |k| k.max(ValueKind::Vector2));
        let changed = kind != self.kind;
        self.kind = kind;
        changed
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        (index == 0).then(|| Value::from_components(self.local, self.kind))
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        let v = inputs.value_or(0, Value::zero(self.kind))?;
        Ok(Some(v.cast(self.kind).normalized()))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        for c in self.local {
            writer.write_f32(c)?;
        }
        Ok(())
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        for c in &mut self.local {
            *c = reader.read_f32()?;
        }
        Ok(())
    }
}

/// Single-argument float function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryFn {
    /// Square root
    Sqrt,
    /// Sine
    Sin,
    /// Cosine
    Cos,
    /// Tangent
    Tan,
}

impl UnaryFn {
    /// Persisted type name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Sqrt => "Sqrt",
            Self::Sin => "Sin",
            Self::Cos => "Cos",
            Self::Tan => "Tan",
        }
    }

    fn input_name(self) -> &'static str {
        match self {
            Self::Sqrt => "v",
            Self::Sin | Self::Cos | Self::Tan => "t",
        }
    }

    fn output_name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
        }
    }

    /// Apply the function
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Sqrt => x.sqrt(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
        }
    }
}

/// Sqrt, Sin, Cos or Tan of one float
#[derive(Debug, Clone)]
pub struct UnaryNode {
    /// Function applied
    pub func: UnaryFn,
    input: f32,
}

impl UnaryNode {
    /// Create a node for `func`
    pub fn new(func: UnaryFn) -> Self {
        Self { func, input: 0.0 }
    }

    /// Local input value
    pub fn input(&self) -> f32 {
        self.input
    }

    /// Set the local input; only index 0 exists
    pub fn set_local(&mut self, index: usize, value: f32) -> bool {
        set_slot(std::slice::from_mut(&mut self.input), index, value)
    }
}

impl NodeBehavior for UnaryNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(ConnectionPoint::input(self.func.input_name(), PointKind::Float));
        points.push_output(primary_output(self.func.output_name(), PointKind::Float));
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        (index == 0).then_some(Value::Float(self.input))
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        Ok(Some(Value::Float(self.func.apply(inputs.float(0)?))))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_f32(self.input)
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        self.input = reader.read_f32()?;
        Ok(())
    }
}

/// `v` raised to `p`
#[derive(Debug, Clone, Default)]
pub struct PowNode {
    locals: [f32; 2],
}

impl PowNode {
    /// Local `v` and `p`
    pub fn locals(&self) -> [f32; 2] {
        self.locals
    }

    /// Set local `v` (0) or `p` (1)
    pub fn set_local(&mut self, index: usize, value: f32) -> bool {
        set_slot(&mut self.locals, index, value)
    }
}

impl NodeBehavior for PowNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(ConnectionPoint::input("v", PointKind::Float));
        points.push_input(ConnectionPoint::input("p", PointKind::Float));
        points.push_output(primary_output("pow", PointKind::Float));
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        self.locals.get(index).map(|v| Value::Float(*v))
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        Ok(Some(Value::Float(inputs.float(0)?.powf(inputs.float(1)?))))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_f32(self.locals[0])?;
        writer.write_f32(self.locals[1])
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        self.locals = [reader.read_f32()?, reader.read_f32()?];
        Ok(())
    }
}

/// `v` limited to `[min, max]`
#[derive(Debug, Clone)]
pub struct ClampNode {
    locals: [f32; 3],
}

impl Default for ClampNode {
    fn default() -> Self {
        Self {
            locals: [0.0, 0.0, 1.0],
        }
    }
}

impl ClampNode {
    /// Local `v`, `min` and `max`
    pub fn locals(&self) -> [f32; 3] {
        self.locals
    }

    /// Set local `v` (0), `min` (1) or `max` (2)
    pub fn set_local(&mut self, index: usize, value: f32) -> bool {
        set_slot(&mut self.locals, index, value)
    }
}

/// Lower bound wins when the range is inverted
fn clamp(v: f32, min: f32, max: f32) -> f32 {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

impl NodeBehavior for ClampNode {
    fn build_points(&self, points: &mut NodePoints) {
        for name in ["v", "min", "max"] {
            points.push_input(ConnectionPoint::input(name, PointKind::Float));
        }
        points.push_output(primary_output("clamp", PointKind::Float));
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        self.locals.get(index).map(|v| Value::Float(*v))
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        let v = inputs.float(0)?;
        let min = inputs.float(1)?;
        let max = inputs.float(2)?;
        Ok(Some(Value::Float(clamp(v, min, max))))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        for v in self.locals {
            writer.write_f32(v)?;
        }
        Ok(())
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        for v in &mut self.locals {
            *v = reader.read_f32()?;
        }
        Ok(())
    }
}

/// Distance between two points, both read as `Vector3`
#[derive(Debug, Clone, Default)]
pub struct DistanceNode {
    from: [f32; 3],
    to: [f32; 3],
}

impl DistanceNode {
    /// Local `From` and `To`
    pub fn locals(&self) -> ([f32; 3], [f32; 3]) {
        (self.from, self.to)
    }

    /// Set a local component: 0..3 is `From`, 3..6 is `To`
    pub fn set_local(&mut self, index: usize, value: f32) -> bool {
        match index {
            0..=2 => set_slot(&mut self.from, index, value),
            3..=5 => set_slot(&mut self.to, index - 3, value),
            _ => false,
        }
    }
}

impl NodeBehavior for DistanceNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(ConnectionPoint::input("From", PointKind::Digit));
        points.push_input(ConnectionPoint::input("To", PointKind::Digit));
        points.push_output(primary_output("Length", PointKind::Float));
    }

    fn input_default(&self, index: usize) -> Option<Value> {
        match index {
            0 => Some(Value::Vector3(self.from)),
            1 => Some(Value::Vector3(self.to)),
            _ => None,
        }
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        let from = inputs.value_or(0, Value::Vector3(self.from))?;
        let to = inputs.value_or(1, Value::Vector3(self.to))?;
        Ok(Some(Value::Float(from.distance(to))))
    }

    fn save(&self, _points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        for c in self.from.iter().chain(self.to.iter()) {
            writer.write_f32(*c)?;
        }
        Ok(())
    }

    fn load(&mut self, _points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        for c in self.from.iter_mut().chain(self.to.iter_mut()) {
            *c = reader.read_f32()?;
        }
        Ok(())
    }
}

/// Value supplied by the world rather than the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinSource {
    /// The constant pi
    Pi,
    /// Frame delta time from the environment
    DeltaTime,
    /// Gravity from the environment
    Gravity,
}

impl BuiltinSource {
    /// Persisted type name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Pi => "Pi",
            Self::DeltaTime => "DeltaTime",
            Self::Gravity => "Gravity",
        }
    }
}

/// Pi, DeltaTime or Gravity
#[derive(Debug, Clone)]
pub struct BuiltinNode {
    /// Value source
    pub source: BuiltinSource,
}

impl BuiltinNode {
    /// Create a node for `source`
    pub fn new(source: BuiltinSource) -> Self {
        Self { source }
    }
}

impl NodeBehavior for BuiltinNode {
    fn build_points(&self, points: &mut NodePoints) {
        let point = match self.source {
            BuiltinSource::Pi => primary_output("pi", PointKind::Float),
            BuiltinSource::DeltaTime => primary_output("t", PointKind::Float),
            BuiltinSource::Gravity => primary_output("g", PointKind::Vector3),
        };
        points.push_output(point);
    }

    fn evaluate(&self, inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        let env = inputs.environment();
        Ok(Some(match self.source {
            BuiltinSource::Pi => Value::Float(std::f32::consts::PI),
            BuiltinSource::DeltaTime => Value::Float(env.delta_time),
            BuiltinSource::Gravity => Value::Vector3(env.gravity),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_matches_inverted_range() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 2.0, 1.0), 2.0);
    }

    #[test]
    fn test_normalize_retype_floor() {
        let mut node = NormalizeNode::default();
        let mut points = NodePoints::default();
        node.build_points(&mut points);

        assert!(!node.retype(&mut points, &[Some(ValueKind::Float)]));
        assert_eq!(node.kind(), ValueKind::Vector2);
        assert!(node.retype(&mut points, &[Some(ValueKind::Vector4)]));
        assert!(node.retype(&mut points, &[None]));
        assert_eq!(node.kind(), ValueKind::Vector2);
    }

    #[test]
    fn test_local_setters() {
        let mut distance = DistanceNode::default();
        assert!(distance.set_local(4, 2.0));
        assert!(!distance.set_local(6, 2.0));
        assert_eq!(distance.locals().1, [0.0, 2.0, 0.0]);

        let mut sqrt = UnaryNode::new(UnaryFn::Sqrt);
        assert!(sqrt.set_local(0, 9.0));
        assert!(!sqrt.set_local(1, 9.0));
        assert_eq!(sqrt.input(), 9.0);
    }

    #[test]
    fn test_unary_functions() {
        assert_eq!(UnaryFn::Sqrt.apply(16.0), 4.0);
        assert_eq!(UnaryFn::Sin.apply(0.0), 0.0);
        assert_eq!(UnaryFn::Cos.apply(0.0), 1.0);
    }
}
