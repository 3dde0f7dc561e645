// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.
//!
//! Every kind is a state struct implementing [`NodeBehavior`]; [`NodeKind`]
//! is the closed set the graph stores and persists by type name.

pub mod arithmetic;
pub mod constant;
pub mod custom;
pub mod flow;
pub mod math;

pub use arithmetic::{ArithmeticNode, ArithmeticOp};
pub use constant::{FloatNode, IntNode, NodeRole, VectorNode};
pub use custom::CustomNode;
pub use flow::{EntryNode, InvertNode, ParallelNode, RepeatNode, SequenceNode};
pub use math::{
    BuiltinNode, BuiltinSource, ClampNode, DistanceNode, NormalizeNode, PowNode, UnaryFn, UnaryNode,
};

use crate::evaluation::{EvaluationError, NodeInputs};
use crate::node::{NodeCategory, NodePoints, NodeRegistry, NodeType};
use crate::persist::{BinaryReader, BinaryWriter, PersistError};
use crate::port::PointDirection;
use crate::value::{Value, ValueKind};
use std::fmt;
use std::io;

/// Per-kind behavior of a node.
///
/// Hooks receive the node's points so a kind can grow, shrink or regenerate
/// them. Points removed through [`NodePoints`] are severed by the graph after
/// the hook returns.
pub trait NodeBehavior: fmt::Debug {
    /// Create the initial points of a fresh node
    fn build_points(&self, points: &mut NodePoints);

    /// A connection was attached to the point at `index`
    fn on_connect(&mut self, _points: &mut NodePoints, _direction: PointDirection, _index: usize) {}

    /// A connection was detached from the point at `index`
    fn on_disconnect(&mut self, _points: &mut NodePoints, _direction: PointDirection, _index: usize) {
    }

    /// Recompute the result kind from the live kinds of the inputs (`None`
    /// for unconnected inputs). Returns whether the result kind changed.
    fn retype(&mut self, _points: &mut NodePoints, _live: &[Option<ValueKind>]) -> bool {
        false
    }

    /// Restore point-count invariants after a bulk change such as a load
    fn settle(&mut self, _points: &mut NodePoints) {}

    /// Value an unconnected input reads
    fn input_default(&self, _index: usize) -> Option<Value> {
        None
    }

    /// Main value of the node
    fn evaluate(&self, _inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        Ok(None)
    }

    /// Write the kind-specific fields
    fn save(&self, _points: &NodePoints, _writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Read the kind-specific fields, rebuilding points as needed
    fn load(
        &mut self,
        _points: &mut NodePoints,
        _reader: &mut BinaryReader<'_>,
    ) -> Result<(), PersistError> {
        Ok(())
    }
}

/// All node kinds known to the graph
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// User-defined object points
    Custom(CustomNode),
    /// Integer constant
    Int(IntNode),
    /// Float constant
    Float(FloatNode),
    /// Vector constant of 2 to 4 components
    Vector(VectorNode),
    /// Plus, Minus, Multiply or Divide
    Arithmetic(ArithmeticNode),
    /// Unit vector
    Normalize(NormalizeNode),
    /// Sqrt, Sin, Cos or Tan
    Unary(UnaryNode),
    /// Power
    Pow(PowNode),
    /// Clamp to a range
    Clamp(ClampNode),
    /// Distance between points
    Distance(DistanceNode),
    /// Pi, DeltaTime or Gravity
    Builtin(BuiltinNode),
    /// Start of event flow
    Entry(EntryNode),
    /// Ordered event fan-out
    Sequence(SequenceNode),
    /// Counted event loop
    Repeat(RepeatNode),
    /// Unordered event fan-out
    Parallel(ParallelNode),
    /// Event inversion
    Invert(InvertNode),
}

impl NodeKind {
    /// Persisted type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Custom(_) => "Node",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::Vector(v) => v.type_name(),
            Self::Arithmetic(a) => a.op.type_name(),
            Self::Normalize(_) => "Normalize",
            Self::Unary(u) => u.func.type_name(),
            Self::Pow(_) => "Pow",
            Self::Clamp(_) => "Clamp",
            Self::Distance(_) => "Distance",
            Self::Builtin(b) => b.source.type_name(),
            Self::Entry(_) => "Entry",
            Self::Sequence(_) => "Sequence",
            Self::Repeat(_) => "Repeat",
            Self::Parallel(_) => "Parallel",
            Self::Invert(_) => "Invert",
        }
    }

    /// Shared behavior
    pub fn behavior(&self) -> &dyn NodeBehavior {
        match self {
            Self::Custom(n) => n,
            Self::Int(n) => n,
            Self::Float(n) => n,
            Self::Vector(n) => n,
            Self::Arithmetic(n) => n,
            Self::Normalize(n) => n,
            Self::Unary(n) => n,
            Self::Pow(n) => n,
            Self::Clamp(n) => n,
            Self::Distance(n) => n,
            Self::Builtin(n) => n,
            Self::Entry(n) => n,
            Self::Sequence(n) => n,
            Self::Repeat(n) => n,
            Self::Parallel(n) => n,
            Self::Invert(n) => n,
        }
    }

    /// Shared behavior, mutably
    pub fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        match self {
            Self::Custom(n) => n,
            Self::Int(n) => n,
            Self::Float(n) => n,
            Self::Vector(n) => n,
            Self::Arithmetic(n) => n,
            Self::Normalize(n) => n,
            Self::Unary(n) => n,
            Self::Pow(n) => n,
            Self::Clamp(n) => n,
            Self::Distance(n) => n,
            Self::Builtin(n) => n,
            Self::Entry(n) => n,
            Self::Sequence(n) => n,
            Self::Repeat(n) => n,
            Self::Parallel(n) => n,
            Self::Invert(n) => n,
        }
    }
}

fn register(
    registry: &mut NodeRegistry,
    type_name: &str,
    category: NodeCategory,
    description: &str,
    factory: fn() -> NodeKind,
) {
    registry.register(NodeType {
        type_name: type_name.to_string(),
        name: type_name.to_string(),
        category,
        description: description.to_string(),
        factory,
    });
}

/// Create the registry of every built-in node kind
pub fn create_default_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Values
    register(&mut registry, "Int", NodeCategory::Value, "Integer constant", || {
        NodeKind::Int(IntNode::default())
    });
    register(&mut registry, "Float", NodeCategory::Value, "Float constant", || {
        NodeKind::Float(FloatNode::default())
    });
    register(&mut registry, "Vector2", NodeCategory::Value, "2D vector", || {
        NodeKind::Vector(VectorNode::new(ValueKind::Vector2))
    });
    register(&mut registry, "Vector3", NodeCategory::Value, "3D vector", || {
        NodeKind::Vector(VectorNode::new(ValueKind::Vector3))
    });
    register(&mut registry, "Vector4", NodeCategory::Value, "4D vector", || {
        NodeKind::Vector(VectorNode::new(ValueKind::Vector4))
    });

    // Math
    register(&mut registry, "Plus", NodeCategory::Math, "Sum of all inputs", || {
        NodeKind::Arithmetic(ArithmeticNode::new(ArithmeticOp::Plus))
    });
    register(&mut registry, "Minus", NodeCategory::Math, "First input minus the rest", || {
        NodeKind::Arithmetic(ArithmeticNode::new(ArithmeticOp::Minus))
    });
    register(&mut registry, "Multiply", NodeCategory::Math, "Product of all inputs", || {
        NodeKind::Arithmetic(ArithmeticNode::new(ArithmeticOp::Multiply))
    });
    register(&mut registry, "Divide", NodeCategory::Math, "First input divided by the rest", || {
        NodeKind::Arithmetic(ArithmeticNode::new(ArithmeticOp::Divide))
    });
    register(&mut registry, "Normalize", NodeCategory::Math, "Unit vector", || {
        NodeKind::Normalize(NormalizeNode::default())
    });
    register(&mut registry, "Sqrt", NodeCategory::Math, "Square root", || {
        NodeKind::Unary(UnaryNode::new(UnaryFn::Sqrt))
    });
    register(&mut registry, "Sin", NodeCategory::Math, "Sine", || {
        NodeKind::Unary(UnaryNode::new(UnaryFn::Sin))
    });
    register(&mut registry, "Cos", NodeCategory::Math, "Cosine", || {
        NodeKind::Unary(UnaryNode::new(UnaryFn::Cos))
    });
    register(&mut registry, "Tan", NodeCategory::Math, "Tangent", || {
        NodeKind::Unary(UnaryNode::new(UnaryFn::Tan))
    });
    register(&mut registry, "Pow", NodeCategory::Math, "v raised to p", || {
        NodeKind::Pow(PowNode::default())
    });
    register(&mut registry, "Clamp", NodeCategory::Math, "Clamp v to [min, max]", || {
        NodeKind::Clamp(ClampNode::default())
    });
    register(&mut registry, "Distance", NodeCategory::Math, "Distance between two points", || {
        NodeKind::Distance(DistanceNode::default())
    });

    // Builtins
    register(&mut registry, "Pi", NodeCategory::Builtin, "The constant pi", || {
        NodeKind::Builtin(BuiltinNode::new(BuiltinSource::Pi))
    });
    register(&mut registry, "DeltaTime", NodeCategory::Builtin, "Frame delta time", || {
        NodeKind::Builtin(BuiltinNode::new(BuiltinSource::DeltaTime))
    });
    register(&mut registry, "Gravity", NodeCategory::Builtin, "World gravity", || {
        NodeKind::Builtin(BuiltinNode::new(BuiltinSource::Gravity))
    });

    // Flow
    register(&mut registry, "Entry", NodeCategory::Flow, "Start of execution", || {
        NodeKind::Entry(EntryNode)
    });
    register(&mut registry, "Sequence", NodeCategory::Flow, "Fire outputs in order", || {
        NodeKind::Sequence(SequenceNode::default())
    });
    register(&mut registry, "Repeat", NodeCategory::Flow, "Fire an event a number of times", || {
        NodeKind::Repeat(RepeatNode)
    });
    register(&mut registry, "Parallel", NodeCategory::Flow, "Fire every output at once", || {
        NodeKind::Parallel(ParallelNode)
    });
    register(&mut registry, "Invert", NodeCategory::Flow, "Invert an event", || {
        NodeKind::Invert(InvertNode)
    });

    // Custom
    register(&mut registry, "Node", NodeCategory::Custom, "Node with user-defined points", || {
        NodeKind::Custom(CustomNode::default())
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_type_names_match_kinds() {
        let registry = create_default_registry();
        assert_eq!(registry.types().count(), 26);
        for node_type in registry.types() {
            let kind = (node_type.factory)();
            assert_eq!(kind.type_name(), node_type.type_name);
        }
    }

    #[test]
    fn test_categories() {
        let registry = create_default_registry();
        assert_eq!(registry.types_in_category(NodeCategory::Value).count(), 5);
        assert_eq!(registry.types_in_category(NodeCategory::Builtin).count(), 3);
        assert_eq!(registry.types_in_category(NodeCategory::Custom).count(), 1);
    }
}
