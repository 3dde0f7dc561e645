// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event flow nodes.

use super::NodeBehavior;
use crate::evaluation::{EvaluationError, NodeInputs};
use crate::node::NodePoints;
use crate::persist::{BinaryReader, BinaryWriter, PersistError};
use crate::port::{ConnectionPoint, PointDirection, PointKind, Producer};
use crate::value::Value;
use std::io;
use tracing::debug;

/// Fewest outputs a sequence keeps
pub const MIN_SEQUENCE_OUTPUTS: usize = 1;

/// Most outputs accepted from a saved graph
const MAX_LOADED_OUTPUTS: usize = 4096;

fn event_input() -> ConnectionPoint {
    ConnectionPoint::input("", PointKind::Event)
}

fn single_event_output(name: &str) -> ConnectionPoint {
    ConnectionPoint::output(name, PointKind::Event).with_max_connections(1)
}

/// Start of execution; cannot be dragged or copied
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryNode;

impl NodeBehavior for EntryNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_output(single_event_output("event"));
    }
}

/// Fires its outputs in order; always keeps one free trailing output
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceNode;

impl SequenceNode {
    fn add_output(points: &mut NodePoints) {
        points.push_output(single_event_output(""));
        debug!(outputs = points.outputs().len(), "Added sequence output");
    }

    fn trim(points: &mut NodePoints) {
        while points.outputs().len() > MIN_SEQUENCE_OUTPUTS
            && !points.is_connected(PointDirection::Out, points.outputs().len() - 2)
        {
            points.pop_output();
            debug!(outputs = points.outputs().len(), "Removed sequence output");
        }
    }
}

impl NodeBehavior for SequenceNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(event_input());
        for _ in 0..MIN_SEQUENCE_OUTPUTS {
            points.push_output(single_event_output(""));
        }
    }

    fn on_connect(&mut self, points: &mut NodePoints, direction: PointDirection, index: usize) {
        if direction == PointDirection::Out && index + 1 == points.outputs().len() {
            Self::add_output(points);
        }
    }

    fn on_disconnect(&mut self, points: &mut NodePoints, direction: PointDirection, _index: usize) {
        if direction == PointDirection::Out {
            Self::trim(points);
        }
    }

    fn settle(&mut self, points: &mut NodePoints) {
        let last = points.outputs().len().saturating_sub(1);
        if points.is_connected(PointDirection::Out, last) {
            Self::add_output(points);
        }
        Self::trim(points);
    }

    fn save(&self, points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_len(points.outputs().len())
    }

    fn load(&mut self, points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        let count = reader.read_len("sequence output count")?;
        if count > MAX_LOADED_OUTPUTS {
            return Err(PersistError::Malformed(format!("{count} sequence outputs")));
        }
        points.clear_outputs();
        for _ in 0..count.max(MIN_SEQUENCE_OUTPUTS) {
            points.push_output(single_event_output(""));
        }
        Ok(())
    }
}

/// Fires `event` `times` times, exposing the iteration as `i`
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatNode;

impl NodeBehavior for RepeatNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(ConnectionPoint::input("invoke", PointKind::Event));
        points.push_input(ConnectionPoint::input("times", PointKind::Int));
        points.push_output(single_event_output("event"));
        points.push_output(ConnectionPoint::output("i", PointKind::Int).with_producer(Producer::Primary));
    }

    // Iteration only advances while a host executes the flow
    fn evaluate(&self, _inputs: &NodeInputs<'_>) -> Result<Option<Value>, EvaluationError> {
        Ok(Some(Value::Int(0)))
    }
}

/// Fires every connected branch at once
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelNode;

impl NodeBehavior for ParallelNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(event_input());
        points.push_output(ConnectionPoint::output("", PointKind::Event));
    }
}

/// Inverts an event
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertNode;

impl NodeBehavior for InvertNode {
    fn build_points(&self, points: &mut NodePoints) {
        points.push_input(event_input());
        points.push_output(single_event_output(""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionId;
    use crate::port::UNLIMITED;

    fn attach_output(points: &mut NodePoints, index: usize) -> ConnectionId {
        let id = ConnectionId::new();
        let point_id = points.output(index).unwrap().id;
        points.get_mut(point_id).unwrap().attach(id);
        id
    }

    #[test]
    fn test_sequence_grows_and_shrinks() {
        let mut node = SequenceNode;
        let mut points = NodePoints::default();
        node.build_points(&mut points);
        assert_eq!(points.outputs().len(), 1);

        let first = attach_output(&mut points, 0);
        node.on_connect(&mut points, PointDirection::Out, 0);
        attach_output(&mut points, 1);
        node.on_connect(&mut points, PointDirection::Out, 1);
        assert_eq!(points.outputs().len(), 3);

        // Freeing a middle output keeps the trailing connected one
        let id = points.output(0).unwrap().id;
        points.get_mut(id).unwrap().detach(first);
        node.on_disconnect(&mut points, PointDirection::Out, 0);
        assert_eq!(points.outputs().len(), 3);
    }

    #[test]
    fn test_event_limits() {
        let mut points = NodePoints::default();
        ParallelNode.build_points(&mut points);
        assert_eq!(points.output(0).unwrap().max_connections, UNLIMITED);

        let mut points = NodePoints::default();
        InvertNode.build_points(&mut points);
        assert_eq!(points.output(0).unwrap().max_connections, 1);

        let mut points = NodePoints::default();
        RepeatNode.build_points(&mut points);
        let names: Vec<_> = points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["invoke", "times", "event", "i"]);
    }
}
