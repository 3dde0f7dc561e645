// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic node whose object points are added by the user.

use super::NodeBehavior;
use crate::node::NodePoints;
use crate::persist::{BinaryReader, BinaryWriter, PersistError};
use crate::port::{ConnectionPoint, PointKind};
use std::io;

/// Most points of either side accepted from a saved graph
const MAX_LOADED_POINTS: usize = 4096;

/// Node with user-defined object points
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomNode;

impl CustomNode {
    /// Append an object input
    pub fn add_in_point(points: &mut NodePoints, name: impl Into<String>) -> usize {
        points.push_input(ConnectionPoint::input(name, PointKind::Object))
    }

    /// Append an object output
    pub fn add_out_point(points: &mut NodePoints, name: impl Into<String>) -> usize {
        points.push_output(ConnectionPoint::output(name, PointKind::Object))
    }
}

fn read_point_count(reader: &mut BinaryReader<'_>, what: &str) -> Result<usize, PersistError> {
    let count = reader.read_len(what)?;
    if count > MAX_LOADED_POINTS {
        return Err(PersistError::Malformed(format!("{count} points in {what}")));
    }
    Ok(count)
}

impl NodeBehavior for CustomNode {
    fn build_points(&self, _points: &mut NodePoints) {}

    fn save(&self, points: &NodePoints, writer: &mut BinaryWriter<'_>) -> io::Result<()> {
        writer.write_len(points.inputs().len())?;
        writer.write_len(points.outputs().len())
    }

    fn load(&mut self, points: &mut NodePoints, reader: &mut BinaryReader<'_>) -> Result<(), PersistError> {
        let inputs = read_point_count(reader, "input count")?;
        let outputs = read_point_count(reader, "output count")?;
        points.clear_inputs();
        points.clear_outputs();
        for _ in 0..inputs {
            Self::add_in_point(points, "In");
        }
        for _ in 0..outputs {
            Self::add_out_point(points, "Out");
        }
        Ok(())
    }
}
