// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary persistence of graphs.
//!
//! Everything is little-endian. Strings carry a 7-bit variable-length byte
//! count followed by UTF-8, the layout .NET's `BinaryWriter` uses.
//!
//! ```text
//! File       := version(i32) node_count(i32) Node* connection_count(i32) Connection*
//! Node       := type_name(str) id(i32) [title(str) if version >= 1]
//!               x(f32) y(f32) width(f32) height(f32) kind_fields
//! Connection := out_node(i32) out_index(i32) in_node(i32) in_index(i32)
//! ```

use crate::graph::Graph;
use crate::node::{NodeId, NodeRect};
use crate::port::{PointDirection, PointRef};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use tracing::{debug, info};

/// Newest format version; adds node titles
pub const FORMAT_VERSION: i32 = 1;

/// Longest string accepted when reading
const MAX_STRING_LEN: usize = 1 << 20;

/// Error while saving or loading a graph
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header names a version this build cannot read or write
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(i32),

    /// A node type has no registered factory
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Data is truncated or inconsistent
    #[error("Malformed graph data: {0}")]
    Malformed(String),
}

impl PersistError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Little-endian primitive writer
pub struct BinaryWriter<'a> {
    inner: &'a mut dyn Write,
}

impl<'a> BinaryWriter<'a> {
    /// Wrap a writer
    pub fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner }
    }

    /// Write a byte
    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_all(&[value])
    }

    /// Write a 32-bit integer
    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    /// Write a 32-bit float
    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    /// Write a count as a 32-bit integer
    pub fn write_len(&mut self, len: usize) -> io::Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "count exceeds i32"))?;
        self.write_i32(len)
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        let mut len = value.len();
        while len >= 0x80 {
            self.write_u8((len as u8 & 0x7F) | 0x80)?;
            len >>= 7;
        }
        self.write_u8(len as u8)?;
        self.inner.write_all(value.as_bytes())
    }
}

/// Little-endian primitive reader; running out of data is [`PersistError::Malformed`]
pub struct BinaryReader<'a> {
    inner: &'a mut dyn Read,
}

impl<'a> BinaryReader<'a> {
    /// Wrap a reader
    pub fn new(inner: &'a mut dyn Read) -> Self {
        Self { inner }
    }

    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], PersistError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => PersistError::malformed("unexpected end of data"),
            _ => PersistError::Io(e),
        })?;
        Ok(buf)
    }

    /// Read a byte
    pub fn read_u8(&mut self) -> Result<u8, PersistError> {
        let [b] = self.read_exact::<1>()?;
        Ok(b)
    }

    /// Read a 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32, PersistError> {
        Ok(i32::from_le_bytes(self.read_exact()?))
    }

    /// Read a 32-bit float
    pub fn read_f32(&mut self) -> Result<f32, PersistError> {
        Ok(f32::from_le_bytes(self.read_exact()?))
    }

    /// Read a non-negative count
    pub fn read_len(&mut self, what: &str) -> Result<usize, PersistError> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| PersistError::malformed(format!("negative {what}: {value}")))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, PersistError> {
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            if shift >= 35 {
                return Err(PersistError::malformed("bad string length prefix"));
            }
            let byte = self.read_u8()?;
            len |= usize::from(byte & 0x7F) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        if len > MAX_STRING_LEN {
            return Err(PersistError::malformed(format!("string of {len} bytes")));
        }

        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => PersistError::malformed("unexpected end of data"),
            _ => PersistError::Io(e),
        })?;
        String::from_utf8(buf).map_err(|_| PersistError::malformed("string is not UTF-8"))
    }
}

/// Counts reported after a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Format version of the file
    pub version: i32,
    /// Nodes restored
    pub nodes: usize,
    /// Connections restored
    pub connections: usize,
}

fn id_to_i32(id: NodeId) -> io::Result<i32> {
    i32::try_from(id.0).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "node id exceeds i32"))
}

/// Write `graph` in the given format version
pub(crate) fn write_graph(graph: &Graph, out: &mut dyn Write, version: i32) -> Result<(), PersistError> {
    if !(0..=FORMAT_VERSION).contains(&version) {
        return Err(PersistError::UnsupportedVersion(version));
    }

    let mut writer = BinaryWriter::new(out);
    writer.write_i32(version)?;

    writer.write_len(graph.node_count())?;
    for node in graph.nodes() {
        writer.write_string(node.type_name())?;
        writer.write_i32(id_to_i32(node.id())?)?;
        if version >= 1 {
            writer.write_string(&node.title)?;
        }
        let rect = node.rect;
        writer.write_f32(rect.x)?;
        writer.write_f32(rect.y)?;
        writer.write_f32(rect.width)?;
        writer.write_f32(rect.height)?;
        node.behavior().save(node.points(), &mut writer)?;
    }

    writer.write_len(graph.connection_count())?;
    for connection in graph.connections() {
        let (Some(out_node), Some(in_node)) =
            (graph.node(connection.out_node), graph.node(connection.in_node))
        else {
            return Err(PersistError::malformed("connection references a missing node"));
        };
        let out_index = out_node
            .points()
            .index_of(PointDirection::Out, connection.out_point)
            .ok_or_else(|| PersistError::malformed("connection references a missing output"))?;
        let in_index = in_node
            .points()
            .index_of(PointDirection::In, connection.in_point)
            .ok_or_else(|| PersistError::malformed("connection references a missing input"))?;

        writer.write_i32(id_to_i32(connection.out_node)?)?;
        writer.write_len(out_index)?;
        writer.write_i32(id_to_i32(connection.in_node)?)?;
        writer.write_len(in_index)?;
    }

    info!(
        nodes = graph.node_count(),
        connections = graph.connection_count(),
        version,
        "Saved graph"
    );
    Ok(())
}

/// A saved connection waiting to be restored
#[derive(Debug, Clone, Copy)]
struct PendingConnection {
    out_node: NodeId,
    out_index: usize,
    in_node: NodeId,
    in_index: usize,
}

fn read_node_id(reader: &mut BinaryReader<'_>) -> Result<NodeId, PersistError> {
    let raw = reader.read_i32()?;
    u32::try_from(raw)
        .map(NodeId)
        .map_err(|_| PersistError::malformed(format!("negative node id: {raw}")))
}

/// Read a saved graph into `graph`, which must be empty
pub(crate) fn read_graph(graph: &mut Graph, input: &mut dyn Read) -> Result<LoadSummary, PersistError> {
    let mut reader = BinaryReader::new(input);

    let version = reader.read_i32()?;
    if !(0..=FORMAT_VERSION).contains(&version) {
        return Err(PersistError::UnsupportedVersion(version));
    }

    let node_count = reader.read_len("node count")?;
    for _ in 0..node_count {
        let type_name = reader.read_string()?;
        let id = read_node_id(&mut reader)?;
        let title = if version >= 1 { Some(reader.read_string()?) } else { None };
        let rect = NodeRect::new(
            reader.read_f32()?,
            reader.read_f32()?,
            reader.read_f32()?,
            reader.read_f32()?,
        );

        let mut node = graph
            .registry()
            .create_node(&type_name, id, rect)
            .ok_or_else(|| PersistError::UnknownNodeType(type_name.clone()))?;
        if let Some(title) = title {
            node.title = title;
        }
        {
            let (behavior, points) = node.parts_mut();
            behavior.load(points, &mut reader)?;
            points.take_removed();
        }

        if graph.contains_node(id) {
            return Err(PersistError::malformed(format!("duplicate node id {id}")));
        }
        graph.insert_loaded_node(node);
    }

    let connection_count = reader.read_len("connection count")?;
    let mut pending = Vec::with_capacity(connection_count.min(4096));
    for _ in 0..connection_count {
        pending.push(PendingConnection {
            out_node: read_node_id(&mut reader)?,
            out_index: reader.read_len("output index")?,
            in_node: read_node_id(&mut reader)?,
            in_index: reader.read_len("input index")?,
        });
    }

    // Upstream nodes first, so operators settle their result kind before
    // their regenerated outputs are wired again.
    let rank = upstream_rank(graph, &pending)?;
    pending.sort_by_key(|p| rank.get(&p.out_node).copied().unwrap_or(usize::MAX));

    for p in &pending {
        let out = resolve(graph, p.out_node, PointDirection::Out, p.out_index)?;
        let input = resolve(graph, p.in_node, PointDirection::In, p.in_index)?;
        graph.try_connect(out, input).map_err(|e| {
            PersistError::malformed(format!(
                "connection {}:{} -> {}:{} rejected: {e}",
                p.out_node, p.out_index, p.in_node, p.in_index
            ))
        })?;
    }

    graph.settle_all();

    let summary = LoadSummary {
        version,
        nodes: graph.node_count(),
        connections: graph.connection_count(),
    };
    info!(
        nodes = summary.nodes,
        connections = summary.connections,
        version,
        "Loaded graph"
    );
    Ok(summary)
}

fn resolve(
    graph: &Graph,
    node_id: NodeId,
    direction: PointDirection,
    index: usize,
) -> Result<PointRef, PersistError> {
    let node = graph
        .node(node_id)
        .ok_or_else(|| PersistError::malformed(format!("connection references missing node {node_id}")))?;
    let point = node.points().list(direction).get(index).ok_or_else(|| {
        PersistError::malformed(format!("node {node_id} has no {direction:?} point {index}"))
    })?;
    Ok(PointRef::new(node_id, point.id))
}

/// Topological rank of every node under the saved connections
fn upstream_rank(
    graph: &Graph,
    pending: &[PendingConnection],
) -> Result<HashMap<NodeId, usize>, PersistError> {
    let mut in_degree: HashMap<NodeId, usize> = graph.node_ids().map(|id| (id, 0)).collect();
    let mut downstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for p in pending {
        *in_degree.entry(p.in_node).or_default() += 1;
        in_degree.entry(p.out_node).or_default();
        downstream.entry(p.out_node).or_default().push(p.in_node);
    }

    let mut ready: VecDeque<NodeId> = graph.node_ids().filter(|id| in_degree.get(id) == Some(&0)).collect();
    let mut rank = HashMap::with_capacity(in_degree.len());
    while let Some(id) = ready.pop_front() {
        rank.insert(id, rank.len());
        for next in downstream.get(&id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(*next);
                }
            }
        }
    }

    if rank.len() < in_degree.len() {
        debug!(ranked = rank.len(), total = in_degree.len(), "Saved wiring is cyclic");
        return Err(PersistError::malformed("saved connections form a cycle"));
    }
    Ok(rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_matches_dotnet_layout() {
        let mut bytes = Vec::new();
        let mut writer = BinaryWriter::new(&mut bytes);
        writer.write_string("Plus").unwrap();
        assert_eq!(bytes, [4, b'P', b'l', b'u', b's']);

        let long = "x".repeat(200);
        let mut bytes = Vec::new();
        BinaryWriter::new(&mut bytes).write_string(&long).unwrap();
        assert_eq!(&bytes[..2], &[0xC8, 0x01]);

        let mut slice = bytes.as_slice();
        let mut reader = BinaryReader::new(&mut slice);
        assert_eq!(reader.read_string().unwrap(), long);
    }

    #[test]
    fn test_little_endian_primitives() {
        let mut bytes = Vec::new();
        let mut writer = BinaryWriter::new(&mut bytes);
        writer.write_i32(1).unwrap();
        writer.write_f32(1.0).unwrap();
        writer.write_u8(7).unwrap();
        assert_eq!(bytes, [1, 0, 0, 0, 0, 0, 0x80, 0x3F, 7]);

        let mut slice = bytes.as_slice();
        let mut reader = BinaryReader::new(&mut slice);
        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert!(matches!(reader.read_u8(), Err(PersistError::Malformed(_))));
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let bytes = (-3i32).to_le_bytes();
        let mut slice = bytes.as_slice();
        let mut reader = BinaryReader::new(&mut slice);
        assert!(matches!(reader.read_len("node count"), Err(PersistError::Malformed(_))));
    }

    #[test]
    fn test_overlong_length_prefix() {
        let bytes = [0xFFu8; 6];
        let mut slice = bytes.as_slice();
        let mut reader = BinaryReader::new(&mut slice);
        assert!(matches!(reader.read_string(), Err(PersistError::Malformed(_))));
    }
}
