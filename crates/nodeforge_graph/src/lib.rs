// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph core for `NodeForge`.
//!
//! This crate provides the data model behind a visual node editor:
//! - Typed connection points with capacity limits
//! - Numeric values with kind promotion
//! - Operators whose inputs grow and shrink as they are wired
//! - Cycle-free connections
//! - Lazy pull evaluation
//! - A compact binary save format
//!
//! ## Architecture
//!
//! A [`Graph`] owns its nodes and connections and performs every mutation.
//! Each [`Node`] wraps a [`nodes::NodeKind`] whose [`nodes::NodeBehavior`]
//! builds its points, reacts to wiring changes, computes values and
//! persists its own fields. Node ids come from an [`IdentityPool`] that
//! hands out the smallest free id.

pub mod connection;
pub mod evaluation;
pub mod graph;
pub mod identity;
pub mod node;
pub mod nodes;
pub mod persist;
pub mod port;
pub mod settings;
pub mod value;

pub use connection::{Connection, ConnectionId};
pub use evaluation::{EvaluationContext, EvaluationError};
pub use graph::{ConnectionError, CycleError, Graph, GraphError};
pub use identity::IdentityPool;
pub use node::{Node, NodeCategory, NodeId, NodeRect, NodeRegistry, NodeType};
pub use persist::{LoadSummary, PersistError, FORMAT_VERSION};
pub use port::{ConnectionPoint, PointDirection, PointId, PointKind, PointRef, Producer, UNLIMITED};
pub use settings::{Environment, GraphSettings, SettingsError};
pub use value::{Value, ValueKind};
