// SPDX-License-Identifier: MIT OR Apache-2.0
use nodeforge_graph::nodes::{NodeKind, NodeRole};
use nodeforge_graph::{Graph, GraphSettings, PersistError, Value};

/// Int(3) and Vector3(1, 2, 2) summed, normalized and measured
fn sample_graph() -> Graph {
    let mut graph = Graph::new("sample");
    let entry = graph.add_node("Entry", (0.0, 0.0)).unwrap();
    let seq = graph.add_node("Sequence", (220.0, 0.0)).unwrap();
    graph.connect_indices(entry, 0, seq, 0).unwrap();

    let i = graph.add_node("Int", (0.0, 100.0)).unwrap();
    graph.set_int(i, 3).unwrap();
    graph.set_role(i, NodeRole::Property).unwrap();
    let v = graph.add_node("Vector3", (0.0, 200.0)).unwrap();
    graph.set_vector_component(v, 0, 1.0).unwrap();
    graph.set_vector_component(v, 1, 2.0).unwrap();
    graph.set_vector_component(v, 2, 2.0).unwrap();

    let plus = graph.add_node("Plus", (220.0, 150.0)).unwrap();
    graph.connect_indices(i, 0, plus, 0).unwrap();
    graph.connect_indices(v, 0, plus, 1).unwrap();

    let dist = graph.add_node("Distance", (440.0, 250.0)).unwrap();
    graph.connect_indices(v, 0, dist, 1).unwrap();
    graph.node_mut(dist).unwrap().title = "Length of v".to_string();
    let norm = graph.add_node("Normalize", (440.0, 150.0)).unwrap();
    graph.connect_indices(plus, 0, norm, 0).unwrap();
    graph
}

fn bytes_of(graph: &Graph) -> Vec<u8> {
    let mut bytes = Vec::new();
    graph.save(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_round_trip_preserves_values_and_wiring() {
    let graph = sample_graph();
    let bytes = bytes_of(&graph);

    let mut restored = Graph::default();
    let summary = restored.load(bytes.as_slice()).unwrap();
    assert_eq!(summary.version, 1);
    assert_eq!(summary.nodes, 7);
    assert_eq!(summary.connections, 5);

    for node in graph.nodes() {
        let copy = restored.node(node.id()).unwrap();
        assert_eq!(copy.title, node.title);
        assert_eq!(copy.rect, node.rect);
        assert_eq!(copy.inputs().len(), node.inputs().len());
        assert_eq!(copy.outputs().len(), node.outputs().len());
        for index in 0..node.outputs().len() {
            assert_eq!(
                restored.output_value(node.id(), index),
                graph.output_value(node.id(), index),
            );
        }
    }

    // The Plus retyped to Vector3 before its output was rewired
    let plus = restored.nodes().find(|n| n.type_name() == "Plus").unwrap();
    assert_eq!(restored.output_value(plus.id(), 0).unwrap(), Some(Value::Vector3([4.0, 5.0, 5.0])));
    assert_eq!(plus.inputs().len(), 3);

    let int = restored.nodes().find(|n| n.type_name() == "Int").unwrap();
    assert!(matches!(int.kind(), NodeKind::Int(n) if n.role == NodeRole::Property && n.value == 3));

    assert_eq!(bytes_of(&restored), bytes);
}

#[test]
fn test_version_zero_drops_titles() {
    let mut settings = GraphSettings::default();
    settings.save_format_version = 0;
    let mut graph = Graph::with_settings("old", settings);
    let id = graph.add_node("Float", (1.0, 2.0)).unwrap();
    graph.node_mut(id).unwrap().title = "Speed".to_string();

    let mut bytes = Vec::new();
    graph.save(&mut bytes).unwrap();
    assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
    assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
    assert_eq!(&bytes[8..14], &[5, b'F', b'l', b'o', b'a', b't']);
    assert_eq!(&bytes[14..18], &[0, 0, 0, 0]);
    assert_eq!(&bytes[18..22], &1.0f32.to_le_bytes());

    let mut restored = Graph::default();
    assert_eq!(restored.load(bytes.as_slice()).unwrap().version, 0);
    assert_eq!(restored.node(id).unwrap().title, "Float");
}

#[test]
fn test_unsupported_version_rejected() {
    let mut graph = sample_graph();
    let mut bytes = bytes_of(&graph);
    bytes[..4].copy_from_slice(&7i32.to_le_bytes());

    assert!(matches!(
        graph.load(bytes.as_slice()),
        Err(PersistError::UnsupportedVersion(7))
    ));
    assert_eq!(graph.node_count(), 7);

    graph.settings_mut().save_format_version = 2;
    assert!(matches!(
        graph.save(Vec::new()),
        Err(PersistError::UnsupportedVersion(2))
    ));
}

#[test]
fn test_unknown_type_keeps_current_graph() {
    let mut source = Graph::default();
    source.add_node("Int", (0.0, 0.0)).unwrap();
    let mut bytes = bytes_of(&source);
    // "Int" -> "Inx"
    let pos = bytes.windows(3).position(|w| w == b"Int").unwrap();
    bytes[pos + 2] = b'x';

    let mut graph = sample_graph();
    let before = graph.node_count();
    assert!(matches!(
        graph.load(bytes.as_slice()),
        Err(PersistError::UnknownNodeType(name)) if name == "Inx"
    ));
    assert_eq!(graph.node_count(), before);
    assert_eq!(graph.connection_count(), 5);
}

#[test]
fn test_truncated_data_keeps_current_graph() {
    let bytes = bytes_of(&sample_graph());
    let mut graph = Graph::default();
    let keep = graph.add_node("Pi", (0.0, 0.0)).unwrap();

    for len in [0, 3, 9, bytes.len() / 2, bytes.len() - 1] {
        assert!(matches!(
            graph.load(&bytes[..len]),
            Err(PersistError::Malformed(_))
        ));
        assert_eq!(graph.node_count(), 1);
        assert!(graph.contains_node(keep));
    }
}

#[test]
fn test_bad_connection_index_rejected() {
    let mut source = Graph::default();
    let a = source.add_node("Int", (0.0, 0.0)).unwrap();
    let b = source.add_node("Sqrt", (0.0, 0.0)).unwrap();
    source.connect_indices(a, 0, b, 0).unwrap();
    let mut bytes = bytes_of(&source);

    // Last field is the input index
    let n = bytes.len();
    bytes[n - 4..].copy_from_slice(&9i32.to_le_bytes());
    let mut graph = Graph::default();
    assert!(matches!(graph.load(bytes.as_slice()), Err(PersistError::Malformed(_))));
    assert_eq!(graph.node_count(), 0);
}

#[test]
fn test_loaded_ids_are_not_reissued() {
    let mut source = Graph::default();
    for _ in 0..3 {
        source.add_node("Int", (0.0, 0.0)).unwrap();
    }
    source.remove_node(nodeforge_graph::NodeId(1)).unwrap();
    let bytes = bytes_of(&source);

    let mut graph = Graph::default();
    graph.load(bytes.as_slice()).unwrap();
    let fresh = graph.add_node("Int", (0.0, 0.0)).unwrap();
    assert_eq!(fresh, nodeforge_graph::NodeId(1));
    let next = graph.add_node("Int", (0.0, 0.0)).unwrap();
    assert_eq!(next, nodeforge_graph::NodeId(3));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.graph");
    let graph = sample_graph();
    graph.save_to_path(&path).unwrap();

    let mut restored = Graph::default();
    let summary = restored.load_from_path(&path).unwrap();
    assert_eq!(summary.nodes, graph.node_count());
    assert_eq!(summary.connections, graph.connection_count());

    let missing = dir.path().join("missing.graph");
    assert!(matches!(restored.load_from_path(&missing), Err(PersistError::Io(_))));
    assert_eq!(restored.node_count(), graph.node_count());
}

#[test]
fn test_stored_product_constants_survive_load() {
    let mut graph = Graph::default();
    let multiply = graph.add_node("Multiply", (0.0, 0.0)).unwrap();
    graph.set_slot_constant(multiply, 0, 0.0).unwrap();
    graph.set_slot_constant(multiply, 1, 0.0).unwrap();
    let bytes = bytes_of(&graph);

    let mut restored = Graph::default();
    restored.load(bytes.as_slice()).unwrap();
    let node = restored.node(multiply).unwrap();
    assert!(matches!(node.kind(), NodeKind::Arithmetic(n) if n.constants() == [0.0, 0.0]));

    let fresh = restored.add_node("Multiply", (0.0, 0.0)).unwrap();
    let node = restored.node(fresh).unwrap();
    assert!(matches!(node.kind(), NodeKind::Arithmetic(n) if n.constants() == [1.0, 1.0]));
}
