// SPDX-License-Identifier: MIT OR Apache-2.0
//! `NodeForge` command line host.
//!
//! Stands in for the editor UI when working with saved graphs:
//! - `inspect` lists nodes, points and connections
//! - `eval` pulls the value of one output
//! - `demo` writes a small sample graph

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nodeforge_graph::nodes::NodeRole;
use nodeforge_graph::{Graph, GraphSettings, NodeId, PointKind, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "nodeforge", version, about = "Inspect, evaluate and generate node graphs")]
struct Cli {
    /// RON settings file; defaults apply when it does not exist
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the nodes and connections of a saved graph.
    Inspect(InspectArgs),
    /// Evaluate one output of a node.
    Eval(EvalArgs),
    /// Write a sample graph.
    Demo(DemoArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// Graph file
    file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EvalArgs {
    /// Graph file
    file: PathBuf,
    /// Node id
    node: u32,
    /// Output index
    output: usize,
}

#[derive(Args)]
struct DemoArgs {
    /// Destination file
    file: PathBuf,
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodeforge=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting NodeForge v{}", env!("CARGO_PKG_VERSION"));
    let settings = match &cli.settings {
        Some(path) => GraphSettings::load_or_default(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => GraphSettings::default(),
    };

    match cli.command {
        Commands::Inspect(args) => run_inspect(&args, settings),
        Commands::Eval(args) => run_eval(&args, settings),
        Commands::Demo(args) => run_demo(&args.file, settings),
    }
}

fn open(path: &Path, settings: GraphSettings) -> Result<Graph> {
    let name = path
        .file_stem()
        .map_or_else(|| "graph".to_owned(), |s| s.to_string_lossy().into_owned());
    let mut graph = Graph::with_settings(name, settings);
    graph
        .load_from_path(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(graph)
}

#[derive(Serialize)]
struct GraphReport {
    name: String,
    nodes: Vec<NodeReport>,
    connections: Vec<ConnectionReport>,
}

#[derive(Serialize)]
struct NodeReport {
    id: NodeId,
    type_name: &'static str,
    title: String,
    position: [f32; 2],
    inputs: Vec<PointReport>,
    outputs: Vec<PointReport>,
}

#[derive(Serialize)]
struct PointReport {
    name: String,
    kind: PointKind,
    connections: usize,
    value: Option<Value>,
}

#[derive(Serialize)]
struct ConnectionReport {
    from: (NodeId, usize),
    to: (NodeId, usize),
}

fn report(graph: &Graph) -> GraphReport {
    let nodes = graph
        .nodes()
        .map(|node| {
            let inputs = node
                .inputs()
                .iter()
                .map(|p| PointReport {
                    name: p.name.clone(),
                    kind: p.kind,
                    connections: p.connections().len(),
                    value: None,
                })
                .collect();
            let outputs = node
                .outputs()
                .iter()
                .enumerate()
                .map(|(index, p)| PointReport {
                    name: p.name.clone(),
                    kind: p.kind,
                    connections: p.connections().len(),
                    value: graph.output_value(node.id(), index).ok().flatten(),
                })
                .collect();
            NodeReport {
                id: node.id(),
                type_name: node.type_name(),
                title: node.title.clone(),
                position: [node.rect.x, node.rect.y],
                inputs,
                outputs,
            }
        })
        .collect();

    let connections = graph
        .connections()
        .filter_map(|c| {
            let out_index = graph.node(c.out_node)?.points().locate(c.out_point)?.1;
            let in_index = graph.node(c.in_node)?.points().locate(c.in_point)?.1;
            Some(ConnectionReport {
                from: (c.out_node, out_index),
                to: (c.in_node, in_index),
            })
        })
        .collect();

    GraphReport {
        name: graph.name.clone(),
        nodes,
        connections,
    }
}

fn run_inspect(args: &InspectArgs, settings: GraphSettings) -> Result<()> {
    let graph = open(&args.file, settings)?;
    let report = report(&graph);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({} nodes, {} connections)", report.name, report.nodes.len(), report.connections.len());
    for node in &report.nodes {
        println!(
            "{} {} \"{}\" at ({}, {})",
            node.id, node.type_name, node.title, node.position[0], node.position[1]
        );
        for (index, point) in node.inputs.iter().enumerate() {
            println!("    in  {index} {:?} {:?} [{}]", point.name, point.kind, point.connections);
        }
        for (index, point) in node.outputs.iter().enumerate() {
            match &point.value {
                Some(value) => println!(
                    "    out {index} {:?} {:?} [{}] = {value}",
                    point.name, point.kind, point.connections
                ),
                None => println!("    out {index} {:?} {:?} [{}]", point.name, point.kind, point.connections),
            }
        }
    }
    for c in &report.connections {
        println!("{}:{} -> {}:{}", c.from.0, c.from.1, c.to.0, c.to.1);
    }
    Ok(())
}

fn run_eval(args: &EvalArgs, settings: GraphSettings) -> Result<()> {
    let graph = open(&args.file, settings)?;
    let node = NodeId(args.node);
    if !graph.contains_node(node) {
        bail!("graph has no node {node}");
    }
    match graph
        .output_value(node, args.output)
        .with_context(|| format!("failed to evaluate {node} output {}", args.output))?
    {
        Some(value) => println!("{value}"),
        None => println!("(no value)"),
    }
    Ok(())
}

/// Entry fanned out by a sequence, plus `normalize((1, 2, 2) * speed)`
fn build_demo(settings: GraphSettings) -> Result<Graph> {
    let mut graph = Graph::with_settings("demo", settings);

    let entry = graph.add_node("Entry", (0.0, 0.0))?;
    let sequence = graph.add_node("Sequence", (240.0, 0.0))?;
    graph.connect_indices(entry, 0, sequence, 0)?;

    let direction = graph.add_node("Vector3", (0.0, 120.0))?;
    graph.set_vector_component(direction, 0, 1.0)?;
    graph.set_vector_component(direction, 1, 2.0)?;
    graph.set_vector_component(direction, 2, 2.0)?;

    let speed = graph.add_node("Float", (0.0, 240.0))?;
    graph.set_role(speed, NodeRole::Property)?;
    graph.set_float(speed, 4.0)?;

    let multiply = graph.add_node("Multiply", (240.0, 160.0))?;
    graph.connect_indices(direction, 0, multiply, 0)?;
    graph.connect_indices(speed, 0, multiply, 1)?;

    let normalize = graph.add_node("Normalize", (480.0, 160.0))?;
    graph.connect_indices(multiply, 0, normalize, 0)?;

    let length = graph.add_node("Distance", (480.0, 280.0))?;
    graph.connect_indices(multiply, 0, length, 1)?;
    Ok(graph)
}

fn run_demo(path: &Path, settings: GraphSettings) -> Result<()> {
    let graph = build_demo(settings)?;
    graph
        .save_to_path(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Wrote {} nodes and {} connections to {}",
        graph.node_count(),
        graph.connection_count(),
        path.display()
    );
    Ok(())
}
