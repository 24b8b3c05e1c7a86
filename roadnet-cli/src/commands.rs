use anyhow::{bail, Context, Result};
use log::info;
use roadnet::{EditorConfig, Graph, Node, Session};
use std::path::Path;

fn open(config: EditorConfig, path: &Path) -> Result<Session> {
    let mut session = Session::new(config);
    session
        .open(path)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(session)
}

fn out_of_bounds<'a>(graph: &'a Graph, half: f64) -> impl Iterator<Item = &'a Node> + 'a {
    graph.iter().filter(move |n| n.x().abs() > half || n.z().abs() > half)
}

fn describe(graph: &Graph, node: &Node) -> String {
    let ids = |keys: &[roadnet::NodeKey]| -> String {
        keys.iter()
            .filter_map(|k| graph.node(*k))
            .map(|n| n.id().to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut line = format!(
        "{:>6}  ({:.3}, {:.3}, {:.3})  flag {}  in [{}]  out [{}]",
        node.id(),
        node.x(),
        node.y(),
        node.z(),
        node.flag.raw(),
        ids(node.incoming()),
        ids(node.outgoing())
    );
    if let Some(m) = node.marker() {
        line.push_str(&format!("  marker #{} '{}' ({})", m.marker_index, m.name, m.group));
        if m.is_park_destination() {
            line.push_str(&format!(" parked {:?}", m.parked_vehicles));
        }
    }
    line
}

pub fn info(config: EditorConfig, path: &Path) -> Result<()> {
    let session = open(config, path)?;
    let graph = session.graph();
    println!("file        {}", path.display());
    println!("map         {}", session.map_name().unwrap_or("-"));
    match session.version() {
        Some(v) => println!("version     {} ({:?})", v.raw, session.era()),
        None => println!("version     -"),
    }
    println!("editable    {}", session.is_editable());
    println!("flags       {}", if session.had_flags() { "present" } else { "missing" });
    println!("nodes       {}", graph.len());
    println!("connections {}", graph.connection_count());
    println!("markers     {}", graph.marker_count());
    Ok(())
}

pub fn check(config: EditorConfig, path: &Path) -> Result<()> {
    let half = config.map_half_extent;
    let session = open(config, path)?;
    let graph = session.graph();
    let violations = graph.invariant_violations();
    for v in &violations {
        println!("inconsistent: {}", v);
    }
    let outside: Vec<u32> = out_of_bounds(graph, half).map(Node::id).collect();
    if !outside.is_empty() {
        println!("{} nodes outside +/-{}: {:?}", outside.len(), half, outside);
    }
    if !violations.is_empty() {
        bail!("{} consistency problems in {}", violations.len(), path.display());
    }
    info!("{} nodes checked", graph.len());
    Ok(())
}

pub fn dump(config: EditorConfig, path: &Path, json: bool) -> Result<()> {
    let session = open(config, path)?;
    let graph = session.graph();
    if json {
        let text = serde_json::to_string_pretty(&graph.to_json_value()).context("serialising network")?;
        println!("{}", text);
    } else {
        for node in graph.iter() {
            println!("{}", describe(graph, node));
        }
    }
    Ok(())
}

pub fn fix_bounds(config: EditorConfig, path: &Path) -> Result<()> {
    let mut session = open(config, path)?;
    let moved = session.fix_out_of_bounds();
    if moved == 0 {
        println!("no nodes outside the map");
        return Ok(());
    }
    session
        .save()
        .with_context(|| format!("saving {}", path.display()))?;
    println!("moved {} nodes, saved {}", moved, path.display());
    Ok(())
}

pub fn resave(config: EditorConfig, path: &Path, output: Option<&Path>) -> Result<()> {
    let mut session = open(config, path)?;
    let target = output.unwrap_or(path);
    session
        .save_as(target)
        .with_context(|| format!("saving {}", target.display()))?;
    println!("saved {} nodes to {}", session.graph().len(), target.display());
    Ok(())
}
