use crate::model::{Marker, NodeFlag};
use crate::Graph;
use serde::Serialize;
use serde_json::Value;

pub fn to_json_impl(g: &Graph) -> Value {
    #[derive(Serialize)]
    struct NodeSer<'a> {
        id: u32,
        x: f64,
        y: f64,
        z: f64,
        flag: i32,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        control: bool,
        #[serde(rename = "in")]
        incoming: Vec<u32>,
        out: Vec<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<&'a Marker>,
    }
    #[derive(Serialize)]
    struct Doc<'a> {
        version: u32,
        generation: u64,
        nodes: Vec<NodeSer<'a>>,
        connections: usize,
        markers: usize,
    }

    // adjacency is exported by id, not by internal key
    let id_of = |k: &crate::NodeKey| g.node(*k).map(|n| n.id()).unwrap_or(0);
    let nodes = g
        .iter()
        .map(|n| NodeSer {
            id: n.id(),
            x: n.x(),
            y: n.y(),
            z: n.z(),
            flag: NodeFlag::raw(n.flag),
            control: n.is_control(),
            incoming: n.incoming().iter().map(id_of).collect(),
            out: n.outgoing().iter().map(id_of).collect(),
            marker: n.marker(),
        })
        .collect();
    serde_json::to_value(Doc {
        version: 1,
        generation: g.generation(),
        nodes,
        connections: g.connection_count(),
        markers: g.marker_count(),
    })
    .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use crate::model::{ConnectionKind, Marker, NodeFlag};
    use crate::Graph;

    #[test]
    fn test_json_uses_ids() {
        let mut g = Graph::new();
        let a = g.create_node_with_y(1.0, 2.0, 3.0, NodeFlag::Regular, false, false);
        let b = g.create_node_with_y(4.0, 5.0, 6.0, NodeFlag::SubPriority, false, true);
        g.connect(a, b, ConnectionKind::Regular);
        g.set_marker(b, Some(Marker::new("Shop", "All")));
        let v = g.to_json_value();
        assert_eq!(v["nodes"][0]["out"], serde_json::json!([2]));
        assert_eq!(v["nodes"][1]["in"], serde_json::json!([1]));
        assert_eq!(v["nodes"][1]["flag"], 1);
        assert_eq!(v["nodes"][1]["control"], true);
        assert!(v["nodes"][0].get("control").is_none());
        assert_eq!(v["nodes"][1]["marker"]["name"], "Shop");
        assert_eq!(v["connections"], 1);
    }
}
