// Whole-selection edits that produce a single coordinate undo unit.

use crate::changes::coordinates::CoordinateChanger;
use crate::model::NodeKey;
use crate::Graph;
use log::info;
use std::collections::HashSet;

/// Commits a drag of `keys` by `(dx, dz)`.
///
/// Control nodes stay put. Each axis only moves when the result stays within
/// `[-half_extent, half_extent]`, so a node pushed against the map edge keeps sliding along it.
/// A key listed more than once moves once.
pub fn move_nodes(
    graph: &mut Graph,
    stale: bool,
    keys: &[NodeKey],
    dx: f64,
    dz: f64,
    half_extent: f64,
) -> CoordinateChanger {
    let mut changer = CoordinateChanger::new(graph, stale);
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(*key) {
            continue;
        }
        let node = match graph.node(*key) {
            Some(n) if !n.is_control() => n,
            _ => continue,
        };
        let (x, y, z) = node.position();
        let nx = if (x + dx).abs() <= half_extent { x + dx } else { x };
        let nz = if (z + dz).abs() <= half_extent { z + dz } else { z };
        if nx != x || nz != z {
            changer.add_change(graph, *key, nx, y, nz);
        }
    }
    changer.apply(graph);
    changer
}

/// Resets x and z of every non-control node lying outside the map to the origin, keeping its
/// height. Returns `None` when every node is inside.
pub fn fix_out_of_bounds(
    graph: &mut Graph,
    stale: bool,
    half_x: f64,
    half_z: f64,
) -> Option<CoordinateChanger> {
    let mut changer = CoordinateChanger::new(graph, stale);
    for node in graph.iter() {
        if node.is_control() {
            continue;
        }
        if node.x().abs() > half_x || node.z().abs() > half_z {
            changer.add_change(graph, node.key(), 0.0, node.y(), 0.0);
        }
    }
    if changer.is_empty() {
        return None;
    }
    changer.apply(graph);
    info!("moved {} out-of-bounds nodes to the map origin", changer.len());
    Some(changer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Changeable;
    use crate::model::NodeFlag;

    #[test]
    fn test_move_clamps_per_axis() {
        let mut g = Graph::new();
        let a = g.create_node_with_y(1000.0, 3.0, 0.0, NodeFlag::Regular, false, false);
        let b = g.create_node_with_y(0.0, 0.0, 0.0, NodeFlag::Regular, false, true);
        let c = move_nodes(&mut g, false, &[a, b], 50.0, 20.0, 1024.0);
        assert_eq!(g.node(a).unwrap().position(), (1000.0, 3.0, 20.0));
        assert_eq!(g.node(b).unwrap().position(), (0.0, 0.0, 0.0));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_move_ignores_duplicate_keys() {
        let mut g = Graph::new();
        let a = g.create_node_with_y(0.0, 0.0, 0.0, NodeFlag::Regular, false, false);
        let edge = g.create_node_with_y(1000.0, 0.0, 0.0, NodeFlag::Regular, false, false);
        let mut c = move_nodes(&mut g, false, &[a, a, edge, edge], 10.0, 0.0, 1024.0);
        assert_eq!(g.node(a).unwrap().x(), 10.0);
        assert_eq!(g.node(edge).unwrap().x(), 1010.0);
        assert_eq!(c.len(), 2);
        move_nodes(&mut g, false, &[edge, edge], 20.0, 0.0, 1024.0);
        assert_eq!(g.node(edge).unwrap().x(), 1010.0);
        c.undo(&mut g);
        assert_eq!(g.node(a).unwrap().x(), 0.0);
        assert_eq!(g.node(edge).unwrap().x(), 1000.0);
    }

    #[test]
    fn test_fix_out_of_bounds() {
        let mut g = Graph::new();
        let inside = g.create_node_with_y(10.0, 1.0, 10.0, NodeFlag::Regular, false, false);
        let outside = g.create_node_with_y(3000.0, 7.5, 10.0, NodeFlag::Regular, false, false);
        let control = g.create_node_with_y(5000.0, 0.0, 0.0, NodeFlag::Regular, false, true);
        let mut c = fix_out_of_bounds(&mut g, false, 1024.0, 1024.0).unwrap();
        assert_eq!(g.node(outside).unwrap().position(), (0.0, 7.5, 0.0));
        assert_eq!(g.node(inside).unwrap().position(), (10.0, 1.0, 10.0));
        assert_eq!(g.node(control).unwrap().x(), 5000.0);
        c.undo(&mut g);
        assert_eq!(g.node(outside).unwrap().position(), (3000.0, 7.5, 10.0));
        assert!(fix_out_of_bounds(&mut g, false, 4096.0, 4096.0).is_none());
    }
}
