use proptest::prelude::*;
use roadnet::{ConnectionKind, Graph, NodeFlag, NodeKey};

#[derive(Clone, Debug)]
enum Op {
    Create { x: i16, z: i16 },
    Remove { idx: u16 },
    RemoveAll { a: u16, b: u16 },
    Connect { a: u16, b: u16, kind: u8 },
    Disconnect { a: u16, b: u16 },
    InsertThenRemove { pos: u16, inbound: u16, outbound: u16 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<i16>(), any::<i16>()).prop_map(|(x, z)| Op::Create { x, z }),
        1 => any::<u16>().prop_map(|idx| Op::Remove { idx }),
        1 => (any::<u16>(), any::<u16>()).prop_map(|(a, b)| Op::RemoveAll { a, b }),
        3 => (any::<u16>(), any::<u16>(), 0u8..=2u8).prop_map(|(a, b, kind)| Op::Connect { a, b, kind }),
        1 => (any::<u16>(), any::<u16>()).prop_map(|(a, b)| Op::Disconnect { a, b }),
        1 => (any::<u16>(), any::<u16>(), any::<u16>()).prop_map(|(pos, inbound, outbound)| {
            Op::InsertThenRemove { pos, inbound, outbound }
        }),
    ]
}

fn pick(g: &Graph, idx: u16) -> Option<NodeKey> {
    let keys = g.keys();
    if keys.is_empty() {
        None
    } else {
        Some(keys[idx as usize % keys.len()])
    }
}

type Snapshot = Vec<(u32, (f64, f64, f64), Vec<u32>, Vec<u32>)>;

fn snapshot(g: &Graph) -> Snapshot {
    let ids = |list: &[NodeKey]| -> Vec<u32> { list.iter().map(|k| g.node(*k).unwrap().id()).collect() };
    g.iter()
        .map(|n| (n.id(), n.position(), ids(n.incoming()), ids(n.outgoing())))
        .collect()
}

fn apply_op(g: &mut Graph, op: Op) {
    match op {
        Op::Create { x, z } => {
            g.create_node_with_y(x as f64 * 0.37, 0.0, z as f64 * 0.37, NodeFlag::Regular, false, false);
        }
        Op::Remove { idx } => {
            if let Some(k) = pick(g, idx) {
                g.remove_node(k);
            }
        }
        Op::RemoveAll { a, b } => {
            let keys: Vec<NodeKey> = [pick(g, a), pick(g, b)].into_iter().flatten().collect();
            g.remove_all(&keys);
        }
        Op::Connect { a, b, kind } => {
            if let (Some(a), Some(b)) = (pick(g, a), pick(g, b)) {
                if a != b {
                    let kind = match kind {
                        0 => ConnectionKind::Regular,
                        1 => ConnectionKind::Reverse,
                        _ => ConnectionKind::Dual,
                    };
                    g.connect(a, b, kind);
                }
            }
        }
        Op::Disconnect { a, b } => {
            if let (Some(a), Some(b)) = (pick(g, a), pick(g, b)) {
                g.disconnect(a, b);
            }
        }
        Op::InsertThenRemove { pos, inbound, outbound } => {
            let before = snapshot(g);
            let inbound: Vec<NodeKey> = pick(g, inbound).into_iter().collect();
            let outbound: Vec<NodeKey> = pick(g, outbound).into_iter().collect();
            let mut node = g.detached_node(1.0, 2.0, 3.0, NodeFlag::Regular);
            node.set_id(pos as u32 % (g.len() as u32 + 1) + 1);
            let key = g.insert_node(node, &inbound, &outbound);
            assert!(g.invariant_violations().is_empty());
            g.remove_node(key);
            assert_eq!(before, snapshot(g), "insert followed by remove changed the graph");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 512, .. ProptestConfig::default() })]
    #[test]
    fn id_matches_position_after_any_edit(seq in prop::collection::vec(op_strategy(), 1..60)) {
        let mut g = Graph::new();
        for op in seq {
            apply_op(&mut g, op);
            let violations = g.invariant_violations();
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
        for (i, n) in g.iter().enumerate() {
            prop_assert_eq!(n.id() as usize, i + 1);
        }
    }
}

fn chain(g: &mut Graph, n: usize) -> Vec<NodeKey> {
    let keys: Vec<NodeKey> = (0..n)
        .map(|i| g.create_node_with_y(i as f64 * 10.0, 0.0, 0.0, NodeFlag::Regular, false, false))
        .collect();
    for w in keys.windows(2) {
        g.connect(w[0], w[1], ConnectionKind::Regular);
    }
    keys
}

#[test]
fn removing_id_two_renumbers_chain() {
    let mut g = Graph::new();
    let keys = chain(&mut g, 4);
    g.remove_node(keys[1]);
    let ids: Vec<u32> = g.iter().map(|n| n.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    // formerly id 4, now id 3
    let last = g.node_by_id(3).unwrap();
    assert_eq!(last.key(), keys[3]);
    assert_eq!(last.x(), 30.0);
    assert!(!last.incoming().contains(&keys[1]));
    assert_eq!(g.node_by_id(2).unwrap().incoming(), &[] as &[NodeKey]);
    assert!(g.node(keys[0]).unwrap().outgoing().is_empty());
}

#[test]
fn dual_and_reverse_queries() {
    let mut g = Graph::new();
    let keys = chain(&mut g, 3);
    let (a, b, c) = (keys[0], keys[1], keys[2]);
    g.connect(a, b, ConnectionKind::Dual);
    assert!(g.is_dual(a, b));
    assert!(!g.is_reverse(a, b));
    g.connect(b, c, ConnectionKind::Reverse);
    assert!(g.is_reverse(b, c));
    assert!(!g.is_dual(b, c));
    assert!(!g.is_reverse(c, b));
}

#[test]
fn insert_in_middle_shifts_later_ids() {
    let mut g = Graph::new();
    let keys = chain(&mut g, 3);
    let mut node = g.detached_node(5.0, 0.0, 0.0, NodeFlag::SubPriority);
    node.set_id(2);
    let k = g.insert_node(node, &[keys[1]], &[keys[0]]);
    let order: Vec<NodeKey> = g.iter().map(|n| n.key()).collect();
    assert_eq!(order, vec![keys[0], k, keys[1], keys[2]]);
    assert_eq!(g.node(keys[2]).unwrap().id(), 4);
    assert!(g.node(keys[1]).unwrap().incoming().contains(&k));
    assert!(g.node(keys[0]).unwrap().outgoing().contains(&k));
    assert_eq!(g.key_of(2), Some(k));
}

#[test]
#[should_panic]
fn removing_detached_key_panics() {
    let mut g = Graph::new();
    let keys = chain(&mut g, 2);
    g.remove_node(keys[0]);
    g.remove_node(keys[0]);
}
