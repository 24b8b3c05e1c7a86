use proptest::prelude::*;
use roadnet::{ConnectionKind, EditorConfig, Graph, HistoryError, Marker, NodeFlag, NodeKey, Session};

fn flat(_x: f64, _z: f64) -> f64 {
    4.0
}

fn session_with_nodes(n: usize) -> (Session, Vec<NodeKey>) {
    let mut s = Session::default();
    let keys = (0..n)
        .map(|i| s.create_node(i as f64 * 3.0, i as f64 * -2.0, NodeFlag::Regular, &flat))
        .collect();
    (s, keys)
}

type Snapshot = Vec<(u32, (f64, f64, f64), i32, Vec<u32>, Vec<u32>, Option<Marker>)>;

// adjacency compared as sets; re-inserting deleted nodes appends to neighbour lists
fn snapshot(g: &Graph) -> Snapshot {
    let ids = |list: &[NodeKey]| -> Vec<u32> {
        let mut v: Vec<u32> = list.iter().map(|k| g.node(*k).unwrap().id()).collect();
        v.sort_unstable();
        v
    };
    g.iter()
        .map(|n| {
            (
                n.id(),
                n.position(),
                n.flag.raw(),
                ids(n.incoming()),
                ids(n.outgoing()),
                n.marker().cloned(),
            )
        })
        .collect()
}

#[derive(Clone, Debug)]
enum Edit {
    Move { idx: u8, dx: i16, dz: i16 },
    Set { idx: u8, x: i32, y: i16, z: i32 },
    Connect { a: u8, b: u8, dual: bool },
    Disconnect { a: u8, b: u8 },
    Flag { idx: u8, sub: bool },
    Mark { idx: u8 },
    Delete { idx: u8 },
    Create { x: i16, z: i16 },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<u8>(), any::<i16>(), any::<i16>()).prop_map(|(idx, dx, dz)| Edit::Move { idx, dx, dz }),
        (any::<u8>(), any::<i32>(), any::<i16>(), any::<i32>())
            .prop_map(|(idx, x, y, z)| Edit::Set { idx, x, y, z }),
        (any::<u8>(), any::<u8>(), any::<bool>()).prop_map(|(a, b, dual)| Edit::Connect { a, b, dual }),
        (any::<u8>(), any::<u8>()).prop_map(|(a, b)| Edit::Disconnect { a, b }),
        (any::<u8>(), any::<bool>()).prop_map(|(idx, sub)| Edit::Flag { idx, sub }),
        any::<u8>().prop_map(|idx| Edit::Mark { idx }),
        any::<u8>().prop_map(|idx| Edit::Delete { idx }),
        (any::<i16>(), any::<i16>()).prop_map(|(x, z)| Edit::Create { x, z }),
    ]
}

fn pick(s: &Session, idx: u8) -> Option<NodeKey> {
    let keys = s.graph().keys();
    if keys.is_empty() {
        None
    } else {
        Some(keys[idx as usize % keys.len()])
    }
}

fn apply(s: &mut Session, edit: Edit) {
    match edit {
        Edit::Move { idx, dx, dz } => {
            if let Some(k) = pick(s, idx) {
                s.move_nodes(&[k], dx as f64 * 0.0137, dz as f64 * 0.0137);
            }
        }
        Edit::Set { idx, x, y, z } => {
            if let Some(k) = pick(s, idx) {
                s.set_coordinates(k, x as f64 / 7919.0, y as f64 * 0.01, z as f64 / 104_729.0);
            }
        }
        Edit::Connect { a, b, dual } => {
            if let (Some(a), Some(b)) = (pick(s, a), pick(s, b)) {
                if a != b {
                    let kind = if dual { ConnectionKind::Dual } else { ConnectionKind::Regular };
                    s.connect(a, b, kind);
                }
            }
        }
        Edit::Disconnect { a, b } => {
            if let (Some(a), Some(b)) = (pick(s, a), pick(s, b)) {
                if a != b {
                    s.disconnect(a, b);
                }
            }
        }
        Edit::Flag { idx, sub } => {
            if let Some(k) = pick(s, idx) {
                let flag = if sub { NodeFlag::SubPriority } else { NodeFlag::Regular };
                s.set_flag(&[k], flag);
            }
        }
        Edit::Mark { idx } => {
            if let Some(k) = pick(s, idx) {
                s.set_marker(k, Some(Marker::new(format!("m{}", idx), "All")));
            }
        }
        Edit::Delete { idx } => {
            if let Some(k) = pick(s, idx) {
                s.delete_nodes(&[k]);
            }
        }
        Edit::Create { x, z } => {
            s.create_node(x as f64 * 0.1, z as f64 * 0.1, NodeFlag::Regular, &flat);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]
    #[test]
    fn undo_all_then_redo_all_restores_every_state(edits in prop::collection::vec(edit_strategy(), 1..40)) {
        let (mut s, _) = session_with_nodes(4);
        let mut states = vec![(snapshot(s.graph()), s.is_stale())];
        for e in edits {
            let before = s.history().undo_len();
            apply(&mut s, e);
            if s.history().undo_len() > before {
                states.push((snapshot(s.graph()), s.is_stale()));
            }
        }
        let recorded = states.len() - 1;
        for i in (0..recorded).rev() {
            prop_assert_eq!(s.undo(), Ok(true));
            prop_assert_eq!(&(snapshot(s.graph()), s.is_stale()), &states[i]);
        }
        for i in 1..=recorded {
            prop_assert_eq!(s.redo(), Ok(true));
            prop_assert_eq!(&snapshot(s.graph()), &states[i].0);
            prop_assert!(s.is_stale());
        }
    }

    #[test]
    fn undo_redo_pair_is_bit_identical(moves in prop::collection::vec((any::<i32>(), any::<i32>()), 1..20)) {
        let (mut s, keys) = session_with_nodes(2);
        for (dx, dz) in moves {
            if s.move_nodes(&keys, dx as f64 / 65_537.0, dz as f64 / 131_071.0) == 0 {
                continue;
            }
            let after: Vec<(f64, f64, f64)> = s.graph().iter().map(|n| n.position()).collect();
            let stale = s.is_stale();
            prop_assert_eq!(s.undo(), Ok(true));
            prop_assert_eq!(s.redo(), Ok(true));
            let again: Vec<(f64, f64, f64)> = s.graph().iter().map(|n| n.position()).collect();
            for (a, b) in after.iter().zip(&again) {
                prop_assert_eq!(a.0.to_bits(), b.0.to_bits());
                prop_assert_eq!(a.1.to_bits(), b.1.to_bits());
                prop_assert_eq!(a.2.to_bits(), b.2.to_bits());
            }
            prop_assert_eq!(stale, s.is_stale());
        }
    }
}

#[test]
fn undo_restores_captured_stale_flag() {
    let mut s = Session::default();
    assert!(!s.is_stale());
    let k = s.create_node(1.0, 1.0, NodeFlag::Regular, &flat);
    assert!(s.is_stale());
    assert_eq!(s.graph().node(k).unwrap().y(), 4.0);
    s.set_coordinates(k, 2.0, 4.0, 2.0);
    assert_eq!(s.undo(), Ok(true));
    assert!(s.is_stale());
    assert_eq!(s.undo(), Ok(true));
    assert!(!s.is_stale());
    assert_eq!(s.redo(), Ok(true));
    assert!(s.is_stale());
}

#[test]
fn replay_against_replaced_graph_is_refused() {
    let (mut s, keys) = session_with_nodes(2);
    s.set_coordinates(keys[0], 9.0, 9.0, 9.0);
    let old = s.graph().generation();
    s.graph_mut().replace_all(Graph::new());
    assert_ne!(old, s.graph().generation());
    match s.undo() {
        Err(HistoryError::GraphReplaced { recorded, live }) => {
            assert_eq!(recorded, old);
            assert_eq!(live, s.graph().generation());
        }
        other => panic!("expected GraphReplaced, got {:?}", other),
    }
    assert!(!s.history().can_undo());
    assert!(!s.history().can_redo());
}

#[test]
fn history_depth_comes_from_config() {
    let mut s = Session::new(EditorConfig {
        undo_depth: 3,
        ..EditorConfig::default()
    });
    let k = s.create_node(0.0, 0.0, NodeFlag::Regular, &flat);
    for i in 1..=5 {
        s.set_coordinates(k, i as f64, 0.0, 0.0);
    }
    assert_eq!(s.history().undo_len(), 3);
    while s.undo().unwrap() {}
    assert_eq!(s.graph().node(k).unwrap().x(), 2.0);
}

#[test]
fn deleting_nodes_undoes_in_one_step() {
    let (mut s, keys) = session_with_nodes(4);
    for w in keys.windows(2) {
        s.connect(w[0], w[1], ConnectionKind::Regular);
    }
    s.connect(keys[3], keys[0], ConnectionKind::Dual);
    let before = snapshot(s.graph());
    assert_eq!(s.delete_nodes(&[keys[0], keys[2]]), 2);
    assert_eq!(s.graph().len(), 2);
    assert_eq!(s.undo(), Ok(true));
    assert_eq!(snapshot(s.graph()), before);
}

#[test]
fn parked_vehicles_need_a_marker() {
    let (mut s, keys) = session_with_nodes(1);
    assert!(!s.set_parked_vehicles(keys[0], vec![3]));
    s.set_marker(keys[0], Some(Marker::new("Yard", "Farm")));
    assert!(s.set_parked_vehicles(keys[0], vec![3, 5]));
    assert_eq!(s.graph().node(keys[0]).unwrap().marker().unwrap().parked_vehicles, vec![3, 5]);
    assert_eq!(s.undo(), Ok(true));
    assert!(s.graph().node(keys[0]).unwrap().marker().unwrap().parked_vehicles.is_empty());
    assert_eq!(s.undo(), Ok(true));
    assert!(!s.graph().node(keys[0]).unwrap().has_marker());
}
