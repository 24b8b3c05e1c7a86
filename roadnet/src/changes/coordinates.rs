use crate::geometry::rounding::round3;
use crate::history::Changeable;
use crate::model::NodeKey;
use crate::Graph;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Delta {
    key: NodeKey,
    dx: f64,
    dy: f64,
    dz: f64,
}

/// Records per-axis position differences for any number of nodes as one undo unit.
///
/// The difference is taken against the node's position when [`CoordinateChanger::add_change`] is
/// called, so record first and apply afterwards (see [`CoordinateChanger::apply`]).
#[derive(Clone, Debug)]
pub struct CoordinateChanger {
    deltas: Vec<Delta>,
    was_stale: bool,
    generation: u64,
}

impl CoordinateChanger {
    pub fn new(graph: &Graph, stale: bool) -> Self {
        CoordinateChanger {
            deltas: Vec::new(),
            was_stale: stale,
            generation: graph.generation(),
        }
    }

    /// Records one node's move to `(x, y, z)` and applies it.
    pub fn single(graph: &mut Graph, stale: bool, key: NodeKey, x: f64, y: f64, z: f64) -> Self {
        let mut changer = CoordinateChanger::new(graph, stale);
        changer.add_change(graph, key, x, y, z);
        changer.apply(graph);
        changer
    }

    pub fn add_change(&mut self, graph: &Graph, key: NodeKey, x: f64, y: f64, z: f64) {
        let node = match graph.node(key) {
            Some(n) => n,
            None => panic!("{:?} is not part of this graph", key),
        };
        // both sides carry three decimals, so the difference does too
        self.deltas.push(Delta {
            key,
            dx: round3(round3(x) - node.x()),
            dy: round3(round3(y) - node.y()),
            dz: round3(round3(z) - node.z()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Moves every recorded node by its difference; the same step [`Changeable::redo`] performs.
    pub fn apply(&self, graph: &mut Graph) {
        self.shift(graph, 1.0);
    }

    fn shift(&self, graph: &mut Graph, sign: f64) {
        for d in &self.deltas {
            graph.translate(d.key, sign * d.dx, sign * d.dy, sign * d.dz);
            graph.refresh_node(d.key);
        }
    }
}

impl Changeable for CoordinateChanger {
    fn undo(&mut self, graph: &mut Graph) {
        self.shift(graph, -1.0);
    }

    fn redo(&mut self, graph: &mut Graph) {
        self.shift(graph, 1.0);
    }

    fn was_stale(&self) -> bool {
        self.was_stale
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn label(&self) -> &'static str {
        "move"
    }
}
