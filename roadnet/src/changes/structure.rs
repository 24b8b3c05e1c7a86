// Undo units for edits that change the node sequence or adjacency.

use crate::history::Changeable;
use crate::model::{ConnectionKind, NodeFlag, NodeKey};
use crate::{Graph, Removal};
use std::collections::HashSet;

pub struct NodeCreation {
    key: NodeKey,
    removed: Option<Removal>,
    was_stale: bool,
    generation: u64,
}

impl NodeCreation {
    /// Wraps a node that was just created in `graph`.
    pub fn new(graph: &Graph, key: NodeKey, stale: bool) -> Self {
        NodeCreation {
            key,
            removed: None,
            was_stale: stale,
            generation: graph.generation(),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }
}

impl Changeable for NodeCreation {
    fn undo(&mut self, graph: &mut Graph) {
        self.removed = Some(graph.remove_node(self.key));
    }

    fn redo(&mut self, graph: &mut Graph) {
        if let Some(r) = self.removed.take() {
            graph.insert_node(r.node, &r.inbound, &r.outbound);
        }
    }

    fn was_stale(&self) -> bool {
        self.was_stale
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn label(&self) -> &'static str {
        "create node"
    }
}

/// Removes nodes one at a time and keeps each [`Removal`] so undo can put them back in reverse
/// order, each at the id it had when it was taken out.
pub struct NodeDeletion {
    keys: Vec<NodeKey>,
    removed: Vec<Removal>,
    was_stale: bool,
    generation: u64,
}

impl NodeDeletion {
    pub fn apply(graph: &mut Graph, keys: &[NodeKey], stale: bool) -> Self {
        let mut seen = HashSet::new();
        let keys: Vec<NodeKey> = keys
            .iter()
            .copied()
            .filter(|k| graph.contains(*k) && seen.insert(*k))
            .collect();
        let mut unit = NodeDeletion {
            keys,
            removed: Vec::new(),
            was_stale: stale,
            generation: graph.generation(),
        };
        unit.redo(graph);
        unit
    }

    pub fn keys(&self) -> &[NodeKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Changeable for NodeDeletion {
    fn undo(&mut self, graph: &mut Graph) {
        for r in self.removed.drain(..).rev() {
            graph.insert_node(r.node, &r.inbound, &r.outbound);
        }
    }

    fn redo(&mut self, graph: &mut Graph) {
        self.removed = self.keys.iter().map(|k| graph.remove_node(*k)).collect();
    }

    fn was_stale(&self) -> bool {
        self.was_stale
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn label(&self) -> &'static str {
        "delete nodes"
    }
}

pub struct FlagChange {
    before: Vec<(NodeKey, NodeFlag)>,
    after: NodeFlag,
    was_stale: bool,
    generation: u64,
}

impl FlagChange {
    pub fn apply(graph: &mut Graph, keys: &[NodeKey], flag: NodeFlag, stale: bool) -> Self {
        let generation = graph.generation();
        let before = keys
            .iter()
            .map(|k| {
                let old = graph.set_flag(*k, flag);
                graph.refresh_node(*k);
                (*k, old)
            })
            .collect();
        FlagChange {
            before,
            after: flag,
            was_stale: stale,
            generation,
        }
    }
}

impl Changeable for FlagChange {
    fn undo(&mut self, graph: &mut Graph) {
        for (k, old) in self.before.iter().rev() {
            graph.set_flag(*k, *old);
            graph.refresh_node(*k);
        }
    }

    fn redo(&mut self, graph: &mut Graph) {
        for (k, _) in &self.before {
            graph.set_flag(*k, self.after);
            graph.refresh_node(*k);
        }
    }

    fn was_stale(&self) -> bool {
        self.was_stale
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn label(&self) -> &'static str {
        "change flag"
    }
}

#[derive(Clone)]
struct Adjacency {
    incoming: Vec<NodeKey>,
    outgoing: Vec<NodeKey>,
}

/// Connect or disconnect a pair of nodes. Both endpoints' lists are snapshotted before and after,
/// so replay restores the exact order of the adjacency lists.
pub struct ConnectionChange {
    a: NodeKey,
    b: NodeKey,
    before: (Adjacency, Adjacency),
    after: (Adjacency, Adjacency),
    was_stale: bool,
    generation: u64,
}

impl ConnectionChange {
    /// `kind == None` disconnects the pair.
    pub fn apply(graph: &mut Graph, a: NodeKey, b: NodeKey, kind: Option<ConnectionKind>, stale: bool) -> Self {
        let before = (snapshot(graph, a), snapshot(graph, b));
        match kind {
            Some(kind) => graph.connect(a, b, kind),
            None => {
                graph.disconnect(a, b);
            }
        }
        graph.refresh_node(a);
        graph.refresh_node(b);
        let after = (snapshot(graph, a), snapshot(graph, b));
        ConnectionChange {
            a,
            b,
            before,
            after,
            was_stale: stale,
            generation: graph.generation(),
        }
    }

    fn restore(&self, graph: &mut Graph, state: &(Adjacency, Adjacency)) {
        graph.set_adjacency(self.a, state.0.incoming.clone(), state.0.outgoing.clone());
        graph.set_adjacency(self.b, state.1.incoming.clone(), state.1.outgoing.clone());
        graph.refresh_node(self.a);
        graph.refresh_node(self.b);
    }
}

fn snapshot(graph: &Graph, key: NodeKey) -> Adjacency {
    let (incoming, outgoing) = graph.adjacency(key);
    Adjacency { incoming, outgoing }
}

impl Changeable for ConnectionChange {
    fn undo(&mut self, graph: &mut Graph) {
        self.restore(graph, &self.before);
    }

    fn redo(&mut self, graph: &mut Graph) {
        self.restore(graph, &self.after);
    }

    fn was_stale(&self) -> bool {
        self.was_stale
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn label(&self) -> &'static str {
        "connection"
    }
}
