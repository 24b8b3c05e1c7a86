use crate::history::Changeable;
use crate::model::{Marker, NodeKey};
use crate::Graph;

/// Adding, editing or removing the marker of one node.
pub struct MarkerChange {
    key: NodeKey,
    before: Option<Marker>,
    after: Option<Marker>,
    was_stale: bool,
    generation: u64,
}

impl MarkerChange {
    pub fn apply(graph: &mut Graph, key: NodeKey, marker: Option<Marker>, stale: bool) -> Self {
        let before = graph.set_marker(key, marker.clone());
        graph.refresh_node(key);
        MarkerChange {
            key,
            before,
            after: marker,
            was_stale: stale,
            generation: graph.generation(),
        }
    }
}

impl Changeable for MarkerChange {
    fn undo(&mut self, graph: &mut Graph) {
        graph.set_marker(self.key, self.before.clone());
        graph.refresh_node(self.key);
    }

    fn redo(&mut self, graph: &mut Graph) {
        graph.set_marker(self.key, self.after.clone());
        graph.refresh_node(self.key);
    }

    fn was_stale(&self) -> bool {
        self.was_stale
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn label(&self) -> &'static str {
        "marker"
    }
}
