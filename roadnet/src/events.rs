use crate::model::{Node, NodeKey};
use crate::Graph;

/// Change notification emitted by [`Graph`]. Bulk operations emit exactly one event per call.
#[derive(Debug)]
pub enum GraphEvent<'a> {
    Added(NodeKey),
    Removed(&'a Node),
    BulkAdded(&'a [NodeKey]),
    BulkRemoved(&'a [Node]),
    /// The whole sequence was swapped. `old` is the discarded sequence; the new one is the graph
    /// handed to the listener.
    Replaced { old: &'a [Node] },
    /// Fields of one node changed outside add/remove.
    Refreshed(NodeKey),
    /// Re-read everything.
    Refresh,
}

pub trait GraphListener {
    fn graph_changed(&mut self, graph: &Graph, event: &GraphEvent<'_>);
}
