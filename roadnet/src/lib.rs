pub mod model;
pub mod events;
pub mod geometry {
    pub mod limits;
    pub mod rounding;
}
pub mod changes {
    pub mod coordinates;
    pub mod markers;
    pub mod structure;
}
pub mod xml {
    pub mod game;
    pub mod tree;
    pub mod vehicles;
}
pub mod autosave;
pub mod config;
pub mod edit;
pub mod error;
pub mod history;
pub mod session;
mod json;

pub use changes::coordinates::CoordinateChanger;
pub use config::EditorConfig;
pub use error::{LoadError, SaveError};
pub use events::{GraphEvent, GraphListener};
pub use history::{ChangeLog, Changeable, HistoryError};
pub use model::{ConnectionKind, Marker, Node, NodeFlag, NodeKey};
pub use session::Session;

use geometry::rounding::round3;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Terrain lookup used when a node is placed interactively.
pub trait HeightSampler {
    fn sample_height(&self, x: f64, z: f64) -> f64;
}

impl<F> HeightSampler for F
where
    F: Fn(f64, f64) -> f64,
{
    fn sample_height(&self, x: f64, z: f64) -> f64 {
        self(x, z)
    }
}

/// A node taken out of the graph together with the neighbours that referenced it.
///
/// `inbound` held the node in their `incoming` list, `outbound` in their `outgoing` list; passing
/// both back to [`Graph::insert_node`] restores the adjacency.
#[derive(Clone, Debug)]
pub struct Removal {
    pub node: Node,
    pub inbound: Vec<NodeKey>,
    pub outbound: Vec<NodeKey>,
}

pub struct Graph {
    pub(crate) nodes: Vec<Option<Node>>, // key is index
    pub(crate) order: Vec<NodeKey>,      // network node list, id == position + 1
    generation: u64,
    listeners: Vec<Box<dyn GraphListener>>,
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("generation", &self.generation)
            .field("nodes", &self.order.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            nodes: Vec::new(),
            order: Vec::new(),
            generation: next_generation(),
            listeners: Vec::new(),
        }
    }

    /// Identity token of the loaded network; changes on every [`Graph::replace_all`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key.index()).and_then(|n| n.as_ref())
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.node(key).is_some()
    }

    pub fn node_by_id(&self, id: u32) -> Option<&Node> {
        let pos = (id as usize).checked_sub(1)?;
        self.order.get(pos).and_then(|k| self.node(*k))
    }

    pub fn key_of(&self, id: u32) -> Option<NodeKey> {
        self.node_by_id(id).map(|n| n.key)
    }

    /// Keys in network order.
    pub fn keys(&self) -> &[NodeKey] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(move |k| self.node(*k))
    }

    pub fn connection_count(&self) -> usize {
        self.iter().map(|n| n.outgoing.len()).sum()
    }

    pub fn marker_count(&self) -> usize {
        self.iter().filter(|n| n.marker.is_some()).count()
    }

    fn expect_node(&self, key: NodeKey) -> &Node {
        match self.node(key) {
            Some(n) => n,
            None => panic!("{:?} is not part of this graph", key),
        }
    }

    pub(crate) fn expect_node_mut(&mut self, key: NodeKey) -> &mut Node {
        match self.nodes.get_mut(key.index()).and_then(|n| n.as_mut()) {
            Some(n) => n,
            None => panic!("{:?} is not part of this graph", key),
        }
    }

    fn reserve_key(&mut self) -> NodeKey {
        let key = NodeKey(self.nodes.len() as u32);
        self.nodes.push(None);
        key
    }

    fn make_node(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        flag: NodeFlag,
        selected: bool,
        control: bool,
    ) -> Node {
        Node {
            key: self.reserve_key(),
            id: 0,
            x: round3(x),
            y: round3(y),
            z: round3(z),
            flag,
            selected,
            is_control: control,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            marker: None,
        }
    }

    /// A node that belongs to this graph but is not in the network yet; attach it with
    /// [`Graph::add_node`], [`Graph::add_all`] or [`Graph::insert_node`].
    ///
    /// Every call reserves a key. Keys are never reused, so a node that is dropped without being
    /// attached leaves an empty slot behind; it is invisible to lookups and iteration.
    pub fn detached_node(&mut self, x: f64, y: f64, z: f64, flag: NodeFlag) -> Node {
        self.make_node(x, y, z, flag, false, false)
    }

    // Nodes
    pub fn create_node(
        &mut self,
        x: f64,
        z: f64,
        flag: NodeFlag,
        selected: bool,
        control: bool,
        heights: &dyn HeightSampler,
    ) -> NodeKey {
        let y = heights.sample_height(x, z);
        self.create_node_with_y(x, y, z, flag, selected, control)
    }

    pub fn create_node_with_y(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        flag: NodeFlag,
        selected: bool,
        control: bool,
    ) -> NodeKey {
        let node = self.make_node(x, y, z, flag, selected, control);
        self.add_node(node)
    }

    fn attach(&mut self, mut node: Node) -> NodeKey {
        let key = node.key;
        assert!(
            key.index() < self.nodes.len() && self.nodes[key.index()].is_none(),
            "{:?} is attached already or belongs to another graph",
            key
        );
        node.id = self.order.len() as u32 + 1;
        self.order.push(key);
        self.nodes[key.index()] = Some(node);
        key
    }

    /// Appends `node` at the end of the network; its id becomes `len + 1`.
    pub fn add_node(&mut self, node: Node) -> NodeKey {
        let key = self.attach(node);
        self.notify(GraphEvent::Added(key));
        key
    }

    pub fn add_all(&mut self, nodes: Vec<Node>) -> Vec<NodeKey> {
        let keys: Vec<NodeKey> = nodes.into_iter().map(|n| self.attach(n)).collect();
        self.notify(GraphEvent::BulkAdded(&keys));
        keys
    }

    /// Removes every listed node, repairs adjacency and renumbers the survivors.
    pub fn remove_all(&mut self, keys: &[NodeKey]) -> Vec<Node> {
        let doomed: HashSet<NodeKey> = keys.iter().copied().filter(|k| self.contains(*k)).collect();
        if doomed.is_empty() {
            return Vec::new();
        }
        let mut removed = Vec::with_capacity(doomed.len());
        let Graph { nodes, order, .. } = self;
        order.retain(|key| {
            if doomed.contains(key) {
                if let Some(node) = nodes[key.index()].take() {
                    removed.push(node);
                }
                false
            } else {
                true
            }
        });
        for node in nodes.iter_mut().flatten() {
            node.incoming.retain(|k| !doomed.contains(k));
            node.outgoing.retain(|k| !doomed.contains(k));
        }
        for (pos, key) in order.iter().enumerate() {
            if let Some(node) = nodes[key.index()].as_mut() {
                node.id = pos as u32 + 1;
            }
        }
        self.notify(GraphEvent::BulkRemoved(&removed));
        removed
    }

    /// Inserts `node` at position `node.id - 1`, shifting every later id up by one, then re-links
    /// it into the given neighbours' `incoming` (`inbound`) and `outgoing` (`outbound`) lists.
    pub fn insert_node(&mut self, node: Node, inbound: &[NodeKey], outbound: &[NodeKey]) -> NodeKey {
        let key = node.key;
        let id = node.id as usize;
        assert!(
            id >= 1 && id <= self.order.len() + 1,
            "cannot insert id {} into a network of {} nodes",
            id,
            self.order.len()
        );
        assert!(
            key.index() < self.nodes.len() && self.nodes[key.index()].is_none(),
            "{:?} is attached already or belongs to another graph",
            key
        );
        let pos = id - 1;
        let Graph { nodes, order, .. } = self;
        for k in &order[pos..] {
            if let Some(n) = nodes[k.index()].as_mut() {
                n.id += 1;
            }
        }
        order.insert(pos, key);
        nodes[key.index()] = Some(node);

        for other in inbound {
            let other = self.expect_node_mut(*other);
            if !other.incoming.contains(&key) {
                other.incoming.push(key);
            }
        }
        for other in outbound {
            let other = self.expect_node_mut(*other);
            if !other.outgoing.contains(&key) {
                other.outgoing.push(key);
            }
        }
        debug!("insert_node: index {} (id {})", pos, id);
        self.notify(GraphEvent::Added(key));
        key
    }

    pub fn remove_node(&mut self, key: NodeKey) -> Removal {
        let node = match self.nodes.get_mut(key.index()).and_then(Option::take) {
            Some(n) => n,
            None => panic!("{:?} is not part of this graph", key),
        };
        let pos = node.id as usize - 1;
        debug_assert_eq!(self.order.get(pos), Some(&key), "id/position invariant broken");

        let mut inbound = Vec::new();
        let mut outbound = Vec::new();
        let Graph { nodes, order, .. } = self;
        for other in nodes.iter_mut().flatten() {
            if remove_key(&mut other.incoming, key) {
                inbound.push(other.key);
            }
            if remove_key(&mut other.outgoing, key) {
                outbound.push(other.key);
            }
        }
        order.remove(pos);
        for k in &order[pos..] {
            if let Some(n) = nodes[k.index()].as_mut() {
                n.id -= 1;
            }
        }
        debug!("remove_node: index {} (id {})", pos, node.id);
        self.notify(GraphEvent::Removed(&node));
        Removal {
            node,
            inbound,
            outbound,
        }
    }

    // Connections
    pub fn is_dual(&self, a: NodeKey, b: NodeKey) -> bool {
        let (na, nb) = (self.expect_node(a), self.expect_node(b));
        na.outgoing.contains(&b)
            && nb.incoming.contains(&a)
            && nb.outgoing.contains(&a)
            && na.incoming.contains(&b)
    }

    pub fn is_reverse(&self, a: NodeKey, b: NodeKey) -> bool {
        let (na, nb) = (self.expect_node(a), self.expect_node(b));
        na.outgoing.contains(&b) && !nb.incoming.contains(&a)
    }

    pub fn connection_kind(&self, a: NodeKey, b: NodeKey) -> Option<ConnectionKind> {
        if self.is_dual(a, b) {
            Some(ConnectionKind::Dual)
        } else if self.is_reverse(a, b) {
            Some(ConnectionKind::Reverse)
        } else if self.expect_node(a).outgoing.contains(&b) {
            Some(ConnectionKind::Regular)
        } else {
            None
        }
    }

    /// Links `a` to `b`, replacing whatever relation the pair had before.
    pub fn connect(&mut self, a: NodeKey, b: NodeKey, kind: ConnectionKind) {
        assert_ne!(a, b, "a node cannot connect to itself");
        self.disconnect(a, b);
        push_unique(&mut self.expect_node_mut(a).outgoing, b);
        match kind {
            ConnectionKind::Regular => push_unique(&mut self.expect_node_mut(b).incoming, a),
            ConnectionKind::Reverse => {}
            ConnectionKind::Dual => {
                push_unique(&mut self.expect_node_mut(b).incoming, a);
                push_unique(&mut self.expect_node_mut(b).outgoing, a);
                push_unique(&mut self.expect_node_mut(a).incoming, b);
            }
        }
    }

    /// Drops every link between `a` and `b` in both directions.
    pub fn disconnect(&mut self, a: NodeKey, b: NodeKey) -> bool {
        let na = self.expect_node_mut(a);
        let mut changed = remove_key(&mut na.outgoing, b);
        changed |= remove_key(&mut na.incoming, b);
        let nb = self.expect_node_mut(b);
        changed |= remove_key(&mut nb.outgoing, a);
        changed |= remove_key(&mut nb.incoming, a);
        changed
    }

    pub(crate) fn adjacency(&self, key: NodeKey) -> (Vec<NodeKey>, Vec<NodeKey>) {
        let n = self.expect_node(key);
        (n.incoming.clone(), n.outgoing.clone())
    }

    pub(crate) fn set_adjacency(&mut self, key: NodeKey, incoming: Vec<NodeKey>, outgoing: Vec<NodeKey>) {
        let n = self.expect_node_mut(key);
        n.incoming = incoming;
        n.outgoing = outgoing;
    }

    // Fields. These do not notify; call refresh_node or refresh afterwards.
    pub fn set_position(&mut self, key: NodeKey, x: f64, y: f64, z: f64) {
        let n = self.expect_node_mut(key);
        n.x = round3(x);
        n.y = round3(y);
        n.z = round3(z);
    }

    pub fn translate(&mut self, key: NodeKey, dx: f64, dy: f64, dz: f64) {
        let n = self.expect_node_mut(key);
        n.x = round3(n.x + dx);
        n.y = round3(n.y + dy);
        n.z = round3(n.z + dz);
    }

    pub fn set_flag(&mut self, key: NodeKey, flag: NodeFlag) -> NodeFlag {
        std::mem::replace(&mut self.expect_node_mut(key).flag, flag)
    }

    pub fn set_selected(&mut self, key: NodeKey, selected: bool) {
        self.expect_node_mut(key).selected = selected;
    }

    pub fn set_marker(&mut self, key: NodeKey, marker: Option<Marker>) -> Option<Marker> {
        std::mem::replace(&mut self.expect_node_mut(key).marker, marker)
    }

    /// Swaps in the network of `other` wholesale and assigns a fresh generation.
    pub fn replace_all(&mut self, other: Graph) {
        let Graph { nodes, order, .. } = other;
        let mut old_slots = std::mem::replace(&mut self.nodes, nodes);
        let old_order = std::mem::replace(&mut self.order, order);
        self.generation = next_generation();
        let old: Vec<Node> = old_order
            .iter()
            .filter_map(|k| old_slots.get_mut(k.index()).and_then(Option::take))
            .collect();
        info!(
            "network replaced: {} -> {} nodes, generation {}",
            old.len(),
            self.order.len(),
            self.generation
        );
        self.notify(GraphEvent::Replaced { old: &old });
    }

    pub fn refresh(&mut self) {
        self.notify(GraphEvent::Refresh);
    }

    pub fn refresh_node(&mut self, key: NodeKey) {
        self.notify(GraphEvent::Refreshed(key));
    }

    pub fn add_listener(&mut self, listener: Box<dyn GraphListener>) {
        self.listeners.push(listener);
    }

    fn notify(&mut self, event: GraphEvent<'_>) {
        if self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        for l in listeners.iter_mut() {
            l.graph_changed(self, &event);
        }
        self.listeners = listeners;
    }

    /// Human-readable descriptions of broken invariants; empty for a consistent graph.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (pos, key) in self.order.iter().enumerate() {
            let node = match self.node(*key) {
                Some(n) => n,
                None => {
                    out.push(format!("position {} holds detached {:?}", pos, key));
                    continue;
                }
            };
            if node.id as usize != pos + 1 {
                out.push(format!("node at index {} has id {}", pos, node.id));
            }
            for k in node.incoming.iter().chain(node.outgoing.iter()) {
                if !self.contains(*k) {
                    out.push(format!("node {} references detached {:?}", node.id, k));
                }
            }
        }
        out
    }

    // JSON
    pub fn to_json_value(&self) -> serde_json::Value {
        json::to_json_impl(self)
    }
}

fn push_unique(list: &mut Vec<NodeKey>, key: NodeKey) {
    if !list.contains(&key) {
        list.push(key);
    }
}

fn remove_key(list: &mut Vec<NodeKey>, key: NodeKey) -> bool {
    let before = list.len();
    list.retain(|k| *k != key);
    list.len() != before
}
