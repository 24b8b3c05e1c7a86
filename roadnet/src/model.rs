use serde::{Deserialize, Serialize};

/// Stable handle to a node slot in a [`crate::Graph`].
///
/// Keys survive renumbering and are never reused inside one graph, so undo units can hold them
/// across inserts and removals of other nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(pub(crate) u32);

impl NodeKey {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-node classification flag as stored in the `<flags>` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeFlag {
    Regular,
    SubPriority,
    /// 2 or 4: written by AutoDrive for nodes it generated from map splines.
    SplineGenerated(i32),
    Other(i32),
}

impl NodeFlag {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => NodeFlag::Regular,
            1 => NodeFlag::SubPriority,
            2 | 4 => NodeFlag::SplineGenerated(raw),
            other => NodeFlag::Other(other),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            NodeFlag::Regular => 0,
            NodeFlag::SubPriority => 1,
            NodeFlag::SplineGenerated(raw) | NodeFlag::Other(raw) => raw,
        }
    }

    /// The spline-generated distinction means nothing to the editor; FS22 configs drop it.
    pub fn normalized(self) -> Self {
        match self {
            NodeFlag::SplineGenerated(_) => NodeFlag::Regular,
            other => other,
        }
    }
}

impl Default for NodeFlag {
    fn default() -> Self {
        NodeFlag::Regular
    }
}

/// Relational kind of the link from one node to another, derived from adjacency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// `a.outgoing ∋ b` and `b.incoming ∋ a`
    Regular,
    /// `a.outgoing ∋ b` without `b.incoming ∋ a`
    Reverse,
    /// registered in both directions, in both lists
    Dual,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub group: String,
    /// 1-based position in the `<mapmarker>` block; reassigned on every save.
    pub marker_index: u32,
    pub parked_vehicles: Vec<u32>,
}

impl Marker {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Marker {
            name: name.into(),
            group: group.into(),
            marker_index: 0,
            parked_vehicles: Vec::new(),
        }
    }

    pub fn is_park_destination(&self) -> bool {
        !self.parked_vehicles.is_empty()
    }
}

/// A waypoint of the road network.
///
/// Coordinates are only written through [`crate::Graph`], which rounds them to three decimals.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) id: u32,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) z: f64,
    pub flag: NodeFlag,
    pub selected: bool,
    pub(crate) is_control: bool,
    pub(crate) incoming: Vec<NodeKey>,
    pub(crate) outgoing: Vec<NodeKey>,
    pub(crate) marker: Option<Marker>,
}

impl Node {
    pub fn key(&self) -> NodeKey {
        self.key
    }
    /// 1-based position in the network node list.
    pub fn id(&self) -> u32 {
        self.id
    }
    /// Target position for [`crate::Graph::insert_node`]. Attached nodes are renumbered by the
    /// graph.
    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }
    pub fn x(&self) -> f64 {
        self.x
    }
    pub fn y(&self) -> f64 {
        self.y
    }
    pub fn z(&self) -> f64 {
        self.z
    }
    pub fn position(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
    pub fn is_control(&self) -> bool {
        self.is_control
    }
    pub fn incoming(&self) -> &[NodeKey] {
        &self.incoming
    }
    pub fn outgoing(&self) -> &[NodeKey] {
        &self.outgoing
    }
    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }
    pub fn has_marker(&self) -> bool {
        self.marker.is_some()
    }
}
