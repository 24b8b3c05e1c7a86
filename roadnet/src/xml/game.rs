//! AutoDrive config codec.
//!
//! Nodes are stored positionally: `<waypoints>` holds parallel comma lists (`id`, `x`, `y`, `z`,
//! `flags`) and `;`-separated adjacency lists (`out`, `incoming`) whose entries are comma lists of
//! 1-based ids, `-1` meaning "none". Markers live under `<mapmarker>` as `mm1..mmN`.

use crate::error::{LoadError, SaveError};
use crate::geometry::limits::{in_coord_bounds, MAX_LINKS_PER_NODE, MAX_MARKERS, MAX_NODES};
use crate::geometry::rounding::format_coord;
use crate::model::{Marker, Node, NodeFlag, NodeKey};
use crate::xml::tree::{self, XmlDocument, XmlElement};
use crate::xml::vehicles::{self, ParkingMap};
use crate::Graph;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const ROOT_ELEMENT: &str = "AutoDrive";
pub const VEHICLES_FILE: &str = "vehicles.xml";
const LEGACY_MARKER: &str = "markerID";
const DEFAULT_GROUP: &str = "All";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SchemaEra {
    Fs19,
    Fs22,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigVersion {
    pub raw: String,
    pub major: Option<u32>,
}

impl ConfigVersion {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let major = raw.split('.').next().and_then(|m| m.trim().parse().ok());
        ConfigVersion {
            raw: raw.to_string(),
            major,
        }
    }

    pub fn era(&self) -> SchemaEra {
        match self.major {
            Some(1) => SchemaEra::Fs19,
            Some(2) => SchemaEra::Fs22,
            _ => SchemaEra::Unknown,
        }
    }
}

pub struct LoadedConfig {
    pub graph: Graph,
    /// The parsed file; saving rewrites this document so unknown content survives.
    pub document: XmlDocument,
    pub version: Option<ConfigVersion>,
    pub map_name: Option<String>,
    /// `false` for legacy configs (root carries `markerID`).
    pub editable: bool,
    pub has_flags: bool,
}

impl LoadedConfig {
    pub fn era(&self) -> SchemaEra {
        self.version.as_ref().map_or(SchemaEra::Unknown, ConfigVersion::era)
    }
}

pub struct EncodedConfig {
    pub xml: String,
    /// Vehicle id -> marker index, for `vehicles.xml`.
    pub park_destinations: BTreeMap<u32, u32>,
}

pub fn vehicles_path(config: &Path) -> PathBuf {
    config.with_file_name(VEHICLES_FILE)
}

// trailing empty segments ("1,2," or "2;-1;") are dropped, as the game tolerates them
fn entries(text: &str, sep: char) -> Vec<&str> {
    let mut parts: Vec<&str> = text.trim().split(sep).map(str::trim).collect();
    while parts.last() == Some(&"") {
        parts.pop();
    }
    parts
}

fn field(waypoints: &XmlElement, name: &str) -> Result<String, LoadError> {
    waypoints
        .child(name)
        .map(XmlElement::text)
        .ok_or_else(|| LoadError::MissingElement(name.to_string()))
}

fn check_count(field: &'static str, found: usize, expected: usize) -> Result<(), LoadError> {
    if found != expected {
        return Err(LoadError::EntryCountMismatch {
            field,
            expected,
            found,
        });
    }
    debug!("parsed {} {} entries", found, field);
    Ok(())
}

fn coords(field: &'static str, text: &str, n: usize) -> Result<Vec<f64>, LoadError> {
    let raw = entries(text, ',');
    check_count(field, raw.len(), n)?;
    raw.iter()
        .enumerate()
        .map(|(index, s)| {
            let value: f64 = s.parse().map_err(|_| LoadError::InvalidNumber {
                field,
                index,
                value: s.to_string(),
            })?;
            if !in_coord_bounds(value) {
                return Err(LoadError::CoordinateOutOfRange { field, index, value });
            }
            Ok(value)
        })
        .collect()
}

fn links(field: &'static str, text: &str, n: usize) -> Result<Vec<Vec<usize>>, LoadError> {
    let raw = entries(text, ';');
    check_count(field, raw.len(), n)?;
    let mut out = Vec::with_capacity(n);
    for (index, entry) in raw.iter().enumerate() {
        let mut ids: Vec<usize> = Vec::new();
        for s in entries(entry, ',') {
            let value: i64 = s.parse().map_err(|_| LoadError::InvalidNumber {
                field,
                index,
                value: s.to_string(),
            })?;
            if value == -1 {
                continue;
            }
            if value < 1 || value as usize > n {
                return Err(LoadError::InvalidReference {
                    field,
                    index,
                    value,
                    count: n,
                });
            }
            let id = value as usize;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.len() > MAX_LINKS_PER_NODE {
            return Err(LoadError::LimitExceeded {
                what: "links per node",
                limit: MAX_LINKS_PER_NODE,
            });
        }
        out.push(ids);
    }
    Ok(out)
}

fn flags(waypoints: &XmlElement, n: usize) -> Result<Option<Vec<i32>>, LoadError> {
    let el = match waypoints.child("flags") {
        Some(el) => el,
        None => return Ok(None),
    };
    let text = el.text();
    let raw = entries(&text, ',');
    check_count("<flags>", raw.len(), n)?;
    raw.iter()
        .enumerate()
        .map(|(index, s)| {
            s.parse().map_err(|_| LoadError::InvalidNumber {
                field: "<flags>",
                index,
                value: s.to_string(),
            })
        })
        .collect::<Result<Vec<i32>, _>>()
        .map(Some)
}

fn read_markers(
    root: &XmlElement,
    nodes: &mut [Node],
    parking: &ParkingMap,
) -> Result<usize, LoadError> {
    let block = match root.find("mapmarker") {
        Some(b) => b,
        None => return Ok(0),
    };
    let n = nodes.len();
    let mut count = 0;
    for (pos, mm) in block.elements().enumerate() {
        if pos >= MAX_MARKERS {
            return Err(LoadError::LimitExceeded {
                what: "marker count",
                limit: MAX_MARKERS,
            });
        }
        let raw = mm
            .child("id")
            .map(XmlElement::text)
            .ok_or_else(|| LoadError::MissingElement(format!("{}/id", mm.name)))?;
        // the game writes marker ids as floats ("12.000000")
        let value: f64 = raw.trim().parse().map_err(|_| LoadError::InvalidNumber {
            field: "<mapmarker>",
            index: pos,
            value: raw.trim().to_string(),
        })?;
        let id = if value.is_finite() { value.trunc() as i64 } else { 0 };
        if id < 1 || id as usize > n {
            return Err(LoadError::InvalidReference {
                field: "<mapmarker>",
                index: pos,
                value: id,
                count: n,
            });
        }
        let group = mm
            .child("group")
            .map(XmlElement::text)
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let mut marker = Marker::new(mm.child("name").map(XmlElement::text).unwrap_or_default(), group);
        marker.marker_index = pos as u32 + 1;
        marker.parked_vehicles = parking.get(&marker.marker_index).cloned().unwrap_or_default();
        debug!(
            "marker {} '{}' ({}) on node {}, parked vehicles {:?}",
            marker.marker_index, marker.name, marker.group, id, marker.parked_vehicles
        );
        let node = &mut nodes[id as usize - 1];
        if node.marker.is_some() {
            warn!("node {} carries more than one marker; keeping '{}'", id, marker.name);
        }
        node.marker = Some(marker);
        count += 1;
    }
    Ok(count)
}

/// Decodes a config. `vehicles_xml` is the text of the sibling `vehicles.xml`, if there is one; a
/// malformed one only costs the parking information.
pub fn decode_config(text: &str, vehicles_xml: Option<&str>) -> Result<LoadedConfig, LoadError> {
    let document = tree::parse(text)?;
    let root = &document.root;
    if root.name != ROOT_ELEMENT {
        return Err(LoadError::UnknownConfig {
            root: root.name.clone(),
        });
    }

    let legacy = root.find(LEGACY_MARKER).is_some();
    let version = if legacy {
        warn!("legacy config format, loading read-only");
        None
    } else {
        root.find("version").map(|v| ConfigVersion::parse(&v.text()))
    };
    let era = version.as_ref().map_or(SchemaEra::Unknown, ConfigVersion::era);
    if let Some(v) = &version {
        info!("config version '{}' ({:?})", v.raw, era);
    }
    let map_name = root
        .find("MapName")
        .map(|e| e.text().trim().to_string())
        .filter(|s| !s.is_empty());

    let waypoints = root
        .find("waypoints")
        .ok_or_else(|| LoadError::MissingElement("waypoints".to_string()))?;
    let id_text = field(waypoints, "id")?;
    let ids = entries(&id_text, ',');
    let n = ids.len();
    if n > MAX_NODES {
        return Err(LoadError::LimitExceeded {
            what: "node count",
            limit: MAX_NODES,
        });
    }
    let mut out_of_sequence = 0usize;
    for (index, raw) in ids.iter().enumerate() {
        let id: i64 = raw.parse().map_err(|_| LoadError::InvalidNumber {
            field: "<id>",
            index,
            value: raw.to_string(),
        })?;
        if id != index as i64 + 1 {
            out_of_sequence += 1;
            debug!("<id> entry {} is {}", index + 1, id);
        }
    }
    if out_of_sequence > 0 {
        warn!("{} <id> entries are out of sequence; nodes are numbered by position", out_of_sequence);
    }

    let xs = coords("<x>", &field(waypoints, "x")?, n)?;
    let ys = coords("<y>", &field(waypoints, "y")?, n)?;
    let zs = coords("<z>", &field(waypoints, "z")?, n)?;
    let outgoing = links("<out>", &field(waypoints, "out")?, n)?;
    let incoming = links("<incoming>", &field(waypoints, "incoming")?, n)?;
    let flags = flags(waypoints, n)?;
    let has_flags = flags.is_some();
    if !has_flags {
        info!("no <flags> element, every node is regular");
    }

    let parking = match vehicles_xml {
        Some(text) => vehicles::parse_parking(text, era).unwrap_or_else(|e| {
            warn!("ignoring malformed vehicles.xml: {}", e);
            ParkingMap::new()
        }),
        None => ParkingMap::new(),
    };

    // two passes: create every node, then resolve links by position
    let mut graph = Graph::new();
    let mut nodes: Vec<Node> = Vec::with_capacity(n);
    for i in 0..n {
        let raw = flags.as_ref().map_or(0, |f| f[i]);
        let mut flag = NodeFlag::from_raw(raw);
        if era == SchemaEra::Fs22 {
            flag = flag.normalized();
        }
        nodes.push(graph.detached_node(xs[i], ys[i], zs[i], flag));
    }
    let keys: Vec<NodeKey> = nodes.iter().map(Node::key).collect();
    for (i, node) in nodes.iter_mut().enumerate() {
        node.outgoing = outgoing[i].iter().map(|id| keys[id - 1]).collect();
        node.incoming = incoming[i].iter().map(|id| keys[id - 1]).collect();
    }
    let markers = read_markers(root, &mut nodes, &parking)?;
    graph.add_all(nodes);
    info!(
        "loaded {} nodes, {} connections, {} markers{}",
        graph.len(),
        graph.connection_count(),
        markers,
        map_name.as_deref().map(|m| format!(" for map '{}'", m)).unwrap_or_default()
    );

    Ok(LoadedConfig {
        graph,
        document,
        version,
        map_name,
        editable: !legacy,
        has_flags,
    })
}

/// Reads the config at `path` and the `vehicles.xml` beside it.
pub fn load_config(path: &Path) -> Result<LoadedConfig, LoadError> {
    info!("loading {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let vpath = vehicles_path(path);
    let vehicles = match fs::read_to_string(&vpath) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("{} not loaded, no parking information: {}", vpath.display(), e);
            None
        }
    };
    decode_config(&text, vehicles.as_deref())
}

fn join_links(list: &[NodeKey], ids: &HashMap<NodeKey, usize>) -> String {
    let parts: Vec<String> = list
        .iter()
        .filter_map(|k| ids.get(k))
        .map(|id| id.to_string())
        .collect();
    if parts.is_empty() {
        "-1".to_string()
    } else {
        parts.join(",")
    }
}

/// Writes the graph into a copy of `document`.
///
/// Control nodes are not persisted; the remaining nodes are numbered by their position among the
/// persisted ones and links to control nodes are dropped.
pub fn encode_config(document: &XmlDocument, graph: &Graph) -> Result<EncodedConfig, SaveError> {
    let mut doc = document.clone();
    if doc.root.name != ROOT_ELEMENT {
        return Err(SaveError::UnknownConfig {
            root: doc.root.name.clone(),
        });
    }
    let persisted: Vec<&Node> = graph.iter().filter(|n| !n.is_control()).collect();
    if persisted.len() < graph.len() {
        debug!("skipping {} control nodes", graph.len() - persisted.len());
    }
    let ids: HashMap<NodeKey, usize> = persisted
        .iter()
        .enumerate()
        .map(|(i, n)| (n.key(), i + 1))
        .collect();

    let waypoints = doc.root.ensure_descendant("waypoints");
    let join = |f: &dyn Fn(&Node) -> String, sep: &str| -> String {
        persisted.iter().map(|n| f(n)).collect::<Vec<_>>().join(sep)
    };
    waypoints
        .ensure_child("id")
        .set_text((1..=persisted.len()).map(|i| i.to_string()).collect::<Vec<_>>().join(","));
    waypoints.ensure_child("x").set_text(join(&|n| format_coord(n.x()), ","));
    waypoints.ensure_child("y").set_text(join(&|n| format_coord(n.y()), ","));
    waypoints.ensure_child("z").set_text(join(&|n| format_coord(n.z()), ","));
    waypoints
        .ensure_child("out")
        .set_text(join(&|n| join_links(n.outgoing(), &ids), ";"));
    waypoints
        .ensure_child("incoming")
        .set_text(join(&|n| join_links(n.incoming(), &ids), ";"));
    waypoints
        .ensure_child("flags")
        .set_text(join(&|n| n.flag.raw().to_string(), ","));

    let marked: Vec<(&Node, &Marker)> = persisted
        .iter()
        .filter_map(|n| n.marker().map(|m| (*n, m)))
        .collect();
    let mut park_destinations = BTreeMap::new();
    if !marked.is_empty() || doc.root.find("mapmarker").is_some() {
        let block = doc.root.ensure_descendant("mapmarker");
        block.clear_children();
        for (i, (node, marker)) in marked.iter().enumerate() {
            let index = i as u32 + 1;
            let id = ids.get(&node.key()).copied().unwrap_or_default();
            let mm = block.push_element(XmlElement::new(format!("mm{}", index)));
            mm.push_element(XmlElement::with_text("id", id.to_string()));
            mm.push_element(XmlElement::with_text("name", marker.name.clone()));
            mm.push_element(XmlElement::with_text("group", marker.group.clone()));
            for vehicle in &marker.parked_vehicles {
                park_destinations.insert(*vehicle, index);
            }
        }
    }
    debug!("encoded {} nodes, {} markers", persisted.len(), marked.len());

    Ok(EncodedConfig {
        xml: doc.to_xml_string(),
        park_destinations,
    })
}

/// Encodes and writes the config to `path`. Does not touch `vehicles.xml`.
pub fn save_config(path: &Path, document: &XmlDocument, graph: &Graph) -> Result<EncodedConfig, SaveError> {
    let encoded = encode_config(document, graph)?;
    fs::write(path, &encoded.xml).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("saved {} ({} bytes)", path.display(), encoded.xml.len());
    Ok(encoded)
}

/// Updates park destinations in the `vehicles.xml` beside `config`. Returns how many vehicles were
/// written, 0 when there was nothing to do or no file to update.
pub fn save_parking(
    config: &Path,
    era: SchemaEra,
    destinations: &BTreeMap<u32, u32>,
) -> Result<usize, SaveError> {
    if destinations.is_empty() {
        info!("no park destinations defined");
        return Ok(0);
    }
    let vpath = vehicles_path(config);
    if !vpath.is_file() {
        warn!("{} not found, park destinations not saved", vpath.display());
        return Ok(0);
    }
    let text = fs::read_to_string(&vpath).map_err(|source| SaveError::Io {
        path: vpath.clone(),
        source,
    })?;
    let updated = vehicles::update_parking(&text, era, destinations).map_err(|source| SaveError::Xml {
        path: vpath.clone(),
        source,
    })?;
    fs::write(&vpath, updated).map_err(|source| SaveError::Io {
        path: vpath.clone(),
        source,
    })?;
    Ok(destinations.len())
}

/// Re-assigns `marker_index` in save order.
pub fn renumber_markers(graph: &mut Graph) {
    let keys: Vec<NodeKey> = graph
        .iter()
        .filter(|n| !n.is_control() && n.has_marker())
        .map(Node::key)
        .collect();
    for (i, key) in keys.into_iter().enumerate() {
        if let Some(m) = graph.expect_node_mut(key).marker.as_mut() {
            m.marker_index = i as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_era() {
        assert_eq!(ConfigVersion::parse("2.0.0.4").era(), SchemaEra::Fs22);
        assert_eq!(ConfigVersion::parse(" 1.1.0.6 ").era(), SchemaEra::Fs19);
        assert_eq!(ConfigVersion::parse("3.0").era(), SchemaEra::Unknown);
        assert_eq!(ConfigVersion::parse("beta").major, None);
    }

    #[test]
    fn test_entries() {
        assert!(entries("", ',').is_empty());
        assert!(entries("  \n ", ';').is_empty());
        assert_eq!(entries("1, 2,3", ','), vec!["1", "2", "3"]);
        assert_eq!(entries("-1;2,3", ';'), vec!["-1", "2,3"]);
        assert_eq!(entries("1,2,", ','), vec!["1", "2"]);
        assert_eq!(entries("2;3;-1;", ';'), vec!["2", "3", "-1"]);
        assert_eq!(entries("2;;-1", ';'), vec!["2", "", "-1"]);
    }

    #[test]
    fn test_links_reject_dangling() {
        let err = links("<out>", "2;3", 2).unwrap_err();
        assert_eq!(err.code(), "invalid_reference");
        assert_eq!(links("<out>", "2,2;-1", 2).unwrap(), vec![vec![2], vec![]]);
    }

    #[test]
    fn test_vehicles_path_is_sibling() {
        assert_eq!(
            vehicles_path(Path::new("/saves/savegame1/AutoDrive_config.xml")),
            PathBuf::from("/saves/savegame1/vehicles.xml")
        );
    }
}
