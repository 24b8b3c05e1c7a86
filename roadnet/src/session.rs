//! Editing session: the loaded network, its history and the file it came from.

use crate::autosave::{autosave_path, check_writable, AutoSaveGate, AutoSaveSlots, Suspension};
use crate::changes::coordinates::CoordinateChanger;
use crate::changes::markers::MarkerChange;
use crate::changes::structure::{ConnectionChange, FlagChange, NodeCreation, NodeDeletion};
use crate::config::EditorConfig;
use crate::edit;
use crate::error::{LoadError, SaveError};
use crate::history::{ChangeLog, Changeable, HistoryError};
use crate::model::{ConnectionKind, Marker, NodeFlag, NodeKey};
use crate::xml::game::{self, ConfigVersion, LoadedConfig, SchemaEra};
use crate::xml::tree::XmlDocument;
use crate::{Graph, HeightSampler};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

struct OpenConfig {
    path: PathBuf,
    document: XmlDocument,
    version: Option<ConfigVersion>,
    editable: bool,
    has_flags: bool,
}

pub struct Session {
    graph: Graph,
    history: ChangeLog,
    stale: bool,
    map_name: Option<String>,
    config: EditorConfig,
    open: Option<OpenConfig>,
    gate: AutoSaveGate,
    slots: AutoSaveSlots,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(EditorConfig::default())
    }
}

impl Session {
    pub fn new(config: EditorConfig) -> Self {
        Session {
            graph: Graph::new(),
            history: ChangeLog::with_depth(config.undo_depth),
            stale: false,
            map_name: None,
            slots: AutoSaveSlots::new(config.autosave_slots),
            config,
            open: None,
            gate: AutoSaveGate::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct access, e.g. to register listeners or change selection. Edits made through it are
    /// not recorded.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn history(&self) -> &ChangeLog {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Unsaved changes exist.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.open.as_ref().map(|o| o.path.as_path())
    }

    pub fn version(&self) -> Option<&ConfigVersion> {
        self.open.as_ref().and_then(|o| o.version.as_ref())
    }

    pub fn era(&self) -> SchemaEra {
        self.version().map_or(SchemaEra::Unknown, ConfigVersion::era)
    }

    pub fn is_editable(&self) -> bool {
        self.open.as_ref().map_or(false, |o| o.editable)
    }

    /// Whether the loaded file had a `<flags>` element; saving always writes one.
    pub fn had_flags(&self) -> bool {
        self.open.as_ref().map_or(false, |o| o.has_flags)
    }

    pub fn gate(&self) -> AutoSaveGate {
        self.gate.clone()
    }

    /// Blocks auto-save until the returned guard is dropped; hold it across multi-step edits.
    pub fn suspend_autosave(&self) -> Suspension {
        self.gate.suspend()
    }

    /// Loads `path`. On failure the current network and history are left untouched.
    pub fn open(&mut self, path: &Path) -> Result<(), LoadError> {
        let loaded = game::load_config(path)?;
        self.install(path.to_path_buf(), loaded);
        Ok(())
    }

    fn install(&mut self, path: PathBuf, loaded: LoadedConfig) {
        let LoadedConfig {
            graph,
            document,
            version,
            map_name,
            editable,
            has_flags,
        } = loaded;
        self.graph.replace_all(graph);
        self.history = ChangeLog::with_depth(self.config.undo_depth);
        self.stale = false;
        self.map_name = map_name;
        self.slots = AutoSaveSlots::new(self.config.autosave_slots);
        self.open = Some(OpenConfig {
            path,
            document,
            version,
            editable,
            has_flags,
        });
    }

    pub fn save(&mut self) -> Result<(), SaveError> {
        let path = match &self.open {
            Some(o) => o.path.clone(),
            None => return Err(SaveError::NoConfigLoaded),
        };
        self.save_regular(&path)
    }

    /// Saves to `path` and makes it the session's file from then on.
    pub fn save_as(&mut self, path: &Path) -> Result<(), SaveError> {
        self.save_regular(path)?;
        if let Some(open) = self.open.as_mut() {
            open.path = path.to_path_buf();
        }
        Ok(())
    }

    fn save_regular(&mut self, path: &Path) -> Result<(), SaveError> {
        let open = self.open.as_ref().ok_or(SaveError::NoConfigLoaded)?;
        if !open.editable {
            return Err(SaveError::ReadOnlyConfig);
        }
        check_writable(path)?;
        let era = open.version.as_ref().map_or(SchemaEra::Unknown, ConfigVersion::era);
        let encoded = game::save_config(path, &open.document, &self.graph)?;
        game::save_parking(path, era, &encoded.park_destinations)?;
        game::renumber_markers(&mut self.graph);
        self.stale = false;
        Ok(())
    }

    /// Writes the network to the next auto-save slot. `vehicles.xml` and the stale flag are not
    /// touched.
    pub fn autosave(&mut self) -> Result<PathBuf, SaveError> {
        if self.gate.is_suspended() {
            return Err(SaveError::AutoSaveSuspended);
        }
        let open = self.open.as_ref().ok_or(SaveError::NoConfigLoaded)?;
        if !open.editable {
            return Err(SaveError::ReadOnlyConfig);
        }
        let target = autosave_path(&open.path, self.slots.peek());
        check_writable(&target)?;
        game::save_config(&target, &open.document, &self.graph)?;
        self.slots.advance();
        info!("auto-saved to {}", target.display());
        Ok(target)
    }

    /// [`Session::autosave`], retrying suspensions and unwritable targets after a fixed backoff.
    /// The slot only advances once a copy was written.
    pub fn autosave_with_retry(&mut self) -> Result<PathBuf, SaveError> {
        let backoff = Duration::from_secs(self.config.autosave_backoff_secs);
        let attempts = self.config.autosave_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.autosave() {
                Err(e) if attempt < attempts && e.is_retryable() => {
                    warn!(
                        "auto-save attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, attempts, e, backoff
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub fn undo(&mut self) -> Result<bool, HistoryError> {
        self.history.undo(&mut self.graph, &mut self.stale)
    }

    pub fn redo(&mut self) -> Result<bool, HistoryError> {
        self.history.redo(&mut self.graph, &mut self.stale)
    }

    /// Records an edit that was already applied to the graph and marks the document stale.
    pub fn record(&mut self, unit: impl Changeable + 'static) {
        self.history.record(unit);
        self.stale = true;
    }

    pub fn create_node(&mut self, x: f64, z: f64, flag: NodeFlag, heights: &dyn HeightSampler) -> NodeKey {
        let key = self.graph.create_node(x, z, flag, false, false, heights);
        let unit = NodeCreation::new(&self.graph, key, self.stale);
        self.record(unit);
        key
    }

    pub fn delete_nodes(&mut self, keys: &[NodeKey]) -> usize {
        let unit = NodeDeletion::apply(&mut self.graph, keys, self.stale);
        let removed = unit.keys().len();
        if removed > 0 {
            self.record(unit);
        }
        removed
    }

    pub fn set_flag(&mut self, keys: &[NodeKey], flag: NodeFlag) {
        if keys.is_empty() {
            return;
        }
        let unit = FlagChange::apply(&mut self.graph, keys, flag, self.stale);
        self.record(unit);
    }

    pub fn connect(&mut self, a: NodeKey, b: NodeKey, kind: ConnectionKind) {
        let unit = ConnectionChange::apply(&mut self.graph, a, b, Some(kind), self.stale);
        self.record(unit);
    }

    pub fn disconnect(&mut self, a: NodeKey, b: NodeKey) {
        let unit = ConnectionChange::apply(&mut self.graph, a, b, None, self.stale);
        self.record(unit);
    }

    /// `None` removes the marker.
    pub fn set_marker(&mut self, key: NodeKey, marker: Option<Marker>) {
        let unit = MarkerChange::apply(&mut self.graph, key, marker, self.stale);
        self.record(unit);
    }

    /// Returns `false` when the node has no marker to park at.
    pub fn set_parked_vehicles(&mut self, key: NodeKey, vehicles: Vec<u32>) -> bool {
        let mut marker = match self.graph.node(key).and_then(|n| n.marker()) {
            Some(m) => m.clone(),
            None => return false,
        };
        marker.parked_vehicles = vehicles;
        self.set_marker(key, Some(marker));
        true
    }

    pub fn set_coordinates(&mut self, key: NodeKey, x: f64, y: f64, z: f64) {
        let unit = CoordinateChanger::single(&mut self.graph, self.stale, key, x, y, z);
        self.record(unit);
    }

    /// Commits a drag; returns how many nodes moved.
    pub fn move_nodes(&mut self, keys: &[NodeKey], dx: f64, dz: f64) -> usize {
        let changer = edit::move_nodes(&mut self.graph, self.stale, keys, dx, dz, self.config.map_half_extent);
        let moved = changer.len();
        if moved > 0 {
            self.record(changer);
        }
        moved
    }

    pub fn fix_out_of_bounds(&mut self) -> usize {
        let half = self.config.map_half_extent;
        match edit::fix_out_of_bounds(&mut self.graph, self.stale, half, half) {
            Some(changer) => {
                let moved = changer.len();
                self.record(changer);
                moved
            }
            None => 0,
        }
    }
}
