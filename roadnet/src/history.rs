use crate::Graph;
use log::{debug, error};
use std::collections::VecDeque;

pub const DEFAULT_DEPTH: usize = 500;

/// A recorded edit that can be inverted and re-applied.
///
/// Implementations capture whatever they need at record time so that `undo` followed by `redo`
/// leaves the graph exactly as it was after the original edit.
pub trait Changeable {
    fn undo(&mut self, graph: &mut Graph);
    fn redo(&mut self, graph: &mut Graph);
    /// Stale flag of the document when the unit was captured; restored on undo.
    fn was_stale(&self) -> bool;
    /// [`Graph::generation`] the unit was recorded against.
    fn generation(&self) -> u64;
    fn label(&self) -> &'static str {
        "change"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("change was recorded against graph generation {recorded}, but generation {live} is loaded")]
    GraphReplaced { recorded: u64, live: u64 },
}

/// Undo/redo stacks. Recording clears the redo stack; the undo stack keeps at most `max_depth`
/// units and drops the oldest beyond that.
pub struct ChangeLog {
    undo: VecDeque<Box<dyn Changeable>>,
    redo: Vec<Box<dyn Changeable>>,
    max_depth: usize,
}

impl Default for ChangeLog {
    fn default() -> Self {
        ChangeLog::new()
    }
}

impl ChangeLog {
    pub fn new() -> Self {
        ChangeLog::with_depth(DEFAULT_DEPTH)
    }

    pub fn with_depth(max_depth: usize) -> Self {
        ChangeLog {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn record(&mut self, unit: impl Changeable + 'static) {
        self.record_boxed(Box::new(unit));
    }

    pub fn record_boxed(&mut self, unit: Box<dyn Changeable>) {
        debug!("record {}", unit.label());
        self.redo.clear();
        self.push_undo(unit);
    }

    fn push_undo(&mut self, unit: Box<dyn Changeable>) {
        self.undo.push_back(unit);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    fn check(&mut self, unit: &dyn Changeable, graph: &Graph) -> Result<(), HistoryError> {
        if unit.generation() == graph.generation() {
            return Ok(());
        }
        error!(
            "refusing to replay {}: recorded against generation {}, live generation is {}",
            unit.label(),
            unit.generation(),
            graph.generation()
        );
        self.clear();
        Err(HistoryError::GraphReplaced {
            recorded: unit.generation(),
            live: graph.generation(),
        })
    }

    /// Reverts the newest unit and restores its captured stale flag into `stale`.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, graph: &mut Graph, stale: &mut bool) -> Result<bool, HistoryError> {
        let mut unit = match self.undo.pop_back() {
            Some(u) => u,
            None => return Ok(false),
        };
        self.check(unit.as_ref(), graph)?;
        debug!("undo {}", unit.label());
        unit.undo(graph);
        *stale = unit.was_stale();
        self.redo.push(unit);
        Ok(true)
    }

    /// Re-applies the most recently undone unit and marks the document stale.
    pub fn redo(&mut self, graph: &mut Graph, stale: &mut bool) -> Result<bool, HistoryError> {
        let mut unit = match self.redo.pop() {
            Some(u) => u,
            None => return Ok(false),
        };
        self.check(unit.as_ref(), graph)?;
        debug!("redo {}", unit.label());
        unit.redo(graph);
        *stale = true;
        self.push_undo(unit);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        value: Rc<Cell<i32>>,
        stale: bool,
        generation: u64,
    }

    impl Changeable for Counter {
        fn undo(&mut self, _graph: &mut Graph) {
            self.value.set(self.value.get() - 1);
        }
        fn redo(&mut self, _graph: &mut Graph) {
            self.value.set(self.value.get() + 1);
        }
        fn was_stale(&self) -> bool {
            self.stale
        }
        fn generation(&self) -> u64 {
            self.generation
        }
    }

    #[test]
    fn test_depth_drops_oldest() {
        let graph = Graph::new();
        let value = Rc::new(Cell::new(0));
        let mut log = ChangeLog::with_depth(2);
        for _ in 0..3 {
            log.record(Counter {
                value: value.clone(),
                stale: false,
                generation: graph.generation(),
            });
        }
        assert_eq!(log.undo_len(), 2);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut graph = Graph::new();
        let value = Rc::new(Cell::new(1));
        let mut stale = true;
        let mut log = ChangeLog::new();
        let unit = |stale| Counter {
            value: value.clone(),
            stale,
            generation: graph.generation(),
        };
        log.record(unit(false));
        let second = unit(true);
        assert_eq!(log.undo(&mut graph, &mut stale), Ok(true));
        assert_eq!(value.get(), 0);
        assert!(!stale);
        assert!(log.can_redo());
        log.record(second);
        assert!(!log.can_redo());
        assert_eq!(log.redo(&mut graph, &mut stale), Ok(false));
    }

    #[test]
    fn test_empty_log_is_noop() {
        let mut graph = Graph::new();
        let mut stale = true;
        let mut log = ChangeLog::new();
        assert_eq!(log.undo(&mut graph, &mut stale), Ok(false));
        assert!(stale);
    }
}
