//! The compiled dialogue graph.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::*;

use crate::errors::GraphError;
use crate::line::{Line, LineKind, LineVariant, OptionLine};

/// A named, ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub lines: Vec<Line>,
}

impl Node {
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineLocation {
    node: String,
    index: usize,
}

/// Nodes keyed by name, plus a global index of line ids.
///
/// The parser builds one of these, but a graph can also be put together by
/// hand with [`add_node`](Self::add_node) and [`add_line`](Self::add_line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: HashMap<String, Node>,
    line_ids: HashMap<String, LineLocation>,
    start: Option<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) -> Result<(), GraphError> {
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_owned()));
        }
        debug!("Adding node {:?}", name);
        self.nodes.insert(name.to_owned(), Node::default());
        Ok(())
    }

    /// Appends `line` to `node` and registers all of its ids.
    ///
    /// Nothing is added if any of the ids is already taken.
    pub fn add_line(&mut self, node: &str, line: impl Into<Line>) -> Result<(), GraphError> {
        let line = line.into();
        let lines = match self.nodes.get_mut(node) {
            Some(node) => &mut node.lines,
            None => return Err(GraphError::UnknownNode(node.to_owned())),
        };

        let ids = line.all_ids();
        {
            let mut seen = HashSet::new();
            if let Some(taken) = ids
                .iter()
                .find(|id| self.line_ids.contains_key(**id) || !seen.insert(**id))
            {
                return Err(GraphError::DuplicateId((*taken).to_owned()));
            }
        }

        let index = lines.len();
        for id in ids {
            self.line_ids.insert(
                id.to_owned(),
                LineLocation {
                    node: node.to_owned(),
                    index,
                },
            );
        }
        lines.push(line);
        Ok(())
    }

    /// The node a sequence starts on when no other node is chosen.
    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn set_start(&mut self, name: &str) -> Result<(), GraphError> {
        if !self.contains_node(name) {
            return Err(GraphError::UnknownNode(name.to_owned()));
        }
        self.start = Some(name.to_owned());
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All node names, sorted.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn line(&self, node: &str, index: usize) -> Option<&Line> {
        self.node(node).and_then(|node| node.line(index))
    }

    fn location(&self, id: &str) -> Result<&LineLocation, GraphError> {
        self.line_ids
            .get(id)
            .ok_or_else(|| GraphError::UnknownId(id.to_owned()))
    }

    pub fn line_by_id(&self, id: &str) -> Result<&Line, GraphError> {
        let location = self.location(id)?;
        self.line(&location.node, location.index)
            .ok_or_else(|| GraphError::UnknownId(id.to_owned()))
    }

    fn line_by_id_mut(&mut self, id: &str) -> Result<&mut Line, GraphError> {
        let LineLocation { node, index } = self.location(id)?.clone();
        self.nodes
            .get_mut(&node)
            .and_then(|node| node.lines.get_mut(index))
            .ok_or_else(|| GraphError::UnknownId(id.to_owned()))
    }

    /// Looks up the line registered under `id`, which must be a `T`.
    pub fn line_with_id<T: LineVariant>(&self, id: &str) -> Result<&T, GraphError> {
        let line = self.line_by_id(id)?;
        T::from_kind(&line.kind).ok_or_else(|| GraphError::TypeMismatch {
            id: id.to_owned(),
            expected: T::NAME,
            found: line.kind.name(),
        })
    }

    pub fn line_with_id_mut<T: LineVariant>(&mut self, id: &str) -> Result<&mut T, GraphError> {
        let line = self.line_by_id_mut(id)?;
        let found = line.kind.name();
        T::from_kind_mut(&mut line.kind).ok_or_else(|| GraphError::TypeMismatch {
            id: id.to_owned(),
            expected: T::NAME,
            found,
        })
    }

    /// Enables or disables the whole line registered under `id`.
    pub fn toggle_line(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        debug!("Toggling line {:?} to {}", id, enabled);
        self.line_by_id_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Enables or disables the single option whose id is `id`.
    pub fn toggle_option(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        debug!("Toggling option {:?} to {}", id, enabled);
        let options = self.line_with_id_mut::<OptionLine>(id)?;
        if options.toggle_option_by_id(id, enabled) {
            Ok(())
        } else {
            Err(GraphError::UnknownId(id.to_owned()))
        }
    }

    fn lines(&self) -> impl Iterator<Item = &Line> {
        self.nodes.values().flat_map(|node| node.lines.iter())
    }

    /// Names of every function an exec line calls.
    pub fn function_names(&self) -> BTreeSet<&str> {
        self.lines()
            .filter_map(|line| match &line.kind {
                LineKind::Exec(exec) => Some(exec.function.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Goto and option targets that don't name a node in this graph.
    pub fn dangling_targets(&self) -> BTreeSet<&str> {
        let mut targets = BTreeSet::new();
        for line in self.lines() {
            match &line.kind {
                LineKind::Goto(goto) => {
                    targets.insert(goto.target.as_str());
                }
                LineKind::Options(options) => {
                    targets.extend(options.options().values().map(|o| o.target.as_str()));
                }
                _ => {}
            }
        }
        targets.retain(|target| !self.contains_node(target));
        targets
    }
}
