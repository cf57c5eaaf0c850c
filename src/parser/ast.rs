use std::collections::HashSet;

use log::*;

use crate::errors::{GraphError, ParseErrorKind};
use crate::line::{DialogueOption, Line, OptionLine};

/// Position of a [`ParsedNode`] in its [`Layers`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub depth: usize,
    pub index: usize,
}

#[derive(Debug)]
pub struct ParsedNode {
    pub key: String,
    pub parent: Option<NodeRef>,
    pub depth: usize,
    pub index: usize,
    pub lines: Vec<Line>,
    /// Created by the first option line added to this node, and always
    /// compiled as its last line.
    pub options: Option<OptionLine>,
    /// Where lines after this node's option block went.
    pub continuation: Option<NodeRef>,
}

impl ParsedNode {
    pub fn add_option(&mut self, target: String, text: String) -> usize {
        self.options
            .get_or_insert_with(OptionLine::new)
            .add_option(DialogueOption::new(target, text))
    }
}

/// Every parsed node, grouped by depth in creation order.
#[derive(Debug, Default)]
pub struct Layers {
    layers: Vec<Vec<ParsedNode>>,
    keys: HashSet<String>,
}

impl Layers {
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Appends a node at `depth`. A depth may only be used once the depth
    /// above it holds a node.
    pub fn create(
        &mut self,
        key: String,
        parent: Option<NodeRef>,
        depth: usize,
    ) -> Result<NodeRef, ParseErrorKind> {
        if depth > self.layers.len() {
            return Err(ParseErrorKind::LayerGap { depth });
        }
        if self.keys.contains(&key) {
            return Err(GraphError::DuplicateNode(key).into());
        }
        if depth == self.layers.len() {
            self.layers.push(Vec::new());
        }

        let layer = &mut self.layers[depth];
        let index = layer.len();
        debug!("Creating parsed node {:?} at depth {}", key, depth);
        self.keys.insert(key.clone());
        layer.push(ParsedNode {
            key,
            parent,
            depth,
            index,
            lines: Vec::new(),
            options: None,
            continuation: None,
        });
        Ok(NodeRef { depth, index })
    }

    /// The most recently created node at `depth`.
    pub fn tail(&self, depth: usize) -> Option<NodeRef> {
        let layer = self.layers.get(depth)?;
        let index = layer.len().checked_sub(1)?;
        Some(NodeRef { depth, index })
    }

    pub fn get(&self, node: NodeRef) -> Option<&ParsedNode> {
        self.layers.get(node.depth)?.get(node.index)
    }

    pub fn get_mut(&mut self, node: NodeRef) -> Option<&mut ParsedNode> {
        self.layers.get_mut(node.depth)?.get_mut(node.index)
    }

    /// The first node created at depth 0.
    pub fn root(&self) -> Option<&ParsedNode> {
        self.layers.first()?.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedNode> {
        self.layers.iter().flatten()
    }
}
