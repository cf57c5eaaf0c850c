//! Second parsing pass: turns the layered [`ParsedNode`]s into a [`Graph`].

use log::*;

use crate::errors::ParseErrorKind;
use crate::graph::Graph;
use crate::line::{GotoLine, Line};
use crate::parser::{Layers, ParsedNode};

/// The node a finished branch continues with: whatever follows the option
/// block it hangs off. A block that ended its own branch defers outwards.
fn fallthrough<'l>(layers: &'l Layers, node: &ParsedNode) -> Option<&'l str> {
    let mut parent = layers.get(node.parent?)?;
    loop {
        if let Some(next) = parent.continuation {
            return layers.get(next).map(|next| next.key.as_str());
        }
        parent = layers.get(parent.parent?)?;
    }
}

pub(crate) fn compile(layers: &Layers) -> Result<Graph, ParseErrorKind> {
    let root = layers.root().ok_or(ParseErrorKind::EmptyScript)?;
    let mut graph = Graph::new();

    for node in layers.iter() {
        graph.add_node(&node.key)?;
        for line in &node.lines {
            graph.add_line(&node.key, line.clone())?;
        }

        if let Some(options) = &node.options {
            graph.add_line(&node.key, Line::from(options.clone()))?;
        } else if let Some(target) = fallthrough(layers, node) {
            graph.add_line(&node.key, GotoLine::new(target))?;
        }
    }

    graph.set_start(&root.key)?;

    for target in graph.dangling_targets() {
        warn!("Nothing in the dialogue is named {:?}", target);
    }

    Ok(graph)
}
