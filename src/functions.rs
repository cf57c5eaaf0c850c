//! Functions that exec lines can call.

use std::collections::HashMap;
use std::fmt;

use log::*;

use crate::errors::{FunctionFailure, GraphError, SequenceError};
use crate::graph::Graph;
use crate::line::Line;

pub type PlainFunction = dyn FnMut(&[String]);
pub type ContextualFunction =
    dyn FnMut(&mut FunctionContext<'_>, &[String]) -> Result<(), FunctionFailure>;

/// How many parameters a function accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Any number of parameters
    Variadic,
}

pub enum DialogueFunction {
    Plain(Box<PlainFunction>),
    Contextual(Box<ContextualFunction>),
}

impl DialogueFunction {
    pub fn call(
        &mut self,
        context: &mut FunctionContext<'_>,
        params: &[String],
    ) -> Result<(), FunctionFailure> {
        match self {
            Self::Plain(func) => {
                (func)(params);
                Ok(())
            }
            Self::Contextual(func) => (func)(context, params),
        }
    }
}

impl fmt::Debug for DialogueFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain(..)"),
            Self::Contextual(_) => f.write_str("Contextual(..)"),
        }
    }
}

#[derive(Debug)]
pub struct FunctionInfo {
    arity: Arity,
    func: DialogueFunction,
}

impl FunctionInfo {
    pub fn new<F>(arity: Arity, func: F) -> Self
    where
        F: FnMut(&[String]) + 'static,
    {
        Self {
            arity,
            func: DialogueFunction::Plain(Box::new(func)),
        }
    }

    /// A function that can toggle and look up lines while it runs.
    pub fn new_contextual<F>(arity: Arity, func: F) -> Self
    where
        F: FnMut(&mut FunctionContext<'_>, &[String]) -> Result<(), FunctionFailure> + 'static,
    {
        Self {
            arity,
            func: DialogueFunction::Contextual(Box::new(func)),
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }
}

/// What a contextual function can see of the sequence calling it.
///
/// The graph can be toggled and queried, but the cursor can't be moved from
/// inside a function.
pub struct FunctionContext<'a> {
    graph: &'a mut Graph,
    current_node: Option<&'a str>,
}

impl<'a> FunctionContext<'a> {
    pub fn new(graph: &'a mut Graph, current_node: Option<&'a str>) -> Self {
        Self {
            graph,
            current_node,
        }
    }

    /// The node holding the exec line being run.
    pub fn current_node(&self) -> Option<&str> {
        self.current_node
    }

    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    pub fn line_by_id(&self, id: &str) -> Result<&Line, GraphError> {
        self.graph.line_by_id(id)
    }

    pub fn toggle_line(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        self.graph.toggle_line(id, enabled)
    }

    pub fn toggle_option(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        self.graph.toggle_option(id, enabled)
    }
}

/// The named functions a sequence can call.
#[derive(Debug, Default)]
pub struct Library {
    functions: HashMap<String, FunctionInfo>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function, failing if the name is taken.
    pub fn register(&mut self, name: &str, info: FunctionInfo) -> Result<(), GraphError> {
        if self.functions.contains_key(name) {
            return Err(GraphError::DuplicateFunction(name.to_owned()));
        }
        self.functions.insert(name.to_owned(), info);
        Ok(())
    }

    /// Adds or replaces a function, returning the one it replaced.
    pub fn upsert(&mut self, name: &str, info: FunctionInfo) -> Option<FunctionInfo> {
        self.functions.insert(name.to_owned(), info)
    }

    pub fn remove(&mut self, name: &str) -> Option<FunctionInfo> {
        self.functions.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn invoke(
        &mut self,
        name: &str,
        params: &[String],
        context: &mut FunctionContext<'_>,
    ) -> Result<(), SequenceError> {
        let function = self
            .functions
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownFunction(name.to_owned()))?;

        if let Arity::Exact(expected) = function.arity {
            if expected != params.len() {
                return Err(SequenceError::ParameterCountMismatch {
                    function: name.to_owned(),
                    expected,
                    actual: params.len(),
                });
            }
        }

        debug!("Calling {}({:?})", name, params);
        function
            .func
            .call(context, params)
            .map_err(|source| SequenceError::FunctionFailed {
                function: name.to_owned(),
                source,
            })
    }
}
