//! A compiler and runtime for an indentation-structured dialogue scripting
//! language.
//!
//! Scripts are compiled into a [`Graph`] of named nodes by a [`Parser`], then
//! stepped through by a [`Sequence`]:
//!
//! ```
//! use palaver::{parse_str, Sequence, SuspendReason};
//!
//! let graph = parse_str("- Start\nTom: Hello!\n-> Hi\n    You: Hi Tom.").unwrap();
//! let mut sequence = Sequence::new(graph);
//!
//! match sequence.start().unwrap() {
//!     SuspendReason::Line(line) => assert_eq!(line.text, "Hello!"),
//!     other => panic!("{:?}", other),
//! }
//! assert!(matches!(sequence.continue_dialogue().unwrap(), SuspendReason::Options(_)));
//! assert!(matches!(sequence.select_option(0).unwrap(), SuspendReason::Line(_)));
//! assert_eq!(sequence.continue_dialogue().unwrap(), SuspendReason::DialogueComplete);
//! ```

use log::*;

pub use crate::{
    command::{Command, CommandKind, CommandTable, Indentation},
    errors::*,
    format::{parse_format, IdentifiedString},
    functions::{
        Arity, ContextualFunction, DialogueFunction, FunctionContext, FunctionInfo, Library,
        PlainFunction,
    },
    graph::{Graph, Node},
    line::{
        DialogueLine, DialogueOption, ExecLine, GotoLine, Line, LineKind, LineVariant, OptionLine,
    },
    parser::{parse_str, Parser},
    reader::DialogueReader,
};

mod command;
mod compiler;
mod errors;
pub mod format;
mod functions;
mod graph;
mod line;
pub mod parser;
mod reader;

/// Functional lines a single advance may run through before giving up.
const MAX_FUNCTIONAL_STEPS: usize = 100_000;

/// Why a [`Sequence`] stopped advancing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspendReason {
    /// Waiting for [`Sequence::continue_dialogue`]
    Line(DialogueLine),
    /// Waiting for [`Sequence::select_option`] or [`Sequence::choose`]
    Options(OptionLine),
    DialogueComplete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Stopped,
    WaitingOnOptionSelection,
    Suspended,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    node: String,
    index: usize,
}

impl Cursor {
    fn new(node: impl Into<String>, index: usize) -> Self {
        Self {
            node: node.into(),
            index,
        }
    }
}

/// What the line under the cursor asks the sequence to do next.
enum Step {
    Line(DialogueLine),
    Options(OptionLine),
    Skip,
    Jump(String),
    Call(ExecLine),
    End,
}

/// Walks a [`Graph`] one displayable line at a time.
///
/// Goto and exec lines are run as the sequence advances and are never
/// returned to the caller; disabled lines are passed over. If advancing fails
/// (a missing node, an unknown or failing function) the cursor is left where
/// it was before the call, so the caller can fix things up and try again.
pub struct Sequence {
    graph: Graph,
    library: Library,
    cursor: Option<Cursor>,
    execution_state: ExecutionState,
}

impl Sequence {
    pub fn new(graph: Graph) -> Self {
        Self::with_library(graph, Library::new())
    }

    /// Creates a sequence positioned on the graph's start node.
    pub fn with_library(graph: Graph, library: Library) -> Self {
        let cursor = graph.start().map(|start| Cursor::new(start, 0));
        Self {
            graph,
            library,
            cursor,
            execution_state: ExecutionState::Stopped,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn execution_state(&self) -> ExecutionState {
        self.execution_state
    }

    pub fn current_node(&self) -> Option<&str> {
        self.cursor.as_ref().map(|cursor| cursor.node.as_str())
    }

    /// The line under the cursor, if there is one.
    pub fn current_line(&self) -> Option<&Line> {
        let cursor = self.cursor.as_ref()?;
        self.graph.line(&cursor.node, cursor.index)
    }

    /// Moves the cursor and stops the sequence; call [`start`](Self::start)
    /// to run from the new position.
    pub fn set_current_node(&mut self, name: &str, index: usize) -> Result<(), SequenceError> {
        if !self.graph.contains_node(name) {
            return Err(GraphError::UnknownNode(name.to_owned()).into());
        }
        debug!("Setting current node to {:?} at line {}", name, index);
        self.cursor = Some(Cursor::new(name, index));
        self.execution_state = ExecutionState::Stopped;
        Ok(())
    }

    /// Runs from the cursor to the first displayable line.
    pub fn start(&mut self) -> Result<SuspendReason, SequenceError> {
        let cursor = self.cursor.as_ref().ok_or(SequenceError::NotConfigured)?;
        if !self.graph.contains_node(&cursor.node) {
            return Err(GraphError::UnknownNode(cursor.node.clone()).into());
        }
        debug!("Starting sequence at {:?}", cursor.node);
        self.advance(None)
    }

    /// Dismisses the current dialogue line.
    pub fn continue_dialogue(&mut self) -> Result<SuspendReason, SequenceError> {
        match self.execution_state {
            ExecutionState::Stopped => Err(SequenceError::NotStarted),
            ExecutionState::WaitingOnOptionSelection => {
                Err(SequenceError::WaitingOnOptionSelection)
            }
            ExecutionState::Ended => Ok(SuspendReason::DialogueComplete),
            ExecutionState::Suspended => {
                let next = self
                    .cursor
                    .as_ref()
                    .map(|cursor| Cursor::new(cursor.node.clone(), cursor.index + 1));
                self.advance(next)
            }
        }
    }

    /// Resumes from the current options by jumping to `target`.
    pub fn choose(&mut self, target: &str) -> Result<SuspendReason, SequenceError> {
        if self.execution_state != ExecutionState::WaitingOnOptionSelection {
            return Err(SequenceError::NotWaitingOnOptionSelection);
        }
        if !self.graph.contains_node(target) {
            return Err(GraphError::UnknownNode(target.to_owned()).into());
        }
        debug!("Choosing node {:?}", target);
        self.advance(Some(Cursor::new(target, 0)))
    }

    /// Resumes from the current options with the option numbered `id`.
    pub fn select_option(&mut self, id: usize) -> Result<SuspendReason, SequenceError> {
        if self.execution_state != ExecutionState::WaitingOnOptionSelection {
            return Err(SequenceError::NotWaitingOnOptionSelection);
        }
        let options = match self.current_line().map(|line| &line.kind) {
            Some(LineKind::Options(options)) => options,
            _ => return Err(SequenceError::NotWaitingOnOptionSelection),
        };
        let option = options.option(id).ok_or(SequenceError::InvalidOption(id))?;
        if !option.enabled {
            return Err(SequenceError::OptionDisabled(id));
        }

        let target = option.target.clone();
        debug!("Selected option: {}", id);
        self.choose(&target)
    }

    pub fn register_function(&mut self, name: &str, info: FunctionInfo) -> Result<(), GraphError> {
        self.library.register(name, info)
    }

    pub fn upsert_function(&mut self, name: &str, info: FunctionInfo) {
        self.library.upsert(name, info);
    }

    /// Returns false if there was no such function.
    pub fn remove_function(&mut self, name: &str) -> bool {
        self.library.remove(name).is_some()
    }

    pub fn invoke_function(&mut self, name: &str, params: &[String]) -> Result<(), SequenceError> {
        let current_node = self.cursor.as_ref().map(|cursor| cursor.node.as_str());
        let mut context = FunctionContext::new(&mut self.graph, current_node);
        self.library.invoke(name, params, &mut context)
    }

    pub fn toggle_line(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        self.graph.toggle_line(id, enabled)
    }

    pub fn toggle_option(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        self.graph.toggle_option(id, enabled)
    }

    pub fn line_with_id<T: LineVariant>(&self, id: &str) -> Result<&T, GraphError> {
        self.graph.line_with_id(id)
    }

    fn advance(&mut self, next: Option<Cursor>) -> Result<SuspendReason, SequenceError> {
        let checkpoint = (self.cursor.clone(), self.execution_state);
        if let Some(next) = next {
            self.cursor = Some(next);
        }

        let result = self.advance_to_visible();
        if result.is_err() {
            (self.cursor, self.execution_state) = checkpoint;
        }
        result
    }

    fn step(&self) -> Result<Step, SequenceError> {
        let cursor = self.cursor.as_ref().ok_or(SequenceError::NotConfigured)?;
        let node = self
            .graph
            .node(&cursor.node)
            .ok_or_else(|| GraphError::UnknownNode(cursor.node.clone()))?;

        let line = match node.line(cursor.index) {
            Some(line) => line,
            None => return Ok(Step::End),
        };
        if !line.enabled {
            return Ok(Step::Skip);
        }

        Ok(match &line.kind {
            LineKind::Dialogue(dialogue) => Step::Line(dialogue.clone()),
            LineKind::Options(options) => Step::Options(options.clone()),
            LineKind::Goto(goto) => Step::Jump(goto.target.clone()),
            LineKind::Exec(exec) => Step::Call(exec.clone()),
        })
    }

    fn next_line(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.index += 1;
        }
    }

    fn advance_to_visible(&mut self) -> Result<SuspendReason, SequenceError> {
        for _ in 0..MAX_FUNCTIONAL_STEPS {
            match self.step()? {
                Step::Line(line) => {
                    self.execution_state = ExecutionState::Suspended;
                    return Ok(SuspendReason::Line(line));
                }
                Step::Options(options) => {
                    self.execution_state = ExecutionState::WaitingOnOptionSelection;
                    return Ok(SuspendReason::Options(options));
                }
                Step::End => {
                    debug!("Dialogue complete");
                    self.execution_state = ExecutionState::Ended;
                    return Ok(SuspendReason::DialogueComplete);
                }
                Step::Skip => self.next_line(),
                Step::Jump(target) => {
                    debug!("Going to node {:?}", target);
                    self.cursor = Some(Cursor::new(target, 0));
                }
                Step::Call(exec) => {
                    self.invoke_function(&exec.function, &exec.params)?;
                    self.next_line();
                }
            }
        }

        Err(SequenceError::RunawayTraversal {
            node: self.current_node().unwrap_or_default().to_owned(),
        })
    }
}
