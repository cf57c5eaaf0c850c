use std::error::Error;
use std::fmt;

use crate::command::CommandKind;

/// Boxed error a contextual dialogue function may fail with.
pub type FunctionFailure = Box<dyn Error + Send + Sync>;

/// Errors raised by the command-splitting primitive
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum TokenizeError {
    /// An escape literal that isn't followed by another command literal
    #[error("Unknown escape sequence in {0:?}")]
    UnknownEscape(String),
}

/// Why a function call on an exec line could not be read
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExecParseReason {
    TrailingEscape,
    UnknownEscape,
    OpenedTwice,
    Unopened,
    UnexpectedDelimiter,
    Unclosed,
    MissingName,
}

impl fmt::Display for ExecParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::TrailingEscape => "unexpected escape at end of call",
            Self::UnknownEscape => "unknown escape",
            Self::OpenedTwice => "parameter list opened twice",
            Self::Unopened => "parameter list closed before it was opened",
            Self::UnexpectedDelimiter => "parameter delimiter outside of parameter list",
            Self::Unclosed => "parameter list is never closed",
            Self::MissingName => "missing function name",
        };
        f.write_str(message)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
#[error("Unable to parse function {text:?}: {reason}")]
pub struct ExecParseError {
    pub text: String,
    pub reason: ExecParseReason,
}

impl ExecParseError {
    pub(crate) fn new(text: &str, reason: ExecParseReason) -> Self {
        Self {
            text: text.to_owned(),
            reason,
        }
    }
}

/// Errors raised by mutating or querying a [`Graph`](crate::Graph)
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("Node {0:?} already exists")]
    DuplicateNode(String),
    #[error("No node named {0:?} exists")]
    UnknownNode(String),
    #[error("Function {0:?} is already registered")]
    DuplicateFunction(String),
    #[error("No function named {0:?} is registered")]
    UnknownFunction(String),
    #[error("Id {0:?} is already in use")]
    DuplicateId(String),
    #[error("No line carries the id {0:?}")]
    UnknownId(String),
    #[error("Line {id:?} is {found}, not {expected}")]
    TypeMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum ParseErrorKind {
    #[error("Mix of tabs and spaces in indentation")]
    MixedIndentation,
    #[error("Uneven indentation: {count} characters is not a multiple of {width}")]
    UnevenIndentation { count: usize, width: usize },
    #[error("Indentation skips to depth {depth} without a node at the depth above")]
    LayerGap { depth: usize },
    #[error("Node id {0:?} cannot contain commands")]
    NodeIdContainsCommand(String),
    #[error("Ids must come after a line")]
    IdWithoutLine,
    #[error("Unclosed id")]
    UnclosedId,
    #[error("Unopened id")]
    UnopenedId,
    #[error("Option already has the id {0:?}")]
    OptionIdAlreadySet(String),
    #[error("Line must be connected to a node")]
    DisconnectedLine,
    #[error("Too many commands on one line")]
    CommandLimit,
    #[error("Script does not define any nodes")]
    EmptyScript,
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Exec(#[from] ExecParseError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ParseErrorKind {
    /// Attaches a 1-based line number
    pub(crate) fn at(self, line: usize) -> ParseError {
        ParseError {
            line: Some(line),
            kind: self,
        }
    }
}

/// A malformed script. Compilation is all-or-nothing, so no graph is produced.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
#[error("Malformed dialogue{}: {kind}", .line.map(|line| format!(" at line {}", line)).unwrap_or_default())]
pub struct ParseError {
    /// 1-based line the error was detected on, if it belongs to one
    pub line: Option<usize>,
    pub kind: ParseErrorKind,
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        Self { line: None, kind }
    }
}

/// Errors raised while stepping through a [`Sequence`](crate::Sequence)
#[derive(thiserror::Error, Debug)]
pub enum SequenceError {
    #[error("Current node not set, cannot start the sequence")]
    NotConfigured,
    #[error("Sequence has not been started")]
    NotStarted,
    #[error("Cannot continue running dialogue. Still waiting on option selection.")]
    WaitingOnOptionSelection,
    #[error("An option was chosen, but the sequence isn't waiting for a selection")]
    NotWaitingOnOptionSelection,
    #[error("{0} is not a valid option id")]
    InvalidOption(usize),
    #[error("Option {0} is disabled")]
    OptionDisabled(usize),
    #[error("Function {function:?} expected {expected} parameters, but received {actual}")]
    ParameterCountMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("Function {function:?} failed: {source}")]
    FunctionFailed {
        function: String,
        #[source]
        source: FunctionFailure,
    },
    #[error("Traversal from node {node:?} never reached a displayable line")]
    RunawayTraversal { node: String },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors raised by the inline formatting parser. These belong to the renderer
/// boundary, never to graph construction.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum FormatParseError {
    #[error("Ids must begin with the id marker")]
    MissingIdStart,
    #[error("Id must be followed by an opening bracket")]
    MissingFormatStart,
    #[error("Text must be closed with a closing bracket")]
    MissingFormatEnd,
    #[error("Id {0:?} must be one word with no symbols")]
    InvalidId(String),
    #[error("Unfinished id in format")]
    Unfinished,
    #[error("Id {0:?} is used twice")]
    DuplicateId(String),
    #[error("Bounds {start}..{end} do not fit in text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}

/// Errors raised while configuring a [`CommandTable`](crate::CommandTable)
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Command {0:?} cannot have an empty literal")]
    EmptyLiteral(CommandKind),
    #[error("Indentation {0:?} must have a width of at least 1")]
    ZeroIndentWidth(char),
    #[error("Could not read command overrides: {0}")]
    Csv(#[from] csv::Error),
}
