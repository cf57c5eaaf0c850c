//! The command table: every literal the tokenizer recognises, and the
//! indentation units the parser measures depth with.

use std::cmp::Ordering;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Dialogue,
    Option,
    NodeStart,
    NodeEnd,
    Exec,
    Goto,
    Comment,
    Escape,
    IdStart,
    IdEnd,
    FunctionStart,
    FunctionEnd,
    ParamDelim,
    FormatStart,
    FormatEnd,
}

/// A literal in the script text together with what it means.
///
/// Commands order by priority: a longer literal sorts first, ties are
/// broken by comparing the literals (and finally the kinds).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    pub kind: CommandKind,
    pub literal: String,
}

impl Command {
    pub fn new(kind: CommandKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.literal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literal.is_empty()
    }
}

impl Ord for Command {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .literal
            .chars()
            .count()
            .cmp(&self.literal.chars().count())
            .then_with(|| self.literal.cmp(&other.literal))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for Command {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A leading run of `ch` counts one level of depth per `width` characters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Indentation {
    pub ch: char,
    pub width: usize,
}

impl Indentation {
    pub const fn new(ch: char, width: usize) -> Self {
        Self { ch, width }
    }
}

/// One row of an overrides file.
#[derive(Debug, Deserialize)]
struct CommandRecord {
    kind: CommandKind,
    literal: String,
}

fn default_commands() -> Vec<Command> {
    use CommandKind::*;

    vec![
        Command::new(Dialogue, ":"),
        Command::new(Option, "->"),
        Command::new(NodeStart, "-"),
        Command::new(NodeEnd, "--"),
        Command::new(Exec, ">"),
        Command::new(Goto, "|"),
        Command::new(Comment, "#"),
        Command::new(Escape, "\\"),
        Command::new(IdStart, "["),
        Command::new(IdEnd, "]"),
    ]
}

fn default_function_parts() -> Vec<Command> {
    use CommandKind::*;

    vec![
        Command::new(Escape, "\\"),
        Command::new(FunctionStart, "("),
        Command::new(FunctionEnd, ")"),
        Command::new(ParamDelim, ","),
    ]
}

fn default_format_parts() -> Vec<Command> {
    use CommandKind::*;

    vec![
        Command::new(Escape, "\\"),
        Command::new(IdStart, "$"),
        Command::new(FormatStart, "("),
        Command::new(FormatEnd, ")"),
    ]
}

/// Configuration shared by the parser, the tokenizer and the format parser.
///
/// Nothing here is global: every compilation takes the table it should use,
/// so differently configured compilations don't interfere.
#[derive(Debug, Clone)]
pub struct CommandTable {
    base: Vec<Command>,
    overrides: Vec<Command>,
    function_parts: Vec<Command>,
    format_parts: Vec<Command>,
    indentations: Vec<Indentation>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            base: default_commands(),
            overrides: Vec::new(),
            function_parts: default_function_parts(),
            format_parts: default_format_parts(),
            indentations: vec![Indentation::new(' ', 4), Indentation::new('\t', 1)],
        }
    }
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the literal used for `command.kind` in the main table.
    pub fn define(&mut self, command: Command) -> Result<(), ConfigError> {
        if command.is_empty() {
            return Err(ConfigError::EmptyLiteral(command.kind));
        }

        self.overrides.retain(|existing| existing.kind != command.kind);
        self.overrides.push(command);
        Ok(())
    }

    /// Reads `kind,literal` rows and defines each of them in order.
    pub fn load_overrides<R: io::Read>(&mut self, reader: R) -> Result<(), ConfigError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        for record in csv_reader.deserialize() {
            let record: CommandRecord = record?;
            self.define(Command::new(record.kind, record.literal))?;
        }
        Ok(())
    }

    pub fn from_overrides_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(csv::Error::from)?;
        let mut table = Self::default();
        table.load_overrides(file)?;
        Ok(table)
    }

    /// The main table with overrides applied, sorted by priority.
    pub fn ordered(&self) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .base
            .iter()
            .filter(|command| !self.overrides.iter().any(|o| o.kind == command.kind))
            .chain(self.overrides.iter())
            .cloned()
            .collect();
        commands.sort();
        commands
    }

    pub fn command(&self, kind: CommandKind) -> Option<Command> {
        self.overrides
            .iter()
            .chain(self.base.iter())
            .find(|command| command.kind == kind)
            .cloned()
    }

    pub fn escape(&self) -> Command {
        self.command(CommandKind::Escape)
            .unwrap_or_else(|| Command::new(CommandKind::Escape, "\\"))
    }

    pub fn function_parts(&self) -> &[Command] {
        &self.function_parts
    }

    pub fn format_parts(&self) -> &[Command] {
        &self.format_parts
    }

    pub fn indentations(&self) -> &[Indentation] {
        &self.indentations
    }

    pub fn set_indentations(&mut self, indentations: Vec<Indentation>) -> Result<(), ConfigError> {
        if let Some(zero) = indentations.iter().find(|indent| indent.width == 0) {
            return Err(ConfigError::ZeroIndentWidth(zero.ch));
        }
        self.indentations = indentations;
        Ok(())
    }
}
