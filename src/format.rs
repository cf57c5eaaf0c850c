//! Inline formatting: `$id(text)` marks a span of a line for a renderer.
//!
//! This runs on line text after it leaves a [`Sequence`](crate::Sequence) and
//! plays no part in compiling or running dialogue.
//!
//! ```
//! use palaver::{parse_format, CommandTable};
//!
//! let formatted = parse_format("Hello $shake(World)!", &CommandTable::default()).unwrap();
//! assert_eq!(formatted.text(), "Hello World!");
//! assert_eq!(formatted.span("shake"), Some("World"));
//! ```

use std::collections::BTreeMap;
use std::ops::Range;

use crate::command::{CommandKind, CommandTable};
use crate::errors::FormatParseError;
use crate::parser::split_command;

/// Text with named byte ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifiedString {
    text: String,
    bounds: BTreeMap<String, Range<usize>>,
}

impl IdentifiedString {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounds: BTreeMap::new(),
        }
    }

    /// Names the byte range `range` of the text.
    pub fn add_bounds(&mut self, id: &str, range: Range<usize>) -> Result<(), FormatParseError> {
        if range.start > range.end
            || range.end > self.text.len()
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            return Err(FormatParseError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.text.len(),
            });
        }
        if self.bounds.contains_key(id) {
            return Err(FormatParseError::DuplicateId(id.to_owned()));
        }

        self.bounds.insert(id.to_owned(), range);
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bounds(&self, id: &str) -> Option<Range<usize>> {
        self.bounds.get(id).cloned()
    }

    pub fn span(&self, id: &str) -> Option<&str> {
        self.text.get(self.bounds(id)?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bounds.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.bounds.keys().map(String::as_str)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Expecting {
    Marker,
    Open,
    Close,
}

fn is_single_word(id: &str) -> bool {
    !id.is_empty() && id.chars().all(char::is_alphanumeric)
}

/// Strips the markup from `text`, recording where each marked span ended up.
pub fn parse_format(text: &str, table: &CommandTable) -> Result<IdentifiedString, FormatParseError> {
    let mut commands = table.format_parts().to_vec();
    commands.sort();
    let escape = commands
        .iter()
        .find(|command| command.kind == CommandKind::Escape)
        .cloned()
        .unwrap_or_else(|| table.escape());

    let mut output = String::with_capacity(text.len());
    let mut spans = Vec::new();
    let mut expecting = Expecting::Marker;
    let mut start = 0;
    let mut rest = text.to_owned();

    while !rest.is_empty() {
        let split = split_command(&rest, &escape, &commands)?;
        let command = match split.command {
            Some(command) => command,
            None => {
                output.push_str(&split.before);
                break;
            }
        };

        match expecting {
            Expecting::Marker => {
                if command.kind != CommandKind::IdStart {
                    return Err(FormatParseError::MissingIdStart);
                }
                output.push_str(&split.before);
                start = output.len();
                rest = split.after + &split.next;
                expecting = Expecting::Open;
            }
            Expecting::Open => {
                if command.kind != CommandKind::FormatStart {
                    return Err(FormatParseError::MissingFormatStart);
                }
                let id = split.before.trim();
                if !is_single_word(id) {
                    return Err(FormatParseError::InvalidId(id.to_owned()));
                }
                output.push_str(&split.after);
                spans.push((id.to_owned(), start..output.len()));
                rest = split.next;
                expecting = Expecting::Close;
            }
            Expecting::Close => {
                if command.kind != CommandKind::FormatEnd {
                    return Err(FormatParseError::MissingFormatEnd);
                }
                // the closing literal is the first thing left
                rest = rest.get(command.len()..).unwrap_or_default().to_owned();
                expecting = Expecting::Marker;
            }
        }
    }

    if expecting != Expecting::Marker {
        return Err(FormatParseError::Unfinished);
    }

    let mut identified = IdentifiedString::new(output);
    for (id, range) in spans {
        identified.add_bounds(&id, range)?;
    }
    Ok(identified)
}
