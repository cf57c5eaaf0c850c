use crate::command::Command;
use crate::errors::TokenizeError;

/// Result of splitting a piece of text on its first command.
///
/// The command itself is dropped, everything else (whitespace included) is
/// kept. Escapes are resolved in `before` and `after`; `next` is the raw
/// remainder, starting at the command that ended `after`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub before: String,
    pub after: String,
    pub next: String,
    pub command: Option<Command>,
}

impl Split {
    /// Trims all three buffers, as the parser does after every split.
    pub(crate) fn trimmed(self) -> Self {
        Self {
            before: self.before.trim().to_owned(),
            after: self.after.trim().to_owned(),
            next: self.next.trim().to_owned(),
            command: self.command,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Filling {
    Before,
    After,
}

fn starting_command<'c>(text: &str, commands: &'c [Command]) -> Option<&'c Command> {
    commands
        .iter()
        .find(|command| !command.is_empty() && text.starts_with(command.literal.as_str()))
}

/// Splits `text` on the first command found in `commands`.
///
/// `commands` is expected in priority order, so the first literal that
/// matches at a position wins. `escape` is searched for even when it isn't
/// part of `commands`.
pub fn split_command(
    text: &str,
    escape: &Command,
    commands: &[Command],
) -> Result<Split, TokenizeError> {
    let mut search: Vec<Command> = commands.to_vec();
    if !search.contains(escape) {
        search.push(escape.clone());
        search.sort();
    }

    let mut split = Split::default();
    let mut filling = Filling::Before;
    let mut index = 0;

    while index < text.len() {
        let rest = &text[index..];
        let buffer = match filling {
            Filling::Before => &mut split.before,
            Filling::After => &mut split.after,
        };

        match starting_command(rest, &search) {
            None => {
                let Some(ch) = rest.chars().next() else {
                    break;
                };
                buffer.push(ch);
                index += ch.len_utf8();
            }
            Some(found) if found == escape => {
                let escaped = &rest[escape.len()..];
                let escaped_command = starting_command(escaped, &search)
                    .ok_or_else(|| TokenizeError::UnknownEscape(rest.to_owned()))?;
                buffer.push_str(&escaped_command.literal);
                index += escape.len() + escaped_command.len();
            }
            Some(found) => match filling {
                Filling::Before => {
                    split.command = Some(found.clone());
                    index += found.len();
                    filling = Filling::After;
                }
                Filling::After => {
                    split.next.push_str(rest);
                    break;
                }
            },
        }
    }

    Ok(split)
}
