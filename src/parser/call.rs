use crate::command::{Command, CommandKind};
use crate::errors::{ExecParseError, ExecParseReason};

fn starting_part<'c>(text: &str, parts: &'c [Command]) -> Option<&'c Command> {
    parts
        .iter()
        .find(|part| !part.is_empty() && text.starts_with(part.literal.as_str()))
}

fn push_param(params: &mut Vec<String>, buffer: &mut String) {
    let param = buffer.trim();
    if !param.is_empty() {
        params.push(param.to_owned());
    }
    buffer.clear();
}

/// Reads `name(param, param, ...)` from the text of an exec line.
///
/// Every delimiter in `parts` can be escaped. Empty parameters are dropped
/// and anything after the closing delimiter is ignored. A bare `name` is a
/// call without parameters.
pub fn parse_call(text: &str, parts: &[Command]) -> Result<(String, Vec<String>), ExecParseError> {
    let fail = |reason| ExecParseError::new(text, reason);

    let mut buffer = String::new();
    let mut name: Option<String> = None;
    let mut params = Vec::new();
    let mut closed = false;
    let mut index = 0;

    while index < text.len() {
        let rest = &text[index..];
        let part = match starting_part(rest, parts) {
            Some(part) => part,
            None => {
                let Some(ch) = rest.chars().next() else {
                    break;
                };
                buffer.push(ch);
                index += ch.len_utf8();
                continue;
            }
        };

        match part.kind {
            CommandKind::Escape => {
                let escaped = &rest[part.len()..];
                if escaped.is_empty() {
                    return Err(fail(ExecParseReason::TrailingEscape));
                }
                let escaped = starting_part(escaped, parts)
                    .ok_or_else(|| fail(ExecParseReason::UnknownEscape))?;
                buffer.push_str(&escaped.literal);
                index += part.len() + escaped.len();
                continue;
            }
            CommandKind::FunctionStart => {
                if name.is_some() {
                    return Err(fail(ExecParseReason::OpenedTwice));
                }
                name = Some(buffer.trim().to_owned());
                buffer.clear();
            }
            CommandKind::FunctionEnd => {
                if name.is_none() {
                    return Err(fail(ExecParseReason::Unopened));
                }
                push_param(&mut params, &mut buffer);
                closed = true;
                break;
            }
            CommandKind::ParamDelim => {
                if name.is_none() {
                    return Err(fail(ExecParseReason::UnexpectedDelimiter));
                }
                push_param(&mut params, &mut buffer);
            }
            _ => buffer.push_str(&part.literal),
        }
        index += part.len();
    }

    let name = match name {
        Some(_) if !closed => return Err(fail(ExecParseReason::Unclosed)),
        Some(name) => name,
        None => buffer.trim().to_owned(),
    };
    if name.is_empty() {
        return Err(fail(ExecParseReason::MissingName));
    }

    Ok((name, params))
}
