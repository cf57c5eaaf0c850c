//! Turns dialogue scripts into a [`Graph`].
//!
//! Parsing happens in two passes. The first reads the script line by line
//! and sorts everything it finds into [`ParsedNode`]s, one layer per
//! indentation depth. The second (see [`compiler`](crate::compiler))
//! materializes those layers into graph nodes.

use std::collections::HashSet;

use log::*;

use crate::command::{Command, CommandKind, CommandTable};
use crate::compiler;
use crate::errors::{GraphError, ParseError, ParseErrorKind};
use crate::graph::Graph;
use crate::line::{DialogueLine, ExecLine, GotoLine, Line};

mod ast;
mod call;
mod indent;
mod lexer;

pub(crate) use self::ast::{Layers, NodeRef, ParsedNode};
pub use self::call::parse_call;
pub use self::indent::measure;
pub use self::lexer::{split_command, Split};

/// Commands handled on a single physical line before giving up.
const COMMAND_LIMIT: usize = 1000;

/// Where the last line created on the current physical line lives, so a
/// following id can be attached to it.
#[derive(Debug, Copy, Clone)]
enum Created {
    Line(NodeRef, usize),
    Option(NodeRef, usize),
}

/// Compiles scripts using the commands of one [`CommandTable`].
///
/// ```
/// use palaver::{CommandTable, Parser};
///
/// let table = CommandTable::default();
/// let graph = Parser::new(&table).parse("- Start\nTom: Hello!").unwrap();
/// assert_eq!(graph.start(), Some("Start"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Parser<'t> {
    table: &'t CommandTable,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t CommandTable) -> Self {
        Self { table }
    }

    pub fn parse(&self, input: &str) -> Result<Graph, ParseError> {
        let mut state = ParseState::new(self.table);

        for (index, line) in input.split('\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let number = index + 1;
            state
                .parse_line(line, number)
                .map_err(|kind| kind.at(number))?;
        }

        Ok(compiler::compile(&state.layers)?)
    }
}

/// Compiles `input` with the default command table.
pub fn parse_str(input: &str) -> Result<Graph, ParseError> {
    Parser::new(&CommandTable::default()).parse(input)
}

struct ParseState<'t> {
    table: &'t CommandTable,
    commands: Vec<Command>,
    escape: Command,
    layers: Layers,
    /// Depths whose next ordinary line starts a new node, set by options
    breaks: HashSet<usize>,
    next_anonymous: usize,
    ids: HashSet<String>,
}

impl<'t> ParseState<'t> {
    fn new(table: &'t CommandTable) -> Self {
        Self {
            table,
            commands: table.ordered(),
            escape: table.escape(),
            layers: Layers::default(),
            breaks: HashSet::new(),
            next_anonymous: 0,
            ids: HashSet::new(),
        }
    }

    fn split(&self, text: &str) -> Result<Split, ParseErrorKind> {
        let split = split_command(text, &self.escape, &self.commands)?.trimmed();
        trace!("Split {:?} into {:?}", text, split);
        Ok(split)
    }

    fn anonymous_key(&mut self) -> String {
        loop {
            let key = format!("<{}>", self.next_anonymous);
            self.next_anonymous += 1;
            if !self.layers.contains_key(&key) {
                return key;
            }
        }
    }

    fn parse_line(&mut self, raw: &str, number: usize) -> Result<(), ParseErrorKind> {
        let (mut depth, rest) = measure(raw, self.table.indentations())?;
        let mut created: Option<Created> = None;
        let mut split = self.split(rest.trim())?;
        let mut handled = 0;

        while let Some(command) = split.command.take() {
            if handled == COMMAND_LIMIT {
                return Err(ParseErrorKind::CommandLimit);
            }
            handled += 1;

            let remainder = match command.kind {
                CommandKind::NodeStart => {
                    self.breaks.retain(|&pending| pending < depth);
                    let key = split.after;
                    if self
                        .commands
                        .iter()
                        .any(|command| key.contains(command.literal.as_str()))
                    {
                        return Err(ParseErrorKind::NodeIdContainsCommand(key));
                    }
                    self.layers.create(key, None, depth)?;
                    String::new()
                }
                CommandKind::Option => {
                    self.breaks.insert(depth);
                    let owner = self
                        .layers
                        .tail(depth)
                        .ok_or(ParseErrorKind::DisconnectedLine)?;

                    let key = self.anonymous_key();
                    self.layers.create(key.clone(), Some(owner), depth + 1)?;
                    // a new branch ends every option block nested deeper
                    self.breaks.retain(|&pending| pending <= depth);
                    let index = self
                        .layers
                        .get_mut(owner)
                        .ok_or(ParseErrorKind::DisconnectedLine)?
                        .add_option(key, split.after);
                    created = Some(Created::Option(owner, index));

                    // whatever follows the option on this line belongs to its branch
                    depth += 1;
                    split.next
                }
                CommandKind::IdStart => {
                    let target = created.ok_or(ParseErrorKind::IdWithoutLine)?;
                    let end = match self.split(&split.next)?.command {
                        Some(end) if end.kind == CommandKind::IdEnd => end,
                        _ => return Err(ParseErrorKind::UnclosedId),
                    };
                    self.attach_id(target, split.after)?;
                    split.next.get(end.len()..).unwrap_or_default().to_owned()
                }
                CommandKind::IdEnd => return Err(ParseErrorKind::UnopenedId),
                CommandKind::Comment => String::new(),
                CommandKind::Dialogue => {
                    let line = DialogueLine::new(split.before, split.after);
                    created = Some(self.add_to_node(line.into(), depth)?);
                    split.next
                }
                CommandKind::Goto => {
                    let line = GotoLine::new(split.after);
                    created = Some(self.add_to_node(line.into(), depth)?);
                    split.next
                }
                CommandKind::Exec => {
                    let (function, params) =
                        parse_call(&split.after, self.table.function_parts())?;
                    let line = ExecLine::new(function, params);
                    created = Some(self.add_to_node(line.into(), depth)?);
                    split.next
                }
                _ => {
                    warn!(
                        "Unknown command {:?} on line {}, ignoring the rest of the line",
                        command.literal, number
                    );
                    String::new()
                }
            };

            split = self.split(&remainder)?;
        }

        if !split.before.is_empty() {
            warn!(
                "Ignoring text without a command on line {}: {:?}",
                number, split.before
            );
        }
        Ok(())
    }

    /// Appends `line` to the newest node at `depth`, or to a fresh sibling
    /// of it if an option block at this depth just ended.
    fn add_to_node(&mut self, line: Line, depth: usize) -> Result<Created, ParseErrorKind> {
        let tail = self
            .layers
            .tail(depth)
            .ok_or(ParseErrorKind::DisconnectedLine)?;

        let node = if self.breaks.remove(&depth) {
            let parent = self.layers.get(tail).and_then(|node| node.parent);
            let key = self.anonymous_key();
            let continuation = self.layers.create(key, parent, depth)?;
            if let Some(owner) = self.layers.get_mut(tail) {
                owner.continuation = Some(continuation);
            }
            continuation
        } else {
            tail
        };

        let parsed: &mut ParsedNode = self
            .layers
            .get_mut(node)
            .ok_or(ParseErrorKind::DisconnectedLine)?;
        parsed.lines.push(line);
        Ok(Created::Line(node, parsed.lines.len() - 1))
    }

    fn attach_id(&mut self, target: Created, id: String) -> Result<(), ParseErrorKind> {
        if self.ids.contains(&id) {
            return Err(GraphError::DuplicateId(id).into());
        }

        match target {
            Created::Line(node, index) => {
                let line = self
                    .layers
                    .get_mut(node)
                    .and_then(|node| node.lines.get_mut(index))
                    .ok_or(ParseErrorKind::IdWithoutLine)?;
                line.ids.insert(id.clone());
            }
            Created::Option(node, index) => {
                let option = self
                    .layers
                    .get_mut(node)
                    .and_then(|node| node.options.as_mut())
                    .and_then(|options| options.option_mut(index))
                    .ok_or(ParseErrorKind::IdWithoutLine)?;
                if let Some(existing) = &option.id {
                    return Err(ParseErrorKind::OptionIdAlreadySet(existing.clone()));
                }
                option.id = Some(id.clone());
            }
        }

        self.ids.insert(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Indentation;
    use crate::line::{LineKind, OptionLine};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kinds(graph: &Graph, node: &str) -> Vec<LineKind> {
        graph
            .node(node)
            .unwrap()
            .lines
            .iter()
            .map(|line| line.kind.clone())
            .collect()
    }

    fn dialogue(speaker: &str, text: &str) -> LineKind {
        LineKind::Dialogue(DialogueLine::new(speaker, text))
    }

    fn goto(target: &str) -> LineKind {
        LineKind::Goto(GotoLine::new(target))
    }

    #[test]
    fn test_chained_dialogue() {
        let graph = parse_str("-Start\nTom: hi : how are you?").unwrap();
        assert_eq!(
            kinds(&graph, "Start"),
            vec![dialogue("Tom", "hi"), dialogue("", "how are you?")]
        );
        assert_eq!(graph.start(), Some("Start"));
    }

    #[test]
    fn test_option_branches_fall_through() {
        let src = "\
- Start
Tom: Pick one
-> A
    Tom: in A
-> B
    Tom: in B
Tom: after
";
        let graph = parse_str(src).unwrap();
        let start = kinds(&graph, "Start");
        assert_eq!(start[0], dialogue("Tom", "Pick one"));

        let options = match &start[1] {
            LineKind::Options(options) => options.clone(),
            other => panic!("Expected options, got {:?}", other),
        };
        let texts: Vec<&str> = options.options().values().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
        assert_eq!(options.target_for(0), Some("<0>"));
        assert_eq!(options.target_for(1), Some("<1>"));

        assert_eq!(kinds(&graph, "<0>"), vec![dialogue("Tom", "in A"), goto("<2>")]);
        assert_eq!(kinds(&graph, "<1>"), vec![dialogue("Tom", "in B"), goto("<2>")]);
        assert_eq!(kinds(&graph, "<2>"), vec![dialogue("Tom", "after")]);
    }

    #[test]
    fn test_nested_fallthrough() {
        let src = "\
- Start
-> Layer 1
    -> Layer 2
        Tom: End Layer 2
    Tom: End Layer 1
";
        let graph = parse_str(src).unwrap();
        // <1> is the branch of "Layer 2", <2> continues after it at depth 1
        assert_eq!(kinds(&graph, "<1>"), vec![dialogue("Tom", "End Layer 2"), goto("<2>")]);
        assert_eq!(kinds(&graph, "<2>"), vec![dialogue("Tom", "End Layer 1")]);
        assert_eq!(graph.node("<0>").unwrap().len(), 1);
    }

    #[test]
    fn test_nested_option_then_sibling_option() {
        let src = "\
- Start
-> A
    -> A1
        Tom: a1
-> B
    Tom: in B
Tom: after
";
        let graph = parse_str(src).unwrap();
        assert_eq!(graph.len(), 5);
        // B's branch keeps its body, and both branches rejoin at <3>
        assert_eq!(kinds(&graph, "<2>"), vec![dialogue("Tom", "in B"), goto("<3>")]);
        assert_eq!(kinds(&graph, "<1>"), vec![dialogue("Tom", "a1"), goto("<3>")]);
        assert_eq!(kinds(&graph, "<3>"), vec![dialogue("Tom", "after")]);
        assert!(matches!(kinds(&graph, "<0>").as_slice(), [LineKind::Options(_)]));
    }

    #[test]
    fn test_option_line_continues_in_branch() {
        let graph = parse_str("- Start\n-> Yes : Great").unwrap();
        assert_eq!(kinds(&graph, "<0>"), vec![dialogue("", "Great")]);
        let options = graph.node("Start").unwrap().lines[0].clone();
        match options.kind {
            LineKind::Options(options) => assert_eq!(options.option(0).unwrap().text, "Yes"),
            other => panic!("Expected options, got {:?}", other),
        }
    }

    #[test]
    fn test_goto_and_exec() {
        let src = "\
- Start
> Function(hello, world) | End
- End
> wave
";
        let graph = parse_str(src).unwrap();
        assert_eq!(
            kinds(&graph, "Start"),
            vec![
                LineKind::Exec(ExecLine::new(
                    "Function",
                    vec!["hello".to_owned(), "world".to_owned()]
                )),
                goto("End"),
            ]
        );
        assert_eq!(kinds(&graph, "End"), vec![LineKind::Exec(ExecLine::new("wave", vec![]))]);
    }

    #[test]
    fn test_ids() {
        let src = "\
- Start
Tom: hi [HiID] [Greeting]
-> Yes [YesID]
-> No
";
        let graph = parse_str(src).unwrap();
        let hi = graph.line_by_id("Greeting").unwrap();
        assert_eq!(hi.kind, dialogue("Tom", "hi"));
        assert_eq!(hi.ids.len(), 2);

        let options = graph.line_with_id::<OptionLine>("YesID").unwrap();
        assert_eq!(options.option(0).unwrap().id.as_deref(), Some("YesID"));
        assert_eq!(options.option(1).unwrap().id, None);
    }

    #[test]
    fn test_comments_and_escapes() {
        let src = "\
# leading comment
- Start
Tom: 10\\:30 is late # not shown
Tom: hyphen\\-ated
";
        let graph = parse_str(src).unwrap();
        assert_eq!(
            kinds(&graph, "Start"),
            vec![dialogue("Tom", "10:30 is late"), dialogue("Tom", "hyphen-ated")]
        );
    }

    #[test]
    fn test_unknown_command_is_skipped() {
        let graph = parse_str("- Start\nTom: hi\n--\nTom: bye").unwrap();
        assert_eq!(
            kinds(&graph, "Start"),
            vec![dialogue("Tom", "hi"), dialogue("Tom", "bye")]
        );
    }

    #[test]
    fn test_plain_text_is_ignored() {
        let graph = parse_str("- Start\nnothing to see here\nTom: hi").unwrap();
        assert_eq!(kinds(&graph, "Start"), vec![dialogue("Tom", "hi")]);
    }

    #[test]
    fn test_deterministic() {
        let src = "- Start\nTom: hi\n-> A\n    Tom: a\n-> B\nTom: after";
        assert_eq!(parse_str(src).unwrap(), parse_str(src).unwrap());
    }

    #[test]
    fn test_custom_table() {
        let mut table = CommandTable::default();
        table
            .define(Command::new(CommandKind::Dialogue, "=>"))
            .unwrap();
        table
            .set_indentations(vec![Indentation::new(' ', 2)])
            .unwrap();

        let graph = Parser::new(&table)
            .parse("- Start\n-> Go\n  Tom => a: b")
            .unwrap();
        assert_eq!(kinds(&graph, "<0>"), vec![dialogue("Tom", "a: b")]);
    }

    #[rstest]
    #[case("- Start\n  Tom: hi", 2, ParseErrorKind::UnevenIndentation { count: 2, width: 4 })]
    #[case("- Start\n \tTom: hi", 2, ParseErrorKind::MixedIndentation)]
    #[case("- Start\n    Tom: hi", 2, ParseErrorKind::DisconnectedLine)]
    #[case("Tom: hi", 1, ParseErrorKind::DisconnectedLine)]
    #[case("- Start\n        - Deep", 2, ParseErrorKind::LayerGap { depth: 2 })]
    #[case("- Start\\: here", 1, ParseErrorKind::NodeIdContainsCommand("Start: here".to_owned()))]
    #[case("- Start\n[Id]", 2, ParseErrorKind::IdWithoutLine)]
    #[case("- Start\nTom: hi [Id", 2, ParseErrorKind::UnclosedId)]
    #[case("- Start\nTom: hi ]", 2, ParseErrorKind::UnopenedId)]
    #[case("- Start\n-> A [One] [Two]", 2, ParseErrorKind::OptionIdAlreadySet("One".to_owned()))]
    #[case(
        "- Start\nTom: a [Same]\nTom: b [Same]",
        3,
        ParseErrorKind::Graph(GraphError::DuplicateId("Same".to_owned()))
    )]
    #[case(
        "- Start\nTom: hi\n- Start",
        3,
        ParseErrorKind::Graph(GraphError::DuplicateNode("Start".to_owned()))
    )]
    #[case("- Start\nTom: hi \\ there", 2, ParseErrorKind::Tokenize(crate::errors::TokenizeError::UnknownEscape("\\ there".to_owned())))]
    fn test_malformed(#[case] src: &str, #[case] line: usize, #[case] kind: ParseErrorKind) {
        assert_eq!(parse_str(src), Err(kind.at(line)));
    }

    #[test]
    fn test_escaped_call_delimiter() {
        // the script escapes the escape, leaving `\,` for the call parser
        let graph = parse_str("- Start\n> say(a\\\\, b)").unwrap();
        assert_eq!(
            kinds(&graph, "Start"),
            vec![LineKind::Exec(ExecLine::new("say", vec!["a, b".to_owned()]))]
        );

        let err = parse_str("- Start\n> say(a\\, b)").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(matches!(err.kind, ParseErrorKind::Tokenize(_)));
    }

    #[test]
    fn test_exec_error() {
        let err = parse_str("- Start\n> say(hello").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(matches!(err.kind, ParseErrorKind::Exec(_)));
    }

    #[test]
    fn test_command_limit() {
        let src = format!("- Start\nTom{}", ": a ".repeat(COMMAND_LIMIT + 1));
        assert_eq!(parse_str(&src), Err(ParseErrorKind::CommandLimit.at(2)));
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(parse_str(""), Err(ParseErrorKind::EmptyScript.into()));
        assert_eq!(parse_str("# just a comment\n\n"), Err(ParseErrorKind::EmptyScript.into()));
    }
}
