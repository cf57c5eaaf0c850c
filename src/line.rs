//! The compiled lines a [`Node`](crate::Node) is made of.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Moves the cursor to the first line of another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoLine {
    pub target: String,
}

impl GotoLine {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Calls a function from the sequence's [`Library`](crate::Library).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecLine {
    pub function: String,
    pub params: Vec<String>,
}

impl ExecLine {
    pub fn new(function: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            function: function.into(),
            params,
        }
    }
}

/// One choice of an [`OptionLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueOption {
    /// Node the sequence moves to when this option is chosen
    pub target: String,
    pub text: String,
    pub id: Option<String>,
    pub enabled: bool,
}

impl DialogueOption {
    pub fn new(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
            id: None,
            enabled: true,
        }
    }
}

/// A set of options shown together.
///
/// Options are numbered from 0 in the order they were added. Disabling an
/// option hides it from [`enabled_options`](Self::enabled_options) but keeps
/// its number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionLine {
    options: BTreeMap<usize, DialogueOption>,
}

impl OptionLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option and returns its number.
    pub fn add_option(&mut self, option: DialogueOption) -> usize {
        let index = self.options.len();
        self.options.insert(index, option);
        index
    }

    pub fn option(&self, index: usize) -> Option<&DialogueOption> {
        self.options.get(&index)
    }

    pub fn option_mut(&mut self, index: usize) -> Option<&mut DialogueOption> {
        self.options.get_mut(&index)
    }

    pub fn options(&self) -> &BTreeMap<usize, DialogueOption> {
        &self.options
    }

    pub fn enabled_options(&self) -> impl Iterator<Item = (usize, &DialogueOption)> {
        self.options
            .iter()
            .filter(|(_, option)| option.enabled)
            .map(|(&index, option)| (index, option))
    }

    pub fn target_for(&self, index: usize) -> Option<&str> {
        self.option(index).map(|option| option.target.as_str())
    }

    /// Returns false if there is no option with that number.
    pub fn toggle_option(&mut self, index: usize, enabled: bool) -> bool {
        match self.options.get_mut(&index) {
            Some(option) => {
                option.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Returns false if no option carries `id`.
    pub fn toggle_option_by_id(&mut self, id: &str, enabled: bool) -> bool {
        match self
            .options
            .values_mut()
            .find(|option| option.id.as_deref() == Some(id))
        {
            Some(option) => {
                option.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = &str> {
        self.options.values().filter_map(|option| option.id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Dialogue(DialogueLine),
    Options(OptionLine),
    Goto(GotoLine),
    Exec(ExecLine),
}

impl LineKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dialogue(_) => DialogueLine::NAME,
            Self::Options(_) => OptionLine::NAME,
            Self::Goto(_) => GotoLine::NAME,
            Self::Exec(_) => ExecLine::NAME,
        }
    }

    /// Functional lines act on the sequence and are never shown to a reader.
    pub fn is_functional(&self) -> bool {
        matches!(self, Self::Goto(_) | Self::Exec(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    pub enabled: bool,
    pub ids: BTreeSet<String>,
}

impl Line {
    pub fn new(kind: LineKind) -> Self {
        Self {
            kind,
            enabled: true,
            ids: BTreeSet::new(),
        }
    }

    /// Every id that resolves to this line, including the ids of its options.
    pub fn all_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        if let LineKind::Options(options) = &self.kind {
            ids.extend(options.ids());
        }
        ids
    }
}

impl From<LineKind> for Line {
    fn from(kind: LineKind) -> Self {
        Self::new(kind)
    }
}

/// Typed access to one variant of [`LineKind`], used by the id lookups on
/// [`Graph`](crate::Graph).
pub trait LineVariant: Sized {
    const NAME: &'static str;

    fn from_kind(kind: &LineKind) -> Option<&Self>;
    fn from_kind_mut(kind: &mut LineKind) -> Option<&mut Self>;
}

macro_rules! line_variant {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl LineVariant for $ty {
            const NAME: &'static str = $name;

            fn from_kind(kind: &LineKind) -> Option<&Self> {
                match kind {
                    LineKind::$variant(line) => Some(line),
                    _ => None,
                }
            }

            fn from_kind_mut(kind: &mut LineKind) -> Option<&mut Self> {
                match kind {
                    LineKind::$variant(line) => Some(line),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Line {
            fn from(line: $ty) -> Self {
                Self::new(LineKind::$variant(line))
            }
        }
    };
}

line_variant!(DialogueLine, Dialogue, "dialogue");
line_variant!(OptionLine, Options, "options");
line_variant!(GotoLine, Goto, "goto");
line_variant!(ExecLine, Exec, "exec");
