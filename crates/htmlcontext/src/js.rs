//! JavaScript string-literal tracker.
//!
//! This is not a JavaScript lexer. It answers one question for an
//! auto-escaper: is the byte just consumed inside a quoted string, inside a
//! comment, or in plain code? Escapes inside strings are honored so `'\''`
//! does not end early; a `/` only matters when it opens a comment, and there
//! is no attempt at telling regular expressions from division.

use alloc::sync::Arc;

use crate::{
    error::{ConfigError, ParseError},
    fsm::{Definition, Machine, Rule, State},
};

/// The coarse JavaScript context exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JsState {
    /// Code outside any literal or comment.
    Text,
    /// Inside a `'…'` string.
    Quoted,
    /// Inside a `"…"` string.
    DoubleQuoted,
    /// Inside a `//` or `/* */` comment.
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Internal {
    Text,
    Q,
    QEscape,
    Dq,
    DqEscape,
    Slash,
    LineComment,
    BlockComment,
    BlockCommentStar,
}

impl Internal {
    const ALL: [Self; 9] = [
        Self::Text,
        Self::Q,
        Self::QEscape,
        Self::Dq,
        Self::DqEscape,
        Self::Slash,
        Self::LineComment,
        Self::BlockComment,
        Self::BlockCommentStar,
    ];

    const fn state(self) -> State {
        State::new(self as u8)
    }

    fn from_state(state: State) -> Option<Self> {
        Self::ALL.get(state.index()).copied()
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Text => "js_text",
            Self::Q => "js_q",
            Self::QEscape => "js_q_escape",
            Self::Dq => "js_dq",
            Self::DqEscape => "js_dq_escape",
            Self::Slash => "js_slash",
            Self::LineComment => "js_line_comment",
            Self::BlockComment => "js_block_comment",
            Self::BlockCommentStar => "js_block_comment_star",
        }
    }

    const fn external(self) -> JsState {
        match self {
            Self::Text | Self::Slash => JsState::Text,
            Self::Q | Self::QEscape => JsState::Quoted,
            Self::Dq | Self::DqEscape => JsState::DoubleQuoted,
            Self::LineComment | Self::BlockComment | Self::BlockCommentStar => JsState::Comment,
        }
    }
}

macro_rules! rule {
    ($pattern:expr, $from:ident => $to:ident) => {
        Rule::new($pattern, Internal::$from.state(), Internal::$to.state())
    };
}

const RULES: &[Rule<'static>] = &[
    rule!(b"default", Text => Text),
    rule!(b"'", Text => Q),
    rule!(b"\"", Text => Dq),
    rule!(b"/", Text => Slash),
    rule!(b"default", Q => Q),
    rule!(b"\\", Q => QEscape),
    rule!(b"'", Q => Text),
    rule!(b"default", QEscape => Q),
    rule!(b"default", Dq => Dq),
    rule!(b"\\", Dq => DqEscape),
    rule!(b"\"", Dq => Text),
    rule!(b"default", DqEscape => Dq),
    rule!(b"default", Slash => Text),
    rule!(b"/", Slash => LineComment),
    rule!(b"*", Slash => BlockComment),
    rule!(b"'", Slash => Q),
    rule!(b"\"", Slash => Dq),
    rule!(b"default", LineComment => LineComment),
    rule!(b"\n", LineComment => Text),
    rule!(b"default", BlockComment => BlockComment),
    rule!(b"*", BlockComment => BlockCommentStar),
    rule!(b"default", BlockCommentStar => BlockComment),
    rule!(b"*", BlockCommentStar => BlockCommentStar),
    rule!(b"/", BlockCommentStar => Text),
];

/// Builds the JavaScript transition table.
pub(crate) fn definition() -> Result<Definition<()>, ConfigError> {
    let mut def = Definition::new(Internal::ALL.len())?;
    def.populate(RULES)?;
    def.set_names(&Internal::ALL.map(Internal::name))?;
    Ok(def)
}

/// Tracks whether a stream of JavaScript bytes is inside a string literal.
///
/// ```rust
/// use htmlcontext::{JsParser, JsState};
///
/// let mut js = JsParser::new().unwrap();
/// assert_eq!(js.parse(br#"alert("it's"#), Ok(JsState::DoubleQuoted));
/// assert!(js.is_quoted());
/// assert_eq!(js.parse(br#"")"#), Ok(JsState::Text));
/// ```
#[derive(Debug, Clone)]
pub struct JsParser {
    machine: Machine<()>,
}

impl JsParser {
    /// Builds a parser with its own transition table.
    ///
    /// # Errors
    ///
    /// Only if the table cannot be allocated.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self::with_definition(Arc::new(definition()?)))
    }

    pub(crate) fn with_definition(definition: Arc<Definition<()>>) -> Self {
        Self {
            machine: Machine::new(definition, ()),
        }
    }

    /// Back to plain code, as at the start of a new script.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Feeds a chunk of JavaScript.
    ///
    /// # Errors
    ///
    /// The grammar has a transition for every byte, so this only fails if
    /// the parser was halted in some other way.
    pub fn parse(&mut self, input: &[u8]) -> Result<JsState, ParseError> {
        self.machine.parse(input)?;
        Ok(self.state())
    }

    /// The current context.
    #[must_use]
    pub fn state(&self) -> JsState {
        Internal::from_state(self.machine.state()).map_or(JsState::Text, Internal::external)
    }

    /// Whether the last byte left the parser inside a string literal.
    #[must_use]
    pub fn is_quoted(&self) -> bool {
        matches!(self.state(), JsState::Quoted | JsState::DoubleQuoted)
    }
}
