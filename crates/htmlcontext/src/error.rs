use core::fmt;

use thiserror::Error;

/// Failure while building a transition table or registering hooks.
///
/// These are fatal for whoever is constructing a parser: a grammar that does
/// not build is a programming error, not bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested number of states is zero or collides with the error
    /// sentinel.
    #[error("a state machine needs between 1 and {max} states, got {0}", max = crate::fsm::State::MAX_STATES)]
    StateCount(usize),
    /// A rule or hook named a state outside the table.
    #[error("state {state} is out of range for a machine with {num_states} states")]
    StateOutOfRange {
        /// The offending state index.
        state: u8,
        /// Size of the table it was checked against.
        num_states: usize,
    },
    /// A rule pattern is neither `default`, a single byte, nor a bracket
    /// expression.
    #[error("malformed pattern {0:?}")]
    MalformedPattern(bstr::BString),
    /// A `default` rule came after a more specific rule for the same state,
    /// which would silently discard the earlier rule.
    #[error("`default` must be the first rule for state {0}")]
    DefaultNotFirst(u8),
    /// The state-name table does not cover every state.
    #[error("expected {expected} state names, got {actual}")]
    NameCount {
        /// Number of states in the table.
        expected: usize,
        /// Number of names supplied.
        actual: usize,
    },
    /// The allocator refused the transition table.
    #[error("could not allocate the transition table")]
    OutOfMemory,
}

/// A parse failure, positioned at the offending byte.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source} at {line}:{column}")]
pub struct ParseError {
    pub(crate) source: ErrorKind,
    /// 1-based line of the offending byte.
    pub line: usize,
    /// 1-based column of the offending byte.
    pub column: usize,
}

impl ParseError {
    /// What went wrong, without the position.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.source
    }
}

/// The reason a [`ParseError`] was raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No transition is defined for this byte in the current state.
    #[error("unexpected character '{}'{}", escaped(.byte), in_state(.state))]
    UnexpectedByte {
        /// The rejected byte.
        byte: u8,
        /// Name of the state that rejected it, when the table has names.
        state: Option<&'static str>,
    },
    /// A `(buffer, length)` pair whose length is negative or past the end.
    #[error("invalid input length {0}")]
    InvalidLength(isize),
    /// A forced transition named a state the table does not have.
    #[error("unknown state {0}")]
    UnknownState(u8),
}

// thiserror hands fields to format arguments by reference.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn escaped(byte: &u8) -> EscapedByte {
    EscapedByte(*byte)
}

#[allow(clippy::ref_option)]
fn in_state(state: &Option<&'static str>) -> InState {
    InState(*state)
}

/// Renders a byte the way diagnostics show it: printable ASCII verbatim,
/// everything else escaped.
struct EscapedByte(u8);

impl fmt::Display for EscapedByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            b'\'' => f.write_str("\\'"),
            b'\\' => f.write_str("\\\\"),
            b'\n' => f.write_str("\\n"),
            b'\r' => f.write_str("\\r"),
            b'\t' => f.write_str("\\t"),
            b @ 0x20..=0x7e => write!(f, "{}", b as char),
            b => write!(f, "\\x{b:02x}"),
        }
    }
}

struct InState(Option<&'static str>);

impl fmt::Display for InState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => write!(f, " in state '{name}'"),
            None => Ok(()),
        }
    }
}
