use bstr::BString;

use super::State;
use crate::error::ConfigError;

/// The byte selector of a transition [`Rule`].
///
/// Written as byte strings:
/// - `b"default"` selects all 256 bytes,
/// - a single byte such as `b"<"` selects just that byte,
/// - a bracket expression such as `b"[a-zA-Z0-9_]"` selects individual bytes
///   and inclusive `a-b` ranges. A `-` at either end of the bracket body is
///   literal. There is no negation and there are no named classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<'a> {
    /// Every byte.
    Default,
    /// One byte.
    Byte(u8),
    /// The body of a bracket expression, brackets stripped.
    Bracket(&'a [u8]),
}

impl<'a> Pattern<'a> {
    /// Parses the textual form of a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedPattern`] for empty input, multi-byte
    /// input that is not a bracket expression, empty brackets, and reversed
    /// ranges.
    pub fn parse(src: &'a [u8]) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedPattern(BString::from(src));
        match src {
            b"default" => Ok(Pattern::Default),
            [byte] => Ok(Pattern::Byte(*byte)),
            [b'[', body @ .., b']'] if !body.is_empty() => {
                let mut valid = true;
                for_each_span(body, |lo, hi| valid &= lo <= hi);
                if valid {
                    Ok(Pattern::Bracket(body))
                } else {
                    Err(malformed())
                }
            }
            _ => Err(malformed()),
        }
    }

    /// Calls `f` with every byte the pattern selects.
    pub fn for_each_byte(&self, mut f: impl FnMut(u8)) {
        match *self {
            Pattern::Default => (0..=u8::MAX).for_each(f),
            Pattern::Byte(byte) => f(byte),
            Pattern::Bracket(body) => for_each_span(body, |lo, hi| (lo..=hi).for_each(&mut f)),
        }
    }

    #[cfg(test)]
    fn matches(&self, byte: u8) -> bool {
        let mut hit = false;
        self.for_each_byte(|b| hit |= b == byte);
        hit
    }
}

fn for_each_span(body: &[u8], mut f: impl FnMut(u8, u8)) {
    let mut i = 0;
    while i < body.len() {
        if i + 2 < body.len() && body[i + 1] == b'-' {
            f(body[i], body[i + 2]);
            i += 3;
        } else {
            f(body[i], body[i]);
            i += 1;
        }
    }
}

/// One line of a grammar: on a byte matching `pattern` in state `from`, go
/// to state `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule<'a> {
    /// Byte selector, see [`Pattern`].
    pub pattern: &'a [u8],
    /// Source state.
    pub from: State,
    /// Destination state.
    pub to: State,
}

impl<'a> Rule<'a> {
    /// Builds a rule; usable in `const` grammar tables.
    #[must_use]
    pub const fn new(pattern: &'a [u8], from: State, to: State) -> Self {
        Self { pattern, from, to }
    }
}
