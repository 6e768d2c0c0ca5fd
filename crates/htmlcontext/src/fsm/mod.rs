//! Table-driven byte automaton with per-state hooks.
//!
//! Overview
//! - A [`Definition`] owns the transition table (`num_states × 256`) and
//!   three hook slots per state: enter, exit and in-state. It is built once
//!   from ordered [`Rule`]s and is read-only afterwards, so it is shared
//!   through an `Arc` by every [`Machine`] that runs it, across threads if
//!   need be.
//! - A [`Machine`] is the per-stream cursor: current state, recording
//!   buffer, line/column counters, the sticky error and a caller-supplied
//!   context value `T` that hooks read and write.
//!
//! Per byte, the driver looks up `table[state][byte]` and then fires
//! `exit(old)`, `enter(new)` (both only when the state changes) and
//! `in_state(new)` (always). Every hook returns an optional override of the
//! destination; later hooks see the overridden destination. The byte is then
//! appended to the recording buffer if recording is on, and the destination
//! is committed.
//!
//! Consequently a hook that starts recording captures the byte that fired
//! it, and a hook that stops recording does not.

mod pattern;
mod record_buffer;

#[cfg(test)]
mod tests;

use alloc::{sync::Arc, vec::Vec};
use core::fmt;

pub use pattern::{Pattern, Rule};
pub use record_buffer::{RECORD_BUFFER_SIZE, RecordBuffer};

use crate::error::{ConfigError, ErrorKind, ParseError};

/// Index of a state in a transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State(u8);

impl State {
    /// The terminal error sentinel. No transition leaves it.
    pub const ERROR: Self = Self(127);

    /// Largest number of states a table may have; every valid index sits
    /// below [`State::ERROR`].
    pub const MAX_STATES: usize = 127;

    /// Wraps a raw state index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// The raw index.
    #[must_use]
    pub const fn id(self) -> u8 {
        self.0
    }

    /// The raw index, for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the error sentinel.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }
}

/// What a hook is told about the transition it is part of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// State before the byte.
    pub from: State,
    /// The byte being consumed, or `None` for a forced transition
    /// ([`Machine::set_state`]).
    pub byte: Option<u8>,
    /// Destination, including overrides from hooks that already ran.
    pub to: State,
}

/// A state hook. Returning `Some(state)` overrides the destination.
pub type Hook<T> = fn(&mut Machine<T>, Step) -> Option<State>;

/// An immutable-once-built grammar: transition table, hooks and state names.
pub struct Definition<T> {
    table: Vec<[State; 256]>,
    enter: Vec<Option<Hook<T>>>,
    exit: Vec<Option<Hook<T>>>,
    in_state: Vec<Option<Hook<T>>>,
    names: Vec<&'static str>,
}

impl<T> Definition<T> {
    /// Allocates a table of `num_states` rows, all leading to
    /// [`State::ERROR`], with no hooks.
    ///
    /// # Errors
    ///
    /// [`ConfigError::StateCount`] when `num_states` is zero or above
    /// [`State::MAX_STATES`], [`ConfigError::OutOfMemory`] when allocation
    /// fails.
    pub fn new(num_states: usize) -> Result<Self, ConfigError> {
        if num_states == 0 || num_states > State::MAX_STATES {
            return Err(ConfigError::StateCount(num_states));
        }

        let mut table = Vec::new();
        let mut enter = Vec::new();
        let mut exit = Vec::new();
        let mut in_state = Vec::new();
        table
            .try_reserve_exact(num_states)
            .and_then(|()| enter.try_reserve_exact(num_states))
            .and_then(|()| exit.try_reserve_exact(num_states))
            .and_then(|()| in_state.try_reserve_exact(num_states))
            .map_err(|_| ConfigError::OutOfMemory)?;

        table.resize(num_states, [State::ERROR; 256]);
        enter.resize(num_states, None);
        exit.resize(num_states, None);
        in_state.resize(num_states, None);

        Ok(Self {
            table,
            enter,
            exit,
            in_state,
            names: Vec::new(),
        })
    }

    /// Number of states in the table.
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.table.len()
    }

    /// Applies `rules` in order. A `default` rule fills the whole row of its
    /// source state and has to come before any specific rule for that state;
    /// later rules overwrite earlier ones.
    ///
    /// # Errors
    ///
    /// Malformed patterns, states outside the table (the destination may be
    /// [`State::ERROR`]), and a `default` listed after a specific rule for the
    /// same state.
    pub fn populate(&mut self, rules: &[Rule<'_>]) -> Result<(), ConfigError> {
        let mut specific_seen = [false; State::MAX_STATES];

        for rule in rules {
            self.check(rule.from)?;
            if !rule.to.is_error() {
                self.check(rule.to)?;
            }

            let row = &mut self.table[rule.from.index()];
            match Pattern::parse(rule.pattern)? {
                Pattern::Default => {
                    if specific_seen[rule.from.index()] {
                        return Err(ConfigError::DefaultNotFirst(rule.from.id()));
                    }
                    row.fill(rule.to);
                }
                pattern => {
                    specific_seen[rule.from.index()] = true;
                    pattern.for_each_byte(|byte| row[usize::from(byte)] = rule.to);
                }
            }
        }

        Ok(())
    }

    /// Registers the hook fired when a byte moves the machine into `state`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::StateOutOfRange`] for a state outside the table.
    pub fn set_enter(&mut self, state: State, hook: Hook<T>) -> Result<(), ConfigError> {
        self.check(state)?;
        self.enter[state.index()] = Some(hook);
        Ok(())
    }

    /// Registers the hook fired when a byte moves the machine out of
    /// `state`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::StateOutOfRange`] for a state outside the table.
    pub fn set_exit(&mut self, state: State, hook: Hook<T>) -> Result<(), ConfigError> {
        self.check(state)?;
        self.exit[state.index()] = Some(hook);
        Ok(())
    }

    /// Registers the hook fired for every byte that leaves the machine in
    /// `state`, whether or not the state changed.
    ///
    /// # Errors
    ///
    /// [`ConfigError::StateOutOfRange`] for a state outside the table.
    pub fn set_in_state(&mut self, state: State, hook: Hook<T>) -> Result<(), ConfigError> {
        self.check(state)?;
        self.in_state[state.index()] = Some(hook);
        Ok(())
    }

    /// Names every state, for diagnostics.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NameCount`] unless there is exactly one name per
    /// state.
    pub fn set_names(&mut self, names: &[&'static str]) -> Result<(), ConfigError> {
        if names.len() != self.num_states() {
            return Err(ConfigError::NameCount {
                expected: self.num_states(),
                actual: names.len(),
            });
        }
        self.names = names.to_vec();
        Ok(())
    }

    /// Name of `state`, if names were supplied.
    #[must_use]
    pub fn name(&self, state: State) -> Option<&'static str> {
        self.names.get(state.index()).copied()
    }

    /// Destination for `byte` in `state`; [`State::ERROR`] for anything
    /// the table does not cover.
    #[must_use]
    #[inline]
    pub fn next(&self, state: State, byte: u8) -> State {
        self.table
            .get(state.index())
            .map_or(State::ERROR, |row| row[usize::from(byte)])
    }

    #[inline]
    fn enter_hook(&self, state: State) -> Option<Hook<T>> {
        self.enter.get(state.index()).copied().flatten()
    }

    #[inline]
    fn exit_hook(&self, state: State) -> Option<Hook<T>> {
        self.exit.get(state.index()).copied().flatten()
    }

    #[inline]
    fn in_state_hook(&self, state: State) -> Option<Hook<T>> {
        self.in_state.get(state.index()).copied().flatten()
    }

    fn check(&self, state: State) -> Result<(), ConfigError> {
        if state.index() < self.num_states() {
            Ok(())
        } else {
            Err(ConfigError::StateOutOfRange {
                state: state.id(),
                num_states: self.num_states(),
            })
        }
    }
}

impl<T> fmt::Debug for Definition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("num_states", &self.num_states())
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

/// A running instance of a [`Definition`] over one input stream.
///
/// Input may arrive in any number of [`parse`](Machine::parse) calls; all
/// state carries over between them.
///
/// Errors are sticky: after a failed call the machine stays in
/// [`State::ERROR`] and every later `parse` or `set_state` returns the same
/// error again, until [`reset`](Machine::reset).
#[derive(Clone)]
pub struct Machine<T> {
    definition: Arc<Definition<T>>,
    state: State,
    current_byte: Option<u8>,
    recording: bool,
    record: RecordBuffer,
    line: usize,
    column: usize,
    error: Option<ParseError>,
    user: T,
}

impl<T> Machine<T> {
    /// Starts a machine in state 0, carrying `user` for the hooks.
    pub fn new(definition: Arc<Definition<T>>, user: T) -> Self {
        Self {
            definition,
            state: State::new(0),
            current_byte: None,
            recording: false,
            record: RecordBuffer::new(),
            line: 1,
            column: 1,
            error: None,
            user,
        }
    }

    /// The shared grammar.
    #[must_use]
    pub fn definition(&self) -> &Arc<Definition<T>> {
        &self.definition
    }

    /// Current state; [`State::ERROR`] after a failure.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// The last byte handed to the machine.
    #[must_use]
    pub fn current_byte(&self) -> Option<u8> {
        self.current_byte
    }

    /// The error that halted the machine, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// 1-based line of the next byte.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// 1-based column of the next byte.
    #[must_use]
    pub fn column_number(&self) -> usize {
        self.column
    }

    /// Overrides the line counter, e.g. after splicing in other content.
    pub fn set_line_number(&mut self, line: usize) {
        self.line = line;
    }

    /// Overrides the column counter.
    pub fn set_column_number(&mut self, column: usize) {
        self.column = column;
    }

    /// The hook context.
    #[must_use]
    pub fn user(&self) -> &T {
        &self.user
    }

    /// The hook context, mutably.
    pub fn user_mut(&mut self) -> &mut T {
        &mut self.user
    }

    /// The hook context together with the recorded bytes, for hooks that
    /// copy a capture into their own state.
    pub fn user_and_record(&mut self) -> (&mut T, &[u8]) {
        (&mut self.user, self.record.as_bytes())
    }

    /// Starts capturing input bytes, discarding any previous capture.
    pub fn start_record(&mut self) {
        self.record.clear();
        self.recording = true;
    }

    /// Stops capturing. The capture stays readable until the next
    /// [`start_record`](Self::start_record).
    pub fn stop_record(&mut self) {
        self.recording = false;
    }

    /// Whether bytes are currently being captured.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The current or most recent capture.
    #[must_use]
    pub fn record_buffer(&self) -> &RecordBuffer {
        &self.record
    }

    /// Returns to state 0 with counters, capture and error cleared. The
    /// hook context is left alone.
    pub fn reset(&mut self) {
        self.reset_to(State::new(0));
    }

    /// Like [`reset`](Self::reset) but starting in `state`. No hooks fire.
    ///
    /// A state outside the table halts the machine with
    /// [`ErrorKind::UnknownState`].
    pub fn reset_to(&mut self, state: State) {
        self.state = state;
        self.current_byte = None;
        self.recording = false;
        self.record.clear();
        self.line = 1;
        self.column = 1;
        self.error = None;
        if state.index() >= self.definition.num_states() {
            self.halt(ErrorKind::UnknownState(state.id()));
        }
    }

    /// Forces a transition without consuming input. Exit and enter hooks
    /// fire with `byte: None`; in-state hooks do not.
    ///
    /// Returns the state the machine ended up in, which differs from `state`
    /// when a hook overrode it.
    ///
    /// # Errors
    ///
    /// The sticky error if the machine is halted, or
    /// [`ErrorKind::UnknownState`] (without halting) for a state outside the
    /// table.
    pub fn set_state(&mut self, state: State) -> Result<State, ParseError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if state.index() >= self.definition.num_states() {
            return Err(self.positioned(ErrorKind::UnknownState(state.id())));
        }

        let from = self.state;
        let next = self.transition(from, None, state);
        self.commit(from, None, next)
    }

    /// Feeds a chunk of input and returns the resulting state.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::UnexpectedByte`] at the first byte the table has no
    /// transition for. Bytes after it are not looked at, and the machine is
    /// halted.
    pub fn parse(&mut self, input: &[u8]) -> Result<State, ParseError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        for &byte in input {
            self.current_byte = Some(byte);
            let from = self.state;
            let to = self.definition.next(from, byte);
            if to.is_error() {
                let name = self.definition.name(from);
                return Err(self.halt(ErrorKind::UnexpectedByte { byte, state: name }));
            }

            let to = self.transition(from, Some(byte), to);
            let hook = self.definition.in_state_hook(to);
            let to = self.fire(hook, Step {
                from,
                byte: Some(byte),
                to,
            });

            if self.recording {
                self.record.push(byte);
            }

            self.commit(from, Some(byte), to)?;
            self.column += 1;
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            }
        }

        Ok(self.state)
    }

    /// [`parse`](Self::parse) for callers holding a `(buffer, length)` pair.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidLength`] when `len` is negative or runs past the
    /// end of `input`; the machine is not halted by this. Otherwise as
    /// [`parse`](Self::parse).
    pub fn parse_len(&mut self, input: &[u8], len: isize) -> Result<State, ParseError> {
        let Some(chunk) = usize::try_from(len).ok().and_then(|len| input.get(..len)) else {
            return Err(self.positioned(ErrorKind::InvalidLength(len)));
        };
        self.parse(chunk)
    }

    /// An independent machine in the same position, sharing the grammar.
    #[must_use]
    pub fn duplicate(&self) -> Self
    where
        T: Clone,
    {
        self.clone()
    }

    /// Overwrites `dst` with this machine's position and context. The
    /// grammar is shared, not copied.
    pub fn copy_into(&self, dst: &mut Self)
    where
        T: Clone,
    {
        dst.clone_from(self);
    }

    fn transition(&mut self, from: State, byte: Option<u8>, mut to: State) -> State {
        if from != to {
            let hook = self.definition.exit_hook(from);
            to = self.fire(hook, Step { from, byte, to });
        }
        if from != to {
            let hook = self.definition.enter_hook(to);
            to = self.fire(hook, Step { from, byte, to });
        }
        to
    }

    #[inline]
    fn fire(&mut self, hook: Option<Hook<T>>, step: Step) -> State {
        match hook {
            Some(hook) => hook(self, step).unwrap_or(step.to),
            None => step.to,
        }
    }

    fn commit(&mut self, from: State, byte: Option<u8>, to: State) -> Result<State, ParseError> {
        if to.is_error() {
            let state = self.definition.name(from);
            return Err(self.halt(ErrorKind::UnexpectedByte {
                byte: byte.unwrap_or(0),
                state,
            }));
        }
        if to.index() >= self.definition.num_states() {
            return Err(self.halt(ErrorKind::UnknownState(to.id())));
        }
        self.state = to;
        Ok(to)
    }

    fn positioned(&self, kind: ErrorKind) -> ParseError {
        ParseError {
            source: kind,
            line: self.line,
            column: self.column,
        }
    }

    fn halt(&mut self, kind: ErrorKind) -> ParseError {
        let err = self.positioned(kind);
        log::debug!("state machine halted: {err}");
        self.state = State::ERROR;
        self.recording = false;
        self.error = Some(err.clone());
        err
    }
}

impl<T: fmt::Debug> fmt::Debug for Machine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("line", &self.line)
            .field("column", &self.column)
            .field("recording", &self.recording)
            .field("record", &self.record)
            .field("error", &self.error)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
