//! The HTML context parser.
//!
//! [`HtmlParser`] is fed template text chunk by chunk and, after each chunk,
//! reports the lexical context the next byte would land in: text, a tag, an
//! attribute name or value, a comment, or (in JavaScript and CSS modes) a
//! script or stylesheet. Alongside the coarse [`HtmlState`] it tracks what an
//! auto-escaper needs to pick an escaping function:
//! - the open element and the current attribute, lower-cased,
//! - what the attribute's value means ([`AttrType`]) and how it is quoted,
//! - whether the position is inside JavaScript, and if so, inside a string.
//!
//! `<script>`, `<style>`, `<title>` and `<textarea>` bodies are raw text up
//! to the matching close tag; inside `<script>` bodies and `on*` attribute
//! values every byte is also run through a [`JsParser`]. Attribute values
//! have their character references decoded first, so `&#39;` opens a string
//! just like `'`.

mod attributes;
mod grammar;


use alloc::sync::Arc;

use bstr::BStr;

pub use attributes::AttrType;
use grammar::{HtmlContext, Internal};

use crate::{
    error::{ConfigError, ParseError},
    fsm::{Definition, Machine},
    js::{self, JsParser, JsState},
    options::{ParserMode, ParserOptions},
};

/// The coarse lexical context exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HtmlState {
    /// Character data, including raw-text element bodies.
    Text,
    /// Inside a tag, outside any attribute; also `<!…>` and `<?…>`
    /// declarations.
    Tag,
    /// An attribute name.
    Attr,
    /// An attribute value.
    Value,
    /// An HTML comment.
    Comment,
    /// A standalone JavaScript file.
    JsFile,
    /// A standalone stylesheet.
    CssFile,
    /// The parser has halted.
    Error,
}

/// How the current attribute value is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueQuote {
    /// `name=value`
    Unquoted,
    /// `name='value'`
    Single,
    /// `name="value"`
    Double,
}

/// The HTML and JavaScript transition tables, built once.
///
/// Building the tables is the only costly part of creating a parser. A
/// `Grammar` can be cloned cheaply and shared between threads, and every
/// parser made from it refers to the same tables.
#[derive(Debug, Clone)]
pub struct Grammar {
    html: Arc<Definition<HtmlContext>>,
    js: Arc<Definition<()>>,
}

impl Grammar {
    /// Builds both transition tables.
    ///
    /// # Errors
    ///
    /// Only if the tables cannot be allocated.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            html: Arc::new(grammar::definition()?),
            js: Arc::new(js::definition()?),
        })
    }
}

/// Streaming HTML context tracker.
///
/// ```rust
/// use htmlcontext::{AttrType, HtmlParser, HtmlState};
///
/// let mut parser = HtmlParser::new().unwrap();
/// assert_eq!(parser.parse(b"<a href=\""), Ok(HtmlState::Value));
/// assert_eq!(parser.attr_type(), AttrType::Uri);
/// assert!(parser.is_url_start());
/// ```
#[derive(Debug, Clone)]
pub struct HtmlParser {
    machine: Machine<HtmlContext>,
    options: ParserOptions,
}

impl HtmlParser {
    /// A parser for an HTML document, with its own [`Grammar`].
    ///
    /// # Errors
    ///
    /// Only if the transition tables cannot be allocated.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_options(ParserOptions::default())
    }

    /// A parser configured by `options`, with its own [`Grammar`].
    ///
    /// # Errors
    ///
    /// Only if the transition tables cannot be allocated.
    pub fn with_options(options: ParserOptions) -> Result<Self, ConfigError> {
        Ok(Self::with_grammar(&Grammar::new()?, options))
    }

    /// A parser sharing `grammar` with every other parser made from it.
    #[must_use]
    pub fn with_grammar(grammar: &Grammar, options: ParserOptions) -> Self {
        let js = JsParser::with_definition(Arc::clone(&grammar.js));
        let mut parser = Self {
            machine: Machine::new(Arc::clone(&grammar.html), HtmlContext::new(js)),
            options,
        };
        parser.restart();
        parser
    }

    /// Feeds the next chunk of the document and returns the context after
    /// its last byte.
    ///
    /// # Errors
    ///
    /// Once a chunk fails the parser stays halted and returns the same error
    /// until [`reset`](Self::reset).
    pub fn parse(&mut self, input: &[u8]) -> Result<HtmlState, ParseError> {
        let result = self.machine.parse(input);
        self.external(result)
    }

    /// [`parse`](Self::parse) for callers holding a `(buffer, length)` pair.
    ///
    /// # Errors
    ///
    /// A negative length or one past the end of `input` is rejected without
    /// halting the parser. Otherwise as [`parse`](Self::parse).
    pub fn parse_len(&mut self, input: &[u8], len: isize) -> Result<HtmlState, ParseError> {
        let result = self.machine.parse_len(input, len);
        self.external(result)
    }

    fn external<S>(&self, result: Result<S, ParseError>) -> Result<HtmlState, ParseError> {
        match result {
            Ok(_) => Ok(self.state()),
            Err(err) => {
                #[cfg(any(test, feature = "fuzzing"))]
                assert!(
                    !self.options.panic_on_error
                        || matches!(err.kind(), crate::ErrorKind::InvalidLength(_)),
                    "{err}"
                );
                Err(err)
            }
        }
    }

    /// Tells the parser that the caller is about to emit content that is not
    /// in the template text, such as an expanded variable.
    ///
    /// Right after `name=`, the substitution becomes the first byte of an
    /// unquoted value, and the parser moves on as if it had seen one.
    /// Returns `false`, changing nothing, anywhere else.
    pub fn insert_text(&mut self) -> bool {
        self.internal() == Some(Internal::Value)
            && self
                .machine
                .set_state(Internal::ValueText.state())
                .is_ok()
    }

    /// Starts over in the configured mode.
    pub fn reset(&mut self) {
        self.restart();
    }

    /// Starts over in `mode`, which becomes the configured mode.
    pub fn reset_mode(&mut self, mode: ParserMode) {
        log::debug!("parser reset to {mode:?} mode");
        self.options.mode = mode;
        self.restart();
    }

    fn restart(&mut self) {
        let start = match self.options.mode {
            ParserMode::Html => Internal::Text,
            ParserMode::Js => Internal::JsFile,
            ParserMode::Css => Internal::CssFile,
            ParserMode::HtmlInTag => Internal::TagSpace,
        };
        self.machine.reset_to(start.state());
        self.machine.user_mut().clear();
    }

    /// The options this parser runs with.
    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn internal(&self) -> Option<Internal> {
        Internal::from_state(self.machine.state())
    }

    fn ctx(&self) -> &HtmlContext {
        self.machine.user()
    }

    /// The current context; [`HtmlState::Error`] once halted.
    #[must_use]
    pub fn state(&self) -> HtmlState {
        self.internal().map_or(HtmlState::Error, Internal::external)
    }

    /// The open element, lower-cased, or `None` after a closing tag and
    /// while a tag name is still being read.
    #[must_use]
    pub fn tag(&self) -> Option<&BStr> {
        let tag = &self.ctx().tag;
        (!tag.is_empty()).then(|| BStr::new(tag.as_slice()))
    }

    /// The attribute being read or whose value is being read.
    ///
    /// Lower-cased once the name is complete; while it is still being read
    /// the bytes come back as written. `None` outside attributes.
    #[must_use]
    pub fn attr(&self) -> Option<&BStr> {
        match self.internal()? {
            Internal::Attr => Some(BStr::new(self.machine.record_buffer().as_bytes())),
            state if matches!(state.external(), HtmlState::Attr | HtmlState::Value) => {
                Some(BStr::new(self.ctx().attr.as_slice()))
            }
            _ => None,
        }
    }

    /// The raw value bytes read so far, up to the recording capacity.
    /// Empty right after `=` or an opening quote, `None` outside values.
    #[must_use]
    pub fn value(&self) -> Option<&BStr> {
        let state = self.internal()?;
        if state.is_value_content() {
            Some(BStr::new(self.machine.record_buffer().as_bytes()))
        } else if state.is_value_start() {
            Some(BStr::new(b""))
        } else {
            None
        }
    }

    /// How many value bytes have been read, `None` outside values.
    ///
    /// `Some(0)` means a substitution here would start the value.
    #[must_use]
    pub fn value_index(&self) -> Option<usize> {
        let state = self.internal()?;
        (state.external() == HtmlState::Value).then_some(self.ctx().value_index)
    }

    /// What the current attribute's value means; [`AttrType::None`] outside
    /// attributes.
    #[must_use]
    pub fn attr_type(&self) -> AttrType {
        match self.internal() {
            Some(Internal::Attr) => AttrType::classify(self.machine.record_buffer().as_bytes()),
            Some(state) if matches!(state.external(), HtmlState::Attr | HtmlState::Value) => {
                self.ctx().attr_type
            }
            _ => AttrType::None,
        }
    }

    /// Whether the current value sits between quotes.
    #[must_use]
    pub fn is_attr_quoted(&self) -> bool {
        self.internal().is_some_and(Internal::is_quoted_value)
    }

    /// The quoting of the current value, `None` outside values.
    #[must_use]
    pub fn value_quote(&self) -> Option<ValueQuote> {
        match self.internal()? {
            Internal::Value | Internal::ValueText => Some(ValueQuote::Unquoted),
            Internal::ValueQStart | Internal::ValueQ => Some(ValueQuote::Single),
            Internal::ValueDqStart | Internal::ValueDq => Some(ValueQuote::Double),
            _ => None,
        }
    }

    /// Whether the position is JavaScript: a JavaScript file, a `<script>`
    /// body, or the value of an event-handler attribute.
    #[must_use]
    pub fn in_js(&self) -> bool {
        match self.internal() {
            Some(Internal::JsFile) => true,
            Some(state) if state.is_cdata() => self.ctx().in_js,
            Some(state) if state.external() == HtmlState::Value => {
                self.ctx().attr_type == AttrType::Js
            }
            _ => false,
        }
    }

    /// Whether the position is inside a JavaScript string literal.
    #[must_use]
    pub fn is_js_quoted(&self) -> bool {
        self.in_js() && self.ctx().js.is_quoted()
    }

    /// The JavaScript context, `None` outside JavaScript.
    #[must_use]
    pub fn js_state(&self) -> Option<JsState> {
        self.in_js().then(|| self.ctx().js.state())
    }

    /// Whether the position is CSS: a stylesheet, a `<style>` body, or a
    /// `style` attribute value.
    #[must_use]
    pub fn in_css(&self) -> bool {
        match self.internal() {
            Some(Internal::CssFile) => true,
            Some(state) if state.is_cdata() => self.ctx().tag.as_slice() == b"style",
            Some(state) if state.external() == HtmlState::Value => {
                self.ctx().attr_type == AttrType::Style
            }
            _ => false,
        }
    }

    /// Whether a substitution here would be the very start of a URL value,
    /// where a scheme such as `javascript:` could be injected.
    #[must_use]
    pub fn is_url_start(&self) -> bool {
        self.attr_type() == AttrType::Uri && self.value_index() == Some(0)
    }

    /// The error that halted the parser, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        self.machine.error()
    }

    /// 1-based line of the next byte.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.machine.line_number()
    }

    /// 1-based column of the next byte.
    #[must_use]
    pub fn column_number(&self) -> usize {
        self.machine.column_number()
    }

    /// Overrides the line counter.
    pub fn set_line_number(&mut self, line: usize) {
        self.machine.set_line_number(line);
    }

    /// Overrides the column counter.
    pub fn set_column_number(&mut self, column: usize) {
        self.machine.set_column_number(column);
    }

    /// An independent parser in the same position, for speculative parsing.
    /// The JavaScript context and any half-read character reference are
    /// copied too; the grammar is shared.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Overwrites `dst` with this parser's position and context.
    pub fn copy_into(&self, dst: &mut Self) {
        dst.clone_from(self);
    }
}
