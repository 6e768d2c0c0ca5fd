//! Streaming lexical-context tracking for HTML and embedded JavaScript.
//!
//! An auto-escaping template engine has to know, at every substitution
//! site, what kind of text surrounds it: element content, a tag, an
//! attribute name, a quoted or unquoted attribute value, a URL, a script
//! string. [`HtmlParser`] answers that from the template text alone, fed in
//! whatever chunks the engine happens to produce.
//!
//! ```rust
//! use htmlcontext::{AttrType, HtmlParser, HtmlState};
//!
//! let mut parser = HtmlParser::new()?;
//! parser.parse(b"<a onclick=\"alert('")?;
//! assert_eq!(parser.state(), HtmlState::Value);
//! assert_eq!(parser.attr_type(), AttrType::Js);
//! assert!(parser.is_js_quoted());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The parsers are built on [`fsm`], a generic table-driven automaton with
//! enter, exit and in-state hooks, which can be used on its own.

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod entity;
mod error;
pub mod fsm;
mod html;
mod js;
mod options;

#[cfg(test)]
mod tests;

pub use entity::{EntityDecoder, MAX_ENTITY_SIZE, decode_entities};
pub use error::{ConfigError, ErrorKind, ParseError};
pub use html::{AttrType, Grammar, HtmlParser, HtmlState, ValueQuote};
pub use js::{JsParser, JsState};
pub use options::{ParserMode, ParserOptions};
