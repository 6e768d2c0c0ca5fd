/// What kind of document the parser is looking at.
///
/// A template engine picks the mode from the file it is about to expand:
/// a `.js` file is JavaScript from its first byte, an `.html` file starts in
/// text, and a fragment included from inside an open tag starts between
/// attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParserMode {
    /// An HTML document, starting in text.
    #[default]
    Html,
    /// A standalone JavaScript file. Every byte feeds the JavaScript
    /// sub-parser and the external state stays
    /// [`HtmlState::JsFile`](crate::HtmlState::JsFile).
    Js,
    /// A standalone stylesheet. The external state stays
    /// [`HtmlState::CssFile`](crate::HtmlState::CssFile).
    Css,
    /// An HTML fragment that begins inside an open tag, between attributes.
    HtmlInTag,
}

/// Configuration for an [`HtmlParser`](crate::HtmlParser).
///
/// # Examples
///
/// ```rust
/// use htmlcontext::{HtmlParser, HtmlState, ParserMode, ParserOptions};
///
/// let options = ParserOptions {
///     mode: ParserMode::Js,
///     ..Default::default()
/// };
/// let mut parser = HtmlParser::with_options(options).unwrap();
/// assert_eq!(parser.parse(b"var x = '"), Ok(HtmlState::JsFile));
/// assert!(parser.is_js_quoted());
/// ```
///
/// # Default
///
/// HTML mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserOptions {
    /// Where the parser starts, and for JavaScript and CSS files, where it
    /// stays.
    ///
    /// # Default
    ///
    /// [`ParserMode::Html`]
    pub mode: ParserMode,

    #[cfg(any(test, feature = "fuzzing"))]
    #[cfg_attr(feature = "serde", serde(default))]
    /// Panic on transition errors instead of returning them.
    ///
    /// Enabled only in test and fuzzing builds to get a backtrace at the
    /// offending byte.
    pub panic_on_error: bool,
}
