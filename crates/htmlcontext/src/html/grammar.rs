//! The HTML transition table and the hooks that derive tag, attribute and
//! JavaScript context from it.
//!
//! The table is total: every state has a `default` rule,
//! so no input makes the HTML machine fail. Anything that does not look like
//! markup is text.

use bstr::{BStr, BString};

use super::{HtmlState, attributes::AttrType};
use crate::{
    entity::EntityDecoder,
    error::ConfigError,
    fsm::{Definition, Machine, Rule, State, Step},
    js::JsParser,
};

/// Elements whose body is raw text up to the matching close tag.
const CDATA_TAGS: [&[u8]; 4] = [b"script", b"style", b"title", b"textarea"];

/// HTML whitespace.
const WS: &[u8] = b"[ \t\n\r\x0c]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Internal {
    Text,
    TagStart,
    TagName,
    TagSpace,
    TagClose,
    Attr,
    AttrSpace,
    Value,
    ValueText,
    ValueQStart,
    ValueQ,
    ValueDqStart,
    ValueDq,
    Bang,
    CommentOpen,
    Declaration,
    CommentBody,
    CommentDash,
    CommentDashDash,
    CdataText,
    CdataLt,
    CdataMayClose,
    JsFile,
    CssFile,
}

impl Internal {
    pub(crate) const ALL: [Self; 24] = [
        Self::Text,
        Self::TagStart,
        Self::TagName,
        Self::TagSpace,
        Self::TagClose,
        Self::Attr,
        Self::AttrSpace,
        Self::Value,
        Self::ValueText,
        Self::ValueQStart,
        Self::ValueQ,
        Self::ValueDqStart,
        Self::ValueDq,
        Self::Bang,
        Self::CommentOpen,
        Self::Declaration,
        Self::CommentBody,
        Self::CommentDash,
        Self::CommentDashDash,
        Self::CdataText,
        Self::CdataLt,
        Self::CdataMayClose,
        Self::JsFile,
        Self::CssFile,
    ];

    pub(crate) const fn state(self) -> State {
        State::new(self as u8)
    }

    pub(crate) fn from_state(state: State) -> Option<Self> {
        Self::ALL.get(state.index()).copied()
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TagStart => "tag_start",
            Self::TagName => "tag_name",
            Self::TagSpace => "tag_space",
            Self::TagClose => "tag_close",
            Self::Attr => "attr",
            Self::AttrSpace => "attr_space",
            Self::Value => "value",
            Self::ValueText => "value_text",
            Self::ValueQStart => "value_q_start",
            Self::ValueQ => "value_q",
            Self::ValueDqStart => "value_dq_start",
            Self::ValueDq => "value_dq",
            Self::Bang => "bang",
            Self::CommentOpen => "comment_open",
            Self::Declaration => "declaration",
            Self::CommentBody => "comment_body",
            Self::CommentDash => "comment_dash",
            Self::CommentDashDash => "comment_dash_dash",
            Self::CdataText => "cdata_text",
            Self::CdataLt => "cdata_lt",
            Self::CdataMayClose => "cdata_may_close",
            Self::JsFile => "js_file",
            Self::CssFile => "css_file",
        }
    }

    pub(crate) const fn external(self) -> HtmlState {
        match self {
            Self::Text
            | Self::TagClose
            | Self::CdataText
            | Self::CdataLt
            | Self::CdataMayClose => HtmlState::Text,
            Self::TagStart
            | Self::TagName
            | Self::TagSpace
            | Self::Bang
            | Self::CommentOpen
            | Self::Declaration => HtmlState::Tag,
            Self::Attr | Self::AttrSpace => HtmlState::Attr,
            Self::Value
            | Self::ValueText
            | Self::ValueQStart
            | Self::ValueQ
            | Self::ValueDqStart
            | Self::ValueDq => HtmlState::Value,
            Self::CommentBody | Self::CommentDash | Self::CommentDashDash => HtmlState::Comment,
            Self::JsFile => HtmlState::JsFile,
            Self::CssFile => HtmlState::CssFile,
        }
    }

    pub(crate) const fn is_cdata(self) -> bool {
        matches!(self, Self::CdataText | Self::CdataLt | Self::CdataMayClose)
    }

    /// `=` seen, or an opening quote, but no value byte yet.
    pub(crate) const fn is_value_start(self) -> bool {
        matches!(self, Self::Value | Self::ValueQStart | Self::ValueDqStart)
    }

    pub(crate) const fn is_value_content(self) -> bool {
        matches!(self, Self::ValueText | Self::ValueQ | Self::ValueDq)
    }

    pub(crate) const fn is_quoted_value(self) -> bool {
        matches!(
            self,
            Self::ValueQStart | Self::ValueQ | Self::ValueDqStart | Self::ValueDq
        )
    }
}

macro_rules! rule {
    ($pattern:expr, $from:ident => $to:ident) => {
        Rule::new($pattern, Internal::$from.state(), Internal::$to.state())
    };
}

const RULES: &[Rule<'static>] = &[
    rule!(b"default", Text => Text),
    rule!(b"<", Text => TagStart),
    // `<` not followed by a name is text
    rule!(b"default", TagStart => Text),
    rule!(b"[A-Za-z]", TagStart => TagName),
    rule!(b"/", TagStart => TagName),
    rule!(b"!", TagStart => Bang),
    rule!(b"?", TagStart => Declaration),
    rule!(b"<", TagStart => TagStart),
    rule!(b"default", TagName => TagName),
    rule!(WS, TagName => TagSpace),
    rule!(b"/", TagName => TagSpace),
    rule!(b">", TagName => TagClose),
    rule!(b"default", TagSpace => Attr),
    rule!(WS, TagSpace => TagSpace),
    rule!(b"/", TagSpace => TagSpace),
    rule!(b">", TagSpace => TagClose),
    rule!(b"default", Attr => Attr),
    rule!(WS, Attr => AttrSpace),
    rule!(b"=", Attr => Value),
    rule!(b"/", Attr => TagSpace),
    rule!(b">", Attr => TagClose),
    rule!(b"default", AttrSpace => Attr),
    rule!(WS, AttrSpace => AttrSpace),
    rule!(b"=", AttrSpace => Value),
    rule!(b"/", AttrSpace => TagSpace),
    rule!(b">", AttrSpace => TagClose),
    rule!(b"default", Value => ValueText),
    rule!(WS, Value => Value),
    rule!(b"'", Value => ValueQStart),
    rule!(b"\"", Value => ValueDqStart),
    rule!(b">", Value => TagClose),
    rule!(b"default", ValueText => ValueText),
    rule!(WS, ValueText => TagSpace),
    rule!(b">", ValueText => TagClose),
    rule!(b"default", ValueQStart => ValueQ),
    rule!(b"'", ValueQStart => TagSpace),
    rule!(b"default", ValueQ => ValueQ),
    rule!(b"'", ValueQ => TagSpace),
    rule!(b"default", ValueDqStart => ValueDq),
    rule!(b"\"", ValueDqStart => TagSpace),
    rule!(b"default", ValueDq => ValueDq),
    rule!(b"\"", ValueDq => TagSpace),
    rule!(b"default", TagClose => Text),
    rule!(b"<", TagClose => TagStart),
    rule!(b"default", Bang => Declaration),
    rule!(b"-", Bang => CommentOpen),
    rule!(b">", Bang => Text),
    rule!(b"default", CommentOpen => Declaration),
    rule!(b"-", CommentOpen => CommentBody),
    rule!(b">", CommentOpen => Text),
    rule!(b"default", Declaration => Declaration),
    rule!(b">", Declaration => Text),
    rule!(b"default", CommentBody => CommentBody),
    rule!(b"-", CommentBody => CommentDash),
    rule!(b"default", CommentDash => CommentBody),
    rule!(b"-", CommentDash => CommentDashDash),
    rule!(b"default", CommentDashDash => CommentBody),
    rule!(b"-", CommentDashDash => CommentDashDash),
    rule!(b">", CommentDashDash => Text),
    rule!(b"default", CdataText => CdataText),
    rule!(b"<", CdataText => CdataLt),
    rule!(b"default", CdataLt => CdataText),
    rule!(b"<", CdataLt => CdataLt),
    rule!(b"/", CdataLt => CdataMayClose),
    rule!(b"default", CdataMayClose => CdataText),
    rule!(b"[a-zA-Z0-9]", CdataMayClose => CdataMayClose),
    rule!(b"<", CdataMayClose => CdataLt),
    rule!(b">", CdataMayClose => Text),
    rule!(WS, CdataMayClose => TagSpace),
    rule!(b"default", JsFile => JsFile),
    rule!(b"default", CssFile => CssFile),
];

/// Per-stream state derived by the hooks.
#[derive(Debug, Clone)]
pub(crate) struct HtmlContext {
    /// Lower-cased name of the open element; empty after a closing tag.
    pub(crate) tag: BString,
    /// Lower-cased name of the last completed attribute.
    pub(crate) attr: BString,
    pub(crate) attr_type: AttrType,
    /// Value bytes consumed so far.
    pub(crate) value_index: usize,
    /// Inside the body of a `<script>` element.
    pub(crate) in_js: bool,
    pub(crate) js: JsParser,
    pub(crate) entity: EntityDecoder,
}

impl HtmlContext {
    pub(crate) fn new(js: JsParser) -> Self {
        Self {
            tag: BString::default(),
            attr: BString::default(),
            attr_type: AttrType::None,
            value_index: 0,
            in_js: false,
            js,
            entity: EntityDecoder::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.tag.clear();
        self.attr.clear();
        self.attr_type = AttrType::None;
        self.value_index = 0;
        self.in_js = false;
        self.js.reset();
        self.entity.reset();
    }

    fn feed_js(&mut self, bytes: &[u8]) {
        feed(&mut self.js, bytes);
    }

    /// Runs a value byte through the entity decoder into the JS parser;
    /// `None` flushes a pending reference.
    fn feed_decoded(&mut self, byte: Option<u8>) {
        let decoded = match byte {
            Some(byte) => self.entity.decode(byte),
            None => self.entity.finish(),
        };
        feed(&mut self.js, decoded);
    }
}

fn feed(js: &mut JsParser, bytes: &[u8]) {
    if let Err(err) = js.parse(bytes) {
        log::warn!("javascript context lost: {err}");
    }
}

type Html = Machine<HtmlContext>;

fn lowercase_into(dst: &mut BString, src: &[u8]) {
    dst.clear();
    dst.extend(src.iter().map(u8::to_ascii_lowercase));
}

fn enter_tag_name(m: &mut Html, _: Step) -> Option<State> {
    m.start_record();
    let ctx = m.user_mut();
    ctx.tag.clear();
    ctx.attr.clear();
    ctx.attr_type = AttrType::None;
    None
}

fn exit_tag_name(m: &mut Html, _: Step) -> Option<State> {
    m.stop_record();
    let (ctx, name) = m.user_and_record();
    if name.starts_with(b"/") {
        ctx.tag.clear();
    } else {
        lowercase_into(&mut ctx.tag, name);
    }
    None
}

fn enter_attr(m: &mut Html, _: Step) -> Option<State> {
    m.start_record();
    let ctx = m.user_mut();
    ctx.attr.clear();
    ctx.attr_type = AttrType::None;
    None
}

fn exit_attr(m: &mut Html, _: Step) -> Option<State> {
    m.stop_record();
    let (ctx, name) = m.user_and_record();
    lowercase_into(&mut ctx.attr, name);
    ctx.attr_type = AttrType::classify(name);
    None
}

fn enter_tag_close(m: &mut Html, _: Step) -> Option<State> {
    let ctx = m.user_mut();
    if !CDATA_TAGS.contains(&ctx.tag.as_slice()) {
        return None;
    }
    ctx.in_js = ctx.tag.as_slice() == b"script";
    if ctx.in_js {
        ctx.js.reset();
    }
    Some(Internal::CdataText.state())
}

fn in_cdata(m: &mut Html, step: Step) -> Option<State> {
    // Bytes that led into the body (the `>` of the open tag) are not content.
    let from_body = Internal::from_state(step.from).is_some_and(Internal::is_cdata);
    match step.byte {
        Some(byte) if from_body && m.user().in_js => m.user_mut().feed_js(&[byte]),
        _ => {}
    }
    None
}

fn enter_close_candidate(m: &mut Html, _: Step) -> Option<State> {
    m.start_record();
    None
}

fn exit_close_candidate(m: &mut Html, step: Step) -> Option<State> {
    m.stop_record();
    if step.to != Internal::Text.state() && step.to != Internal::TagSpace.state() {
        return None;
    }

    let (ctx, record) = m.user_and_record();
    let candidate = record.strip_prefix(b"/").unwrap_or(record);
    if candidate.eq_ignore_ascii_case(ctx.tag.as_slice()) {
        ctx.tag.clear();
        ctx.in_js = false;
        None
    } else {
        log::trace!(
            "`</{}` does not close <{}>, staying in raw text",
            BStr::new(candidate),
            ctx.tag
        );
        Some(Internal::CdataText.state())
    }
}

fn enter_value(m: &mut Html, _: Step) -> Option<State> {
    let ctx = m.user_mut();
    ctx.value_index = 0;
    if ctx.attr_type == AttrType::Js {
        ctx.js.reset();
        ctx.entity.reset();
    }
    None
}

fn enter_value_content(m: &mut Html, _: Step) -> Option<State> {
    m.start_record();
    m.user_mut().value_index = 0;
    None
}

fn in_value_content(m: &mut Html, step: Step) -> Option<State> {
    let ctx = m.user_mut();
    ctx.value_index += 1;
    if ctx.attr_type != AttrType::Js {
        return None;
    }
    if let Some(byte) = step.byte {
        ctx.feed_decoded(Some(byte));
    }
    None
}

fn exit_value_content(m: &mut Html, _: Step) -> Option<State> {
    m.stop_record();
    let ctx = m.user_mut();
    if ctx.attr_type == AttrType::Js {
        ctx.feed_decoded(None);
    }
    None
}

fn in_js_file(m: &mut Html, step: Step) -> Option<State> {
    if let Some(byte) = step.byte {
        m.user_mut().feed_js(&[byte]);
    }
    None
}

/// Builds the HTML transition table with its hooks.
pub(crate) fn definition() -> Result<Definition<HtmlContext>, ConfigError> {
    use Internal as I;

    let mut def = Definition::new(Internal::ALL.len())?;
    def.populate(RULES)?;
    def.set_names(&Internal::ALL.map(Internal::name))?;

    def.set_enter(I::TagName.state(), enter_tag_name)?;
    def.set_exit(I::TagName.state(), exit_tag_name)?;
    def.set_enter(I::Attr.state(), enter_attr)?;
    def.set_exit(I::Attr.state(), exit_attr)?;
    def.set_enter(I::TagClose.state(), enter_tag_close)?;

    for start in [I::Value, I::ValueQStart, I::ValueDqStart] {
        def.set_enter(start.state(), enter_value)?;
    }
    for content in [I::ValueText, I::ValueQ, I::ValueDq] {
        def.set_enter(content.state(), enter_value_content)?;
        def.set_in_state(content.state(), in_value_content)?;
        def.set_exit(content.state(), exit_value_content)?;
    }

    def.set_in_state(I::CdataText.state(), in_cdata)?;
    def.set_in_state(I::CdataLt.state(), in_cdata)?;
    def.set_in_state(I::CdataMayClose.state(), in_cdata)?;
    def.set_enter(I::CdataMayClose.state(), enter_close_candidate)?;
    def.set_exit(I::CdataMayClose.state(), exit_close_candidate)?;

    def.set_in_state(I::JsFile.state(), in_js_file)?;

    Ok(def)
}
