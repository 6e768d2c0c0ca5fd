//! Shows how an auto-escaping template engine uses the parser.
//!
//! The template below has four `{{name}}` substitution sites in four very
//! different places. The engine feeds the literal text between them to the
//! parser and, at each site, asks where it is before choosing an escaper.
//! The same user input needs HTML entity escaping in element content, URL
//! validation at the start of an `href`, JavaScript string escaping inside
//! an event handler, and so on.
//!
//! Run with
//!
//! ```bash
//! cargo run -p htmlcontext --example escape_decisions
//! ```

use htmlcontext::{AttrType, HtmlParser, HtmlState};

/// The escaper a template engine would apply at a substitution site.
#[derive(Debug)]
enum Escaper {
    HtmlText,
    HtmlAttribute,
    UnquotedAttribute,
    ValidatedUrl,
    JsString,
    JsValue,
    Css,
    Reject,
}

fn choose(parser: &HtmlParser) -> Escaper {
    if parser.is_js_quoted() {
        return Escaper::JsString;
    }
    if parser.in_js() {
        return Escaper::JsValue;
    }
    if parser.in_css() {
        return Escaper::Css;
    }
    match parser.state() {
        HtmlState::Text => Escaper::HtmlText,
        HtmlState::Value if parser.is_url_start() => Escaper::ValidatedUrl,
        HtmlState::Value if parser.is_attr_quoted() => Escaper::HtmlAttribute,
        HtmlState::Value => Escaper::UnquotedAttribute,
        // tag and attribute names, comments
        _ => Escaper::Reject,
    }
}

fn main() {
    let template = concat!(
        "<p>Hello, {{name}}!</p>\n",
        "<a href={{name}} title=\"{{name}}\"\n",
        "   onclick=\"greet(&#39;{{name}}&#39;)\">hi</a>\n",
    );

    let mut parser = HtmlParser::new().expect("grammar builds");
    let mut rest = template;
    while let Some(site) = rest.find("{{name}}") {
        parser
            .parse(rest[..site].as_bytes())
            .expect("HTML parsing does not fail");

        let escaper = choose(&parser);
        println!(
            "line {:>2}: {:<8} attr={:<8} type={:<8} -> {escaper:?}",
            parser.line_number(),
            format!("{:?}", parser.state()),
            parser.attr().map(ToString::to_string).unwrap_or_default(),
            format!("{:?}", parser.attr_type()),
        );

        // An unquoted value that is entirely substituted has no literal first
        // byte; tell the parser a value is there.
        if parser.attr_type() != AttrType::None && parser.value_index() == Some(0) {
            parser.insert_text();
        }
        rest = &rest[site + "{{name}}".len()..];
    }
    parser.parse(rest.as_bytes()).expect("HTML parsing does not fail");
    println!("end: {:?}", parser.state());
}
