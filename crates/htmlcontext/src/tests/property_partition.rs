use alloc::vec::Vec;

use quickcheck::QuickCheck;

use super::arbitrary::Markup;
use crate::{
    AttrType, Grammar, HtmlParser, HtmlState, JsParser, JsState, ParserMode, ParserOptions,
    ValueQuote,
};

/// Everything a template engine can ask the parser.
#[derive(Debug, PartialEq, Eq)]
struct Observation {
    state: HtmlState,
    tag: Option<Vec<u8>>,
    attr: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
    value_index: Option<usize>,
    attr_type: AttrType,
    quote: Option<ValueQuote>,
    in_js: bool,
    js_state: Option<JsState>,
    in_css: bool,
    url_start: bool,
    line: usize,
    column: usize,
}

fn observe(p: &HtmlParser) -> Observation {
    Observation {
        state: p.state(),
        tag: p.tag().map(|t| t.to_vec()),
        attr: p.attr().map(|a| a.to_vec()),
        value: p.value().map(|v| v.to_vec()),
        value_index: p.value_index(),
        attr_type: p.attr_type(),
        quote: p.value_quote(),
        in_js: p.in_js(),
        js_state: p.js_state(),
        in_css: p.in_css(),
        url_start: p.is_url_start(),
        line: p.line_number(),
        column: p.column_number(),
    }
}

/// Cuts `src` into consecutive chunks whose sizes are derived from `splits`.
fn chunks<'a>(src: &'a [u8], splits: &[usize]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let mut rest = src;
    for &s in splits {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at(1 + s % rest.len());
        out.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

fn tests() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

/// Property: feeding a document in arbitrary chunks leaves the parser in
/// exactly the state that feeding it whole does.
#[test]
fn partition_transparency_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(markup: Markup, splits: Vec<usize>, mode: ParserMode) -> bool {
        let grammar = Grammar::new().unwrap();
        let options = ParserOptions {
            mode,
            ..Default::default()
        };

        let mut whole = HtmlParser::with_grammar(&grammar, options);
        let whole_result = whole.parse(&markup.0);

        let mut chunked = HtmlParser::with_grammar(&grammar, options);
        let mut chunked_result = chunked.parse(b"");
        for chunk in chunks(&markup.0, &splits) {
            chunked_result = chunked.parse(chunk);
        }

        whole_result == chunked_result && observe(&whole) == observe(&chunked)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Markup, Vec<usize>, ParserMode) -> bool);
}

/// Property: two fresh parsers given the same input agree, and a duplicate
/// taken halfway continues exactly like the original.
#[test]
fn determinism_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(head: Markup, tail: Markup) -> bool {
        let mut a = HtmlParser::new().unwrap();
        let mut b = HtmlParser::new().unwrap();
        a.parse(&head.0).unwrap();
        b.parse(&head.0).unwrap();

        let mut fork = a.duplicate();
        a.parse(&tail.0).unwrap();
        b.parse(&tail.0).unwrap();
        fork.parse(&tail.0).unwrap();

        observe(&a) == observe(&b) && observe(&a) == observe(&fork)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Markup, Markup) -> bool);
}

/// Property: the JavaScript tracker is chunking-transparent too.
#[test]
fn js_partition_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(markup: Markup, splits: Vec<usize>) -> bool {
        let mut whole = JsParser::new().unwrap();
        let mut chunked = whole.clone();
        let expected = whole.parse(&markup.0);
        for chunk in chunks(&markup.0, &splits) {
            chunked.parse(chunk).unwrap();
        }
        expected == Ok(chunked.state())
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Markup, Vec<usize>) -> bool);
}
