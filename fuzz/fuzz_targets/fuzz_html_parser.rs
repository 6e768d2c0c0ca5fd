#![no_main]
use std::cell::RefCell;

use arbitrary::{Arbitrary, Unstructured};
use htmlcontext::{HtmlParser, ParserMode, ParserOptions};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Markup building blocks, so mutations reach deep into tags, values and
/// raw-text bodies instead of bouncing off `<`.
#[derive(Debug, Arbitrary)]
enum Token {
    Open(Name),
    Close(Name),
    Attr(Name, Quote, Vec<Piece>),
    Comment(Vec<Piece>),
    Text(Vec<Piece>),
    Raw(Vec<u8>),
}

#[derive(Debug, Arbitrary)]
enum Name {
    Script,
    Style,
    Title,
    Textarea,
    A,
    Href,
    Onclick,
    Other(String),
}

#[derive(Debug, Arbitrary)]
enum Quote {
    None,
    Single,
    Double,
}

#[derive(Debug, Arbitrary)]
enum Piece {
    Word(String),
    Entity(u32),
    Named,
    Quote,
    DoubleQuote,
    Slash,
    Star,
    Lt,
    Newline,
}

impl Name {
    fn write(&self, out: &mut Vec<u8>, upper: bool) {
        let name: &str = match self {
            Name::Script => "script",
            Name::Style => "style",
            Name::Title => "title",
            Name::Textarea => "textarea",
            Name::A => "a",
            Name::Href => "href",
            Name::Onclick => "onclick",
            Name::Other(s) => s,
        };
        if upper {
            out.extend(name.bytes().map(|b| b.to_ascii_uppercase()));
        } else {
            out.extend_from_slice(name.as_bytes());
        }
    }
}

fn write_pieces(pieces: &[Piece], out: &mut Vec<u8>) {
    for piece in pieces {
        match piece {
            Piece::Word(s) => out.extend_from_slice(s.as_bytes()),
            Piece::Entity(n) => out.extend_from_slice(format!("&#{n};").as_bytes()),
            Piece::Named => out.extend_from_slice(b"&amp;"),
            Piece::Quote => out.push(b'\''),
            Piece::DoubleQuote => out.push(b'"'),
            Piece::Slash => out.push(b'/'),
            Piece::Star => out.push(b'*'),
            Piece::Lt => out.push(b'<'),
            Piece::Newline => out.push(b'\n'),
        }
    }
}

impl Token {
    fn write(&self, out: &mut Vec<u8>, upper: bool) {
        match self {
            Token::Open(name) => {
                out.push(b'<');
                name.write(out, upper);
                out.push(b'>');
            }
            Token::Close(name) => {
                out.extend_from_slice(b"</");
                name.write(out, upper);
                out.push(b'>');
            }
            Token::Attr(name, quote, value) => {
                out.push(b' ');
                name.write(out, upper);
                out.push(b'=');
                let q = match quote {
                    Quote::None => None,
                    Quote::Single => Some(b'\''),
                    Quote::Double => Some(b'"'),
                };
                out.extend(q);
                write_pieces(value, out);
                out.extend(q);
            }
            Token::Comment(body) => {
                out.extend_from_slice(b"<!--");
                write_pieces(body, out);
                out.extend_from_slice(b"-->");
            }
            Token::Text(body) => write_pieces(body, out),
            Token::Raw(bytes) => out.extend_from_slice(bytes),
        }
    }
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed % 10 == 0 {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x1F);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let mut prefix = HEADER;
        while prefix < size.max(HEADER + 1) && prefix < max_size {
            let written = append_tokens(&mut data[prefix..max_size], size);
            if written == 0 {
                break;
            }
            prefix += written;
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

fn append_tokens(buf: &mut [u8], size: usize) -> usize {
    let limit = buf.len();
    let tokens = loop {
        let n = with_rng(|rng| rng.random_range(1..size.max(2) * 2));
        let bytes: Vec<u8> = with_rng(|rng| (0..n).map(|_| rng.random::<u8>()).collect());
        if let Ok(tokens) = Vec::<Token>::arbitrary(&mut Unstructured::new(&bytes)) {
            break tokens;
        }
    };

    let upper = with_rng(|rng| rng.random_bool(0.2));
    let mut out = Vec::new();
    for token in &tokens {
        token.write(&mut out, upper);
    }

    let len = out.len().min(limit);
    buf[..len].copy_from_slice(&out[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

fn parser(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u64::from(u32::from_le_bytes(data[1..5].try_into().unwrap()));
    let data = &data[HEADER..];

    let options = ParserOptions {
        mode: match flags & 3 {
            0 => ParserMode::Html,
            1 => ParserMode::Js,
            2 => ParserMode::Css,
            _ => ParserMode::HtmlInTag,
        },
        panic_on_error: true,
    };

    let mut whole = HtmlParser::with_options(options).unwrap();
    let mut chunked = whole.clone();
    whole.parse(data).unwrap();

    let mut start = 0;
    while start < data.len() {
        let size = (split_seed as usize % (data.len() - start)) + 1;
        chunked.parse(&data[start..start + size]).unwrap();
        // substitution sites at chunk boundaries must never disturb parsing
        if flags & 4 != 0 {
            let mut probe = chunked.duplicate();
            probe.insert_text();
        }
        start += size;
    }

    assert_eq!(whole.state(), chunked.state());
    assert_eq!(whole.tag(), chunked.tag());
    assert_eq!(whole.attr(), chunked.attr());
    assert_eq!(whole.value(), chunked.value());
    assert_eq!(whole.value_index(), chunked.value_index());
    assert_eq!(whole.js_state(), chunked.js_state());
    assert_eq!(whole.in_css(), chunked.in_css());
}

fuzz_target!(|data: &[u8]| parser(data));
