//! Streaming decoder for HTML character references.
//!
//! [`EntityDecoder`] is fed one byte at a time and hands back whatever output
//! that byte completes:
//! - outside a reference every byte comes straight back,
//! - `&` opens a reference and yields nothing until `;` or whitespace closes
//!   it,
//! - a closed reference is resolved as decimal (`#65`), hexadecimal (`#x41`,
//!   `#X41`) or one of the named references `amp`, `lt`, `gt`, `quot`,
//!   `apos` (matched case-insensitively).
//!
//! Decoding is best effort. Anything that does not resolve comes back exactly
//! as it was read, terminator included, and a reference that grows past
//! [`MAX_ENTITY_SIZE`] bytes is flushed verbatim. Nothing is ever dropped and
//! nothing is ever an error: attribute values are untrusted data, not a
//! grammar to validate.

use alloc::vec::Vec;

/// Longest reference body (the part after `&`) that is still buffered.
pub const MAX_ENTITY_SIZE: usize = 10;

const NAMED: [(&[u8], char); 5] = [
    (b"amp", '&'),
    (b"lt", '<'),
    (b"gt", '>'),
    (b"quot", '"'),
    (b"apos", '\''),
];

/// Byte-at-a-time character reference decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecoder {
    buffer: [u8; MAX_ENTITY_SIZE],
    len: usize,
    in_entity: bool,
    // `&` + body + terminator
    output: [u8; MAX_ENTITY_SIZE + 2],
    out_len: usize,
}

impl EntityDecoder {
    /// Creates a decoder outside any reference.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0; MAX_ENTITY_SIZE],
            len: 0,
            in_entity: false,
            output: [0; MAX_ENTITY_SIZE + 2],
            out_len: 0,
        }
    }

    /// Forgets any partially read reference.
    pub fn reset(&mut self) {
        self.len = 0;
        self.in_entity = false;
        self.out_len = 0;
    }

    /// Whether a reference has been opened and not yet closed.
    #[must_use]
    pub fn in_entity(&self) -> bool {
        self.in_entity
    }

    /// Consumes one byte and returns the decoded output it completes, which
    /// is empty while a reference is being accumulated.
    pub fn decode(&mut self, byte: u8) -> &[u8] {
        self.out_len = 0;

        if !self.in_entity {
            if byte == b'&' {
                self.in_entity = true;
                self.len = 0;
            } else {
                self.emit(&[byte]);
            }
            return self.output();
        }

        if byte == b';' || byte.is_ascii_whitespace() {
            self.in_entity = false;
            match resolve(&self.buffer[..self.len]) {
                Some(ch) => {
                    let mut utf8 = [0; 4];
                    self.emit(ch.encode_utf8(&mut utf8).as_bytes());
                    if byte != b';' {
                        self.emit(&[byte]);
                    }
                }
                None => {
                    self.flush_pending();
                    self.emit(&[byte]);
                }
            }
        } else if byte == b'&' {
            // `&&amp;`: the first reference is abandoned, the second starts.
            self.flush_pending();
            self.len = 0;
        } else {
            self.buffer[self.len] = byte;
            self.len += 1;
            if self.len == MAX_ENTITY_SIZE {
                self.in_entity = false;
                self.flush_pending();
            }
        }

        self.output()
    }

    /// Ends the stream: an unterminated reference comes back verbatim.
    pub fn finish(&mut self) -> &[u8] {
        self.out_len = 0;
        if self.in_entity {
            self.in_entity = false;
            self.flush_pending();
        }
        self.output()
    }

    fn flush_pending(&mut self) {
        let pending = self.buffer;
        let len = self.len;
        self.emit(b"&");
        self.emit(&pending[..len]);
    }

    fn emit(&mut self, bytes: &[u8]) {
        let end = self.out_len + bytes.len();
        self.output[self.out_len..end].copy_from_slice(bytes);
        self.out_len = end;
    }

    fn output(&self) -> &[u8] {
        &self.output[..self.out_len]
    }
}

impl Default for EntityDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a complete buffer, flushing any trailing unterminated reference.
#[must_use]
pub fn decode_entities(input: &[u8]) -> Vec<u8> {
    let mut decoder = EntityDecoder::new();
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        out.extend_from_slice(decoder.decode(byte));
    }
    out.extend_from_slice(decoder.finish());
    out
}

fn resolve(body: &[u8]) -> Option<char> {
    match body {
        [b'#', b'x' | b'X', hex @ ..] => numeric(hex, 16),
        [b'#', dec @ ..] => numeric(dec, 10),
        _ => NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(body))
            .map(|&(_, ch)| ch),
    }
}

fn numeric(digits: &[u8], radix: u32) -> Option<char> {
    if digits.is_empty() || !digits.iter().all(|&b| char::from(b).is_digit(radix)) {
        return None;
    }
    let digits = core::str::from_utf8(digits).ok()?;
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::named(b"&amp;", b"&")]
    #[case::decimal(b"&#65;", b"A")]
    #[case::hex(b"&#x41;", b"A")]
    #[case::upper_hex(b"&#X41;", b"A")]
    #[case::all_named(b"&lt;&gt;&quot;&apos;", b"<>\"'")]
    #[case::case_insensitive(b"&AMP;", b"&")]
    #[case::unknown(b"&bogus;", b"&bogus;")]
    #[case::empty(b"&;", b"&;")]
    #[case::empty_hex(b"&#x;", b"&#x;")]
    #[case::bad_digits(b"&#1a;", b"&#1a;")]
    #[case::signed(b"&#+65;", b"&#+65;")]
    #[case::surrogate(b"&#xd800;", b"&#xd800;")]
    #[case::multibyte(b"&#233;", "\u{e9}".as_bytes())]
    #[case::whitespace_terminated(b"a&amp b", b"a& b")]
    #[case::whitespace_unknown(b"&nope\tx", b"&nope\tx")]
    #[case::plain(b"go('x')", b"go('x')")]
    #[case::double_amp(b"&&amp;", b"&&")]
    #[case::unterminated(b"x&amp", b"x&amp")]
    #[case::overflow(b"&abcdefghijklm;", b"&abcdefghijklm;")]
    fn decodes(#[case] input: &[u8], #[case] expected: &[u8]) {
        assert_eq!(decode_entities(input), expected);
    }

    #[test]
    fn output_per_byte() {
        let mut d = EntityDecoder::new();
        assert_eq!(d.decode(b'a'), b"a");
        assert_eq!(d.decode(b'&'), b"");
        assert!(d.in_entity());
        assert_eq!(d.decode(b'l'), b"");
        assert_eq!(d.decode(b't'), b"");
        assert_eq!(d.decode(b';'), b"<");
        assert!(!d.in_entity());
    }

    #[test]
    fn overflow_flushes_at_capacity() {
        let mut d = EntityDecoder::new();
        let mut out = Vec::new();
        d.decode(b'&');
        for _ in 0..MAX_ENTITY_SIZE - 1 {
            assert_eq!(d.decode(b'z'), b"");
        }
        out.extend_from_slice(d.decode(b'z'));
        assert_eq!(out.len(), MAX_ENTITY_SIZE + 1);
        assert_eq!(out[0], b'&');
        assert!(!d.in_entity());
        // back to pass-through
        assert_eq!(d.decode(b';'), b";");
    }

    #[test]
    fn reset_discards_partial_reference() {
        let mut d = EntityDecoder::new();
        d.decode(b'&');
        d.decode(b'q');
        d.reset();
        assert!(!d.in_entity());
        assert_eq!(d.finish(), b"");
        assert_eq!(d.decode(b'q'), b"q");
    }
}
