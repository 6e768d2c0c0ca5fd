#![allow(missing_docs)]
#![allow(dead_code)]

// A template as an engine would feed it: cut wherever a variable could be
// substituted, which is often in the middle of a construct.
#[rustfmt::skip]
pub const STREAM: [&str; 13] = [
    r#"<!DOCTYPE html><html><head><title>"#,    // title body is raw text
    r#"a < b</title>"#,                         // `<` inside raw text, then the close tag
    r#"<script>var s = 'x"#,                    // inside a script string
    r#"</b>';</scr"#,                           // a close tag that does not match, then one cut short
    r#"ipt>"#,                                  // the script closes across the seam
    r#"<a href="#,                              // unquoted URL value start
    r#""/x?y=1&amp;z=2" onclick='go(&quot;"#,   // entity-encoded quote opens a JS string
    r#"a&amp;b&quot;)'>"#,                      // ...and closes it
    r#"<!-- note -"#,                           // inside a comment
    r#"-></a>"#,                                // comment close across the seam
    r#"<p style=color:"#,                       // inline CSS
    r#"red>"#,
    r#""#,
];

pub fn joined() -> String {
    STREAM.concat()
}
