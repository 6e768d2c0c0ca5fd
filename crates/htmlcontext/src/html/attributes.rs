/// What an attribute's value means, as far as escaping is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrType {
    /// Not inside an attribute.
    #[default]
    None,
    /// Plain text.
    Regular,
    /// A URL (`href`, `src`, …).
    Uri,
    /// An event handler (`onclick`, …): the value is JavaScript.
    Js,
    /// An inline stylesheet.
    Style,
}

/// Attributes whose value is a URL. Kept sorted.
const URI_ATTRIBUTES: [&[u8]; 18] = [
    b"action",
    b"archive",
    b"background",
    b"cite",
    b"classid",
    b"codebase",
    b"data",
    b"dynsrc",
    b"formaction",
    b"href",
    b"longdesc",
    b"lowsrc",
    b"manifest",
    b"poster",
    b"profile",
    b"src",
    b"usemap",
    b"xmlns",
];

impl AttrType {
    /// Classifies an attribute name, ignoring ASCII case. An empty name is
    /// [`AttrType::None`].
    #[must_use]
    pub fn classify(name: &[u8]) -> Self {
        if name.is_empty() {
            return Self::None;
        }
        if name.len() >= 2 && name[..2].eq_ignore_ascii_case(b"on") {
            return Self::Js;
        }
        if name.eq_ignore_ascii_case(b"style") {
            return Self::Style;
        }
        let is_uri = URI_ATTRIBUTES
            .binary_search_by(|probe| {
                probe
                    .iter()
                    .map(u8::to_ascii_lowercase)
                    .cmp(name.iter().map(u8::to_ascii_lowercase))
            })
            .is_ok();
        if is_uri { Self::Uri } else { Self::Regular }
    }
}
