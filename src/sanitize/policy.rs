//! Allowed vocabularies per EPUB generation.

use std::collections::HashSet;

use crate::book::EpubVersion;

/// Attributes allowed on any element.
const ALLOWED_ATTRIBUTES: &[&str] = &[
    "about", "accesskey", "alt", "aria-activedescendant", "aria-atomic",
    "aria-autocomplete", "aria-busy", "aria-checked", "aria-controls", "aria-describedat",
    "aria-describedby", "aria-disabled", "aria-dropeffect", "aria-expanded", "aria-flowto",
    "aria-grabbed", "aria-haspopup", "aria-hidden", "aria-invalid", "aria-label",
    "aria-labelledby", "aria-level", "aria-live", "aria-multiline", "aria-multiselectable",
    "aria-orientation", "aria-owns", "aria-posinset", "aria-pressed", "aria-readonly",
    "aria-relevant", "aria-required", "aria-selected", "aria-setsize", "aria-sort",
    "aria-valuemax", "aria-valuemin", "aria-valuenow", "aria-valuetext", "class", "colspan",
    "content", "contenteditable", "contextmenu", "datatype", "dir", "draggable", "dropzone",
    "epub:prefix", "epub:type", "hidden", "href", "hreflang", "id", "inlist", "itemid",
    "itemref", "itemscope", "itemtype", "lang", "media", "prefix", "property", "rel",
    "resource", "rev", "role", "rowspan", "spellcheck", "src", "style", "tabindex", "target",
    "title", "type", "typeof", "vocab", "xml:base", "xml:lang", "xml:space",
];

/// HTML5-only attributes with no meaning under the XHTML 1.1 DTD.
const HTML5_ONLY_ATTRIBUTES: &[&str] = &[
    "contenteditable", "contextmenu", "draggable", "dropzone", "epub:prefix", "epub:type",
    "hidden", "spellcheck",
];

/// XHTML 1.1 elements accepted in EPUB 2 content documents.
const XHTML11_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "applet", "b", "basefont", "bdo", "big", "blockquote",
    "br", "caption", "center", "cite", "code", "col", "colgroup", "dd", "del", "dfn", "div",
    "dl", "dt", "em", "embed", "font", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "iframe",
    "img", "ins", "kbd", "li", "map", "object", "ol", "p", "param", "pre", "q", "s", "samp",
    "small", "span", "strike", "strong", "sub", "sup", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "tt", "u", "ul", "var",
];

/// Elements EPUB 3 content documents accept on top of the XHTML 1.1 set.
const HTML5_TAGS: &[&str] = &[
    "article", "aside", "audio", "bdi", "details", "figcaption", "figure", "footer", "header",
    "hgroup", "main", "mark", "nav", "rp", "rt", "ruby", "section", "source", "summary", "time",
    "track", "video", "wbr",
];

/// The allowed tag and attribute sets for one target version.
#[derive(Debug, Clone)]
pub struct Policy {
    tags: HashSet<String>,
    attributes: HashSet<String>,
    strict: bool,
}

impl Policy {
    /// Build a policy from explicit sets.
    ///
    /// A strict policy targets the XHTML 1.1 DTD: attributes in the `epub:`
    /// namespace are rejected even when listed, since the EPUB 2 document
    /// header declares no such namespace.
    pub fn new<T, A>(tags: T, attributes: A, strict: bool) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            strict,
        }
    }

    /// The default policy for a target version.
    pub fn for_version(version: EpubVersion) -> Self {
        match version {
            EpubVersion::V2 => Self::new(
                XHTML11_TAGS.iter().copied(),
                ALLOWED_ATTRIBUTES
                    .iter()
                    .copied()
                    .filter(|a| !HTML5_ONLY_ATTRIBUTES.contains(a)),
                true,
            ),
            EpubVersion::V3 => Self::new(
                XHTML11_TAGS.iter().chain(HTML5_TAGS).copied(),
                ALLOWED_ATTRIBUTES.iter().copied(),
                false,
            ),
        }
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn allows_attribute(&self, name: &str) -> bool {
        if self.strict && name.starts_with("epub:") {
            return false;
        }
        self.attributes.contains(name)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Label for diagnostics naming the content model being enforced.
    pub fn dialect(&self) -> &'static str {
        if self.strict {
            "EPUB 2/XHTML 1.1 DTD"
        } else {
            "EPUB 3/XHTML5"
        }
    }
}
