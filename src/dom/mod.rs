//! Fragment parsing into an arena DOM.
//!
//! Every fragment is re-rooted under a single synthetic `<body>` so that the
//! sanitizer and image passes always operate on one canonical subtree.

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, Dom, Node, NodeData, NodeId};
pub use serialize::serialize_children;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;

use tree_sink::DomSink;

/// A parsed HTML fragment whose payload hangs off a synthetic `<body>`.
#[derive(Debug)]
pub struct Fragment {
    pub dom: Dom,
    pub body: NodeId,
}

impl Fragment {
    /// Serialize the inner markup of the synthetic body.
    pub fn to_xhtml(&self) -> String {
        serialize_children(&self.dom, self.body)
    }

    /// De-tagged text content of the payload.
    pub fn text(&self) -> String {
        self.dom.text_content(self.body)
    }
}

/// Parse an HTML fragment with browser-style error recovery.
///
/// If the fragment has its own `<body>`, only that body's content is kept.
/// Otherwise the whole parsed tree is the payload: the implied `<head>` and
/// `<body>` wrappers are dissolved and their children kept in order.
pub fn parse_fragment(html: &str) -> Fragment {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut dom = parse_document(DomSink::new(), opts)
        .from_utf8()
        .one(html.as_bytes())
        .into_dom();

    let payload = if has_body_tag(html) {
        match dom.find_by_tag("body") {
            Some(body) => dom.children(body).collect(),
            None => Vec::new(),
        }
    } else {
        let mut nodes = Vec::new();
        let roots: Vec<_> = dom.children(dom.document()).collect();
        for root in roots {
            if dom.tag(root) != Some("html") {
                nodes.push(root);
                continue;
            }
            for child in dom.children(root) {
                match dom.tag(child) {
                    Some("head") | Some("body") => nodes.extend(dom.children(child)),
                    _ => nodes.push(child),
                }
            }
        }
        nodes
    };

    let body = dom.create_html_element("body");
    for node in payload {
        dom.detach(node);
        dom.append(body, node);
    }

    Fragment { dom, body }
}

/// Whether the raw markup contains an explicit `<body` start tag.
fn has_body_tag(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    lower.match_indices("<body").any(|(pos, m)| {
        matches!(
            lower.as_bytes().get(pos + m.len()),
            None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
        )
    })
}
