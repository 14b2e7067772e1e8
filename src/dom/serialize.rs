//! XHTML serialization of arena subtrees.

use super::arena::{Dom, NodeData, NodeId};
use crate::util::is_xml_char;

/// HTML void elements, written self-closed.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Serialize the children of `root` as well-formed XHTML markup.
///
/// Comments are dropped, and characters outside the XML 1.0 `Char`
/// production are removed from text and attribute values.
pub fn serialize_children(dom: &Dom, root: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(root) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.qualified_name());
                out.push_str("=\"");
                push_escaped(out, &attr.value, true);
                out.push('"');
            }

            if node.first_child.is_none() && VOID_ELEMENTS.contains(&tag) {
                out.push_str("/>");
                return;
            }

            out.push('>');
            // The parser strips one leading newline from these elements.
            if matches!(tag, "pre" | "listing" | "textarea")
                && dom.text(node.first_child).is_some_and(|t| t.starts_with('\n'))
            {
                out.push('\n');
            }
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeData::Text(text) => push_escaped(out, text, false),
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        NodeData::Comment(_) => {}
    }
}

fn push_escaped(out: &mut String, s: &str, in_attribute: bool) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
}
