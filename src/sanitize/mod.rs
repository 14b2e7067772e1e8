//! Markup sanitizer.
//!
//! Restricts a fragment to the allowed vocabulary of the target version.
//! Disallowed elements are never dropped: they are replaced by a generic,
//! attribute-less container holding the same children, so no text is lost.

mod policy;

pub use policy::Policy;

use tracing::warn;

use crate::dom::{Dom, Fragment, NodeId, parse_fragment};

/// `alt` text given to images that have none.
pub const IMAGE_ALT_PLACEHOLDER: &str = "image-placeholder";

/// Elements whose direct children the parser moves out of the table unless
/// they are table structure themselves.
const TABLE_CONTEXT: &[&str] = &["table", "tbody", "thead", "tfoot", "tr"];

/// Children that stay in place when their disallowed parent sits in table context.
const TABLE_PARTS: &[&str] = &[
    "caption", "colgroup", "col", "thead", "tbody", "tfoot", "tr", "td", "th",
];

/// Rewrites performed by one sanitize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    pub unwrapped_elements: usize,
    pub removed_attributes: usize,
}

/// Applies a [`Policy`] to parsed fragments.
#[derive(Debug, Clone)]
pub struct Sanitizer<'a> {
    policy: &'a Policy,
    verbose: bool,
}

impl<'a> Sanitizer<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            verbose: false,
        }
    }

    /// Log every rewrite.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Parse, sanitize and re-serialize one HTML fragment.
    pub fn sanitize(&self, html: &str) -> String {
        let mut fragment = parse_fragment(html);
        self.sanitize_fragment(&mut fragment);
        fragment.to_xhtml()
    }

    /// Sanitize a parsed fragment in place.
    pub fn sanitize_fragment(&self, fragment: &mut Fragment) -> SanitizeStats {
        let mut stats = SanitizeStats::default();
        let body = fragment.body;
        let dom = &mut fragment.dom;

        // Deepest/last first: anything an unwrap moves has already been cleaned.
        let mut order = dom.elements(body);
        order.reverse();

        for id in order {
            let Some(tag) = dom.tag(id).map(str::to_owned) else {
                continue;
            };

            if tag == "img" && dom.get_attr(id, "alt").is_none_or(str::is_empty) {
                dom.set_attr(id, "alt", IMAGE_ALT_PLACEHOLDER);
            }

            let removed = dom.retain_attrs(id, |attr| {
                let name = attr.qualified_name();
                self.policy.allows_attribute(&name) && !(name == "type" && tag != "script")
            });
            if self.verbose {
                for name in &removed {
                    warn!(tag = %tag, attribute = %name, "Removed attribute not allowed on {}", self.policy.dialect());
                }
            }
            stats.removed_attributes += removed.len();

            if !self.policy.allows_tag(&tag) {
                if self.verbose {
                    warn!(tag = %tag, "Warning (content): {} tag isn't allowed on {}", tag, self.policy.dialect());
                }
                let table = enclosing_table(dom, id);
                let anchor = table.unwrap_or(id);
                // A block container inside a paragraph would re-parse as a paragraph break.
                let container = if dom.has_ancestor(anchor, body, "p") {
                    "span"
                } else {
                    "div"
                };
                match table {
                    Some(table) => hoist_before_table(dom, id, table, container),
                    None => {
                        dom.unwrap_into(id, container);
                    }
                }
                stats.unwrapped_elements += 1;
            }
        }

        stats
    }
}

/// The table `id` belongs to when its parent is table structure, where a
/// generic container would be moved out of the table on re-parse.
fn enclosing_table(dom: &Dom, id: NodeId) -> Option<NodeId> {
    let mut current = dom.parent(id);
    if !dom.tag(current).is_some_and(|t| TABLE_CONTEXT.contains(&t)) {
        return None;
    }
    while current.is_some() {
        if dom.tag(current) == Some("table") {
            return Some(current);
        }
        current = dom.parent(current);
    }
    None
}

/// Unwrap `id` out of table context: table parts stay where `id` was, other
/// children move into one `container` placed just before `table`. An element
/// with neither leaves nothing behind.
fn hoist_before_table(dom: &mut Dom, id: NodeId, table: NodeId, container: &str) {
    let parent = dom.tag(dom.parent(id)).unwrap_or_default().to_string();
    let children: Vec<_> = dom.children(id).collect();
    let mut hoisted = None;
    for child in children {
        dom.detach(child);
        if let Some(tag) = dom.tag(child).filter(|t| TABLE_PARTS.contains(t)) {
            let wrappers = implied_wrappers(&parent, tag);
            let mut slot = id;
            for wrapper in wrappers {
                let node = dom.create_html_element(wrapper);
                if slot == id {
                    dom.insert_before(id, node);
                } else {
                    dom.append(slot, node);
                }
                slot = node;
            }
            if slot == id {
                dom.insert_before(id, child);
            } else {
                dom.append(slot, child);
            }
            continue;
        }
        let target = match hoisted {
            Some(target) => target,
            None => {
                let target = dom.create_html_element(container);
                dom.insert_before(table, target);
                hoisted = Some(target);
                target
            }
        };
        dom.append(target, child);
    }
    dom.detach(id);
}

/// Row group and row elements the parser would insert between `parent` and `child`.
fn implied_wrappers(parent: &str, child: &str) -> &'static [&'static str] {
    match (parent, child) {
        ("table", "tr") => &["tbody"],
        ("table", "td" | "th") => &["tbody", "tr"],
        ("tbody" | "thead" | "tfoot", "td" | "th") => &["tr"],
        _ => &[],
    }
}

/// Sanitize one fragment against `policy`.
pub fn sanitize_html(html: &str, policy: &Policy) -> String {
    Sanitizer::new(policy).sanitize(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::EpubVersion;

    fn v2() -> Policy {
        Policy::for_version(EpubVersion::V2)
    }

    fn v3() -> Policy {
        Policy::for_version(EpubVersion::V3)
    }

    #[test]
    fn test_allowed_markup_passes_through() {
        let html = r#"<p class="lead">Hello <em>world</em></p>"#;
        assert_eq!(sanitize_html(html, &v3()), html);
    }

    #[test]
    fn test_image_gets_placeholder_alt() {
        let out = sanitize_html(r#"<img src="pic.png">"#, &v3());
        assert_eq!(out, r#"<img src="pic.png" alt="image-placeholder"/>"#);
    }

    #[test]
    fn test_image_keeps_existing_alt() {
        let out = sanitize_html(r#"<img src="pic.png" alt="A cat">"#, &v3());
        assert_eq!(out, r#"<img src="pic.png" alt="A cat"/>"#);
    }

    #[test]
    fn test_script_is_unwrapped_not_dropped() {
        let out = sanitize_html("<div><script>x</script><p>hi</p></div>", &v2());
        assert_eq!(out, "<div><div>x</div><p>hi</p></div>");
        assert_eq!(out.matches("<p>hi</p>").count(), 1);
    }

    #[test]
    fn test_disallowed_attributes_removed() {
        let out = sanitize_html(
            r#"<p onclick="evil()" data-id="7" id="keep" style="color:red">t</p>"#,
            &v3(),
        );
        assert_eq!(out, r#"<p id="keep" style="color:red">t</p>"#);
    }

    #[test]
    fn test_type_attribute_removed_outside_script() {
        let policy = Policy::new(["ol", "li", "script"], ["type"], false);
        let out = sanitize_html(
            r#"<ol type="a"><li>x</li></ol><script type="text/plain">y</script>"#,
            &policy,
        );
        assert_eq!(
            out,
            r#"<ol><li>x</li></ol><script type="text/plain">y</script>"#
        );
    }

    #[test]
    fn test_html5_elements_unwrapped_for_version2_only() {
        let html = "<section><h2>T</h2><p>body</p></section>";
        assert_eq!(sanitize_html(html, &v3()), html);
        assert_eq!(
            sanitize_html(html, &v2()),
            "<div><h2>T</h2><p>body</p></div>"
        );
    }

    #[test]
    fn test_unwrap_inside_paragraph_uses_inline_container() {
        let out = sanitize_html(r#"<p>a <blink class="x">b</blink> c</p>"#, &v3());
        assert_eq!(out, "<p>a <span>b</span> c</p>");
    }

    #[test]
    fn test_nested_disallowed_elements() {
        let out = sanitize_html(
            r#"<custom-a id="1"><custom-b title="t">deep</custom-b></custom-a>"#,
            &v3(),
        );
        assert_eq!(out, "<div><div>deep</div></div>");
    }

    #[test]
    fn test_strict_policy_strips_epub_type() {
        let html = r#"<aside epub:type="footnote" id="n1">note</aside>"#;
        assert_eq!(sanitize_html(html, &v3()), html);
        assert_eq!(sanitize_html(html, &v2()), r#"<div>note</div>"#);

        let span = r#"<span epub:type="pagebreak" id="p1">12</span>"#;
        assert_eq!(sanitize_html(span, &v2()), r#"<span id="p1">12</span>"#);
    }

    #[test]
    fn test_body_content_only() {
        let out = sanitize_html(
            "<html><head><style>p{}</style></head><body><p>x</p></body></html>",
            &v3(),
        );
        assert_eq!(out, "<p>x</p>");
    }

    #[test]
    fn test_empty_fragment() {
        assert_eq!(sanitize_html("", &v3()), "");
    }

    #[test]
    fn test_malformed_markup_recovers() {
        let out = sanitize_html("<p>unclosed <b>bold<p>next", &v3());
        assert_eq!(out, "<p>unclosed <b>bold</b></p><p><b>next</b></p>");
    }

    #[test]
    fn test_stats_count_rewrites() {
        let policy = v3();
        let mut fragment = parse_fragment(r#"<blink onclick="x">a</blink><p data-x="1">b</p>"#);
        let stats = Sanitizer::new(&policy)
            .verbose(true)
            .sanitize_fragment(&mut fragment);
        assert_eq!(stats.unwrapped_elements, 1);
        assert_eq!(stats.removed_attributes, 2);
    }

    #[test]
    fn test_sanitize_is_idempotent_on_sample() {
        let policy = v2();
        let once = sanitize_html(
            r#"<article><p>x <foo>y</foo></p><img src="a.png"><br></article>"#,
            &policy,
        );
        let twice = sanitize_html(&once, &policy);
        assert_eq!(once, twice);
    }

    fn assert_stable(html: &str, policy: &Policy) -> String {
        let once = sanitize_html(html, policy);
        assert_eq!(sanitize_html(&once, policy), once, "unstable output for {html:?}");
        once
    }

    #[test]
    fn test_preformatted_leading_newlines_are_stable() {
        assert_eq!(assert_stable("<pre>\n\nx</pre>", &v3()), "<pre>\n\nx</pre>");
        assert_eq!(assert_stable("<pre>\nx</pre>", &v3()), "<pre>x</pre>");
        assert_stable("<div><pre>\n\n\n  code\n</pre></div>", &v2());
    }

    #[test]
    fn test_unwrapped_script_moves_out_of_table() {
        for policy in [v2(), v3()] {
            let out = assert_stable(
                "<table><script>x</script><tr><td>a</td></tr></table>",
                &policy,
            );
            assert_eq!(
                out,
                "<div>x</div><table><tbody><tr><td>a</td></tr></tbody></table>"
            );
        }
    }

    #[test]
    fn test_empty_containers_in_table_are_dropped() {
        for html in [
            "<table><form></form><tr><td>a</td></tr></table>",
            r#"<table><input type="hidden"><tr><td>a</td></tr></table>"#,
            "<table><tbody><tr><style></style><td>a</td></tr></tbody></table>",
        ] {
            let out = assert_stable(html, &v2());
            assert_eq!(out, "<table><tbody><tr><td>a</td></tr></tbody></table>");
        }
    }

    #[test]
    fn test_template_rows_stay_in_table() {
        let out = assert_stable(
            "<table><template><tr><td>a</td></tr></template></table>",
            &v3(),
        );
        assert_eq!(out, "<table><tbody><tr><td>a</td></tr></tbody></table>");
    }

    #[test]
    fn test_table_inside_paragraph_hoists_inline_container() {
        let out = assert_stable("<p>t<table><style>s</style></table>", &v3());
        assert!(out.contains("<span>s</span><table>"), "{out}");
    }

    mod logging {
        use std::io;
        use std::sync::{Arc, Mutex};

        use super::v2;
        use crate::dom::parse_fragment;
        use crate::sanitize::Sanitizer;

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        fn logs_of(verbose: bool, html: &str) -> String {
            let captured = Captured::default();
            let writer = captured.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .finish();
            tracing::subscriber::with_default(subscriber, || {
                let policy = v2();
                let mut fragment = parse_fragment(html);
                Sanitizer::new(&policy)
                    .verbose(verbose)
                    .sanitize_fragment(&mut fragment);
            });
            let bytes = captured.0.lock().unwrap().clone();
            String::from_utf8(bytes).unwrap()
        }

        #[test]
        fn test_verbose_mode_logs_each_rewrite() {
            let logs = logs_of(true, r#"<section onclick="x">a</section>"#);
            assert!(
                logs.contains("section tag isn't allowed on EPUB 2/XHTML 1.1 DTD"),
                "{logs}"
            );
            assert!(logs.contains("attribute=onclick"), "{logs}");
            assert!(logs.contains("WARN"), "{logs}");
        }

        #[test]
        fn test_quiet_mode_logs_nothing() {
            assert!(logs_of(false, r#"<section onclick="x">a</section>"#).is_empty());
        }
    }
}
