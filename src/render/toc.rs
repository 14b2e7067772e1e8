//! Human-readable table of contents (`toc.xhtml`).

use crate::book::EpubVersion;
use crate::normalize::{STYLESHEET_HREF, charset_meta, document_header};
use crate::package::{PackageModel, Target};
use crate::util::escape_xml;

/// Render the table of contents. Entries follow the navigation map exactly,
/// so its order always matches the NCX play order.
pub fn render_toc(model: &PackageModel) -> String {
    let meta = &model.metadata;
    let mut toc = document_header(meta.version, &meta.lang);

    toc.push_str("<head>\n");
    toc.push_str(&format!("<title>{}</title>\n", escape_xml(&meta.title)));
    toc.push_str(charset_meta(meta.version));
    toc.push('\n');
    toc.push_str(&format!(
        "<link rel=\"stylesheet\" type=\"text/css\" href=\"{STYLESHEET_HREF}\"/>\n"
    ));
    toc.push_str("</head>\n<body>\n");
    toc.push_str(&format!(
        "<h1 class=\"h1\">{}</h1>\n",
        escape_xml(&meta.toc_title)
    ));

    let (open, close) = match meta.version {
        EpubVersion::V3 => ("<nav id=\"toc\" epub:type=\"toc\">", "</nav>"),
        EpubVersion::V2 => ("<div id=\"toc\">", "</div>"),
    };
    toc.push_str(open);
    toc.push_str("\n<ol>\n");

    for nav in &model.nav_points {
        toc.push_str(&format!(
            "<li class=\"table-of-content\"><a href=\"{}\">",
            escape_xml(&nav.href)
        ));
        match (nav.target, model.chapter(nav.target)) {
            (Target::Chapter(_), Some(chapter)) => {
                toc.push_str(&escape_xml(&chapter.display_title()));
                if !chapter.authors.is_empty() {
                    toc.push_str(&format!(
                        " - <small class=\"toc-author\">{}</small>",
                        escape_xml(&chapter.authors.join(", "))
                    ));
                }
                if let Some(url) = chapter.url.as_deref().filter(|u| !u.is_empty()) {
                    toc.push_str(&format!(
                        "<span class=\"toc-link\">{}</span>",
                        escape_xml(url)
                    ));
                }
            }
            _ => toc.push_str(&escape_xml(&nav.label)),
        }
        toc.push_str("</a></li>\n");
    }

    toc.push_str("</ol>\n");
    toc.push_str(close);
    toc.push_str("\n</body>\n</html>\n");
    toc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Book, Chapter, EpubOptions};
    use crate::render::check_well_formed;

    fn render(options: EpubOptions) -> String {
        render_toc(&PackageModel::build(&Book::from_options(&options).unwrap()))
    }

    #[test]
    fn test_entries_follow_navigation_order() {
        let toc = render(
            EpubOptions::new("T")
                .with_chapter(Chapter::new("a"))
                .with_chapter(Chapter::new("b").with_title("Preface").before_toc(true))
                .with_chapter(Chapter::new("c").exclude_from_toc(true)),
        );

        check_well_formed(&toc).unwrap();
        let preface = toc.find("content_1.xhtml").unwrap();
        let own = toc.find("href=\"toc.xhtml\"").unwrap();
        let first = toc.find("content_0.xhtml").unwrap();
        assert!(preface < own && own < first);
        assert!(!toc.contains("content_2.xhtml"));
        assert!(toc.contains(">Chapter 1 - <small class=\"toc-author\">anonymous</small></a>"));
        assert!(toc.contains("epub:type=\"toc\""));
    }

    #[test]
    fn test_author_and_link_lines() {
        let toc = render(
            EpubOptions::new("T").with_chapter(
                Chapter::new("a")
                    .with_title("One")
                    .with_authors(["Ann", "Bo"])
                    .with_url("https://example.com/a?b&c"),
            ),
        );

        assert!(toc.contains(
            "One - <small class=\"toc-author\">Ann, Bo</small><span class=\"toc-link\">https://example.com/a?b&amp;c</span>"
        ));
    }

    #[test]
    fn test_version2_has_no_epub_namespace() {
        let toc = render(
            EpubOptions::new("T")
                .with_version(EpubVersion::V2)
                .with_chapter(Chapter::new("a")),
        );

        check_well_formed(&toc).unwrap();
        assert!(!toc.contains("epub:"));
        assert!(toc.contains("<div id=\"toc\">"));
    }
}
