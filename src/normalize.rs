//! Chapter normalizer: wraps sanitized markup into a complete XHTML document.

use crate::book::{Book, Chapter, EpubVersion};
use crate::util::escape_xml;

/// Stylesheet every content document links to.
pub const STYLESHEET_HREF: &str = "style.css";

/// XML declaration, doctype and `<html>` start tag for a content document.
///
/// EPUB 2 targets the XHTML 1.1 DTD and declares no `epub` namespace.
pub fn document_header(version: EpubVersion, lang: &str) -> String {
    let lang = escape_xml(lang);
    match version {
        EpubVersion::V2 => format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{lang}\">\n"
        ),
        EpubVersion::V3 => format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE html>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\">\n"
        ),
    }
}

/// Charset declaration valid for the version's content model.
pub fn charset_meta(version: EpubVersion) -> &'static str {
    match version {
        EpubVersion::V2 => {
            r#"<meta http-equiv="Content-Type" content="text/html; charset=UTF-8"/>"#
        }
        EpubVersion::V3 => r#"<meta charset="UTF-8"/>"#,
    }
}

/// Build the content document for `chapter` around its sanitized `body` markup.
///
/// A byline is only written for titled chapters.
pub fn normalize_chapter(book: &Book, chapter: &Chapter, body: &str) -> String {
    let mut doc = document_header(book.version, &book.lang);

    doc.push_str("<head>\n");
    doc.push_str(charset_meta(book.version));
    doc.push('\n');
    doc.push_str(&format!("<title>{}</title>\n", escape_xml(&book.title)));
    doc.push_str(&format!(
        "<link rel=\"stylesheet\" type=\"text/css\" href=\"{STYLESHEET_HREF}\"/>\n"
    ));
    doc.push_str("</head>\n<body>\n");

    if let Some(title) = chapter.title.as_deref().filter(|t| !t.is_empty()) {
        if book.append_chapter_titles {
            doc.push_str(&format!("<h1>{}</h1>\n", escape_xml(title)));
        }
        let authors = chapter.author_list();
        if !authors.is_empty() {
            doc.push_str(&format!(
                "<p class=\"epub-author\">{}</p>\n",
                escape_xml(&authors.join(", "))
            ));
        }
    }

    if let Some(url) = chapter.url.as_deref().filter(|u| !u.is_empty()) {
        let url = escape_xml(url);
        doc.push_str(&format!(
            "<p class=\"epub-link\"><a href=\"{url}\">{url}</a></p>\n"
        ));
    }

    doc.push_str(body);
    doc.push_str("\n</body>\n</html>\n");
    doc
}
