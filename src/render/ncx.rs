//! Navigation control document (`toc.ncx`).

use crate::package::PackageModel;
use crate::util::escape_xml;

pub fn render_ncx(model: &PackageModel) -> String {
    let meta = &model.metadata;
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape_xml(&meta.id)
    ));
    ncx.push_str(
        r#"    <meta name="dtb:generator" content="epubgen"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
"#,
    );
    ncx.push_str(&format!(
        "  <docTitle>\n    <text>{}</text>\n  </docTitle>\n",
        escape_xml(&meta.title)
    ));
    ncx.push_str(&format!(
        "  <docAuthor>\n    <text>{}</text>\n  </docAuthor>\n",
        escape_xml(&meta.authors.join(", "))
    ));

    ncx.push_str("  <navMap>\n");
    for nav in &model.nav_points {
        ncx.push_str(&format!(
            "    <navPoint id=\"{}\" playOrder=\"{}\" class=\"chapter\">\n",
            escape_xml(&nav.id),
            nav.play_order
        ));
        ncx.push_str(&format!(
            "      <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&nav.label)
        ));
        ncx.push_str(&format!(
            "      <content src=\"{}\"/>\n",
            escape_xml(&nav.href)
        ));
        ncx.push_str("    </navPoint>\n");
    }
    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}
