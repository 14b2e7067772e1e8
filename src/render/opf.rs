//! Package document (`content.opf`).

use crate::book::EpubVersion;
use crate::package::{COVER_ID, NCX_ID, PackageModel, TOC_HREF, TOC_ID};
use crate::util::escape_xml;

/// Render the package document: metadata, manifest, spine and guide.
pub fn render_opf(model: &PackageModel) -> String {
    let meta = &model.metadata;
    let v3 = meta.version == EpubVersion::V3;
    let mut opf = String::new();

    opf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    if v3 {
        opf.push_str(&format!(
            "<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"BookId\" xml:lang=\"{}\" prefix=\"ibooks: http://vocabulary.itunes.apple.com/rdf/ibooks/vocabulary-extensions-1.0/\">\n",
            escape_xml(&meta.lang)
        ));
    } else {
        opf.push_str(
            "<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"2.0\" unique-identifier=\"BookId\">\n",
        );
    }
    opf.push_str(
        "  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\">\n",
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&meta.id)
    ));
    if v3 {
        opf.push_str(
            "    <meta refines=\"#BookId\" property=\"identifier-type\" scheme=\"onix:codelist5\">22</meta>\n",
        );
    }
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(&meta.title)));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&meta.lang)
    ));
    opf.push_str(&format!(
        "    <dc:description>{}</dc:description>\n",
        escape_xml(&meta.description)
    ));

    for (i, author) in meta.authors.iter().enumerate() {
        let author = escape_xml(author);
        if v3 {
            opf.push_str(&format!(
                "    <dc:creator id=\"creator{i}\">{author}</dc:creator>\n"
            ));
            opf.push_str(&format!(
                "    <meta refines=\"#creator{i}\" property=\"role\" scheme=\"marc:relators\">aut</meta>\n"
            ));
            opf.push_str(&format!(
                "    <meta refines=\"#creator{i}\" property=\"file-as\">{author}</meta>\n"
            ));
        } else {
            opf.push_str(&format!(
                "    <dc:creator opf:role=\"aut\" opf:file-as=\"{author}\">{author}</dc:creator>\n"
            ));
        }
    }

    opf.push_str(&format!(
        "    <dc:publisher>{}</dc:publisher>\n",
        escape_xml(&meta.publisher)
    ));
    opf.push_str(&format!("    <dc:date>{}</dc:date>\n", escape_xml(&meta.date)));
    opf.push_str(&format!("    <dc:rights>{}</dc:rights>\n", escape_xml(&meta.rights)));
    if v3 {
        opf.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            escape_xml(&meta.modified)
        ));
        opf.push_str("    <meta property=\"ibooks:specified-fonts\">true</meta>\n");
    }
    if model.cover.is_some() {
        opf.push_str(&format!("    <meta name=\"cover\" content=\"{COVER_ID}\"/>\n"));
    }
    opf.push_str("    <meta name=\"generator\" content=\"epubgen\"/>\n");
    opf.push_str("  </metadata>\n");

    opf.push_str("  <manifest>\n");
    for item in model.manifest() {
        let properties = match item.id.as_str() {
            TOC_ID if v3 => " properties=\"nav\"",
            COVER_ID if v3 => " properties=\"cover-image\"",
            _ => "",
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type),
            properties
        ));
    }
    opf.push_str("  </manifest>\n");

    opf.push_str(&format!("  <spine toc=\"{NCX_ID}\">\n"));
    for item in &model.spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            escape_xml(&item.idref)
        ));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("  <guide>\n");
    opf.push_str(&format!(
        "    <reference type=\"toc\" title=\"{}\" href=\"{TOC_HREF}\"/>\n",
        escape_xml(&meta.toc_title)
    ));
    opf.push_str("  </guide>\n");
    opf.push_str("</package>\n");
    opf
}
