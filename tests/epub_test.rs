//! End-to-end generation tests.
//!
//! Every test generates a book in memory and reads the archive back with
//! `zip` and `quick-xml`.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::sync::Arc;

use epubgen::render::check_well_formed;
use epubgen::{
    BoxError, Chapter, EpubOptions, EpubVersion, Error, Font, PackageModel, Templates, generate,
    write_epub,
};
use quick_xml::Reader;
use quick_xml::events::Event;

const GIF_BASE64: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

struct Epub {
    names: Vec<String>,
    zip: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl Epub {
    fn open(bytes: Vec<u8>) -> Self {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
        let names = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        Self { names, zip }
    }

    fn bytes(&mut self, name: &str) -> Vec<u8> {
        let mut file = self
            .zip
            .by_name(name)
            .unwrap_or_else(|_| panic!("missing entry {name}"));
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        data
    }

    fn text(&mut self, name: &str) -> String {
        String::from_utf8(self.bytes(name)).unwrap()
    }

    fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Values of `attr` on every `tag` element, in document order.
fn attr_values(xml: &str, tag: &[u8], attr: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut values = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == tag => {
                for a in e.attributes().flatten() {
                    if a.key.as_ref() == attr {
                        values.push(String::from_utf8_lossy(&a.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => panic!("malformed xml: {e}"),
            _ => {}
        }
    }
    values
}

fn book(chapters: Vec<Chapter>) -> EpubOptions {
    EpubOptions::new("Test Book")
        .with_author("Ann Author")
        .with_identifier("urn:uuid:00000000-0000-4000-8000-000000000000")
        .with_date("2024-01-02T03:04:05Z")
        .with_chapters(chapters)
}

#[test]
fn test_minimal_book_layout() {
    let mut epub = Epub::open(generate(&book(vec![Chapter::new("<p>hello</p>")])).unwrap());

    assert_eq!(epub.names[0], "mimetype");
    assert_eq!(
        epub.zip.by_index(0).unwrap().compression(),
        zip::CompressionMethod::Stored
    );
    assert_eq!(epub.text("mimetype"), "application/epub+zip");

    for name in [
        "META-INF/container.xml",
        "META-INF/com.apple.ibooks.display-options.xml",
        "OEBPS/content.opf",
        "OEBPS/toc.ncx",
        "OEBPS/toc.xhtml",
        "OEBPS/style.css",
        "OEBPS/content_0.xhtml",
    ] {
        assert!(epub.has(name), "missing {name}");
    }

    let container = epub.text("META-INF/container.xml");
    assert_eq!(
        attr_values(&container, b"rootfile", b"full-path"),
        ["OEBPS/content.opf"]
    );
}

#[test]
fn test_script_is_neutralized_for_version2() {
    let options = book(vec![Chapter::new(
        "<div><script>x</script><p>hi</p></div>",
    )])
    .with_version(EpubVersion::V2);
    let mut epub = Epub::open(generate(&options).unwrap());

    let chapter = epub.text("OEBPS/content_0.xhtml");
    assert_eq!(chapter.matches("<p>hi</p>").count(), 1);
    assert!(!chapter.contains("<script"));
    assert!(chapter.contains("XHTML 1.1"));
    check_well_formed(&chapter).unwrap();
}

#[test]
fn test_image_placeholder_alt() {
    let mut epub = Epub::open(
        generate(&book(vec![Chapter::new(r#"<p><img src="https://example.invalid/pic"></p>"#)]))
            .unwrap(),
    );
    let chapter = epub.text("OEBPS/content_0.xhtml");
    assert!(chapter.contains(r#"<img src="https://example.invalid/pic" alt="image-placeholder"/>"#));
}

#[test]
fn test_manifest_spine_and_navigation_agree() {
    let options = book(vec![
        Chapter::new("<p>intro</p>").with_title("Intro").before_toc(true),
        Chapter::new("<p>hidden</p>").with_title("Hidden").before_toc(true).exclude_from_toc(true),
        Chapter::new("<p>one</p>").with_title("One"),
        Chapter::new("<p>colophon</p>").exclude_from_toc(true),
        Chapter::new("<p>two</p>").with_title("Two"),
    ]);
    let mut epub = Epub::open(generate(&options).unwrap());

    let opf = epub.text("OEBPS/content.opf");
    let ids = attr_values(&opf, b"item", b"id");
    let hrefs = attr_values(&opf, b"item", b"href");
    let spine = attr_values(&opf, b"itemref", b"idref");

    assert_eq!(
        spine,
        [
            "content_0_item_0",
            "content_1_item_1",
            "toc",
            "content_2_item_2",
            "content_3_item_3",
            "content_4_item_4",
        ]
    );
    let manifest_ids: HashSet<_> = ids.iter().collect();
    for idref in &spine {
        assert!(manifest_ids.contains(idref), "spine item {idref} not in manifest");
    }
    for href in &hrefs {
        assert!(epub.has(&format!("OEBPS/{href}")), "manifest item {href} not archived");
    }

    let ncx = epub.text("OEBPS/toc.ncx");
    let ncx_order = attr_values(&ncx, b"content", b"src");
    let play_order = attr_values(&ncx, b"navPoint", b"playOrder");
    let toc = epub.text("OEBPS/toc.xhtml");
    let toc_order = attr_values(&toc, b"a", b"href");

    let expected = [
        "content_0.xhtml",
        "toc.xhtml",
        "content_2.xhtml",
        "content_4.xhtml",
    ];
    assert_eq!(ncx_order, expected);
    assert_eq!(toc_order, expected);
    assert_eq!(play_order, ["0", "1", "2", "3"]);
}

#[test]
fn test_every_xml_entry_is_well_formed() {
    for version in [EpubVersion::V2, EpubVersion::V3] {
        let options = book(vec![
            Chapter::new("<p>a &amp; b<br><hr></p><table><tr><td>x").with_title("A & B"),
            Chapter::new("<body><section><h2>S</h2></section></body>").with_url("https://x.test/?a=1&b=2"),
        ])
        .with_version(version)
        .with_description("<Quoted> \"things\"");
        let mut epub = Epub::open(generate(&options).unwrap());

        let names: Vec<_> = epub
            .names
            .iter()
            .filter(|n| n.ends_with(".xml") || n.ends_with(".opf") || n.ends_with(".ncx") || n.ends_with(".xhtml"))
            .cloned()
            .collect();
        for name in names {
            let text = epub.text(&name);
            check_well_formed(&text).unwrap_or_else(|e| panic!("{name} is malformed: {e}"));
        }
    }
}

#[test]
fn test_control_characters_in_metadata_are_dropped() {
    for version in [EpubVersion::V2, EpubVersion::V3] {
        let options = EpubOptions::new("Bad\u{1}Title")
            .with_author("A\u{B}uthor")
            .with_description("d\u{1}")
            .with_version(version)
            .with_chapter(
                Chapter::new("<p>x\u{1}y</p>")
                    .with_title("Ch\u{1}apter")
                    .with_authors(["B\u{B}o"])
                    .with_url("https://x.test/\u{1}"),
            );
        let mut epub = Epub::open(generate(&options).unwrap());

        for name in epub.names.clone() {
            if name.ends_with(".css") || name == "mimetype" {
                continue;
            }
            let text = epub.text(&name);
            assert!(!text.contains(['\u{1}', '\u{B}']), "{name} has a control character");
            check_well_formed(&text).unwrap_or_else(|e| panic!("{name} is malformed: {e}"));
        }

        assert!(epub.text("OEBPS/content.opf").contains("<dc:title>BadTitle</dc:title>"));
        assert!(epub.text("OEBPS/toc.ncx").contains("<text>Author</text>"));
        let chapter = epub.text("OEBPS/content_0.xhtml");
        assert!(chapter.contains("<h1>Chapter</h1>"));
        assert!(chapter.contains("<p>xy</p>"));
    }
}

#[test]
fn test_font_names_stay_inside_font_directory() {
    let options = book(vec![Chapter::new("<p>x</p>")])
        .with_font(Font::new("../../Evil.ttf", vec![1]))
        .with_font(Font::new("Evil.ttf", vec![2]))
        .with_font(Font::new("nested/Body.otf", vec![3]));
    let mut epub = Epub::open(generate(&options).unwrap());

    let fonts: Vec<_> = epub
        .names
        .iter()
        .filter(|n| n.contains("fonts/") || n.contains(".."))
        .cloned()
        .collect();
    assert_eq!(fonts, ["OEBPS/fonts/Evil.ttf", "OEBPS/fonts/Body.otf"]);
    assert_eq!(epub.bytes("OEBPS/fonts/Evil.ttf"), [1u8]);

    let opf = epub.text("OEBPS/content.opf");
    let hrefs = attr_values(&opf, b"item", b"href");
    assert!(hrefs.contains(&"fonts/Evil.ttf".to_string()));
    assert!(hrefs.contains(&"fonts/Body.otf".to_string()));
}

#[test]
fn test_data_uri_image_embedded() {
    let html = format!(r#"<p><img src="data:image/gif;base64,{GIF_BASE64}" alt="dot"></p>"#);
    let mut epub = Epub::open(generate(&book(vec![Chapter::new(html)])).unwrap());

    let chapter = epub.text("OEBPS/content_0.xhtml");
    let srcs = attr_values(&chapter, b"img", b"src");
    assert_eq!(srcs.len(), 1);
    assert!(srcs[0].starts_with("images/img_") && srcs[0].ends_with(".gif"));
    assert!(epub.has(&format!("OEBPS/{}", srcs[0])));
    assert_eq!(&epub.bytes(&format!("OEBPS/{}", srcs[0]))[..3], b"GIF");

    let opf = epub.text("OEBPS/content.opf");
    assert!(attr_values(&opf, b"item", b"href").contains(&srcs[0]));
    assert!(attr_values(&opf, b"item", b"media-type").contains(&"image/gif".to_string()));
}

fn fake_fetcher() -> Arc<dyn epubgen::Fetch> {
    Arc::new(|url: &str| -> Result<Vec<u8>, BoxError> {
        if url.contains("broken") {
            Err("connection refused".into())
        } else {
            Ok(b"\x89PNG fake".to_vec())
        }
    })
}

#[test]
fn test_lenient_fetch_leaves_failed_src_unmodified() {
    let options = book(vec![Chapter::new(
        r#"<img src="https://img.test/ok.png"><img src="https://img.test/broken.png"><img src="https://img.test/ok.png">"#,
    )])
    .with_fetcher(fake_fetcher());
    let mut epub = Epub::open(generate(&options).unwrap());

    let chapter = epub.text("OEBPS/content_0.xhtml");
    let srcs = attr_values(&chapter, b"img", b"src");
    assert_eq!(srcs.len(), 3);
    assert!(srcs[0].starts_with("images/"));
    assert_eq!(srcs[1], "https://img.test/broken.png");
    assert_eq!(srcs[0], srcs[2]);

    let images: Vec<_> = epub.names.iter().filter(|n| n.starts_with("OEBPS/images/")).collect();
    assert_eq!(images.len(), 1);
}

#[test]
fn test_strict_fetch_aborts() {
    let options = book(vec![Chapter::new(r#"<img src="https://img.test/broken.png">"#)])
        .with_fetcher(fake_fetcher())
        .with_strict_images(true);

    match generate(&options) {
        Err(Error::ImageFetch { url, .. }) => assert_eq!(url, "https://img.test/broken.png"),
        other => panic!("expected image fetch error, got {other:?}"),
    }
}

#[test]
fn test_unresolvable_media_type_not_fetched() {
    let options = book(vec![Chapter::new(r#"<img src="https://img.test/avatar">"#)])
        .with_fetcher(Arc::new(|url: &str| -> Result<Vec<u8>, BoxError> {
            panic!("unexpected fetch of {url}")
        }))
        .with_strict_images(true);
    let mut epub = Epub::open(generate(&options).unwrap());

    let chapter = epub.text("OEBPS/content_0.xhtml");
    assert_eq!(attr_values(&chapter, b"img", b"src"), ["https://img.test/avatar"]);
}

#[test]
fn test_local_image_cover_and_font() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("figure.png");
    let cover = dir.path().join("cover.jpg");
    let font = dir.path().join("Body.ttf");
    std::fs::write(&image, b"\x89PNGdata").unwrap();
    std::fs::write(&cover, b"\xff\xd8\xffjpeg").unwrap();
    std::fs::write(&font, b"\0\x01\0\0ttf").unwrap();

    let html = format!(r#"<figure><img src="{}"></figure>"#, image.display());
    let options = book(vec![Chapter::new(html)])
        .with_cover(cover.to_string_lossy())
        .with_font(Font::from_path(&font).unwrap());
    let mut epub = Epub::open(generate(&options).unwrap());

    assert_eq!(epub.bytes("OEBPS/cover.jpg"), b"\xff\xd8\xffjpeg");
    assert_eq!(epub.bytes("OEBPS/fonts/Body.ttf"), b"\0\x01\0\0ttf");

    let opf = epub.text("OEBPS/content.opf");
    assert!(opf.contains(r#"<meta name="cover" content="image_cover"/>"#));
    let ids = attr_values(&opf, b"item", b"id");
    assert!(ids.contains(&"image_cover".to_string()));
    assert!(ids.contains(&"font_0".to_string()));

    let chapter = epub.text("OEBPS/content_0.xhtml");
    let src = &attr_values(&chapter, b"img", b"src")[0];
    assert_eq!(epub.bytes(&format!("OEBPS/{src}")), b"\x89PNGdata");
}

#[test]
fn test_missing_cover_is_skipped_in_lenient_mode() {
    let options = book(vec![Chapter::new("<p>x</p>")]).with_cover("/definitely/not/here.png");
    let mut epub = Epub::open(generate(&options).unwrap());

    assert!(!epub.names.iter().any(|n| n.starts_with("OEBPS/cover.")));
    assert!(!epub.text("OEBPS/content.opf").contains("image_cover"));
}

#[test]
fn test_preconditions() {
    assert!(matches!(
        generate(&EpubOptions::new("").with_chapter(Chapter::new("x"))),
        Err(Error::MissingTitle)
    ));
    assert!(matches!(
        generate(&EpubOptions::new("T")),
        Err(Error::MissingContent)
    ));
}

#[test]
fn test_custom_template_replaces_document() {
    let templates = Templates::new().with_toc(|model: &PackageModel| {
        let items: String = model
            .nav_points
            .iter()
            .map(|n| format!("<li>{}</li>", n.href))
            .collect();
        Ok::<_, BoxError>(format!("<html><body><ol>{items}</ol></body></html>"))
    });
    let options = book(vec![Chapter::new("<p>x</p>")]).with_templates(templates);
    let mut epub = Epub::open(generate(&options).unwrap());

    assert_eq!(
        epub.text("OEBPS/toc.xhtml"),
        "<html><body><ol><li>toc.xhtml</li><li>content_0.xhtml</li></ol></body></html>"
    );
}

#[test]
fn test_malformed_custom_template_fails_build() {
    let templates = Templates::new()
        .with_opf(|_: &PackageModel| Ok::<_, BoxError>("<package><metadata></package>".to_string()));
    let options = book(vec![Chapter::new("<p>x</p>")]).with_templates(templates);

    assert!(matches!(
        generate(&options),
        Err(Error::Render { document: "content.opf", .. })
    ));
}

#[test]
fn test_chapter_document_structure() {
    let options = book(vec![
        Chapter::new("<p>body</p>")
            .with_title("First")
            .with_url("https://src.test/1"),
    ])
    .with_language("es");
    let mut epub = Epub::open(generate(&options).unwrap());

    let chapter = epub.text("OEBPS/content_0.xhtml");
    assert!(chapter.contains(r#"lang="es""#));
    assert!(chapter.contains(r#"<link rel="stylesheet" type="text/css" href="style.css"/>"#));
    let h1 = chapter.find("<h1>First</h1>").unwrap();
    let byline = chapter.find(r#"<p class="epub-author">Ann Author</p>"#).unwrap();
    let link = chapter.find(r#"<p class="epub-link">"#).unwrap();
    let body = chapter.find("<p>body</p>").unwrap();
    assert!(h1 < byline && byline < link && link < body);
}

#[test]
fn test_builds_are_reproducible() {
    let chapters = || {
        vec![
            Chapter::new("<p>a</p>").with_title("A"),
            Chapter::new("<p>b</p>").before_toc(true),
            Chapter::new("<p>c</p>").exclude_from_toc(true),
        ]
    };
    let mut first = Epub::open(generate(&book(chapters())).unwrap());
    let mut second = Epub::open(generate(&book(chapters())).unwrap());

    assert_eq!(first.names, second.names);
    let names = first.names.clone();
    for name in names {
        assert_eq!(first.bytes(&name), second.bytes(&name), "{name} differs");
    }
}

#[test]
fn test_write_epub_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.epub");
    write_epub(&book(vec![Chapter::new("<p>x</p>")]), &path).unwrap();

    let epub = Epub::open(std::fs::read(&path).unwrap());
    assert_eq!(epub.names[0], "mimetype");
}

#[test]
fn test_failed_build_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.epub");
    assert!(write_epub(&EpubOptions::new("T"), &path).is_err());
    assert!(!path.exists());
}
