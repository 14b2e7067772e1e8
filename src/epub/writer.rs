use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use super::archive::EpubArchive;
use crate::book::{Book, EpubOptions};
use crate::dom::{Fragment, parse_fragment};
use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpFetcher, fetch_images};
use crate::normalize::normalize_chapter;
use crate::package::images::{collect_images, image_sources, rewrite_sources};
use crate::package::{FONT_DIR, Image, ImageSource, PackageModel, cover_href};
use crate::render::render_all;
use crate::sanitize::{Policy, Sanitizer};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const DISPLAY_OPTIONS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<display_options>
  <platform name="*">
    <option name="specified-fonts">true</option>
  </platform>
</display_options>"#;

/// Generate an EPUB into memory.
///
/// # Example
///
/// ```no_run
/// use epubgen::{Chapter, EpubOptions, generate};
///
/// let options = EpubOptions::new("My Book")
///     .with_author("Me")
///     .with_chapter(Chapter::new("<p>Hello</p>").with_title("One"));
/// let bytes = generate(&options)?;
/// # Ok::<(), epubgen::Error>(())
/// ```
pub fn generate(options: &EpubOptions) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    generate_to_writer(options, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Generate an EPUB into any [`Write`] + [`Seek`] destination.
pub fn generate_to_writer<W: Write + Seek>(options: &EpubOptions, writer: W) -> Result<()> {
    let archive = assemble(options)?;
    archive.write_to(writer, options.compression_level)
}

/// Generate an EPUB file on disk.
///
/// The file is only created once every entry has been built.
pub fn write_epub<P: AsRef<Path>>(options: &EpubOptions, path: P) -> Result<()> {
    let archive = assemble(options)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    archive.write_to(&mut writer, options.compression_level)?;
    writer.flush()?;
    Ok(())
}

/// Run the whole pipeline and return the entries to archive.
pub fn assemble(options: &EpubOptions) -> Result<EpubArchive> {
    let book = Book::from_options(options)?;
    let verbose = book.verbose;
    if verbose {
        info!(title = %book.title, chapters = book.chapters.len(), version = book.version.major(), "Generating EPUB structure");
    }

    let policy = Policy::for_version(book.version);
    let sanitizer = Sanitizer::new(&policy).verbose(verbose);
    let fragments: Vec<Fragment> = book
        .chapters
        .par_iter()
        .map(|chapter| {
            let mut fragment = parse_fragment(&chapter.content);
            sanitizer.sanitize_fragment(&mut fragment);
            fragment
        })
        .collect();

    let sources = collect_images(fragments.iter().flat_map(image_sources));

    let mut default_fetcher = None;
    let fetcher: &dyn Fetch = match &options.fetcher {
        Some(fetcher) => fetcher.as_ref(),
        None if sources.is_empty() && book.cover.is_none() => &NoFetch,
        None => &*default_fetcher.insert(HttpFetcher::from_options(options)?),
    };

    if verbose && !sources.is_empty() {
        info!(count = sources.len(), "Fetching images");
    }
    let images = fetch_images(fetcher, sources, options.fetch_workers, options.strict_images)?;
    let hrefs: HashMap<String, String> = images
        .iter()
        .map(|image| (image.source.url.clone(), image.source.href()))
        .collect();

    let documents: Vec<String> = fragments
        .into_par_iter()
        .zip(book.chapters.par_iter())
        .map(|(mut fragment, chapter)| {
            rewrite_sources(&mut fragment, &hrefs);
            normalize_chapter(&book, chapter, &fragment.to_xhtml())
        })
        .collect();

    let cover = match &book.cover {
        Some(src) => fetch_cover(fetcher, src, options.strict_images)?,
        None => None,
    };

    let mut model = PackageModel::build(&book).with_images(images.iter().map(|i| &i.source));
    if let Some(cover) = &cover {
        model = model.with_cover(cover.source.media_type.clone(), &cover.source.extension);
    }
    let structural = render_all(&model, &options.templates)?;

    if verbose {
        info!("Assembling archive");
    }
    let mut archive = EpubArchive::new();
    archive.add("META-INF/container.xml", CONTAINER_XML);
    archive.add(
        "META-INF/com.apple.ibooks.display-options.xml",
        DISPLAY_OPTIONS_XML,
    );
    archive.add("OEBPS/content.opf", structural.opf);
    archive.add("OEBPS/toc.ncx", structural.ncx);
    archive.add("OEBPS/toc.xhtml", structural.toc);
    archive.add("OEBPS/style.css", book.css.as_str());

    for (chapter, document) in book.chapters.iter().zip(documents) {
        archive.add(format!("OEBPS/{}", chapter.filename()), document);
    }
    if let Some(cover) = cover {
        archive.add(
            format!("OEBPS/{}", cover_href(&cover.source.extension)),
            cover.data,
        );
    }
    for image in images {
        archive.add(format!("OEBPS/{}", image.source.href()), image.data);
    }
    for font in &book.fonts {
        archive.add(format!("OEBPS/{FONT_DIR}/{}", font.name), font.data.clone());
    }

    Ok(archive)
}

fn fetch_cover(fetcher: &dyn Fetch, src: &str, strict: bool) -> Result<Option<Image>> {
    let result = match ImageSource::resolve(src) {
        Some(source) => fetcher
            .fetch(src)
            .map(|data| Image { source, data }),
        None => Err(format!("unsupported cover media type: {src}").into()),
    };

    match result {
        Ok(image) => Ok(Some(image)),
        Err(source) if strict => Err(Error::ImageFetch {
            url: src.to_string(),
            source,
        }),
        Err(err) => {
            warn!(url = src, error = %err, "Skipping cover that could not be fetched");
            Ok(None)
        }
    }
}

/// Stand-in when nothing needs fetching.
struct NoFetch;

impl Fetch for NoFetch {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, crate::error::BoxError> {
        Err(format!("no fetcher configured for {url}").into())
    }
}
