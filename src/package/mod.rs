//! Package model: the one source of ids, ordering and cross-references for
//! every structural document.
//!
//! The manifest, spine, NCX and human table of contents are all rendered from
//! the same [`PackageModel`], so they cannot disagree on ordering.

pub mod images;

use crate::book::{Book, EpubVersion, Font};
use crate::normalize::STYLESHEET_HREF;
use crate::util;

pub use images::{Image, ImageSource};

pub const TOC_ID: &str = "toc";
pub const TOC_HREF: &str = "toc.xhtml";
pub const NCX_ID: &str = "ncx";
pub const NCX_HREF: &str = "toc.ncx";
pub const CSS_ID: &str = "css";
pub const COVER_ID: &str = "image_cover";
pub const FONT_DIR: &str = "fonts";
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Book-level fields as they appear in the package metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub publisher: String,
    pub authors: Vec<String>,
    pub lang: String,
    pub toc_title: String,
    pub version: EpubVersion,
    /// `YYYY-MM-DD` publication date.
    pub date: String,
    /// `dcterms:modified` timestamp.
    pub modified: String,
    pub rights: String,
}

/// One content document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    pub index: usize,
    pub manifest_id: String,
    pub href: String,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub url: Option<String>,
    pub before_toc: bool,
    pub exclude_from_toc: bool,
    /// Navigation slot. `None` for chapters excluded from the TOC.
    pub play_order: Option<usize>,
}

impl ChapterEntry {
    /// Title shown in the tables of contents.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => format!("Chapter {}", self.index + 1),
        }
    }
}

/// What a spine item or navigation entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The injected table of contents document.
    Toc,
    /// Index into [`PackageModel::chapters`].
    Chapter(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub idref: String,
    pub target: Target,
}

/// One entry of the navigation map, shared by the NCX and the human TOC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub id: String,
    pub play_order: usize,
    /// NCX label.
    pub label: String,
    pub href: String,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageModel {
    pub metadata: PackageMetadata,
    pub chapters: Vec<ChapterEntry>,
    pub spine: Vec<SpineItem>,
    pub nav_points: Vec<NavPoint>,
    pub images: Vec<ManifestItem>,
    pub fonts: Vec<ManifestItem>,
    pub cover: Option<ManifestItem>,
}

impl PackageModel {
    /// Derive ids, spine order and play order from the chapter list.
    ///
    /// Spine: every `before_toc` chapter, the TOC, then every other chapter.
    /// Play order follows the same sequence but skips excluded chapters.
    pub fn build(book: &Book) -> Self {
        let mut chapters: Vec<ChapterEntry> = book
            .chapters
            .iter()
            .map(|chapter| ChapterEntry {
                index: chapter.index(),
                manifest_id: format!("content_{}_{}", chapter.index(), chapter.id()),
                href: chapter.filename(),
                title: chapter.title.clone(),
                authors: chapter.author_list().to_vec(),
                url: chapter.url.clone(),
                before_toc: chapter.before_toc,
                exclude_from_toc: chapter.exclude_from_toc,
                play_order: None,
            })
            .collect();

        let before: Vec<usize> = (0..chapters.len()).filter(|&i| chapters[i].before_toc).collect();
        let after: Vec<usize> = (0..chapters.len()).filter(|&i| !chapters[i].before_toc).collect();

        let mut spine = Vec::with_capacity(chapters.len() + 1);
        let mut nav_points = Vec::new();

        for &i in &before {
            spine.push(chapter_spine_item(&chapters[i]));
            push_chapter_nav(&mut chapters[i], &mut nav_points);
        }

        spine.push(SpineItem {
            idref: TOC_ID.to_string(),
            target: Target::Toc,
        });
        nav_points.push(NavPoint {
            id: TOC_ID.to_string(),
            play_order: nav_points.len(),
            label: book.toc_title.clone(),
            href: TOC_HREF.to_string(),
            target: Target::Toc,
        });

        for &i in &after {
            spine.push(chapter_spine_item(&chapters[i]));
            push_chapter_nav(&mut chapters[i], &mut nav_points);
        }

        let fonts = book
            .fonts
            .iter()
            .enumerate()
            .map(|(i, font)| font_item(i, font))
            .collect();

        Self {
            metadata: PackageMetadata {
                id: book.id.clone(),
                title: book.title.clone(),
                description: book.description.clone(),
                publisher: book.publisher.clone(),
                authors: book.authors.clone(),
                lang: book.lang.clone(),
                toc_title: book.toc_title.clone(),
                version: book.version,
                date: util::truncate_to_date(&book.date),
                modified: util::modified_timestamp(&book.date),
                rights: format!(
                    "Copyright \u{a9} {} by {}",
                    util::year_of(&book.date),
                    book.publisher
                ),
            },
            chapters,
            spine,
            nav_points,
            images: Vec::new(),
            fonts,
            cover: None,
        }
    }

    /// Add fetched content images to the manifest.
    pub fn with_images<'a>(mut self, images: impl IntoIterator<Item = &'a ImageSource>) -> Self {
        self.images.extend(images.into_iter().map(|image| ManifestItem {
            id: image.id.clone(),
            href: image.href(),
            media_type: image.media_type.clone(),
        }));
        self
    }

    /// Declare the cover image under the reserved cover id.
    pub fn with_cover(mut self, media_type: impl Into<String>, extension: &str) -> Self {
        self.cover = Some(ManifestItem {
            id: COVER_ID.to_string(),
            href: cover_href(extension),
            media_type: media_type.into(),
        });
        self
    }

    pub fn chapter(&self, target: Target) -> Option<&ChapterEntry> {
        match target {
            Target::Chapter(i) => self.chapters.get(i),
            Target::Toc => None,
        }
    }

    /// Every manifest item in declaration order.
    pub fn manifest(&self) -> Vec<ManifestItem> {
        let mut items = vec![
            ManifestItem {
                id: NCX_ID.to_string(),
                href: NCX_HREF.to_string(),
                media_type: "application/x-dtbncx+xml".to_string(),
            },
            ManifestItem {
                id: TOC_ID.to_string(),
                href: TOC_HREF.to_string(),
                media_type: XHTML_MEDIA_TYPE.to_string(),
            },
            ManifestItem {
                id: CSS_ID.to_string(),
                href: STYLESHEET_HREF.to_string(),
                media_type: "text/css".to_string(),
            },
        ];
        items.extend(self.cover.iter().cloned());
        items.extend(self.images.iter().cloned());
        items.extend(self.chapters.iter().map(|c| ManifestItem {
            id: c.manifest_id.clone(),
            href: c.href.clone(),
            media_type: XHTML_MEDIA_TYPE.to_string(),
        }));
        items.extend(self.fonts.iter().cloned());
        items
    }
}

/// Archive path of the cover relative to `OEBPS/`.
pub fn cover_href(extension: &str) -> String {
    format!("cover.{extension}")
}

fn chapter_spine_item(chapter: &ChapterEntry) -> SpineItem {
    SpineItem {
        idref: chapter.manifest_id.clone(),
        target: Target::Chapter(chapter.index),
    }
}

fn push_chapter_nav(chapter: &mut ChapterEntry, nav_points: &mut Vec<NavPoint>) {
    if chapter.exclude_from_toc {
        return;
    }
    let play_order = nav_points.len();
    chapter.play_order = Some(play_order);
    nav_points.push(NavPoint {
        id: chapter.manifest_id.clone(),
        play_order,
        label: format!("{}. {}", chapter.index + 1, chapter.display_title()),
        href: chapter.href.clone(),
        target: Target::Chapter(chapter.index),
    });
}

fn font_item(index: usize, font: &Font) -> ManifestItem {
    ManifestItem {
        id: format!("font_{index}"),
        href: format!("{FONT_DIR}/{}", font.name),
        media_type: mime_guess::from_path(&font.name)
            .first_raw()
            .unwrap_or("application/x-font-ttf")
            .to_string(),
    }
}
