//! Book descriptors: caller options, chapters, and the resolved [`Book`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::render::Templates;
use crate::util;

/// Stylesheet written to `OEBPS/style.css` when the caller supplies none.
pub const DEFAULT_CSS: &str = r#".epub-author {
    color: #555;
}

.epub-link {
    margin-bottom: 30px;
}

.epub-link a {
    color: #666;
    font-size: 90%;
}

.toc-author {
    font-size: 90%;
    color: #555;
}

.toc-link {
    color: #999;
    font-size: 85%;
    display: block;
}

hr {
    border: 0;
    border-bottom: 1px solid #dedede;
    margin: 60px 10%;
}
"#;

/// Major EPUB generation to target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EpubVersion {
    /// EPUB 2: XHTML 1.1 DTD, strict vocabulary.
    V2,
    /// EPUB 3: XHTML5 content documents.
    #[default]
    V3,
}

impl EpubVersion {
    /// Map a major version number. Anything but `2` targets EPUB 3.
    pub fn from_major(major: u8) -> Self {
        if major == 2 { Self::V2 } else { Self::V3 }
    }

    pub fn major(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    /// Value of the package document's `version` attribute.
    pub fn package_version(self) -> &'static str {
        match self {
            Self::V2 => "2.0",
            Self::V3 => "3.0",
        }
    }
}

/// One content fragment and its navigation flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chapter {
    /// Raw HTML content.
    pub content: String,
    pub title: Option<String>,
    /// Per-chapter authors. `None` falls back to the book authors.
    pub authors: Option<Vec<String>>,
    /// Source URL, rendered as a byline link.
    pub url: Option<String>,
    /// Place before the injected table of contents.
    pub before_toc: bool,
    /// Hide from both generated tables of contents. The chapter stays in the spine.
    pub exclude_from_toc: bool,
    index: usize,
}

impl Chapter {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.get_or_insert_with(Vec::new).push(author.into());
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn before_toc(mut self, before_toc: bool) -> Self {
        self.before_toc = before_toc;
        self
    }

    pub fn exclude_from_toc(mut self, exclude: bool) -> Self {
        self.exclude_from_toc = exclude;
        self
    }

    /// 0-based position in the book, equal to input order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> String {
        format!("item_{}", self.index)
    }

    /// Archive path relative to `OEBPS/`.
    pub fn filename(&self) -> String {
        format!("content_{}.xhtml", self.index)
    }

    /// Resolved authors. Empty only when the caller passed an explicit empty list.
    pub fn author_list(&self) -> &[String] {
        self.authors.as_deref().unwrap_or(&[])
    }

    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// An embedded font file.
#[derive(Clone, PartialEq, Eq)]
pub struct Font {
    /// File name under `OEBPS/fonts/`.
    pub name: String,
    pub data: Vec<u8>,
}

impl Font {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Load a font from disk, named after its file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font.ttf".to_string());
        Ok(Self { name, data })
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Caller-supplied generation options.
///
/// Build with [`EpubOptions::new`] and the `with_*` methods; unset fields get
/// their defaults in [`Book::from_options`].
#[derive(Clone)]
pub struct EpubOptions {
    pub title: String,
    pub content: Vec<Chapter>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub authors: Vec<String>,
    pub lang: Option<String>,
    pub toc_title: Option<String>,
    /// ISO 8601 timestamp.
    pub date: Option<String>,
    pub id: Option<String>,
    pub append_chapter_titles: bool,
    pub version: EpubVersion,
    pub css: Option<String>,
    pub fonts: Vec<Font>,
    /// Cover image path or URL.
    pub cover: Option<String>,
    /// Log sanitizer rewrites and pipeline stages.
    pub verbose: bool,
    /// Proxy URL for remote image fetches.
    pub proxy: Option<String>,
    /// Fail the build when an image cannot be fetched.
    pub strict_images: bool,
    /// Timeout per fetch attempt.
    pub fetch_timeout: Duration,
    /// Retries after the first failed attempt.
    pub fetch_retries: u32,
    pub fetch_workers: usize,
    /// Deflate level for compressed entries.
    pub compression_level: i64,
    pub templates: Templates,
    /// Replaces the built-in fetcher.
    pub fetcher: Option<Arc<dyn Fetch>>,
}

impl Default for EpubOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: Vec::new(),
            description: None,
            publisher: None,
            authors: Vec::new(),
            lang: None,
            toc_title: None,
            date: None,
            id: None,
            append_chapter_titles: true,
            version: EpubVersion::default(),
            css: None,
            fonts: Vec::new(),
            cover: None,
            verbose: false,
            proxy: None,
            strict_images: false,
            fetch_timeout: Duration::from_secs(30),
            fetch_retries: 2,
            fetch_workers: 4,
            compression_level: 9,
            templates: Templates::default(),
            fetcher: None,
        }
    }
}

impl fmt::Debug for EpubOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpubOptions")
            .field("title", &self.title)
            .field("chapters", &self.content.len())
            .field("authors", &self.authors)
            .field("lang", &self.lang)
            .field("version", &self.version)
            .field("cover", &self.cover)
            .field("fonts", &self.fonts)
            .field("strict_images", &self.strict_images)
            .field("templates", &self.templates)
            .field("custom_fetcher", &self.fetcher.is_some())
            .finish_non_exhaustive()
    }
}

impl EpubOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.content.push(chapter);
        self
    }

    pub fn with_chapters(mut self, chapters: impl IntoIterator<Item = Chapter>) -> Self {
        self.content.extend(chapters);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_toc_title(mut self, toc_title: impl Into<String>) -> Self {
        self.toc_title = Some(toc_title.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_append_chapter_titles(mut self, append: bool) -> Self {
        self.append_chapter_titles = append;
        self
    }

    pub fn with_version(mut self, version: EpubVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.fonts.push(font);
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_strict_images(mut self, strict: bool) -> Self {
        self.strict_images = strict;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_fetch_retries(mut self, retries: u32) -> Self {
        self.fetch_retries = retries;
        self
    }

    pub fn with_fetch_workers(mut self, workers: usize) -> Self {
        self.fetch_workers = workers;
        self
    }

    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

/// A validated book with every default resolved.
#[derive(Debug, Clone)]
pub struct Book {
    pub title: String,
    pub description: String,
    pub publisher: String,
    pub authors: Vec<String>,
    pub lang: String,
    pub toc_title: String,
    pub date: String,
    pub id: String,
    pub append_chapter_titles: bool,
    pub version: EpubVersion,
    pub css: String,
    pub fonts: Vec<Font>,
    pub cover: Option<String>,
    pub chapters: Vec<Chapter>,
    pub verbose: bool,
}

impl Book {
    /// Validate the options and apply defaults field by field.
    ///
    /// A blank title or an empty chapter list is rejected before any
    /// processing starts.
    pub fn from_options(options: &EpubOptions) -> Result<Self> {
        if options.title.trim().is_empty() {
            return Err(Error::MissingTitle);
        }
        if options.content.is_empty() {
            return Err(Error::MissingContent);
        }

        let authors = if options.authors.is_empty() {
            vec!["anonymous".to_string()]
        } else {
            options.authors.clone()
        };

        let chapters = options
            .content
            .iter()
            .enumerate()
            .map(|(index, chapter)| Chapter {
                index,
                authors: Some(chapter.authors.clone().unwrap_or_else(|| authors.clone())),
                ..chapter.clone()
            })
            .collect();

        Ok(Self {
            title: options.title.clone(),
            description: non_empty(&options.description).unwrap_or_else(|| options.title.clone()),
            publisher: non_empty(&options.publisher).unwrap_or_else(|| "anonymous".to_string()),
            authors,
            lang: non_empty(&options.lang).unwrap_or_else(|| "en".to_string()),
            toc_title: non_empty(&options.toc_title)
                .unwrap_or_else(|| "Table Of Contents".to_string()),
            date: non_empty(&options.date).unwrap_or_else(util::now_rfc3339),
            id: non_empty(&options.id).unwrap_or_else(util::uuid_v4),
            append_chapter_titles: options.append_chapter_titles,
            version: options.version,
            css: non_empty(&options.css).unwrap_or_else(|| DEFAULT_CSS.to_string()),
            fonts: font_files(&options.fonts),
            cover: non_empty(&options.cover),
            chapters,
            verbose: options.verbose,
        })
    }
}

/// Reduce font names to bare file names, keeping the first font for each name.
fn font_files(fonts: &[Font]) -> Vec<Font> {
    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(fonts.len());
    for font in fonts {
        let name = font.name.rsplit(['/', '\\']).next().unwrap_or_default();
        if matches!(name, "" | "." | "..") {
            warn!(font = %font.name, "Skipping font without a file name");
            continue;
        }
        if !seen.insert(name.to_string()) {
            warn!(font = %font.name, "Skipping duplicate font file name");
            continue;
        }
        files.push(Font::new(name, font.data.clone()));
    }
    files
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}
