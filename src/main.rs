//! epubgen - build an EPUB from a JSON book descriptor

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use epubgen::{Chapter, EpubOptions, EpubVersion, Font, write_epub};

#[derive(Parser)]
#[command(name = "epubgen")]
#[command(version, about = "Generate EPUB books from HTML fragments", long_about = None)]
#[command(after_help = "EXAMPLES:
    epubgen book.json book.epub              Build an EPUB 3 book
    epubgen --version2 book.json book.epub   Build an EPUB 2 book
    epubgen -v --strict-images book.json out.epub")]
struct Cli {
    /// Book descriptor (JSON)
    #[arg(value_name = "BOOK")]
    input: PathBuf,

    /// Output EPUB file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Log sanitizer rewrites and pipeline stages
    #[arg(short, long)]
    verbose: bool,

    /// Fail when an image cannot be fetched
    #[arg(long)]
    strict_images: bool,

    /// Target EPUB 2 regardless of the descriptor
    #[arg(long = "version2")]
    version2: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    One(String),
    Many(Vec<String>),
}

impl Authors {
    fn into_vec(self) -> Vec<String> {
        match self {
            Authors::One(author) => vec![author],
            Authors::Many(authors) => authors,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterDescriptor {
    content: String,
    title: Option<String>,
    author: Option<Authors>,
    url: Option<String>,
    #[serde(default)]
    before_toc: bool,
    #[serde(default)]
    exclude_from_toc: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDescriptor {
    title: String,
    #[serde(default)]
    content: Vec<ChapterDescriptor>,
    author: Option<Authors>,
    publisher: Option<String>,
    description: Option<String>,
    lang: Option<String>,
    toc_title: Option<String>,
    append_chapter_titles: Option<bool>,
    date: Option<String>,
    id: Option<String>,
    cover: Option<String>,
    css: Option<String>,
    #[serde(default)]
    fonts: Vec<PathBuf>,
    proxy: Option<String>,
    version: Option<u8>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&cli.input)?;
    let descriptor: BookDescriptor = serde_json::from_str(&text)?;
    let base = cli.input.parent().unwrap_or(Path::new("."));

    let mut options = into_options(descriptor, base)?
        .with_verbose(cli.verbose)
        .with_strict_images(cli.strict_images);
    if cli.version2 {
        options = options.with_version(EpubVersion::V2);
    }

    write_epub(&options, &cli.output)?;
    eprintln!("wrote {}", cli.output.display());
    Ok(())
}

fn into_options(descriptor: BookDescriptor, base: &Path) -> epubgen::Result<EpubOptions> {
    let chapters = descriptor.content.into_iter().map(|c| {
        let mut chapter = Chapter::new(c.content)
            .before_toc(c.before_toc)
            .exclude_from_toc(c.exclude_from_toc);
        chapter.title = c.title;
        chapter.url = c.url;
        chapter.authors = c.author.map(Authors::into_vec);
        chapter
    });

    let mut options = EpubOptions::new(descriptor.title).with_chapters(chapters);
    options.authors = descriptor.author.map(Authors::into_vec).unwrap_or_default();
    options.publisher = descriptor.publisher;
    options.description = descriptor.description;
    options.lang = descriptor.lang;
    options.toc_title = descriptor.toc_title;
    options.date = descriptor.date;
    options.id = descriptor.id;
    options.css = descriptor.css;
    options.proxy = descriptor.proxy;
    options.cover = descriptor.cover.map(|cover| resolve_local(&cover, base));
    if let Some(append) = descriptor.append_chapter_titles {
        options.append_chapter_titles = append;
    }
    if let Some(major) = descriptor.version {
        options.version = EpubVersion::from_major(major);
    }
    for font in descriptor.fonts {
        options.fonts.push(Font::from_path(base.join(font))?);
    }
    Ok(options)
}

/// Resolve a relative local path against the descriptor's directory.
fn resolve_local(src: &str, base: &Path) -> String {
    if src.contains("://") || src.starts_with("data:") || Path::new(src).is_absolute() {
        return src.to_string();
    }
    base.join(src).to_string_lossy().into_owned()
}
