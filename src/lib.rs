//! # epubgen
//!
//! Generate structurally valid EPUB 2 and EPUB 3 books from HTML fragments.
//!
//! ## Features
//!
//! - Sanitizes every fragment to the target version's allowed vocabulary,
//!   demoting disallowed elements instead of dropping their content
//! - Wraps fragments into complete XHTML content documents
//! - Derives the package document, NCX and human table of contents from one
//!   shared model, so ids and ordering always agree
//! - Embeds images (remote, local or `data:` URIs), a cover, and fonts
//!
//! ## Quick Start
//!
//! ```no_run
//! use epubgen::{Chapter, EpubOptions, write_epub};
//!
//! let options = EpubOptions::new("My Book")
//!     .with_author("Author Name")
//!     .with_chapter(Chapter::new("<p>Preface text</p>").with_title("Preface").before_toc(true))
//!     .with_chapter(Chapter::new("<p>Once upon a time</p>").with_title("Chapter One"));
//!
//! write_epub(&options, "book.epub")?;
//! # Ok::<(), epubgen::Error>(())
//! ```
//!
//! ## Sanitizing on its own
//!
//! ```
//! use epubgen::{EpubVersion, Policy, sanitize_html};
//!
//! let policy = Policy::for_version(EpubVersion::V2);
//! let clean = sanitize_html(r#"<section onclick="x()"><p>hi</p></section>"#, &policy);
//! assert_eq!(clean, "<div><p>hi</p></div>");
//! ```

pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod package;
pub mod render;
pub mod sanitize;
pub mod util;

pub use book::{Book, Chapter, EpubOptions, EpubVersion, Font};
pub use epub::{EpubArchive, generate, generate_to_writer, write_epub};
pub use error::{BoxError, Error, Result};
pub use fetch::{Fetch, HttpFetcher};
pub use normalize::normalize_chapter;
pub use package::PackageModel;
pub use render::{DocumentTemplate, Templates};
pub use sanitize::{Policy, Sanitizer, sanitize_html};
pub use util::uuid_v4;
