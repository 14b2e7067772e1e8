//! EPUB container writing.

mod archive;
mod writer;

pub use archive::{EpubArchive, Entry, MIMETYPE, MIMETYPE_PATH};
pub use writer::{assemble, generate, generate_to_writer, write_epub};
