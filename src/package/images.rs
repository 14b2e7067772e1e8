//! Image reference collection and media type resolution.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::dom::Fragment;

/// Directory under `OEBPS/` holding content images.
pub const IMAGE_DIR: &str = "images";

/// An image reference with a resolved media type, ready to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub id: String,
    pub url: String,
    pub media_type: String,
    pub extension: String,
}

impl ImageSource {
    /// Resolve `url`. Returns `None` when its media type is not an image type.
    pub fn resolve(url: &str) -> Option<Self> {
        let media_type = resolve_media_type(url)?;
        Some(Self {
            id: image_id(url),
            url: url.to_string(),
            extension: extension_for(&media_type),
            media_type,
        })
    }

    /// Archive path relative to `OEBPS/`.
    pub fn href(&self) -> String {
        format!("{IMAGE_DIR}/{}.{}", self.id, self.extension)
    }
}

/// A fetched image.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub source: ImageSource,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("source", &self.source)
            .field("len", &self.data.len())
            .finish()
    }
}

/// `src` values of every `<img>` in the fragment, in document order.
pub fn image_sources(fragment: &Fragment) -> Vec<String> {
    let dom = &fragment.dom;
    dom.elements(fragment.body)
        .into_iter()
        .filter(|&id| dom.tag(id) == Some("img"))
        .filter_map(|id| dom.get_attr(id, "src"))
        .filter(|src| !src.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Deduplicate references by URL, keeping the first occurrence.
///
/// References whose media type does not resolve are left out.
pub fn collect_images<I, S>(urls: I) -> Vec<ImageSource>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for url in urls {
        let url = url.as_ref();
        if !seen.insert(url.to_string()) {
            continue;
        }
        match ImageSource::resolve(url) {
            Some(image) => images.push(image),
            None => debug!(url, "Skipping image with unresolvable media type"),
        }
    }
    images
}

/// Point `<img src>` at the archived copy for every URL in `hrefs`.
pub fn rewrite_sources(fragment: &mut Fragment, hrefs: &HashMap<String, String>) {
    let dom = &mut fragment.dom;
    for id in dom.elements(fragment.body) {
        if dom.tag(id) != Some("img") {
            continue;
        }
        let Some(href) = dom.get_attr(id, "src").and_then(|src| hrefs.get(src)).cloned() else {
            continue;
        };
        dom.set_attr(id, "src", href);
    }
}

/// Media type of an image URL.
///
/// `data:` URIs carry their own type. Anything else is looked up by
/// extension after stripping the query string and fragment.
pub fn resolve_media_type(url: &str) -> Option<String> {
    let media_type = if let Some(rest) = url.strip_prefix("data:") {
        let header = rest.split(',').next().unwrap_or("");
        header.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
    } else {
        let path = url.split(['?', '#']).next().unwrap_or("");
        mime_guess::from_path(path).first_raw()?.to_string()
    };
    media_type.starts_with("image/").then_some(media_type)
}

/// Filesystem-safe file extension for an image media type.
pub fn extension_for(media_type: &str) -> String {
    let known = match media_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "image/webp" => Some("webp"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    let guessed: &str = match mime_guess::get_mime_extensions_str(media_type)
        .and_then(|exts| exts.first().copied())
    {
        Some(ext) => ext,
        None => media_type.rsplit('/').next().unwrap_or(""),
    };
    let ext: String = guessed
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { "img".to_string() } else { ext }
}

/// Stable id derived from the image URL.
pub fn image_id(url: &str) -> String {
    let digest = sha1_smol::Sha1::from(url).digest().to_string();
    format!("img_{}", &digest[..16])
}
