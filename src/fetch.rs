//! Image acquisition.
//!
//! [`Fetch`] is the seam between the pipeline and image I/O. The built-in
//! [`HttpFetcher`] handles `http(s)` URLs, `data:` URIs, `file://` URLs and
//! plain local paths.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use rayon::prelude::*;
use tracing::{debug, warn};
use url::Url;

use crate::book::EpubOptions;
use crate::error::{BoxError, Error, Result};
use crate::package::{Image, ImageSource};

/// Retrieves the bytes behind an image reference.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, BoxError>;
}

impl<F> Fetch for F
where
    F: Fn(&str) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, BoxError> {
        self(url)
    }
}

/// Default fetcher backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with a per-attempt `timeout` and optional proxy URL.
    pub fn new(timeout: Duration, proxy: Option<&str>, retries: u32) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("epubgen/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            retries,
            backoff: Duration::from_millis(250),
        })
    }

    pub fn from_options(options: &EpubOptions) -> Result<Self> {
        Self::new(
            options.fetch_timeout,
            options.proxy.as_deref(),
            options.fetch_retries,
        )
    }

    fn fetch_http(&self, url: &str) -> std::result::Result<Vec<u8>, BoxError> {
        let mut attempt = 0;
        loop {
            match self.get_once(url) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    warn!(url, attempt, error = %err, "Image fetch failed, retrying");
                    thread::sleep(self.backoff * attempt);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn get_once(&self, url: &str) -> std::result::Result<Vec<u8>, BoxError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        if bytes.is_empty() {
            return Err(format!("empty response body from {url}").into());
        }
        Ok(bytes.to_vec())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, BoxError> {
        if url.starts_with("data:") {
            return decode_data_uri(url);
        }

        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => self.fetch_http(url),
            Ok(parsed) if parsed.scheme() == "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| format!("invalid file URL: {url}"))?;
                read_local(path)
            }
            _ => {
                let decoded = percent_decode_str(url).decode_utf8()?;
                read_local(PathBuf::from(decoded.as_ref()))
            }
        }
    }
}

fn read_local(path: PathBuf) -> std::result::Result<Vec<u8>, BoxError> {
    debug!(path = %path.display(), "Reading local image");
    let data = std::fs::read(&path)?;
    if data.is_empty() {
        return Err(format!("empty file: {}", path.display()).into());
    }
    Ok(data)
}

/// Decode the payload of a `data:` URI.
pub fn decode_data_uri(uri: &str) -> std::result::Result<Vec<u8>, BoxError> {
    let rest = uri.strip_prefix("data:").ok_or("not a data URI")?;
    let (header, data) = rest.split_once(',').ok_or("data URI has no payload")?;

    let bytes = if header.ends_with(";base64") {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)?
    } else {
        percent_decode_str(data).collect()
    };
    if bytes.is_empty() {
        return Err("empty data URI".into());
    }
    Ok(bytes)
}

/// Fetch every image on a pool of `workers` threads, preserving input order.
///
/// Failures are skipped with a warning unless `strict` is set, in which case
/// the first failure in input order aborts.
pub fn fetch_images(
    fetcher: &dyn Fetch,
    sources: Vec<ImageSource>,
    workers: usize,
    strict: bool,
) -> Result<Vec<Image>> {
    if sources.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("epubgen-fetch-{i}"))
        .build()
        .map_err(std::io::Error::other)?;

    let results: Vec<_> = pool.install(|| {
        sources
            .into_par_iter()
            .map(|source| {
                let result = fetcher.fetch(&source.url);
                (source, result)
            })
            .collect()
    });

    let mut images = Vec::with_capacity(results.len());
    for (source, result) in results {
        match result {
            Ok(data) => images.push(Image { source, data }),
            Err(source_err) if strict => {
                return Err(Error::ImageFetch {
                    url: source.url,
                    source: source_err,
                });
            }
            Err(err) => warn!(url = %source.url, error = %err, "Skipping image that could not be fetched"),
        }
    }
    Ok(images)
}
