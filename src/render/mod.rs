//! Structural document renderers.
//!
//! The package document, NCX and human table of contents are pure functions
//! of one [`PackageModel`]. Each can be replaced by a [`DocumentTemplate`].

mod ncx;
mod opf;
mod toc;

use std::fmt;
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{BoxError, Error, Result};
use crate::package::PackageModel;
use crate::util::is_xml_char;

pub use ncx::render_ncx;
pub use opf::render_opf;
pub use toc::render_toc;

/// A renderer for one structural document.
pub trait DocumentTemplate: Send + Sync {
    fn render(&self, model: &PackageModel) -> std::result::Result<String, BoxError>;
}

impl<F> DocumentTemplate for F
where
    F: Fn(&PackageModel) -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn render(&self, model: &PackageModel) -> std::result::Result<String, BoxError> {
        self(model)
    }
}

/// Optional overrides for the built-in renderers.
#[derive(Clone, Default)]
pub struct Templates {
    pub opf: Option<Arc<dyn DocumentTemplate>>,
    pub ncx: Option<Arc<dyn DocumentTemplate>>,
    pub toc: Option<Arc<dyn DocumentTemplate>>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opf(mut self, template: impl DocumentTemplate + 'static) -> Self {
        self.opf = Some(Arc::new(template));
        self
    }

    pub fn with_ncx(mut self, template: impl DocumentTemplate + 'static) -> Self {
        self.ncx = Some(Arc::new(template));
        self
    }

    pub fn with_toc(mut self, template: impl DocumentTemplate + 'static) -> Self {
        self.toc = Some(Arc::new(template));
        self
    }
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates")
            .field("opf", &self.opf.is_some())
            .field("ncx", &self.ncx.is_some())
            .field("toc", &self.toc.is_some())
            .finish()
    }
}

/// The three rendered structural documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralDocuments {
    pub opf: String,
    pub ncx: String,
    pub toc: String,
}

/// Render all structural documents, failing on the first render error or
/// malformed result.
pub fn render_all(model: &PackageModel, templates: &Templates) -> Result<StructuralDocuments> {
    Ok(StructuralDocuments {
        opf: render_document("content.opf", model, templates.opf.as_deref(), render_opf)?,
        ncx: render_document("toc.ncx", model, templates.ncx.as_deref(), render_ncx)?,
        toc: render_document("toc.xhtml", model, templates.toc.as_deref(), render_toc)?,
    })
}

fn render_document(
    document: &'static str,
    model: &PackageModel,
    custom: Option<&dyn DocumentTemplate>,
    builtin: fn(&PackageModel) -> String,
) -> Result<String> {
    let xml = match custom {
        Some(template) => template
            .render(model)
            .map_err(|source| Error::Render { document, source })?,
        None => builtin(model),
    };
    check_well_formed(&xml).map_err(|source| Error::Render { document, source })?;
    Ok(xml)
}

/// Verify that `xml` is a single well-formed XML element tree.
pub fn check_well_formed(xml: &str) -> std::result::Result<(), BoxError> {
    if let Some(c) = xml.chars().find(|&c| !is_xml_char(c)) {
        return Err(format!("character U+{:04X} is not allowed in XML", u32::from(c)).into());
    }

    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
                for attr in e.attributes() {
                    attr?;
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    roots += 1;
                }
                for attr in e.attributes() {
                    attr?;
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1).ok_or("unmatched end tag")?;
            }
            Event::Text(text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err("text outside the root element".into());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err("unclosed element at end of document".into());
    }
    if roots != 1 {
        return Err(format!("expected one root element, found {roots}").into());
    }
    Ok(())
}
