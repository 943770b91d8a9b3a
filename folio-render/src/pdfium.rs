use std::convert::TryFrom;
use std::mem;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use folio_core::{
    DocumentHandle, DocumentSource, PageHandle, RenderEngine, RenderImage, RenderSurface,
    Rotation, TextItem, Viewport,
};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tracing::{debug, instrument, warn};

use crate::source::{resolve, SourceData};

/// Runtime override for the location of the pdfium shared library.
pub const LIBRARY_PATH_ENV: &str = "FOLIO_PDFIUM_LIBRARY_PATH";

pub struct PdfiumEngine {
    pdfium: Arc<Pdfium>,
}

impl PdfiumEngine {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_env() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

#[async_trait]
impl RenderEngine for PdfiumEngine {
    #[instrument(skip(self))]
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentHandle>> {
        let data = resolve(source).await?;
        let document = PdfiumDocument::open(Arc::clone(&self.pdfium), data)?;
        debug!(pages = document.page_count, "pdfium document opened");
        Ok(Arc::new(PdfiumDocumentHandle {
            inner: Arc::new(document),
        }))
    }
}

struct PdfiumDocument {
    // Declared before the bindings so it is dropped first.
    document: Mutex<PdfDocument<'static>>,
    page_count: usize,
    _pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn open(pdfium: Arc<Pdfium>, data: SourceData) -> Result<Self> {
        let document = match &data {
            SourceData::File(path) => pdfium
                .load_pdf_from_file(path, None)
                .with_context(|| format!("failed to open {:?}", path))?,
            SourceData::Memory(bytes) => pdfium
                .load_pdf_from_byte_vec(bytes.to_vec(), None)
                .context("failed to open in-memory document")?,
        };
        // SAFETY: the document borrows the bindings owned by `pdfium`. This
        // struct keeps that Arc alive and drops `document` before it, so
        // the extended lifetime never outlives the bindings.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
        Ok(Self {
            document: Mutex::new(document),
            page_count,
            _pdfium: pdfium,
        })
    }

    fn with_page<R, F>(&self, page_num: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        let index = page_num
            .checked_sub(1)
            .and_then(|index| PdfPageIndex::try_from(index).ok())
            .ok_or_else(|| anyhow!("page {} is out of supported range", page_num))?;
        let document = self.document.lock();
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_num))?;
        f(&page)
    }
}

struct PdfiumDocumentHandle {
    inner: Arc<PdfiumDocument>,
}

#[async_trait]
impl DocumentHandle for PdfiumDocumentHandle {
    fn page_count(&self) -> usize {
        self.inner.page_count
    }

    async fn get_page(&self, page_num: usize) -> Result<Arc<dyn PageHandle>> {
        let (width, height) = self
            .inner
            .with_page(page_num, |page| Ok((page.width().value, page.height().value)))?;
        Ok(Arc::new(PdfiumPage {
            document: Arc::clone(&self.inner),
            page_num,
            width,
            height,
        }))
    }
}

struct PdfiumPage {
    document: Arc<PdfiumDocument>,
    page_num: usize,
    width: f32,
    height: f32,
}

#[async_trait]
impl PageHandle for PdfiumPage {
    fn viewport(&self, scale: f32, rotation: Rotation) -> Viewport {
        Viewport::for_page(self.width, self.height, scale, rotation)
    }

    #[instrument(skip(self, surface), fields(page = self.page_num))]
    async fn render(&self, surface: &mut dyn RenderSurface, viewport: &Viewport) -> Result<()> {
        let transform = surface.transform();
        let factor = (viewport.scale * transform.scale_x).max(0.1);
        let config = PdfRenderConfig::new()
            .scale_page_by_factor(factor)
            .rotate(pdfium_rotation(viewport.rotation), false);

        let image = self.document.with_page(self.page_num, |page| {
            let bitmap = page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", self.page_num))?;
            let pixels = bitmap.as_image().to_rgba8().into_raw();
            Ok(RenderImage {
                width: u32::try_from(bitmap.width()).unwrap_or_default(),
                height: u32::try_from(bitmap.height()).unwrap_or_default(),
                pixels,
            })
        })?;

        surface.draw_image(image);
        Ok(())
    }

    async fn text_content(&self) -> Result<Vec<TextItem>> {
        self.document.with_page(self.page_num, |page| {
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", self.page_num))?;
            Ok(text
                .all()
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(TextItem::new)
                .collect())
        })
    }
}

fn pdfium_rotation(rotation: Rotation) -> PdfPageRenderRotation {
    match rotation.degrees() {
        90 => PdfPageRenderRotation::Degrees90,
        180 => PdfPageRenderRotation::Degrees180,
        270 => PdfPageRenderRotation::Degrees270,
        _ => PdfPageRenderRotation::None,
    }
}

fn bind_pdfium_from_env() -> Option<Pdfium> {
    match std::env::var(LIBRARY_PATH_ENV) {
        Ok(path) if !path.is_empty() => match Pdfium::bind_to_library(&path) {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                warn!("failed to load Pdfium from {}={}: {}", LIBRARY_PATH_ENV, path, err);
                None
            }
        },
        _ => None,
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");

    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("{}: {}", cwd_path.display(), err));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; install it or set {} ({})",
                LIBRARY_PATH_ENV,
                errors.join(", ")
            ))
        }
    }
}
