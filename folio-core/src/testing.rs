//! Scripted engine used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::engine::{
    DocumentHandle, DocumentSource, PageHandle, RenderEngine, RenderImage, RenderSurface,
    TextItem, Viewport,
};
use crate::state::Rotation;

#[derive(Clone)]
struct FakePageData {
    fragments: Vec<String>,
    width: f32,
    height: f32,
}

#[derive(Clone, Default)]
pub struct FakeDocument {
    pages: Arc<Vec<FakePageData>>,
    fail_text: Arc<HashSet<usize>>,
    fail_text_once: Arc<Mutex<HashSet<usize>>>,
    fail_render: Arc<HashSet<usize>>,
    fetch_delay: Arc<HashMap<usize, Duration>>,
    text_calls: Arc<AtomicUsize>,
}

#[derive(Default)]
pub struct FakeDocumentBuilder {
    pages: Vec<FakePageData>,
    fail_text: HashSet<usize>,
    fail_text_once: HashSet<usize>,
    fail_render: HashSet<usize>,
    fetch_delay: HashMap<usize, Duration>,
}

impl FakeDocumentBuilder {
    pub fn page(self, text: &str) -> Self {
        self.page_fragments(&[text])
    }

    pub fn page_fragments(mut self, fragments: &[&str]) -> Self {
        self.pages.push(FakePageData {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            width: 200.0,
            height: 300.0,
        });
        self
    }

    pub fn blank_pages(mut self, count: usize) -> Self {
        for _ in 0..count {
            self = self.page("");
        }
        self
    }

    /// Sets the size in points of the most recently added page.
    pub fn size(mut self, width: f32, height: f32) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.width = width;
            page.height = height;
        }
        self
    }

    pub fn fail_text_on(mut self, page_num: usize) -> Self {
        self.fail_text.insert(page_num);
        self
    }

    /// The first text request for `page_num` fails; later ones succeed.
    pub fn fail_text_once_on(mut self, page_num: usize) -> Self {
        self.fail_text_once.insert(page_num);
        self
    }

    pub fn fail_render_on(mut self, page_num: usize) -> Self {
        self.fail_render.insert(page_num);
        self
    }

    pub fn fetch_delay(mut self, page_num: usize, delay: Duration) -> Self {
        self.fetch_delay.insert(page_num, delay);
        self
    }

    pub fn build(self) -> FakeDocument {
        FakeDocument {
            pages: Arc::new(self.pages),
            fail_text: Arc::new(self.fail_text),
            fail_text_once: Arc::new(Mutex::new(self.fail_text_once)),
            fail_render: Arc::new(self.fail_render),
            fetch_delay: Arc::new(self.fetch_delay),
            text_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeDocument {
    pub fn builder() -> FakeDocumentBuilder {
        FakeDocumentBuilder::default()
    }

    /// Number of text-content requests served so far.
    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentHandle for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn get_page(&self, page_num: usize) -> Result<Arc<dyn PageHandle>> {
        if let Some(delay) = self.fetch_delay.get(&page_num) {
            tokio::time::sleep(*delay).await;
        }
        let data = page_num
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .ok_or_else(|| anyhow!("page {page_num} out of range"))?;
        Ok(Arc::new(FakePage {
            page_num,
            data: data.clone(),
            fail_text: self.fail_text.contains(&page_num),
            fail_text_once: Arc::clone(&self.fail_text_once),
            fail_render: self.fail_render.contains(&page_num),
            text_calls: Arc::clone(&self.text_calls),
        }))
    }
}

struct FakePage {
    page_num: usize,
    data: FakePageData,
    fail_text: bool,
    fail_text_once: Arc<Mutex<HashSet<usize>>>,
    fail_render: bool,
    text_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PageHandle for FakePage {
    fn viewport(&self, scale: f32, rotation: Rotation) -> Viewport {
        Viewport::for_page(self.data.width, self.data.height, scale, rotation)
    }

    async fn render(&self, surface: &mut dyn RenderSurface, viewport: &Viewport) -> Result<()> {
        if self.fail_render {
            bail!("rasterizer crashed on page {}", self.page_num);
        }
        let transform = surface.transform();
        let width = (viewport.width * transform.scale_x).floor() as u32;
        let height = (viewport.height * transform.scale_y).floor() as u32;
        surface.draw_image(RenderImage {
            width,
            height,
            pixels: vec![self.page_num as u8; 4],
        });
        Ok(())
    }

    async fn text_content(&self) -> Result<Vec<TextItem>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_text {
            bail!("text layer unavailable");
        }
        if self.fail_text_once.lock().remove(&self.page_num) {
            bail!("transient");
        }
        Ok(self.data.fragments.iter().map(TextItem::new).collect())
    }
}

#[derive(Default)]
pub struct FakeEngine {
    documents: HashMap<String, FakeDocument>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, location: &str, document: FakeDocument) -> Self {
        self.documents.insert(location.to_owned(), document);
        self
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentHandle>> {
        let key = source.to_string();
        let document = self
            .documents
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow!("no such document: {key}"))?;
        Ok(Arc::new(document))
    }
}
