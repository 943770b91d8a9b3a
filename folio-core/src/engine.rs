//! Seams to the external rendering engine.
//!
//! The session never parses documents itself. Everything it knows about a
//! document arrives through [`RenderEngine`], [`DocumentHandle`] and
//! [`PageHandle`], and every pixel it produces is drawn into a
//! [`RenderSurface`] by the engine.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::state::Rotation;

#[derive(Clone)]
pub enum DocumentSource {
    /// `http(s)://` or `file://` URL.
    Url(String),
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl DocumentSource {
    /// Classifies a user-supplied location: anything with a URL scheme is
    /// treated as a URL, everything else as a filesystem path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        match trimmed.split_once("://") {
            Some((scheme, _))
                if !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
            {
                DocumentSource::Url(trimmed.to_owned())
            }
            _ => DocumentSource::Path(PathBuf::from(trimmed)),
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        DocumentSource::Bytes(bytes.into())
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Url(url) => f.write_str(url),
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
            DocumentSource::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentSource({self})")
    }
}

/// Page dimensions in points, already rotated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Size of the area a page is displayed in, in CSS-style logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

/// Geometry of a page at a given scale and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub rotation: Rotation,
}

impl Viewport {
    /// Builds the viewport for an unrotated page of `width` x `height`
    /// points, swapping axes for quarter turns.
    pub fn for_page(width: f32, height: f32, scale: f32, rotation: Rotation) -> Self {
        let (width, height) = if rotation.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        };
        Self {
            width: width * scale,
            height: height * scale,
            scale,
            rotation,
        }
    }

    pub fn size(&self) -> PageSize {
        PageSize {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
}

impl TextItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Scale applied by the surface when mapping viewport units to raster pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl SurfaceTransform {
    pub const IDENTITY: SurfaceTransform = SurfaceTransform {
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn uniform(scale: f32) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
        }
    }
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Drawing target handed to [`PageHandle::render`].
pub trait RenderSurface: Send {
    fn container_size(&self) -> ContainerSize;
    fn device_pixel_ratio(&self) -> f32;
    fn resize(&mut self, width: u32, height: u32);
    fn set_transform(&mut self, transform: SurfaceTransform);
    fn transform(&self) -> SurfaceTransform;
    fn draw_image(&mut self, image: RenderImage);
}

#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentHandle>>;
}

#[async_trait]
pub trait DocumentHandle: Send + Sync {
    fn page_count(&self) -> usize;

    /// Fetches a page by its 1-based number.
    async fn get_page(&self, page_num: usize) -> Result<Arc<dyn PageHandle>>;
}

#[async_trait]
pub trait PageHandle: Send + Sync {
    fn viewport(&self, scale: f32, rotation: Rotation) -> Viewport;

    async fn render(&self, surface: &mut dyn RenderSurface, viewport: &Viewport) -> Result<()>;

    async fn text_content(&self) -> Result<Vec<TextItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_urls_and_paths() {
        assert!(matches!(
            DocumentSource::parse("https://example.com/a.pdf"),
            DocumentSource::Url(_)
        ));
        assert!(matches!(
            DocumentSource::parse("file:///tmp/a.pdf"),
            DocumentSource::Url(_)
        ));
        match DocumentSource::parse(" docs/report.pdf ") {
            DocumentSource::Path(path) => assert_eq!(path, PathBuf::from("docs/report.pdf")),
            other => panic!("unexpected source: {other:?}"),
        }
        assert!(matches!(
            DocumentSource::parse("weird name://x.pdf"),
            DocumentSource::Path(_)
        ));
    }

    #[test]
    fn viewport_swaps_axes_on_quarter_turns() {
        let upright = Viewport::for_page(200.0, 300.0, 2.0, Rotation::NONE);
        assert_eq!((upright.width, upright.height), (400.0, 600.0));

        let turned = Viewport::for_page(200.0, 300.0, 2.0, Rotation::NONE.rotated());
        assert_eq!((turned.width, turned.height), (600.0, 400.0));

        let flipped = Viewport::for_page(200.0, 300.0, 1.0, Rotation::NONE.rotated().rotated());
        assert_eq!((flipped.width, flipped.height), (200.0, 300.0));
    }

    #[test]
    fn bytes_source_displays_length() {
        let source = DocumentSource::from_bytes(vec![1u8, 2, 3]);
        assert_eq!(source.to_string(), "<3 bytes>");
    }
}
