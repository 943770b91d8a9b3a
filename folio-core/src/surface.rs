use crate::engine::{ContainerSize, RenderImage, RenderSurface, SurfaceTransform};

/// In-memory RGBA surface.
///
/// `resize` only records the raster size for the next frame; the presented
/// frame is replaced solely by [`RenderSurface::draw_image`], so a failed
/// render keeps the previous page visible.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    container: ContainerSize,
    device_pixel_ratio: f32,
    transform: SurfaceTransform,
    raster_size: (u32, u32),
    frame: Option<RenderImage>,
}

impl RasterSurface {
    pub fn new(container: ContainerSize, device_pixel_ratio: f32) -> Self {
        Self {
            container,
            device_pixel_ratio,
            transform: SurfaceTransform::IDENTITY,
            raster_size: (0, 0),
            frame: None,
        }
    }

    pub fn set_container_size(&mut self, container: ContainerSize) {
        self.container = container;
    }

    pub fn raster_size(&self) -> (u32, u32) {
        self.raster_size
    }

    pub fn frame(&self) -> Option<&RenderImage> {
        self.frame.as_ref()
    }
}

impl RenderSurface for RasterSurface {
    fn container_size(&self) -> ContainerSize {
        self.container
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.raster_size = (width, height);
    }

    fn set_transform(&mut self, transform: SurfaceTransform) {
        self.transform = transform;
    }

    fn transform(&self) -> SurfaceTransform {
        self.transform
    }

    fn draw_image(&mut self, image: RenderImage) {
        self.frame = Some(image);
    }
}
