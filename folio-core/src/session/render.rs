use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use tracing::{debug, instrument, warn};

use super::Session;
use crate::engine::{DocumentHandle, RenderSurface, SurfaceTransform, Viewport};
use crate::error::{Result, ViewerError};
use crate::fit::fit_scale;
use crate::state::{DocumentId, FitMode, RenderGeneration, Rotation};

/// Whether a finished render reached the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderStatus {
    Completed(Viewport),
    /// A newer render or a new document took over before this one finished.
    Superseded,
}

/// One page render, detached from the session so several may be in flight.
pub struct RenderJob {
    generation: u64,
    document_id: DocumentId,
    document: Arc<dyn DocumentHandle>,
    page_num: usize,
    zoom_level: f32,
    rotation: Rotation,
    fit_mode: FitMode,
    latest: RenderGeneration,
}

pub struct RenderOutcome {
    generation: u64,
    document_id: DocumentId,
    page_num: usize,
    result: AnyResult<Option<Viewport>>,
}

impl RenderOutcome {
    pub fn page_num(&self) -> usize {
        self.page_num
    }
}

impl RenderJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_num(&self) -> usize {
        self.page_num
    }

    fn is_stale(&self) -> bool {
        self.latest.current() != self.generation
    }

    /// Fetches the page and draws it. A job that has been superseded by the
    /// time its page arrives leaves the surface untouched.
    pub async fn run(self, surface: &mut dyn RenderSurface) -> RenderOutcome {
        let result = self.draw(surface).await;
        RenderOutcome {
            generation: self.generation,
            document_id: self.document_id,
            page_num: self.page_num,
            result,
        }
    }

    async fn draw(&self, surface: &mut dyn RenderSurface) -> AnyResult<Option<Viewport>> {
        let page = self
            .document
            .get_page(self.page_num)
            .await
            .with_context(|| format!("failed to fetch page {}", self.page_num))?;
        if self.is_stale() {
            return Ok(None);
        }

        let natural = page.viewport(1.0, self.rotation).size();
        let scale = fit_scale(natural, surface.container_size(), self.fit_mode)
            .unwrap_or(self.zoom_level);
        let viewport = page.viewport(scale, self.rotation);

        let ratio = surface.device_pixel_ratio();
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        surface.resize(
            (viewport.width * ratio).floor() as u32,
            (viewport.height * ratio).floor() as u32,
        );
        surface.set_transform(SurfaceTransform::uniform(ratio));

        page.render(surface, &viewport)
            .await
            .with_context(|| format!("engine failed to draw page {}", self.page_num))?;
        Ok(Some(viewport))
    }
}

impl Session {
    /// Issues a render of `page_num`, superseding any render still in flight.
    pub fn prepare_render(&mut self, page_num: usize) -> Result<RenderJob> {
        let (document_id, document) = self.loaded_document().ok_or_else(|| {
            ViewerError::render(page_num, anyhow::anyhow!("no document loaded"))
        })?;
        if !self.state.is_valid_page(page_num) {
            return Err(ViewerError::render(
                page_num,
                anyhow::anyhow!("page outside 1..={}", self.state.total_pages),
            ));
        }
        let generation = self.state.render_generation.advance();
        debug!(page_num, generation, "render issued");
        Ok(RenderJob {
            generation,
            document_id,
            document,
            page_num,
            zoom_level: self.state.zoom_level,
            rotation: self.state.rotation,
            fit_mode: self.state.fit_mode,
            latest: self.state.render_generation.clone(),
        })
    }

    /// Applies a finished render if it is still the latest one for the
    /// loaded document. Failures are reported but never touch view state.
    pub fn finish_render(&mut self, outcome: RenderOutcome) -> Result<RenderStatus> {
        let current = self.state.render_generation.current();
        if self.state.document_id != Some(outcome.document_id) || outcome.generation != current {
            debug!(
                page_num = outcome.page_num,
                generation = outcome.generation,
                current,
                "discarding stale render"
            );
            return Ok(RenderStatus::Superseded);
        }

        match outcome.result {
            Ok(Some(viewport)) => {
                self.refresh_overlay();
                Ok(RenderStatus::Completed(viewport))
            }
            Ok(None) => Ok(RenderStatus::Superseded),
            Err(err) => {
                let error = ViewerError::render(outcome.page_num, err);
                warn!(%error, "render failed");
                Err(error)
            }
        }
    }

    /// Renders the current page, then refreshes the match badge a second
    /// time after the configured settle delay.
    #[instrument(skip(self, surface), fields(page = self.state.current_page))]
    pub async fn render(&mut self, surface: &mut dyn RenderSurface) -> Result<RenderStatus> {
        let job = self.prepare_render(self.state.current_page)?;
        let outcome = job.run(surface).await;
        let status = self.finish_render(outcome)?;
        if matches!(status, RenderStatus::Completed(_)) {
            tokio::time::sleep(self.config.overlay_settle_delay()).await;
            self.refresh_overlay();
        }
        Ok(status)
    }
}
