//! Viewer session engine: navigation, rendering coordination and
//! whole-document text search on top of an external rendering engine.

mod command;
mod config;
mod engine;
mod error;
mod fit;
mod overlay;
mod search;
mod session;
mod state;
mod surface;
mod text;
mod theme;

#[cfg(test)]
mod testing;

pub use command::Command;
pub use config::{SearchConfig, ViewerConfig};
pub use engine::{
    ContainerSize, DocumentHandle, DocumentSource, PageHandle, PageSize, RenderEngine,
    RenderImage, RenderSurface, SurfaceTransform, TextItem, Viewport,
};
pub use error::{Result, ViewerError};
pub use fit::fit_scale;
pub use overlay::{compute_badge, HighlightBadge};
pub use search::{
    find_matches, locate_match, page_for_match, search_text, total_matches, Match, PageResult,
    CONTEXT_RADIUS,
};
pub use session::{RenderJob, RenderOutcome, RenderStatus, Session, MAX_ZOOM, MIN_ZOOM};
pub use state::{
    DocumentId, FitMode, Lifecycle, RenderGeneration, Rotation, SearchState, SearchSummary,
    SessionState, Theme,
};
pub use surface::RasterSurface;
pub use text::{extract_page_text, TextCache, FRAGMENT_SEPARATOR};
pub use theme::{FileThemeStore, MemoryThemeStore, ThemeStore};
