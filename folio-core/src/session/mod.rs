//! The viewer session: sole owner and writer of [`SessionState`].

mod loader;
mod navigation;
mod render;
mod search;

use std::sync::Arc;

use tracing::{debug, warn};

pub use render::{RenderJob, RenderOutcome, RenderStatus};

use crate::command::Command;
use crate::config::ViewerConfig;
use crate::engine::{DocumentHandle, RenderEngine};
use crate::error::{Result, ViewerError};
use crate::overlay::compute_badge;
use crate::state::{DocumentId, SessionState, Theme};
use crate::theme::ThemeStore;

/// Bounds for relative zoom steps. Absolute zoom is only required to be positive.
pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 4.0;

pub struct Session {
    engine: Arc<dyn RenderEngine>,
    themes: Arc<dyn ThemeStore>,
    config: ViewerConfig,
    state: SessionState,
}

impl Session {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        themes: Arc<dyn ThemeStore>,
        config: ViewerConfig,
    ) -> Self {
        let theme = match themes.load() {
            Ok(stored) => stored.unwrap_or_default(),
            Err(err) => {
                warn!(?err, "failed to read stored theme, falling back to default");
                Theme::default()
            }
        };
        let state = SessionState::new(
            theme,
            config.default_fit_mode,
            config.search.case_sensitive,
        );
        Self {
            engine,
            themes,
            config,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Changes the theme and writes it through to the preference store.
    ///
    /// A persistence failure is returned but the in-memory theme still
    /// changes.
    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.state.theme = theme;
        self.themes.save(theme).map_err(|err| {
            warn!(?err, %theme, "failed to persist theme");
            ViewerError::Persistence(format!("{err:#}"))
        })
    }

    /// Recomputes the per-page match badge from the current page and results.
    pub fn refresh_overlay(&mut self) {
        self.state.highlight = compute_badge(self.state.current_page, &self.state.search.results);
    }

    /// Applies a synchronous command. Returns `true` when the displayed page
    /// needs to be rendered again.
    pub fn apply(&mut self, command: Command) -> bool {
        debug!(?command, "applying command");
        let before = self.view_key();
        match command {
            Command::NextPage { count } => self.advance_pages(count.max(1)),
            Command::PrevPage { count } => self.rewind_pages(count.max(1)),
            Command::GotoPage { page } => self.go_to_page(page),
            Command::FirstPage => self.go_to_page(1),
            Command::LastPage => self.go_to_page(self.state.total_pages),
            Command::ZoomBy { factor } => {
                let zoom = self.state.zoom_level * factor;
                if zoom > 0.0 {
                    self.set_zoom(zoom.clamp(MIN_ZOOM, MAX_ZOOM));
                }
            }
            Command::SetZoom { zoom } => self.set_zoom(zoom),
            Command::Rotate => self.rotate(),
            Command::SetFitMode { mode } => self.set_fit_mode(mode),
            Command::CycleTheme => {
                // The failure is already logged; the new theme is applied regardless.
                let _ = self.set_theme(self.state.theme.next());
            }
            Command::SetTheme { theme } => {
                let _ = self.set_theme(theme);
            }
            Command::NextMatch { count } => {
                self.advance_matches(count.max(1));
            }
            Command::PrevMatch { count } => {
                self.rewind_matches(count.max(1));
            }
            Command::ClearSearch => self.clear_search(),
            Command::ToggleCaseSensitive => self.toggle_case_sensitive(),
        }
        before != self.view_key()
    }

    pub(crate) fn loaded_document(&self) -> Option<(DocumentId, Arc<dyn DocumentHandle>)> {
        match (&self.state.document_id, &self.state.document) {
            (Some(id), Some(document)) => Some((*id, Arc::clone(document))),
            _ => None,
        }
    }

    fn view_key(&self) -> ViewKey {
        ViewKey {
            page: self.state.current_page,
            zoom_bits: self.state.zoom_level.to_bits(),
            rotation: self.state.rotation.degrees(),
            fit_mode: self.state.fit_mode,
            theme: self.state.theme,
            highlight: self.state.highlight,
            total_matches: self.state.search.total_matches,
        }
    }
}

/// Everything that changes what ends up on screen.
#[derive(PartialEq)]
struct ViewKey {
    page: usize,
    zoom_bits: u32,
    rotation: u16,
    fit_mode: crate::state::FitMode,
    theme: Theme,
    highlight: Option<crate::overlay::HighlightBadge>,
    total_matches: usize,
}
