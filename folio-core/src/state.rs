use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::DocumentHandle;
use crate::error::ViewerError;
use crate::overlay::HighlightBadge;
use crate::search::{Match, PageResult};
use crate::text::TextCache;

pub type DocumentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    Width,
    #[default]
    Page,
    Actual,
    Custom,
}

impl FitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Width => "width",
            FitMode::Page => "page",
            FitMode::Actual => "actual",
            FitMode::Custom => "custom",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "width" => Ok(FitMode::Width),
            "page" => Ok(FitMode::Page),
            "actual" => Ok(FitMode::Actual),
            "custom" => Ok(FitMode::Custom),
            other => Err(ViewerError::Validation(format!("unknown fit mode `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Normal,
    Dark,
    Sepia,
    HighContrast,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Normal, Theme::Dark, Theme::Sepia, Theme::HighContrast];

    pub fn next(self) -> Theme {
        match self {
            Theme::Normal => Theme::Dark,
            Theme::Dark => Theme::Sepia,
            Theme::Sepia => Theme::HighContrast,
            Theme::HighContrast => Theme::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Normal => "normal",
            Theme::Dark => "dark",
            Theme::Sepia => "sepia",
            Theme::HighContrast => "high-contrast",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == wanted)
            .ok_or_else(|| ViewerError::Validation(format!("unknown theme `{wanted}`")))
    }
}

/// Clockwise page rotation, always a multiple of 90 degrees below 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    pub fn degrees(self) -> u16 {
        self.0
    }

    pub fn rotated(self) -> Rotation {
        Rotation((self.0 + 90) % 360)
    }

    pub fn swaps_axes(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

impl TryFrom<u16> for Rotation {
    type Error = ViewerError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        if degrees % 90 == 0 {
            Ok(Rotation(degrees % 360))
        } else {
            Err(ViewerError::Validation(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            )))
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Document lifecycle derived from the loader flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unloaded,
    Loading,
    Ready,
    Error,
}

/// Monotonic counter identifying the most recently issued render.
///
/// Shared with in-flight [`RenderJob`](crate::RenderJob)s so they can notice
/// they were superseded without borrowing the session.
#[derive(Debug, Clone, Default)]
pub struct RenderGeneration(Arc<AtomicU64>);

impl RenderGeneration {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub query: String,
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Whether the search UI is shown; has no effect on matching.
    pub active: bool,
    pub query: String,
    pub case_sensitive: bool,
    /// Pages with at least one match, ascending by page number.
    pub results: Vec<PageResult>,
    pub total_matches: usize,
    pub current_match_index: usize,
    pub searching: bool,
    pub page_text_cache: TextCache,
}

impl SearchState {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            ..Self::default()
        }
    }

    pub(crate) fn clear_results(&mut self) {
        self.results.clear();
        self.total_matches = 0;
        self.current_match_index = 0;
    }

    pub fn current_match(&self) -> Option<(usize, &Match)> {
        crate::search::locate_match(&self.results, self.current_match_index)
    }

    pub fn summary(&self) -> Option<SearchSummary> {
        if self.query.is_empty() {
            return None;
        }
        Some(SearchSummary {
            query: self.query.clone(),
            current: self.current_match_index,
            total: self.total_matches,
        })
    }
}

pub struct SessionState {
    pub document: Option<Arc<dyn DocumentHandle>>,
    pub document_id: Option<DocumentId>,
    pub current_page: usize,
    pub total_pages: usize,
    pub zoom_level: f32,
    pub rotation: Rotation,
    pub fit_mode: FitMode,
    pub theme: Theme,
    pub loading: bool,
    pub error: Option<String>,
    pub search: SearchState,
    pub highlight: Option<HighlightBadge>,
    pub render_generation: RenderGeneration,
}

impl SessionState {
    pub fn new(theme: Theme, fit_mode: FitMode, case_sensitive: bool) -> Self {
        Self {
            document: None,
            document_id: None,
            current_page: 1,
            total_pages: 0,
            zoom_level: 1.0,
            rotation: Rotation::NONE,
            fit_mode,
            theme,
            loading: false,
            error: None,
            search: SearchState::new(case_sensitive),
            highlight: None,
            render_generation: RenderGeneration::default(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.loading {
            Lifecycle::Loading
        } else if self.document.is_some() {
            Lifecycle::Ready
        } else if self.error.is_some() {
            Lifecycle::Error
        } else {
            Lifecycle::Unloaded
        }
    }

    pub fn is_valid_page(&self, page: usize) -> bool {
        (1..=self.total_pages).contains(&page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_cycles_back_after_four_turns() {
        let mut rotation = Rotation::try_from(90u16).unwrap();
        for _ in 0..4 {
            rotation = rotation.rotated();
        }
        assert_eq!(rotation.degrees(), 90);
        assert!(Rotation::try_from(45u16).is_err());
        assert_eq!(Rotation::try_from(450u16).unwrap().degrees(), 90);
    }

    #[test]
    fn theme_round_trips_through_strings() {
        for theme in Theme::ALL {
            assert_eq!(theme.as_str().parse::<Theme>().unwrap(), theme);
        }
        assert_eq!(Theme::HighContrast.next(), Theme::Normal);
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn fit_mode_parses_case_insensitively() {
        assert_eq!("Width".parse::<FitMode>().unwrap(), FitMode::Width);
        assert!(matches!(
            "stretch".parse::<FitMode>(),
            Err(ViewerError::Validation(_))
        ));
    }

    #[test]
    fn lifecycle_reflects_loader_flags() {
        let mut state = SessionState::new(Theme::Normal, FitMode::Page, false);
        assert_eq!(state.lifecycle(), Lifecycle::Unloaded);
        state.loading = true;
        assert_eq!(state.lifecycle(), Lifecycle::Loading);
        state.loading = false;
        state.error = Some("boom".into());
        assert_eq!(state.lifecycle(), Lifecycle::Error);
    }

    #[test]
    fn render_generation_is_shared_between_clones() {
        let generation = RenderGeneration::default();
        let observer = generation.clone();
        assert_eq!(generation.advance(), 1);
        assert_eq!(observer.current(), 1);
    }
}
