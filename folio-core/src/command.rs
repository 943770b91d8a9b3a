use crate::state::{FitMode, Theme};

/// Synchronous viewer commands, as produced by a key map.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage { count: usize },
    PrevPage { count: usize },
    GotoPage { page: usize },
    FirstPage,
    LastPage,
    ZoomBy { factor: f32 },
    SetZoom { zoom: f32 },
    Rotate,
    SetFitMode { mode: FitMode },
    CycleTheme,
    SetTheme { theme: Theme },
    NextMatch { count: usize },
    PrevMatch { count: usize },
    ClearSearch,
    ToggleCaseSensitive,
}
