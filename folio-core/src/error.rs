use thiserror::Error;

/// Errors surfaced by the viewer session.
///
/// Engine calls report failures as [`anyhow::Error`]; the session flattens
/// them into one of these kinds so callers can decide what reaches the user.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to load document: {0}")]
    Load(String),

    /// A page render failed. Session state is left untouched.
    #[error("failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("search failed: {0}")]
    Search(String),

    #[error("invalid value: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to persist viewer preferences: {0}")]
    Persistence(String),
}

impl ViewerError {
    pub(crate) fn load(err: anyhow::Error) -> Self {
        Self::Load(format!("{err:#}"))
    }

    pub(crate) fn render(page: usize, err: anyhow::Error) -> Self {
        Self::Render {
            page,
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn search(err: anyhow::Error) -> Self {
        Self::Search(format!("{err:#}"))
    }
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
