use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::Session;
use crate::engine::DocumentSource;
use crate::error::{Result, ViewerError};
use crate::state::SessionState;
use crate::text::TextCache;

impl Session {
    /// Opens a document, replacing whatever was loaded before.
    ///
    /// All view and search state is reset first; only the theme and the
    /// render generation counter carry over, so renders issued for the
    /// previous document are recognised as stale. Returns the page count.
    #[instrument(skip(self), fields(source = %source))]
    pub async fn load(&mut self, source: DocumentSource) -> Result<usize> {
        self.reset_for_load();
        self.state.loading = true;

        match self.engine.open(&source).await {
            Ok(document) => {
                let id = Uuid::new_v4();
                let total_pages = document.page_count();
                self.state.document = Some(document);
                self.state.document_id = Some(id);
                self.state.total_pages = total_pages;
                self.state.search.page_text_cache = TextCache::for_document(id);
                self.state.loading = false;
                self.state.error = None;
                info!(%id, total_pages, "document loaded");
                Ok(total_pages)
            }
            Err(err) => {
                let error = ViewerError::load(err);
                warn!(%error, "document load failed");
                self.state.error = Some(error.to_string());
                self.state.loading = false;
                Err(error)
            }
        }
    }

    fn reset_for_load(&mut self) {
        let fresh = SessionState::new(
            self.state.theme,
            self.config.default_fit_mode,
            self.config.search.case_sensitive,
        );
        let previous = std::mem::replace(&mut self.state, fresh);
        previous.render_generation.advance();
        self.state.render_generation = previous.render_generation;
    }
}
