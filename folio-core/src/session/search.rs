use anyhow::anyhow;
use futures::future::{join_all, try_join_all};
use tracing::{debug, info, instrument, warn};

use super::Session;
use crate::error::{Result, ViewerError};
use crate::search::{search_text, total_matches, PageResult};
use crate::text::extract_page_text;

impl Session {
    /// Text of one page, served from the cache when possible.
    pub async fn get_text(&mut self, page_num: usize) -> Result<String> {
        let (document_id, document) = self
            .loaded_document()
            .ok_or_else(|| ViewerError::search(anyhow!("no document loaded")))?;
        if let Some(text) = self.state.search.page_text_cache.get(page_num) {
            return Ok(text.to_owned());
        }

        let text = extract_page_text(document.as_ref(), page_num)
            .await
            .map_err(ViewerError::search)?;
        Ok(self
            .state
            .search
            .page_text_cache
            .insert(document_id, page_num, text.clone())
            .map(str::to_owned)
            .unwrap_or(text))
    }

    pub async fn search_page(
        &mut self,
        page_num: usize,
        query: &str,
        case_sensitive: bool,
    ) -> Result<PageResult> {
        let text = self.get_text(page_num).await?;
        Ok(search_text(page_num, &text, query, case_sensitive))
    }

    /// Searches every page, extracting uncached text concurrently.
    ///
    /// Returns only pages with at least one match, in page order. By default
    /// one failing page fails the whole search; with
    /// `search.skip_failed_pages` the page is left out instead.
    #[instrument(skip(self))]
    pub async fn search_all_pages(
        &mut self,
        query: &str,
        case_sensitive: bool,
    ) -> Result<Vec<PageResult>> {
        let (document_id, document) = self
            .loaded_document()
            .ok_or_else(|| ViewerError::search(anyhow!("no document loaded")))?;
        let total_pages = self.state.total_pages;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pending: Vec<usize> = (1..=total_pages)
            .filter(|page_num| !self.state.search.page_text_cache.contains(*page_num))
            .collect();
        debug!(
            pending = pending.len(),
            cached = total_pages - pending.len(),
            "extracting page text"
        );

        let tasks = pending.iter().map(|&page_num| {
            let document = document.as_ref();
            async move {
                extract_page_text(document, page_num)
                    .await
                    .map(|text| (page_num, text))
            }
        });

        let extracted: Vec<(usize, String)> = if self.config.search.skip_failed_pages {
            join_all(tasks)
                .await
                .into_iter()
                .filter_map(|outcome| match outcome {
                    Ok(page) => Some(page),
                    Err(err) => {
                        warn!(?err, "skipping page whose text could not be extracted");
                        None
                    }
                })
                .collect()
        } else {
            try_join_all(tasks).await.map_err(ViewerError::search)?
        };

        let cache = &mut self.state.search.page_text_cache;
        for (page_num, text) in extracted {
            cache.insert(document_id, page_num, text);
        }

        Ok((1..=total_pages)
            .filter_map(|page_num| {
                let text = cache.get(page_num)?;
                let result = search_text(page_num, text, query, case_sensitive);
                (!result.matches.is_empty()).then_some(result)
            })
            .collect())
    }

    /// Runs a whole-document search and moves to the first matching page.
    /// Returns the number of matches.
    #[instrument(skip(self))]
    pub async fn perform_search(&mut self, query: &str) -> Result<usize> {
        let search = &mut self.state.search;
        search.query = query.to_owned();
        search.searching = true;
        search.clear_results();
        self.state.highlight = None;

        let case_sensitive = self.state.search.case_sensitive;
        match self.search_all_pages(query, case_sensitive).await {
            Ok(results) => {
                let total = total_matches(&results);
                let first_page = results.first().map(|result| result.page_num);
                let search = &mut self.state.search;
                search.results = results;
                search.total_matches = total;
                search.current_match_index = 0;
                if let Some(page) = first_page {
                    self.go_to_page(page);
                }
                self.refresh_overlay();
                self.state.search.searching = false;
                self.state.error = None;
                info!(total, pages = self.state.search.results.len(), "search finished");
                Ok(total)
            }
            Err(error) => {
                warn!(%error, "search failed");
                self.state.error = Some(error.to_string());
                self.state.search.searching = false;
                Err(error)
            }
        }
    }

    /// Flips case sensitivity. Results found under the old setting are
    /// dropped; the query is kept so the caller can search again.
    pub fn toggle_case_sensitive(&mut self) {
        let search = &mut self.state.search;
        search.case_sensitive = !search.case_sensitive;
        search.clear_results();
        self.refresh_overlay();
    }

    /// Drops the query and results. Extracted text stays cached.
    pub fn clear_search(&mut self) {
        let search = &mut self.state.search;
        search.query.clear();
        search.active = false;
        search.searching = false;
        search.clear_results();
        self.refresh_overlay();
    }
}
