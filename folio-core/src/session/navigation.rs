use tracing::debug;

use super::Session;
use crate::search::page_for_match;
use crate::state::FitMode;

// Out-of-range arguments are silently ignored throughout: a bad page number
// or zoom level is a no-op, never an error. None of these trigger a render.
impl Session {
    pub fn go_to_page(&mut self, page: usize) {
        if self.state.is_valid_page(page) {
            self.state.current_page = page;
        } else {
            debug!(page, total = self.state.total_pages, "ignoring out-of-range page");
        }
    }

    pub fn next_page(&mut self) {
        self.advance_pages(1);
    }

    pub fn prev_page(&mut self) {
        self.rewind_pages(1);
    }

    /// Moves forward `count` pages, stopping at the last page.
    pub fn advance_pages(&mut self, count: usize) {
        let target = self
            .state
            .current_page
            .saturating_add(count)
            .min(self.state.total_pages);
        self.go_to_page(target);
    }

    /// Moves back `count` pages, stopping at the first page.
    pub fn rewind_pages(&mut self, count: usize) {
        self.go_to_page(self.state.current_page.saturating_sub(count).max(1));
    }

    /// Sets a custom zoom level; switches the fit mode to `custom`.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() && zoom > 0.0 {
            self.state.zoom_level = zoom;
            self.state.fit_mode = FitMode::Custom;
        } else {
            debug!(zoom, "ignoring non-positive zoom");
        }
    }

    pub fn rotate(&mut self) {
        self.state.rotation = self.state.rotation.rotated();
    }

    pub fn set_fit_mode(&mut self, mode: FitMode) {
        self.state.fit_mode = mode;
    }

    pub fn set_search_active(&mut self, active: bool) {
        self.state.search.active = active;
    }

    pub fn next_match(&mut self) -> Option<usize> {
        self.advance_matches(1)
    }

    pub fn prev_match(&mut self) -> Option<usize> {
        self.rewind_matches(1)
    }

    /// Advances the match cursor by `count`, stopping at the last match, and
    /// moves to the page holding it. Returns that page.
    pub fn advance_matches(&mut self, count: usize) -> Option<usize> {
        let search = &mut self.state.search;
        if search.total_matches == 0 {
            return None;
        }
        search.current_match_index = search
            .current_match_index
            .saturating_add(count)
            .min(search.total_matches - 1);
        self.follow_match_cursor()
    }

    /// Moves the match cursor back by `count`, stopping at the first match.
    pub fn rewind_matches(&mut self, count: usize) -> Option<usize> {
        let search = &mut self.state.search;
        if search.total_matches == 0 {
            return None;
        }
        search.current_match_index = search.current_match_index.saturating_sub(count);
        self.follow_match_cursor()
    }

    fn follow_match_cursor(&mut self) -> Option<usize> {
        let page = page_for_match(
            &self.state.search.results,
            self.state.search.current_match_index,
        )?;
        self.go_to_page(page);
        Some(page)
    }
}
