use crate::search::PageResult;

/// Passive indicator showing how many matches the displayed page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightBadge {
    pub page_num: usize,
    pub match_count: usize,
}

impl HighlightBadge {
    pub fn label(&self) -> String {
        if self.match_count == 1 {
            "1 match on this page".to_owned()
        } else {
            format!("{} matches on this page", self.match_count)
        }
    }
}

/// Recomputes the badge for `current_page` from scratch.
pub fn compute_badge(current_page: usize, results: &[PageResult]) -> Option<HighlightBadge> {
    results
        .binary_search_by_key(&current_page, |result| result.page_num)
        .ok()
        .map(|position| HighlightBadge {
            page_num: current_page,
            match_count: results[position].matches.len(),
        })
        .filter(|badge| badge.match_count > 0)
}
