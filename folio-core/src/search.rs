//! Text matching and the flattened match cursor.
//!
//! Offsets are counted in `char`s, not bytes, so they line up with what a
//! reader sees regardless of encoding.

/// Characters of surrounding text kept on each side of a match.
pub const CONTEXT_RADIUS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub index: usize,
    pub length: usize,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub page_num: usize,
    pub text: String,
    pub matches: Vec<Match>,
}

/// Finds every occurrence of `query` in `text`.
///
/// Each scan resumes one character after the previous match's start, so
/// self-overlapping queries (`"aa"` in `"aaa"`) report every start position.
pub fn find_matches(text: &str, query: &str, case_sensitive: bool) -> Vec<Match> {
    if text.is_empty() || query.is_empty() {
        return Vec::new();
    }

    let haystack: Vec<char> = text.chars().collect();
    let needle: Vec<char> = query.chars().collect();
    let (haystack_folded, needle_folded) = if case_sensitive {
        (haystack.clone(), needle.clone())
    } else {
        (fold_chars(&haystack), fold_chars(&needle))
    };

    if needle.len() > haystack.len() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    let mut start = 0;
    while let Some(offset) = find_from(&haystack_folded, &needle_folded, start) {
        let context_start = offset.saturating_sub(CONTEXT_RADIUS);
        let context_end = (offset + needle.len() + CONTEXT_RADIUS).min(haystack.len());
        matches.push(Match {
            index: offset,
            length: needle.len(),
            context: haystack[context_start..context_end].iter().collect(),
        });
        start = offset + 1;
    }
    matches
}

/// Runs [`find_matches`] over a page's text and packages the outcome.
pub fn search_text(page_num: usize, text: &str, query: &str, case_sensitive: bool) -> PageResult {
    PageResult {
        page_num,
        text: text.to_owned(),
        matches: find_matches(text, query, case_sensitive),
    }
}

pub fn total_matches(results: &[PageResult]) -> usize {
    results.iter().map(|result| result.matches.len()).sum()
}

/// Resolves a zero-based cursor into the flattened match sequence to the
/// page holding that match and the match itself.
pub fn locate_match(results: &[PageResult], cursor: usize) -> Option<(usize, &Match)> {
    let mut seen = 0;
    for result in results {
        let count = result.matches.len();
        if seen + count > cursor {
            return result
                .matches
                .get(cursor - seen)
                .map(|found| (result.page_num, found));
        }
        seen += count;
    }
    None
}

pub fn page_for_match(results: &[PageResult], cursor: usize) -> Option<usize> {
    locate_match(results, cursor).map(|(page_num, _)| page_num)
}

fn find_from(haystack: &[char], needle: &[char], start: usize) -> Option<usize> {
    if start >= haystack.len() || needle.len() > haystack.len() - start {
        return None;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + start)
}

// Folding keeps one char per char so offsets stay valid in the original text.
fn fold_chars(chars: &[char]) -> Vec<char> {
    chars
        .iter()
        .map(|&c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(single), None) => single,
                _ => c,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(page_num: usize, count: usize) -> PageResult {
        PageResult {
            page_num,
            text: String::new(),
            matches: (0..count)
                .map(|index| Match {
                    index,
                    length: 1,
                    context: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn finds_each_occurrence_case_insensitively() {
        let matches = find_matches("Hello World", "o", false);
        let offsets: Vec<_> = matches.iter().map(|m| (m.index, m.length)).collect();
        assert_eq!(offsets, vec![(4, 1), (7, 1)]);

        let upper = find_matches("Hello World", "WORLD", false);
        assert_eq!(upper.len(), 1);
        assert_eq!(upper[0].index, 6);
    }

    #[test]
    fn respects_case_when_requested() {
        assert!(find_matches("Hello World", "world", true).is_empty());
        assert_eq!(find_matches("Hello World", "World", true).len(), 1);
    }

    #[test]
    fn missing_or_empty_inputs_yield_nothing() {
        assert!(find_matches("Hello World", "xyz", false).is_empty());
        assert!(find_matches("", "a", false).is_empty());
        assert!(find_matches("abc", "", false).is_empty());
        assert!(find_matches("ab", "abc", false).is_empty());
    }

    #[test]
    fn scanning_resumes_after_previous_start() {
        let offsets: Vec<_> = find_matches("aaaa", "aa", true)
            .iter()
            .map(|m| m.index)
            .collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn context_is_clamped_to_text_bounds() {
        let text = format!("{}needle{}", "x".repeat(40), "y".repeat(5));
        let matches = find_matches(&text, "needle", false);
        assert_eq!(matches.len(), 1);
        let context = &matches[0].context;
        assert_eq!(context, &format!("{}needle{}", "x".repeat(30), "y".repeat(5)));

        let short = find_matches("a needle b", "needle", false);
        assert_eq!(short[0].context, "a needle b");
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let matches = find_matches("Ünïcödé text", "TEXT", false);
        assert_eq!(matches[0].index, 8);
        let accented = find_matches("ÀB àb", "àb", false);
        assert_eq!(accented.iter().map(|m| m.index).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn cursor_resolves_through_flattened_results() {
        let results = vec![result(1, 2), result(3, 3)];
        assert_eq!(total_matches(&results), 5);
        assert_eq!(page_for_match(&results, 0), Some(1));
        assert_eq!(page_for_match(&results, 1), Some(1));
        assert_eq!(page_for_match(&results, 2), Some(3));
        assert_eq!(page_for_match(&results, 4), Some(3));
        assert_eq!(page_for_match(&results, 5), None);

        let (page, found) = locate_match(&results, 3).unwrap();
        assert_eq!(page, 3);
        assert_eq!(found.index, 1);
    }
}
