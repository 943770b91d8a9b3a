use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::engine::DocumentHandle;
use crate::state::DocumentId;

/// Separator placed between text-layer fragments when flattening a page.
pub const FRAGMENT_SEPARATOR: &str = " ";

/// Extracted page text for one loaded document.
///
/// Entries are written once and never replaced; the whole cache is dropped
/// when another document is loaded.
#[derive(Debug, Clone, Default)]
pub struct TextCache {
    document: Option<DocumentId>,
    pages: HashMap<usize, String>,
}

impl TextCache {
    pub fn for_document(document: DocumentId) -> Self {
        Self {
            document: Some(document),
            pages: HashMap::new(),
        }
    }

    pub fn document(&self) -> Option<DocumentId> {
        self.document
    }

    pub fn get(&self, page_num: usize) -> Option<&str> {
        self.pages.get(&page_num).map(String::as_str)
    }

    pub fn contains(&self, page_num: usize) -> bool {
        self.pages.contains_key(&page_num)
    }

    /// Stores text for `page_num` unless it is already cached or belongs to a
    /// different document. Returns the text now held for the page, if any.
    pub(crate) fn insert(
        &mut self,
        document: DocumentId,
        page_num: usize,
        text: String,
    ) -> Option<&str> {
        if self.document != Some(document) {
            return None;
        }
        Some(self.pages.entry(page_num).or_insert(text).as_str())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Pulls the text layer of one page from the engine and flattens it.
pub async fn extract_page_text(document: &dyn DocumentHandle, page_num: usize) -> Result<String> {
    let page = document
        .get_page(page_num)
        .await
        .with_context(|| format!("failed to fetch page {page_num}"))?;
    let items = page
        .text_content()
        .await
        .with_context(|| format!("failed to extract text for page {page_num}"))?;
    Ok(items
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDocument;
    use uuid::Uuid;

    #[test]
    fn insert_keeps_the_first_value() {
        let id = Uuid::new_v4();
        let mut cache = TextCache::for_document(id);
        assert_eq!(cache.insert(id, 1, "first".into()), Some("first"));
        assert_eq!(cache.insert(id, 1, "second".into()), Some("first"));
        assert_eq!(cache.get(1), Some("first"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn insert_ignores_text_from_another_document() {
        let mut cache = TextCache::for_document(Uuid::new_v4());
        assert_eq!(cache.insert(Uuid::new_v4(), 1, "stale".into()), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn extraction_joins_fragments_with_spaces() {
        let document = FakeDocument::builder()
            .page_fragments(&["Hello", "World"])
            .build();
        let text = extract_page_text(&document, 1).await.unwrap();
        assert_eq!(text, "Hello World");
    }

    #[tokio::test]
    async fn extraction_reports_the_failing_page() {
        let document = FakeDocument::builder()
            .page("fine")
            .page("broken")
            .fail_text_on(2)
            .build();
        let err = extract_page_text(&document, 2).await.unwrap_err();
        assert!(format!("{err:#}").contains("page 2"));
    }
}
