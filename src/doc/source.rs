use std::fs;
use std::path::Path;

use crate::core::errors::ApiError;

/// One page of extracted document text, lines already joined.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: usize,
    pub content: String,
}

/// Cumulative character thresholds per page over the flattened text. A
/// chunk belongs to the first page whose threshold strictly exceeds the
/// chunk's offset.
#[derive(Debug, Clone, Default)]
pub struct PageMap {
    thresholds: Vec<(usize, usize)>,
}

impl PageMap {
    pub fn page_of(&self, offset: usize) -> usize {
        self.thresholds
            .iter()
            .find(|(end, _)| *end > offset)
            .or_else(|| self.thresholds.last())
            .map(|(_, number)| *number)
            .unwrap_or(1)
    }
}

/// Reads a pre-extracted document: pages separated by form-feed, each
/// page's lines joined with single spaces.
pub fn load_pages(path: &Path) -> Result<Vec<PageText>, ApiError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        ApiError::Internal(format!("Failed to read document {}: {}", path.display(), err))
    })?;
    Ok(paginate(&raw))
}

pub fn paginate(raw: &str) -> Vec<PageText> {
    raw.split('\u{000C}')
        .enumerate()
        .map(|(idx, page)| PageText {
            number: idx + 1,
            content: page
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect()
}

/// Joins pages into the single ingestion text and records the page
/// threshold table alongside it.
pub fn flatten_pages(pages: &[PageText]) -> (String, PageMap) {
    let mut text = String::new();
    let mut thresholds = Vec::with_capacity(pages.len());

    for (idx, page) in pages.iter().enumerate() {
        if idx > 0 {
            text.push(' ');
        }
        text.push_str(&page.content);
        thresholds.push((text.len(), page.number));
    }

    (text, PageMap { thresholds })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn pages_split_on_form_feed_and_join_lines() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "first line\nsecond line\u{000C}third line\n").expect("write doc");

        let pages = load_pages(file.path()).expect("document should load");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].content, "first line second line");
        assert_eq!(pages[1].content, "third line");
    }

    #[test]
    fn flatten_pages_maps_offsets_to_owning_pages() {
        let pages = paginate("alpha beta\u{000C}gamma delta");
        let (text, page_map) = flatten_pages(&pages);

        assert_eq!(text, "alpha beta gamma delta");
        assert_eq!(page_map.page_of(0), 1);
        assert_eq!(page_map.page_of(9), 1);
        // "gamma" starts at offset 11, past the first page threshold of 10
        assert_eq!(page_map.page_of(11), 2);
        // offsets past the final threshold stay on the last page
        assert_eq!(page_map.page_of(1000), 2);
    }

    #[test]
    fn missing_document_fails_explicitly() {
        let result = load_pages(Path::new("/nonexistent/document.txt"));
        assert!(result.is_err());
    }
}
