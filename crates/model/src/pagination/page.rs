use crate::{pagination::cursor::Cursor, records::raw::RawRecord};

/// One read unit from the source.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RawRecord>,
    /// Where the following read starts; `None` once the source is exhausted.
    pub next: Option<Cursor>,
}

impl Page {
    /// Builds a page from rows fetched with `limit`. A short page marks exhaustion.
    pub fn from_fetch(records: Vec<RawRecord>, limit: usize) -> Self {
        let next = if records.len() < limit {
            None
        } else {
            records.last().map(|r| Cursor::After { id: r.id })
        };
        Page { records, next }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_page_points_past_last_row() {
        let page = Page::from_fetch(vec![RawRecord::new(4, "a"), RawRecord::new(9, "b")], 2);
        assert_eq!(page.next, Some(Cursor::After { id: 9 }));
    }

    #[test]
    fn test_short_page_is_exhausted() {
        let page = Page::from_fetch(vec![RawRecord::new(4, "a")], 2);
        assert_eq!(page.next, None);
        assert!(Page::from_fetch(Vec::new(), 2).is_empty());
    }
}
