use crate::transform::RowTransform;
use model::records::{
    normalized::{Mapped, NormalizedRecord},
    raw::RawRecord,
};

/// Splits the text column on a delimiter and keeps the first two tokens.
///
/// Missing tokens become empty strings. Anything after the second delimiter
/// is discarded, so `"a_b_c"` and `"a_b"` map to the same record.
#[derive(Debug, Clone)]
pub struct SplitTransform {
    delimiter: String,
}

impl SplitTransform {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn split(&self, text: &str) -> NormalizedRecord {
        // An empty delimiter would match between every character.
        if self.delimiter.is_empty() {
            return NormalizedRecord::new(text, "");
        }

        let mut tokens = text.splitn(3, self.delimiter.as_str());
        let part1 = tokens.next().unwrap_or_default();
        let part2 = tokens.next().unwrap_or_default();
        NormalizedRecord::new(part1, part2)
    }
}

impl Default for SplitTransform {
    fn default() -> Self {
        Self::new("_")
    }
}

impl RowTransform for SplitTransform {
    fn apply(&self, raw: RawRecord) -> Mapped {
        match raw.text {
            Some(text) => Mapped::Record(self.split(&text)),
            None => Mapped::Unmappable {
                id: raw.id,
                reason: "text column is NULL".to_string(),
            },
        }
    }
}
