use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a paginated read over the source id column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Before the first row.
    #[default]
    Start,

    /// Strictly after the row with this id.
    After { id: u64 },
}

impl Cursor {
    pub fn from_last_id(last_id: Option<u64>) -> Self {
        match last_id {
            Some(id) => Cursor::After { id },
            None => Cursor::Start,
        }
    }

    /// Lower bound (exclusive) of the next read, `None` at the start.
    pub fn after_id(&self) -> Option<u64> {
        match self {
            Cursor::Start => None,
            Cursor::After { id } => Some(*id),
        }
    }

    /// Whether a row with `id` is beyond this cursor.
    pub fn admits(&self, id: u64) -> bool {
        match self {
            Cursor::Start => true,
            Cursor::After { id: after } => id > *after,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Start => write!(f, "start"),
            Cursor::After { id } => write!(f, "id > {id}"),
        }
    }
}
