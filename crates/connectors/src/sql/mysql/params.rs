use model::{pagination::cursor::Cursor, records::batch::Batch};
use mysql_async::{Params, Value as MySqlValue};

/// Positional parameters for one statement.
pub struct MySqlParamStore {
    values: Vec<MySqlValue>,
}

impl MySqlParamStore {
    /// `(part1, part2)` pairs in batch order, matching `QueryGenerator::insert_values`.
    pub fn from_batch(batch: &Batch) -> Self {
        let values = batch
            .records()
            .iter()
            .flat_map(|r| {
                [
                    MySqlValue::Bytes(r.part1.clone().into_bytes()),
                    MySqlValue::Bytes(r.part2.clone().into_bytes()),
                ]
            })
            .collect();
        MySqlParamStore { values }
    }

    /// Cursor id (if any) followed by the limit (if any), matching
    /// `QueryGenerator::select_after`.
    pub fn keyset(cursor: &Cursor, limit: Option<usize>) -> Self {
        let mut values = Vec::with_capacity(2);
        if let Some(id) = cursor.after_id() {
            values.push(MySqlValue::UInt(id));
        }
        if let Some(limit) = limit {
            values.push(MySqlValue::UInt(limit as u64));
        }
        MySqlParamStore { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_params(self) -> Params {
        if self.values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(self.values)
        }
    }
}
