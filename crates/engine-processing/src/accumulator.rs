use model::records::{batch::Batch, normalized::NormalizedRecord};

/// Groups transformed records into fixed-size batches, preserving order.
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    next_seq: u64,
    open: Vec<NormalizedRecord>,
    first_id: Option<u64>,
    last_id: u64,
}

impl BatchAccumulator {
    /// `capacity` must be non-zero; settings validation guarantees it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_seq: 1,
            open: Vec::with_capacity(capacity),
            first_id: None,
            last_id: 0,
        }
    }

    /// Appends a record read from source row `id`. Returns the sealed batch
    /// once the open one reaches capacity.
    pub fn push(&mut self, id: u64, record: NormalizedRecord) -> Option<Batch> {
        self.first_id.get_or_insert(id);
        self.last_id = id;
        self.open.push(record);

        if self.open.len() >= self.capacity {
            self.seal()
        } else {
            None
        }
    }

    /// Seals whatever is open. `None` when nothing is pending.
    pub fn flush(&mut self) -> Option<Batch> {
        self.seal()
    }

    pub fn pending(&self) -> usize {
        self.open.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of batches sealed so far.
    pub fn sealed(&self) -> u64 {
        self.next_seq - 1
    }

    fn seal(&mut self) -> Option<Batch> {
        let first_id = self.first_id.take()?;
        let records = std::mem::replace(&mut self.open, Vec::with_capacity(self.capacity));
        let batch = Batch::seal(self.next_seq, records, first_id, self.last_id);
        self.next_seq += 1;
        Some(batch)
    }
}
