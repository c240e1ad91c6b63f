use model::records::{normalized::Mapped, raw::RawRecord};

pub mod split;

pub use split::SplitTransform;

/// A pure, total mapping from a source row to its destination image.
pub trait RowTransform: Send + Sync {
    fn apply(&self, raw: RawRecord) -> Mapped;
}

impl<F> RowTransform for F
where
    F: Fn(RawRecord) -> Mapped + Send + Sync,
{
    fn apply(&self, raw: RawRecord) -> Mapped {
        self(raw)
    }
}
