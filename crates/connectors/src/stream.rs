use crate::error::ConnectorError;
use model::records::raw::RawRecord;
use std::future::Future;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Number of chunks the producer may buffer ahead of the consumer.
pub const STREAM_CHANNEL_CAPACITY: usize = 2;

enum StreamItem {
    Chunk(Vec<RawRecord>),
    End,
    Failed(ConnectorError),
}

/// Sending half handed to a stream producer.
#[derive(Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<StreamItem>,
}

impl ChunkSender {
    /// Hands a chunk to the consumer, waiting while the channel is full.
    pub async fn send(&self, chunk: Vec<RawRecord>) -> Result<(), ConnectorError> {
        self.tx
            .send(StreamItem::Chunk(chunk))
            .await
            .map_err(|_| ConnectorError::Closed)
    }
}

/// A lazy, finite, single-use sequence of raw record chunks.
///
/// The producer runs in its own task and owns whatever server-side cursor it
/// reads from. Once an error has been observed the stream is poisoned: it can
/// neither be resumed nor restarted. Dropping the stream aborts the producer,
/// which releases its connection.
pub struct RecordStream {
    rx: mpsc::Receiver<StreamItem>,
    task: Option<JoinHandle<()>>,
    poisoned: bool,
    finished: bool,
}

impl RecordStream {
    /// Spawns `producer` and returns the consuming end.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(ChunkSender) -> Fut,
        Fut: Future<Output = Result<(), ConnectorError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let sender = ChunkSender { tx: tx.clone() };
        let fut = producer(sender);

        let task = tokio::spawn(async move {
            let item = match fut.await {
                Ok(()) => StreamItem::End,
                Err(err) => StreamItem::Failed(err),
            };
            // The receiver may already be gone; nothing left to report to.
            let _ = tx.send(item).await;
        });

        RecordStream {
            rx,
            task: Some(task),
            poisoned: false,
            finished: false,
        }
    }

    /// Next chunk, or `None` once the producer has finished.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<RawRecord>>, ConnectorError> {
        if self.poisoned {
            return Err(ConnectorError::StreamInvalidated);
        }
        if self.finished {
            return Ok(None);
        }

        match self.rx.recv().await {
            Some(StreamItem::Chunk(chunk)) => Ok(Some(chunk)),
            Some(StreamItem::End) => {
                self.finished = true;
                self.task = None;
                Ok(None)
            }
            Some(StreamItem::Failed(err)) => {
                self.poisoned = true;
                Err(err)
            }
            None => {
                self.poisoned = true;
                Err(ConnectorError::Closed)
            }
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Aborting unfinished record stream producer");
                task.abort();
            }
        }
    }
}
