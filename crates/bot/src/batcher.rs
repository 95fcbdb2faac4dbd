use mkw_bulk::BatchItem;
use mkw_core::WRITE_BATCH_FLUSH;
use mkw_core::WRITE_BATCH_SIZE;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Where flushed batches land. The session store is the production
/// sink; tests record instead.
#[async_trait::async_trait]
pub trait BatchSink: Send + Sync + 'static {
    async fn write(&self, token: &str, items: Vec<BatchItem>) -> Result<(), String>;
}

#[async_trait::async_trait]
impl BatchSink for mkw_bulk::SessionStore {
    async fn write(&self, token: &str, items: Vec<BatchItem>) -> Result<(), String> {
        self.append_batch(token, items)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Batches OCR completions into session writes: a batch flushes when it
/// reaches 10 rows or 500 ms after the most recent completion, whichever
/// comes first. Dropping the handle flushes the remainder.
pub struct Batcher {
    tx: mpsc::UnboundedSender<BatchItem>,
    task: tokio::task::JoinHandle<()>,
}

impl Batcher {
    pub fn spawn(sink: impl BatchSink, token: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(sink, token, rx));
        Self { tx, task }
    }

    pub fn push(&self, item: BatchItem) {
        let _ = self.tx.send(item);
    }

    /// Close the intake and wait for the final flush.
    pub async fn finish(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}

async fn run(sink: impl BatchSink, token: String, mut rx: mpsc::UnboundedReceiver<BatchItem>) {
    let mut buffer: Vec<BatchItem> = Vec::with_capacity(WRITE_BATCH_SIZE);
    let mut deadline = Instant::now();
    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(item) => {
                    buffer.push(item);
                    deadline = Instant::now() + WRITE_BATCH_FLUSH;
                    if buffer.len() >= WRITE_BATCH_SIZE {
                        flush(&sink, &token, &mut buffer).await;
                    }
                }
                None => break,
            },
            _ = tokio::time::sleep_until(deadline), if !buffer.is_empty() => {
                flush(&sink, &token, &mut buffer).await;
            }
        }
    }
    flush(&sink, &token, &mut buffer).await;
}

async fn flush(sink: &impl BatchSink, token: &str, buffer: &mut Vec<BatchItem>) {
    if buffer.is_empty() {
        return;
    }
    let items = std::mem::take(buffer);
    let count = items.len();
    if let Err(e) = sink.write(token, items).await {
        log::error!("batch write of {} session rows failed: {}", count, e);
    } else {
        log::debug!("flushed {} session rows", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkw_bulk::NewFailure;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder {
        batches: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait::async_trait]
    impl BatchSink for Recorder {
        async fn write(&self, _token: &str, items: Vec<BatchItem>) -> Result<(), String> {
            self.batches.lock().unwrap().push(items.len());
            Ok(())
        }
    }

    fn failure() -> BatchItem {
        BatchItem::Failure(NewFailure {
            image_filename: "war.png".to_string(),
            image_url: None,
            error_message: "empty output".to_string(),
            message_timestamp: None,
            message_id: None,
        })
    }

    #[tokio::test]
    async fn full_batches_flush_at_ten() {
        let recorder = Recorder::default();
        let batcher = Batcher::spawn(recorder.clone(), "t".to_string());
        for _ in 0..25 {
            batcher.push(failure());
        }
        batcher.finish().await;
        let batches = recorder.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn partial_batch_flushes_on_deadline() {
        let recorder = Recorder::default();
        let batcher = Batcher::spawn(recorder.clone(), "t".to_string());
        batcher.push(failure());
        batcher.push(failure());
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(recorder.batches.lock().unwrap().clone(), vec![2]);
        batcher.finish().await;
        assert_eq!(recorder.batches.lock().unwrap().clone(), vec![2]);
    }

    #[tokio::test]
    async fn drop_flushes_remainder() {
        let recorder = Recorder::default();
        let batcher = Batcher::spawn(recorder.clone(), "t".to_string());
        batcher.push(failure());
        batcher.finish().await;
        assert_eq!(recorder.batches.lock().unwrap().clone(), vec![1]);
    }
}
