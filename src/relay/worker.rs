//! Background delivery of relayed messages.
//!
//! A single task owns the receiving end of the relay queue, so messages
//! reach the sink in the order they were queued.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::common::RelayMessage;
use crate::config::types::RetryConfig;
use crate::relay::sink::ChatSink;

pub struct RelayWorker {
    rx: mpsc::Receiver<RelayMessage>,
    sink: Arc<dyn ChatSink>,
    retry: RetryConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayWorker {
    pub fn new(
        rx: mpsc::Receiver<RelayMessage>,
        sink: Arc<dyn ChatSink>,
        retry: RetryConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            rx,
            sink,
            retry,
            shutdown_rx,
        }
    }

    /// Deliver messages until the queue closes or shutdown is signalled.
    ///
    /// On shutdown whatever is already queued is still delivered.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        self.drain().await;
                        break;
                    }
                }
                message = self.rx.recv() => {
                    match message {
                        Some(message) => self.deliver(&message).await,
                        None => break,
                    }
                }
            }
        }
        info!("Relay worker stopped");
    }

    async fn drain(&mut self) {
        self.rx.close();
        let mut drained = 0usize;
        while let Some(message) = self.rx.recv().await {
            self.deliver(&message).await;
            drained += 1;
        }
        if drained > 0 {
            info!("Delivered {} queued messages before shutdown", drained);
        }
    }

    /// Publish one message, retrying transient failures.
    async fn deliver(&self, message: &RelayMessage) {
        let mut backoff = self.backoff();
        let mut attempt = 1usize;

        loop {
            match self.sink.publish(message).await {
                Ok(()) => {
                    debug!(kind = message.kind.name(), attempt, "Relayed message");
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    warn!(kind = message.kind.name(), "Dropping message: {}", e);
                    return;
                }
                Err(e) => match backoff.next() {
                    Some(delay) => {
                        debug!(
                            attempt,
                            "Publish failed: {}. Retrying in {:.1}s",
                            e,
                            delay.as_secs_f64()
                        );
                        attempt += 1;
                        sleep(delay).await;
                    }
                    None => {
                        warn!(
                            kind = message.kind.name(),
                            attempts = attempt,
                            "Dropping message after retries: {}",
                            e
                        );
                        return;
                    }
                },
            }
        }
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        backon::ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.retry.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.retry.max_delay_ms))
            .with_max_times(self.retry.max_attempts.saturating_sub(1))
            .with_jitter()
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::SinkError;
    use crate::common::BroadcastKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
        failures_left: Mutex<usize>,
        reject: bool,
    }

    impl RecordingSink {
        fn failing(times: usize) -> Self {
            Self {
                failures_left: Mutex::new(times),
                ..Self::default()
            }
        }

        fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }

        fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn publish(&self, message: &RelayMessage) -> Result<(), SinkError> {
            *self.attempts.lock().unwrap() += 1;
            if self.reject {
                return Err(SinkError::Rejected {
                    message: "missing permissions".to_string(),
                });
            }
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(SinkError::Unavailable {
                    message: "gateway down".to_string(),
                });
            }
            self.published.lock().unwrap().push(message.content.clone());
            Ok(())
        }
    }

    fn retry(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            min_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    fn system(content: &str) -> RelayMessage {
        RelayMessage {
            kind: BroadcastKind::System,
            content: content.to_string(),
            origin: None,
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = RelayWorker::new(rx, sink.clone(), retry(3), shutdown_rx);

        for text in ["one", "two", "three"] {
            tx.send(system(text)).await.unwrap();
        }
        drop(tx);
        worker.run().await;

        assert_eq!(sink.published(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let sink = Arc::new(RecordingSink::failing(2));
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = RelayWorker::new(rx, sink.clone(), retry(5), shutdown_rx);

        tx.send(system("Server restarting")).await.unwrap();
        drop(tx);
        worker.run().await;

        assert_eq!(sink.published(), vec!["Server restarting"]);
        assert_eq!(sink.attempts(), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let sink = Arc::new(RecordingSink::failing(100));
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = RelayWorker::new(rx, sink.clone(), retry(3), shutdown_rx);

        tx.send(system("lost")).await.unwrap();
        drop(tx);
        worker.run().await;

        assert!(sink.published().is_empty());
        assert_eq!(sink.attempts(), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let sink = Arc::new(RecordingSink {
            reject: true,
            ..RecordingSink::default()
        });
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = RelayWorker::new(rx, sink.clone(), retry(5), shutdown_rx);

        tx.send(system("nope")).await.unwrap();
        drop(tx);
        worker.run().await;

        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = RelayWorker::new(rx, sink.clone(), retry(3), shutdown_rx);

        tx.send(system("a")).await.unwrap();
        tx.send(system("b")).await.unwrap();
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), worker.run())
            .await
            .unwrap();
        assert_eq!(sink.published(), vec!["a", "b"]);
    }
}
