//! Bounded notification queue and its consumer.
//!
//! The producer side ([`NotificationQueue`]) is a [`NotificationSink`] over a
//! `tokio::sync::mpsc` channel; `publish` uses `try_send` so a full queue
//! back-pressures by dropping (and logging) rather than stalling a checkout.
//! The consumer ([`run_consumer`]) drains events, renders them, and writes
//! notification rows through a [`NotificationWriter`], retrying each event up
//! to [`MAX_DELIVERY_ATTEMPTS`] times before giving up on it.

use std::sync::Arc;

use async_trait::async_trait;
use pomelo_core::{NotificationKind, UserId};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{NotificationEvent, NotificationSink};
use crate::db::{NotificationRepository, RepositoryError};

/// Delivery attempts per event before it is dropped.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Producer half of the notification queue.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationEvent>,
}

impl NotificationQueue {
    /// Create a queue bounded to `capacity` events. The returned receiver is
    /// handed to [`run_consumer`].
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for NotificationQueue {
    async fn publish(&self, event: NotificationEvent) {
        match self.tx.try_send(event) {
            Ok(()) => debug!("notification event queued"),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "notification queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(?event, "notification consumer gone, dropping event");
            }
        }
    }
}

/// Persistence seam for the consumer, so tests can count delivery attempts.
#[async_trait]
pub trait NotificationWriter: Send + Sync {
    /// Write one notification row.
    async fn write(
        &self,
        user_id: UserId,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Result<(), RepositoryError>;
}

/// Postgres-backed writer.
pub struct PgNotificationWriter {
    pool: PgPool,
}

impl PgNotificationWriter {
    /// Create a writer over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationWriter for PgNotificationWriter {
    async fn write(
        &self,
        user_id: UserId,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Result<(), RepositoryError> {
        NotificationRepository::new(&self.pool)
            .create(user_id, title, message, kind)
            .await?;
        Ok(())
    }
}

/// Drain `rx` until every producer is dropped, delivering each event with
/// bounded retries. Spawn this on its own task:
///
/// ```rust,ignore
/// let (queue, rx) = NotificationQueue::new(1024);
/// tokio::spawn(run_consumer(rx, Arc::new(PgNotificationWriter::new(pool))));
/// ```
pub async fn run_consumer(
    mut rx: mpsc::Receiver<NotificationEvent>,
    writer: Arc<dyn NotificationWriter>,
) {
    info!("notification consumer started");
    while let Some(event) = rx.recv().await {
        deliver(&*writer, &event).await;
    }
    info!("notification consumer stopped");
}

async fn deliver(writer: &dyn NotificationWriter, event: &NotificationEvent) {
    let (title, message, kind) = event.render();
    let user_id = event.user_id();

    for attempt in 1..=MAX_DELIVERY_ATTEMPTS {
        match writer.write(user_id, &title, &message, kind).await {
            Ok(()) => {
                debug!(%user_id, attempt, "notification delivered");
                return;
            }
            Err(e) if attempt < MAX_DELIVERY_ATTEMPTS => {
                warn!(%user_id, attempt, error = %e, "notification delivery failed, retrying");
            }
            Err(e) => {
                error!(%user_id, attempt, error = %e, "notification dropped after retries");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomelo_core::OrderId;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Writer that fails the first `failures` calls, then succeeds.
    struct FlakyWriter {
        failures: u32,
        attempts: AtomicU32,
        written: Mutex<Vec<(UserId, String, String, NotificationKind)>>,
    }

    impl FlakyWriter {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
                written: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NotificationWriter for FlakyWriter {
        async fn write(
            &self,
            user_id: UserId,
            title: &str,
            message: &str,
            kind: NotificationKind,
        ) -> Result<(), RepositoryError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(RepositoryError::NotFound);
            }
            self.written
                .lock()
                .expect("lock")
                .push((user_id, title.to_owned(), message.to_owned(), kind));
            Ok(())
        }
    }

    fn order_created() -> NotificationEvent {
        NotificationEvent::OrderCreated {
            user_id: UserId::new(1),
            order_id: OrderId::new(10),
        }
    }

    #[tokio::test]
    async fn test_consumer_writes_one_row_per_event() {
        let writer = Arc::new(FlakyWriter::new(0));
        let (queue, rx) = NotificationQueue::new(8);

        queue.publish(order_created()).await;
        drop(queue);
        run_consumer(rx, writer.clone()).await;

        let written = writer.written.lock().expect("lock");
        assert_eq!(written.len(), 1);
        let (user_id, title, _, kind) = &written[0];
        assert_eq!(*user_id, UserId::new(1));
        assert_eq!(title, "Order Confirmed");
        assert_eq!(*kind, NotificationKind::Success);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let writer = Arc::new(FlakyWriter::new(2));
        let (queue, rx) = NotificationQueue::new(8);

        queue.publish(order_created()).await;
        drop(queue);
        run_consumer(rx, writer.clone()).await;

        assert_eq!(writer.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(writer.written.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn test_event_dropped_after_bounded_attempts() {
        let writer = Arc::new(FlakyWriter::new(u32::MAX));
        let (queue, rx) = NotificationQueue::new(8);

        queue.publish(order_created()).await;
        drop(queue);
        run_consumer(rx, writer.clone()).await;

        assert_eq!(
            writer.attempts.load(Ordering::SeqCst),
            MAX_DELIVERY_ATTEMPTS
        );
        assert!(writer.written.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let (queue, rx) = NotificationQueue::new(1);

        queue.publish(order_created()).await;
        // Queue is full; this publish returns immediately instead of waiting
        queue.publish(order_created()).await;

        drop(queue);
        let writer = Arc::new(FlakyWriter::new(0));
        run_consumer(rx, writer.clone()).await;
        assert_eq!(writer.written.lock().expect("lock").len(), 1);
    }
}
