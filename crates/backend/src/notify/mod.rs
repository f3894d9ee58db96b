//! Typed notification events and the sink they flow through.
//!
//! The checkout orchestrator and the order state machine publish events to a
//! [`NotificationSink`] after their transactions commit. Publishing is
//! fire-and-forget: a failed or dropped event never rolls back the work that
//! produced it. The bundled [`queue::NotificationQueue`] sink feeds a
//! consumer task with its own bounded-retry policy.

use pomelo_core::{NotificationKind, OrderId, OrderStatus, UserId};
use serde::{Deserialize, Serialize};

pub mod queue;

pub use queue::{NotificationQueue, NotificationWriter, PgNotificationWriter, run_consumer};

/// Events the core workflow emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A checkout committed.
    OrderCreated { user_id: UserId, order_id: OrderId },
    /// An order moved to a new status.
    OrderStatusChanged {
        user_id: UserId,
        order_id: OrderId,
        status: OrderStatus,
    },
    /// A new account was created.
    Welcome { user_id: UserId, name: String },
}

impl NotificationEvent {
    /// The user the resulting notification is addressed to.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::OrderCreated { user_id, .. }
            | Self::OrderStatusChanged { user_id, .. }
            | Self::Welcome { user_id, .. } => *user_id,
        }
    }

    /// Render the user-facing title, message, and kind.
    #[must_use]
    pub fn render(&self) -> (String, String, NotificationKind) {
        match self {
            Self::OrderCreated { order_id, .. } => (
                "Order Confirmed".to_owned(),
                format!("Your order #{order_id} has been confirmed and is being processed."),
                NotificationKind::Success,
            ),
            Self::OrderStatusChanged {
                order_id, status, ..
            } => (
                "Order Update".to_owned(),
                format!("Your order #{order_id} status has been updated to {status}"),
                NotificationKind::OrderUpdate,
            ),
            Self::Welcome { name, .. } => (
                "Welcome to Pomelo!".to_owned(),
                format!("Hi {name}, welcome to Pomelo! Start exploring our products."),
                NotificationKind::Success,
            ),
        }
    }
}

/// Where the core workflow hands off its side-effect events.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Publish `event`. Must not fail the caller: implementations log and
    /// drop on error.
    async fn publish(&self, event: NotificationEvent);
}
