/// Domain event bus
///
/// The core notifies external collaborators (mailer, audit log) through a
/// fire-and-forget [`EventBus`]: `publish` returns immediately and the core
/// never waits on subscriber completion. A dropped event because nobody is
/// listening is not an error.
///
/// # Example
///
/// ```
/// use saasbase_shared::events::{ChannelEventBus, DomainEvent, EventBus};
/// use uuid::Uuid;
///
/// let (bus, mut rx) = ChannelEventBus::channel();
/// bus.publish(DomainEvent::PasswordUpdated { account_id: Uuid::new_v4() });
/// assert!(rx.try_recv().is_ok());
/// ```
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Events emitted by the account core
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A new account finished signup
    AccountCreated { account_id: Uuid, email: String },

    /// A password reset was requested; carries what a mailer needs
    PasswordResetRequested {
        account_id: Uuid,
        email: String,
        confirmation_token: String,
    },

    /// A pending reset was consumed and the password changed
    PasswordUpdated { account_id: Uuid },

    /// The account's bound current user changed
    ActiveUserChanged { account_id: Uuid, user_id: Uuid },
}

/// Fire-and-forget notification sink
pub trait EventBus: Send + Sync {
    /// Publishes the event; never blocks, never fails the caller
    fn publish(&self, event: DomainEvent);
}

/// Event bus over an unbounded tokio channel
///
/// Subscribers drain the receiving half on their own schedule. If the
/// receiver is gone the event is dropped silently.
#[derive(Clone)]
pub struct ChannelEventBus {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl ChannelEventBus {
    /// Creates a bus together with its subscriber end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventBus for ChannelEventBus {
    fn publish(&self, event: DomainEvent) {
        debug!(?event, "publishing domain event");
        // No receiver means no subscribers; that is fine.
        let _ = self.tx.send(event);
    }
}

/// Bus that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(&self, _event: DomainEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bus_delivers() {
        let (bus, mut rx) = ChannelEventBus::channel();
        let account_id = Uuid::new_v4();

        bus.publish(DomainEvent::PasswordUpdated { account_id });

        match rx.try_recv().unwrap() {
            DomainEvent::PasswordUpdated { account_id: got } => assert_eq!(got, account_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_receiver_is_silent() {
        let (bus, rx) = ChannelEventBus::channel();
        drop(rx);

        // Must not panic or error out.
        bus.publish(DomainEvent::PasswordUpdated {
            account_id: Uuid::new_v4(),
        });
    }
}
