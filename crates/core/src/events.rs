use std::{sync::Mutex, time::SystemTime};

use uuid::Uuid;

use crate::error::{ClientError, Operation};

/// A user-facing failure from one operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorEvent {
    pub event_id: Uuid,
    pub origin: Operation,
    pub message: String,
    pub raised_at: SystemTime,
}

impl ErrorEvent {
    pub fn new(origin: Operation, message: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            origin,
            message: message.into(),
            raised_at: SystemTime::now(),
        }
    }
}

/// Holds the single current error. A newer event replaces the older one.
#[derive(Debug, Default)]
pub struct ErrorFeed {
    slot: Mutex<Option<ErrorEvent>>,
}

impl ErrorFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: ErrorEvent) {
        *self.slot.lock().expect("ErrorFeed poisoned") = Some(event);
    }

    /// Publishes `error` as raised by `origin` and returns the event.
    pub fn report(&self, origin: Operation, error: &ClientError) -> ErrorEvent {
        let event = ErrorEvent::new(origin, error.to_string());
        self.publish(event.clone());
        event
    }

    pub fn current(&self) -> Option<ErrorEvent> {
        self.slot.lock().expect("ErrorFeed poisoned").clone()
    }

    /// Clears the current error without retrying anything.
    pub fn dismiss(&self) -> Option<ErrorEvent> {
        self.slot.lock().expect("ErrorFeed poisoned").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_event_replaces_the_previous_one() {
        let feed = ErrorFeed::new();
        feed.publish(ErrorEvent::new(Operation::Upload, "first"));
        let second = feed.report(
            Operation::Highlight,
            &ClientError::RequestSetup {
                message: "second".to_string(),
            },
        );

        let current = feed.current().unwrap();
        assert_eq!(current, second);
        assert_eq!(current.message, "second");
        assert_eq!(current.origin, Operation::Highlight);
    }

    #[test]
    fn dismiss_clears_the_slot() {
        let feed = ErrorFeed::new();
        assert!(feed.dismiss().is_none());

        feed.publish(ErrorEvent::new(Operation::Upload, "boom"));
        assert_eq!(feed.dismiss().map(|e| e.message), Some("boom".to_string()));
        assert!(feed.current().is_none());
    }
}
