//! Per-attribute change subscriptions.
//!
//! Observers are fire-and-forget and read only: they receive the change by
//! shared reference and cannot reach back into the world that produced it.

use std::fmt;

use crate::attribute::Attribute;
use crate::world::EntityId;

/// A current-value change delivered to observers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttributeChange {
    pub entity: EntityId,
    pub attribute: Attribute,
    pub old_value: f32,
    pub new_value: f32,
}

/// Token returned by `subscribe`; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

pub type ChangeCallback = Box<dyn Fn(&AttributeChange) + Send + Sync>;

struct Subscription {
    token: SubscriptionToken,
    attribute: Attribute,
    callback: ChangeCallback,
}

/// Observer list for one entity.
#[derive(Default)]
pub struct ChangeObservers {
    next_token: u64,
    subscriptions: Vec<Subscription>,
}

impl ChangeObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, attribute: Attribute, callback: ChangeCallback) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.push(Subscription {
            token,
            attribute,
            callback,
        });
        token
    }

    /// Removes a subscription. Returns false if the token was unknown.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.token != token);
        self.subscriptions.len() != before
    }

    /// Invokes every observer of `change.attribute` in subscription order.
    pub fn notify(&self, change: &AttributeChange) {
        self.subscriptions
            .iter()
            .filter(|sub| sub.attribute == change.attribute)
            .for_each(|sub| (sub.callback)(change));
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl fmt::Debug for ChangeObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeObservers")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn change(attribute: Attribute) -> AttributeChange {
        AttributeChange {
            entity: EntityId::new(1),
            attribute,
            old_value: 10.0,
            new_value: 20.0,
        }
    }

    #[test]
    fn only_matching_attribute_is_notified() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut observers = ChangeObservers::new();
        let counter = Arc::clone(&hits);
        observers.subscribe(
            Attribute::Health,
            Box::new(move |_: &AttributeChange| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        observers.notify(&change(Attribute::Mana));
        observers.notify(&change(Attribute::Health));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribed_observer_is_never_invoked() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut observers = ChangeObservers::new();
        let counter = Arc::clone(&hits);
        let token = observers.subscribe(
            Attribute::Health,
            Box::new(move |_: &AttributeChange| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(observers.unsubscribe(token));
        assert!(!observers.unsubscribe(token));
        observers.notify(&change(Attribute::Health));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(observers.is_empty());
    }
}
