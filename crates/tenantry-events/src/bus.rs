//! Event bus implementation
//!
//! This module provides the event bus abstraction and the in-memory
//! implementation used to fan tenancy notifications out to subscribers
//! and handlers (email delivery, audit sinks).

use crate::types::{Event, TenancyEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `tenantry.organization.*` matches `tenantry.organization.created`
    /// - `tenantry.#` matches every tenancy event
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;

    /// Unsubscribe from a topic.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Publish a typed tenancy event.
pub async fn publish_tenancy_event(
    bus: &dyn EventBus,
    event: &TenancyEvent,
    actor: Option<uuid::Uuid>,
    tenant_id: Option<uuid::Uuid>,
) -> EventBusResult<()> {
    let mut envelope = event.to_event()?.with_tenant(tenant_id);
    if let Some(user_id) = actor {
        envelope = envelope.with_user(user_id);
    }
    bus.publish(envelope).await
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total events delivered
    pub events_delivered: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// In-memory event bus.
///
/// Fans events out to broadcast subscribers and spawned handler tasks within
/// one process. Used by default and in tests.
pub struct MemoryEventBus {
    state: RwLock<BusState>,
    channel_capacity: usize,
}

#[derive(Default)]
struct BusState {
    /// One broadcast channel per distinct pattern
    channels: HashMap<String, broadcast::Sender<Event>>,
    /// Subscription id to pattern
    subscriptions: HashMap<String, String>,
    handlers: Vec<Arc<dyn EventHandler>>,
    stats: EventBusStats,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish_non_exhaustive()
    }
}

impl MemoryEventBus {
    /// Create a bus with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose per-pattern channels buffer `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(BusState::default()),
            channel_capacity: capacity,
        }
    }
}

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Match a dotted topic against a pattern with `*` and `#` wildcards.
fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let topic: Vec<&str> = topic.split('.').collect();
    segments_match(&pattern, &topic)
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match (pattern.split_first(), topic.split_first()) {
        (None, None) => true,
        (Some((&"#", rest)), _) => (0..=topic.len()).any(|skip| segments_match(rest, &topic[skip..])),
        (Some((&"*", rest)), Some((_, remaining))) => segments_match(rest, remaining),
        (Some((segment, rest)), Some((part, remaining))) if segment == part => {
            segments_match(rest, remaining)
        }
        _ => false,
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut state = self.state.write().await;
        let mut delivered = 0u64;

        for (pattern, sender) in &state.channels {
            if topic_matches(pattern, &topic) {
                // A channel without live receivers is not a failure.
                if let Ok(receivers) = sender.send(event.clone()) {
                    delivered += receivers as u64;
                }
            }
        }

        for handler in &state.handlers {
            if !handler.topics().iter().any(|t| topic_matches(t, &topic)) {
                continue;
            }
            let handler = Arc::clone(handler);
            let event = event.clone();
            delivered += 1;
            tokio::spawn(async move {
                if let Err(e) = handler.handle(event).await {
                    tracing::warn!(error = %e, "event handler failed");
                }
            });
        }

        state.stats.events_published += 1;
        state.stats.events_delivered += delivered;
        tracing::debug!(topic = %topic, event_id = %event.id, delivered, "event published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.is_empty() {
            return Err(EventBusError::SubscribeError("empty topic pattern".to_string()));
        }

        let mut state = self.state.write().await;
        let receiver = match state.channels.get(topic) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.channel_capacity);
                state.channels.insert(topic.to_string(), sender);
                receiver
            }
        };

        let id = uuid::Uuid::now_v7().to_string();
        state.subscriptions.insert(id.clone(), topic.to_string());
        state.stats.active_subscriptions = state.subscriptions.len();

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        let mut state = self.state.write().await;
        state.handlers.push(handler);
        state.stats.registered_handlers = state.handlers.len();
        Ok(())
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        let mut state = self.state.write().await;
        if state.subscriptions.remove(subscription_id).is_none() {
            return Err(EventBusError::SubscribeError(format!(
                "unknown subscription: {subscription_id}"
            )));
        }
        state.stats.active_subscriptions = state.subscriptions.len();
        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.state.read().await.stats.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_memory_event_bus_publish_subscribe() {
        let bus = MemoryEventBus::new();

        // Subscribe to topic
        let mut sub = bus.subscribe("tenantry.organization.*").await.unwrap();

        // Publish event
        let event = Event::new("organization.created", serde_json::json!({}));
        bus.publish(event.clone()).await.unwrap();

        // Receive event
        let received = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(received.id, event.id);
    }

    #[test]
    fn test_topic_matching() {
        // Exact match
        assert!(topic_matches("tenantry.member.joined", "tenantry.member.joined"));

        // Single wildcard
        assert!(topic_matches("tenantry.member.*", "tenantry.member.joined"));
        assert!(topic_matches("tenantry.*.joined", "tenantry.member.joined"));
        assert!(topic_matches("*.member.joined", "tenantry.member.joined"));

        // Multi-segment wildcard
        assert!(topic_matches("tenantry.#", "tenantry.member.joined"));
        assert!(topic_matches("#", "tenantry.member.joined"));
        assert!(topic_matches("tenantry.#.joined", "tenantry.member.joined"));

        // Non-matches
        assert!(!topic_matches("tenantry.member.removed", "tenantry.member.joined"));
        assert!(!topic_matches("tenantry.user.*", "tenantry.member.joined"));
        assert!(!topic_matches("tenantry.*", "tenantry.member.joined"));
    }

    #[tokio::test]
    async fn test_stats() {
        let bus = MemoryEventBus::new();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.active_subscriptions, 0);

        let sub = bus.subscribe("tenantry.#").await.unwrap();
        let stats = bus.stats().await;
        assert_eq!(stats.active_subscriptions, 1);

        let event = Event::new("tenant.created", serde_json::json!({}));
        bus.publish(event).await.unwrap();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.events_delivered, 1);

        bus.unsubscribe(&sub.id).await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 0);
        assert!(bus.unsubscribe(&sub.id).await.is_err());
    }

    struct CountingHandler {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> EventBusResult<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            vec!["tenantry.whitelist.*".to_string()]
        }
    }

    #[tokio::test]
    async fn test_handler_receives_matching_events() {
        let bus = MemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.register_handler(Arc::new(CountingHandler { seen: seen.clone() }))
            .await
            .unwrap();

        let added = TenancyEvent::WhitelistEntryAdded {
            organization_id: Uuid::now_v7(),
            email: "jane@acme.com".into(),
            reactivated: false,
        };
        publish_tenancy_event(&bus, &added, None, None).await.unwrap();
        publish_tenancy_event(
            &bus,
            &TenancyEvent::UserDeleted { user_id: Uuid::now_v7() },
            None,
            None,
        )
        .await
        .unwrap();

        for _ in 0..50 {
            if seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_tenancy_event_sets_context() {
        let bus = MemoryEventBus::new();
        let mut sub = bus.subscribe("tenantry.member.joined").await.unwrap();

        let actor = Uuid::now_v7();
        let tenant = Uuid::now_v7();
        let org = Uuid::now_v7();
        let joined = TenancyEvent::MemberJoined {
            organization_id: org,
            user_id: actor,
            email: "jane@acme.com".into(),
        };
        publish_tenancy_event(&bus, &joined, Some(actor), Some(tenant))
            .await
            .unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.user_id, Some(actor));
        assert_eq!(event.tenant_id, Some(tenant));
        assert_eq!(event.org_id, Some(org));
    }
}
