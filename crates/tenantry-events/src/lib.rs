//! # Tenantry Events
//!
//! This crate provides the notification event bus for the tenantry
//! services. Services publish a [`TenancyEvent`] after a lifecycle change
//! commits; downstream collaborators (email delivery, audit) subscribe.
//! A failed publish is logged and never rolls back the committed change.
//!
//! ## Overview
//!
//! The tenantry-events crate handles:
//! - **Event Types**: Strongly-typed tenancy events
//! - **Event Bus**: Publish/subscribe messaging
//! - **Event Handlers**: Async event processing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenantry_events::{publish_tenancy_event, EventBus, MemoryEventBus, TenancyEvent};
//! use uuid::Uuid;
//!
//! async fn example() {
//!     let bus = MemoryEventBus::new();
//!     let mut sub = bus.subscribe("tenantry.member.*").await.unwrap();
//!
//!     let joined = TenancyEvent::MemberJoined {
//!         organization_id: Uuid::now_v7(),
//!         user_id: Uuid::now_v7(),
//!         email: "jane@acme.com".to_string(),
//!     };
//!     publish_tenancy_event(&bus, &joined, None, None).await.unwrap();
//!
//!     let event = sub.recv().await.unwrap();
//!     assert_eq!(event.event_type, "member.joined");
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `tenantry.{event_type}`:
//! - `tenantry.member.joined` - Specific event
//! - `tenantry.organization.*` - All organization events
//! - `tenantry.#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    publish_tenancy_event, EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler,
    MemoryEventBus, Subscription,
};
pub use types::{Event, EventCategory, TenancyEvent, EVENT_SOURCE};
