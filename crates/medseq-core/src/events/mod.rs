//! Administrative counter events.
//!
//! Storage wrappers publish a [`CounterEvent`] after every successful
//! administrative change (reset, reconciliation advance, reservation,
//! periodic reset) so that audit consumers can follow counter history.
//!
//! # Module Structure
//!
//! - [`types`]: Event type definitions (`CounterEvent`, `CounterEventType`)
//! - [`broadcaster`]: Event broadcasting infrastructure

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{CounterEvent, CounterEventType};
