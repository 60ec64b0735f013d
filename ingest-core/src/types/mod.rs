//! Domain types for the ingestion core.
//!
//! This module contains all the core types used throughout the indexer:
//!
//! - [`primitives`] - Validated newtypes (`EthAddress`, `ChainId`)
//! - [`enums`] - State-machine and mode enumerations (`ConnectionState`, `SubscriberState`, ...)
//! - [`events`] - Strongly-typed on-chain events and the `DomainEventEnvelope`
//! - [`entities`] - Domain entities for database and cache persistence

pub mod entities;
pub mod enums;
pub mod events;
pub mod primitives;

// Re-export commonly used types at module level
pub use entities::{
    BlockTrackerRecord, PoolRecord, PositionRecord, ScheduledTaskRecord, SubscriberRecord,
};
pub use enums::{BatchMode, ConnectionState, InvalidSubscriberTransition, NfpmTransferKind, SubscriberState};
pub use events::{ChainEvent, DomainEventEnvelope, EntityType, EventMetadata};
pub use primitives::{ChainId, EthAddress, InvalidChainId, InvalidEthAddress};
