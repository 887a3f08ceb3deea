//! Spork governance layer
//!
//! Sporks are network-wide feature switches. A value only takes effect once
//! enough of the configured signer keys have signed the same value; until
//! then every spork reads as its default.

pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod network;
pub mod sporks;
pub mod tally;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use config::{SporkConfig, DEFAULT_MAX_FUTURE_DRIFT_SECS};
pub use error::SporkError;
pub use manager::{IngestOutcome, SporkManager};
pub use network::{
    BroadcastRequest, InboundSpork, OutboundSpork, PeerId, SporkNetworkAdapter, SporkWireMessage,
    DEFAULT_TICK_INTERVAL,
};
pub use sporks::{
    spork_by_id, spork_by_name, SporkDef, KNOWN_SPORKS, SPORK_17_QUORUM_DKG_ENABLED,
    SPORK_2_INSTANTSEND_ENABLED, SPORK_3_INSTANTSEND_BLOCK_FILTERING, SPORK_4_DIP0003_ENFORCED,
    SPORK_9_SUPERBLOCKS_ENABLED, SPORK_DEFAULT_OFF,
};
pub use tally::{tally_value, SporkTally};

pub use evo_types::{SporkId, SporkMessage};
