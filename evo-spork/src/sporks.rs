//! The fixed table of sporks this node understands.
//!
//! Sporks are addressed by name at the API surface and by numeric id on the
//! wire. A value is a unix timestamp: the feature is on once local time has
//! passed it, so the shared default (year 2099) means "off".

use evo_types::SporkId;

/// Default for every spork.
pub const SPORK_DEFAULT_OFF: i64 = 4_070_908_800;

pub const SPORK_2_INSTANTSEND_ENABLED: SporkId = SporkId(10001);
pub const SPORK_3_INSTANTSEND_BLOCK_FILTERING: SporkId = SporkId(10002);
pub const SPORK_4_DIP0003_ENFORCED: SporkId = SporkId(10003);
pub const SPORK_9_SUPERBLOCKS_ENABLED: SporkId = SporkId(10008);
pub const SPORK_17_QUORUM_DKG_ENABLED: SporkId = SporkId(10016);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SporkDef {
    pub id: SporkId,
    pub name: &'static str,
    pub default_value: i64,
}

pub const KNOWN_SPORKS: &[SporkDef] = &[
    SporkDef { id: SPORK_2_INSTANTSEND_ENABLED, name: "SPORK_2_INSTANTSEND_ENABLED", default_value: SPORK_DEFAULT_OFF },
    SporkDef { id: SPORK_3_INSTANTSEND_BLOCK_FILTERING, name: "SPORK_3_INSTANTSEND_BLOCK_FILTERING", default_value: SPORK_DEFAULT_OFF },
    SporkDef { id: SPORK_4_DIP0003_ENFORCED, name: "SPORK_4_DIP0003_ENFORCED", default_value: SPORK_DEFAULT_OFF },
    SporkDef { id: SPORK_9_SUPERBLOCKS_ENABLED, name: "SPORK_9_SUPERBLOCKS_ENABLED", default_value: SPORK_DEFAULT_OFF },
    SporkDef { id: SPORK_17_QUORUM_DKG_ENABLED, name: "SPORK_17_QUORUM_DKG_ENABLED", default_value: SPORK_DEFAULT_OFF },
];

pub fn spork_by_id(id: SporkId) -> Option<&'static SporkDef> {
    KNOWN_SPORKS.iter().find(|def| def.id == id)
}

pub fn spork_by_name(name: &str) -> Option<&'static SporkDef> {
    KNOWN_SPORKS.iter().find(|def| def.name == name)
}
