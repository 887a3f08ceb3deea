//! Deterministic masternode registry.
//!
//! Provider transactions (registration, service update, registrar update,
//! revocation) are validated per block and folded into a height-tagged
//! [`MasternodeList`]. Every block leaves a [`MasternodeListDiff`] behind so
//! that reorganizations can be undone exactly.

pub mod collateral;
pub mod diff;
pub mod error;
pub mod list;
pub mod params;
pub mod registry;
pub mod validation;

pub use collateral::{BlockCollateralView, CollateralView, InMemoryCollateralView, NoCollateral};
pub use diff::{DiffLog, ListMutation, MasternodeListDiff};
pub use error::{RegistryError, ValidationError};
pub use list::MasternodeList;
pub use params::{
    ActivationGate, HeightActivation, RegistryParams, COIN, CURRENT_PROTX_VERSION,
    MASTERNODE_COLLATERAL_AMOUNT,
};
pub use registry::{DeterministicMnManager, RegistryState};
pub use validation::{MutationIntent, ProviderTxValidator};
