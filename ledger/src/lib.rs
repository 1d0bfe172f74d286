//! Entanglement state machine.
//!
//! Tracks registered beacons and their collateral, the positions users
//! open by depositing foreign assets with a beacon, the burns that turn
//! native asset back into foreign asset, and the proofs and punishments
//! that settle those burns. The whole state encodes canonically so that
//! every node can commit to the same snapshot hash.

pub mod beacon;
pub mod entangle;
pub mod entity;
pub mod error;
pub mod snapshot;
pub mod state;
pub mod sweep;

pub use beacon::{BeaconAddress, ExBeaconInfo, WhiteListEntry};
pub use entangle::BurnOutcome;
pub use entity::{BurnInfos, BurnItem, BurnProofItem, EntangleEntity, EntityKey, RedeemState};
pub use error::StateError;
pub use state::{EntangleState, NewBeacon};
pub use sweep::{summarize_punished, BlockSweep, PunishedItem, TimeoutReport};
