//! # Holdfast signing
//!
//! The signing side of the vault protocol: each custodian signs the
//! shared unsigned PSBT independently, ships back its script-path
//! signature triples, and a coordinator merges every set and finalizes
//! once the quorum is reached.
//!
//! ```text
//! unsigned psbt ──► sign_psbt_and_collect_sigs (×N custodians, any order)
//!                      │
//!                      ▼
//!               aggregate_tap_script_sigs (merge each signer's map)
//!                      │
//!                      ▼
//!               finalize_psbt_and_extract_tx ──► raw transaction
//! ```
//!
//! Aggregation is commutative, signing is deterministic (no auxiliary
//! randomness), and finalization refuses to produce a transaction whose
//! inputs do not meet their script's signature threshold.

mod aggregate;
mod collect;
mod error;
mod finalize;
mod keymap;
mod sign;

pub use aggregate::aggregate_tap_script_sigs;
pub use collect::{sign_psbt_and_collect_sigs, TapScriptSig, TapScriptSigBytes, TapScriptSigsMap};
pub use error::SigningError;
pub use finalize::finalize_psbt_and_extract_tx;
pub use keymap::{network_kind_from_byte, SigningKeyMap};
pub use sign::sign_psbt_by_single_key;
