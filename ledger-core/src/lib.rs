//! ETHUB Ledger Core
//!
//! Embeddable, tamper-evident transaction ledger that binds signed transfers
//! to registered identities without persisting raw identifying material.
//!
//! # Architecture
//!
//! - **Hash chain**: every block commits to its predecessor's hash
//! - **Fingerprint binding**: accounts store only HMAC-SHA256 of the raw marker
//! - **Signed transfers**: ed25519 over a canonical payload encoding
//! - **Single document**: the whole state is one JSON file, replaced atomically
//!
//! # Invariants
//!
//! - Append-only: accounts and blocks are never modified or removed
//! - `blocks[i].index == i` and `blocks[i].previousHash == hash(blocks[i-1])`
//! - Block hashes are always a pure function of the block's own fields
//! - Every transaction signature verifies against its signer
//! - Any state reachable through the public API passes [`verify_chain`]

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod anchor;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod storage;
pub mod types;
pub mod verify;

// Re-exports
pub use config::Config;
pub use crypto::{generate_key_pair, KeyPair};
pub use error::{Error, Result};
pub use ledger::{
    load_or_init_state, register_account_fingerprint, submit_signed_transaction,
    SubmitOutcome, SubmitTransactionInput,
};
pub use registry::RegisterAccountInput;
pub use storage::StorageOptions;
pub use types::{Account, Block, ChainMeta, LedgerState, SignaturePayload, Transaction};
pub use verify::{verify_chain, VerifyReport};
