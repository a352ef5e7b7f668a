//! Core types for the ledger
//!
//! Everything here serializes to the persisted JSON document with camelCase
//! field names. State transitions are immutable: helpers on [`LedgerState`]
//! return a new value and never touch the receiver.

use crate::crypto::hash_object;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `previousHash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Placeholder used for every identity field of the genesis transaction
pub const GENESIS_MARKER: &str = "genesis";

/// Current version of the persisted document layout
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Registered identity: a public key bound to an HMAC-derived fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Sequential label (`acct_1`, `acct_2`, ...)
    pub id: String,

    /// PEM-encoded ed25519 public key
    pub public_key: String,

    /// HMAC-SHA256 of the raw fingerprint (hex)
    pub fingerprint_hash: String,

    /// Registration time
    pub registered_at: DateTime<Utc>,
}

/// The exact value a transaction signature covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
    /// Sender key, `None` for a mint
    pub from_public_key: Option<String>,

    /// Receiver key
    pub to_public_key: String,

    /// Amount as supplied by the caller
    pub amount: String,

    /// Fingerprint hash of the anchoring account
    pub fingerprint_hash: String,
}

/// Signed transfer stored inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// `tx_{blockIndex}_{position}`
    pub id: String,

    /// Sender public key, `None` for a mint
    pub from: Option<String>,

    /// Receiver public key
    pub to: String,

    /// Decimal amount, kept verbatim
    pub amount: String,

    /// Position within the block
    pub nonce: u64,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Fingerprint hash of `from` if present, else of `to`
    pub fingerprint_hash: String,

    /// Base64 ed25519 signature over [`SignaturePayload`]
    pub signature: String,

    /// Signer key (`from` if present, else `to`)
    pub public_key: String,
}

impl Transaction {
    /// Rebuild the payload this transaction's signature covers
    pub fn signature_payload(&self) -> SignaturePayload {
        SignaturePayload {
            from_public_key: self.from.clone(),
            to_public_key: self.to.clone(),
            amount: self.amount.clone(),
            fingerprint_hash: self.fingerprint_hash.clone(),
        }
    }

    /// Key expected to have produced the signature
    pub fn expected_signer(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.to)
    }

    fn genesis(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: GENESIS_MARKER.to_string(),
            from: None,
            to: GENESIS_MARKER.to_string(),
            amount: "0".to_string(),
            nonce: 0,
            timestamp,
            fingerprint_hash: GENESIS_MARKER.to_string(),
            signature: String::new(),
            public_key: GENESIS_MARKER.to_string(),
        }
    }
}

/// Block of the hash chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Height, 0 for genesis
    pub index: u64,

    /// Hash of the block at `index - 1`
    pub previous_hash: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Non-empty list of transactions
    pub transactions: Vec<Transaction>,

    /// Always 0 (no mining)
    pub nonce: u64,

    /// SHA-256 over the canonical header, see [`Block::compute_hash`]
    pub hash: String,

    /// External reference captured at build time; not part of the hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// Hash preimage of a block. Field set is fixed; `hash` and `anchor` are excluded.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader<'a> {
    index: u64,
    previous_hash: &'a str,
    timestamp: &'a DateTime<Utc>,
    transactions: &'a [Transaction],
    nonce: u64,
}

impl Block {
    /// Build a block and seal it with its hash
    pub fn seal(
        index: u64,
        previous_hash: String,
        timestamp: DateTime<Utc>,
        transactions: Vec<Transaction>,
    ) -> Result<Self> {
        let mut block = Self {
            index,
            previous_hash,
            timestamp,
            transactions,
            nonce: 0,
            hash: String::new(),
            anchor: None,
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// The fixed index-0 block
    pub fn genesis() -> Result<Self> {
        let now = Utc::now();
        Self::seal(
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            now,
            vec![Transaction::genesis(now)],
        )
    }

    /// Recompute the hash from the block's own fields, ignoring `hash`
    pub fn compute_hash(&self) -> Result<String> {
        hash_object(&BlockHeader {
            index: self.index,
            previous_hash: &self.previous_hash,
            timestamp: &self.timestamp,
            transactions: &self.transactions,
            nonce: self.nonce,
        })
    }
}

/// Chain summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMeta {
    /// Number of blocks, genesis included
    pub height: usize,

    /// Hash of the last block, empty if there is none
    pub tip: String,
}

/// Root aggregate persisted as one JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    /// Document layout version
    #[serde(default = "default_schema_version")]
    pub version: u32,

    /// Registered accounts keyed by public key
    pub accounts: HashMap<String, Account>,

    /// Blocks in chain order; `blocks[i].index == i`
    pub blocks: Vec<Block>,
}

impl LedgerState {
    /// Fresh state holding only the genesis block
    pub fn new() -> Result<Self> {
        Ok(Self {
            version: SCHEMA_VERSION,
            accounts: HashMap::new(),
            blocks: vec![Block::genesis()?],
        })
    }

    /// Chain tip
    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Copy of this state with `account` added
    pub fn with_account(&self, account: Account) -> Self {
        let mut next = self.clone();
        next.accounts.insert(account.public_key.clone(), account);
        next
    }

    /// Copy of this state with `block` appended
    pub fn with_block(&self, block: Block) -> Self {
        let mut next = self.clone();
        next.blocks.push(block);
        next
    }

    /// Height and tip hash
    pub fn meta(&self) -> ChainMeta {
        ChainMeta {
            height: self.blocks.len(),
            tip: self
                .latest_block()
                .map(|b| b.hash.clone())
                .unwrap_or_default(),
        }
    }
}
