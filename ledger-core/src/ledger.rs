//! Main ledger orchestration layer
//!
//! Ties together storage, the account registry, crypto, and the chain
//! verifier into the operations callers use. Every call takes the
//! [`StorageOptions`] explicitly, reloads the document, and persists only as
//! its very last step, so a failed call leaves the stored ledger untouched.
//!
//! # Example
//!
//! ```no_run
//! use ethub_ledger::{
//!     generate_key_pair, register_account_fingerprint, submit_signed_transaction,
//!     verify_chain, RegisterAccountInput, StorageOptions, SubmitTransactionInput,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ethub_ledger::Result<()> {
//!     let storage = StorageOptions::new("./data/ledger.json");
//!     let alice = generate_key_pair()?;
//!     let bob = generate_key_pair()?;
//!
//!     for (key, raw) in [(&alice, "device:alice"), (&bob, "device:bob")] {
//!         register_account_fingerprint(&storage, RegisterAccountInput {
//!             public_key: key.public_key.clone(),
//!             raw_fingerprint: raw.to_string(),
//!             hmac_key: "secret".to_string(),
//!         })
//!         .await?;
//!     }
//!
//!     let input = SubmitTransactionInput {
//!         from_public_key: Some(alice.public_key.clone()),
//!         to_public_key: bob.public_key.clone(),
//!         amount: "5".to_string(),
//!         raw_fingerprint: "device:alice".to_string(),
//!         fingerprint_hmac_key: "secret".to_string(),
//!         signature: String::new(),
//!     }
//!     .sign_with(&alice.private_key)?;
//!
//!     let outcome = submit_signed_transaction(&storage, input).await?;
//!     assert!(verify_chain(&outcome.state).ok);
//!     Ok(())
//! }
//! ```

use crate::{
    anchor::resolve_git_anchor,
    crypto::{hmac_fingerprint, sign_payload, verify_signature},
    registry::{find_account_by_public_key, register_fingerprint, RegisterAccountInput},
    storage::{load_state, save_state, StorageOptions},
    types::{Block, LedgerState, SignaturePayload, Transaction},
    verify::verify_chain,
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Input for [`submit_signed_transaction`]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionInput {
    /// Sender key, `None` for a mint
    pub from_public_key: Option<String>,

    /// Receiver key
    pub to_public_key: String,

    /// Decimal amount
    pub amount: String,

    /// Raw fingerprint the caller signed against (client side only)
    pub raw_fingerprint: String,

    /// HMAC secret the caller signed against (client side only)
    pub fingerprint_hmac_key: String,

    /// Base64 signature over the [`SignaturePayload`]
    pub signature: String,
}

impl std::fmt::Debug for SubmitTransactionInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitTransactionInput")
            .field("from_public_key", &self.from_public_key)
            .field("to_public_key", &self.to_public_key)
            .field("amount", &self.amount)
            .field("raw_fingerprint", &"<redacted>")
            .field("fingerprint_hmac_key", &"<redacted>")
            .field("signature", &self.signature)
            .finish()
    }
}

impl SubmitTransactionInput {
    /// Payload a client signs, with the fingerprint hash derived locally
    ///
    /// The ledger itself never uses `raw_fingerprint`; it verifies against the
    /// hash stored at registration.
    pub fn signing_payload(&self) -> SignaturePayload {
        SignaturePayload {
            from_public_key: self.from_public_key.clone(),
            to_public_key: self.to_public_key.clone(),
            amount: self.amount.clone(),
            fingerprint_hash: hmac_fingerprint(&self.raw_fingerprint, &self.fingerprint_hmac_key),
        }
    }

    /// Fill in `signature` using `private_key_pem`
    pub fn sign_with(mut self, private_key_pem: &str) -> Result<Self> {
        self.signature = sign_payload(&self.signing_payload(), private_key_pem)?;
        Ok(self)
    }

    /// `from` if present, else `to`
    pub fn signer(&self) -> &str {
        self.from_public_key.as_deref().unwrap_or(&self.to_public_key)
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// State after the append (already persisted)
    pub state: LedgerState,

    /// The appended block
    pub block: Block,
}

/// Load the ledger, creating and persisting a genesis-only one if missing
pub async fn load_or_init_state(options: &StorageOptions) -> Result<LedgerState> {
    if let Some(state) = load_state(options).await? {
        return Ok(state);
    }

    let state = LedgerState::new()?;
    save_state(&state, options).await?;

    tracing::info!(
        path = %options.path.display(),
        genesis = %state.blocks[0].hash,
        "Ledger initialized"
    );

    Ok(state)
}

/// Bind a public key to the HMAC of its raw fingerprint and persist
pub async fn register_account_fingerprint(
    options: &StorageOptions,
    input: RegisterAccountInput,
) -> Result<LedgerState> {
    let state = load_or_init_state(options).await?;
    let next = register_fingerprint(&state, &input)?;

    if next != state {
        save_state(&next, options).await?;
    }

    Ok(next)
}

/// Validate a signed transfer, append it as a new block, and persist
pub async fn submit_signed_transaction(
    options: &StorageOptions,
    input: SubmitTransactionInput,
) -> Result<SubmitOutcome> {
    let state = load_or_init_state(options).await?;

    let fingerprint_hash = match authorize(&state, &input) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "Transaction rejected");
            return Err(e);
        }
    };

    let mut block = build_block(&state, &input, fingerprint_hash, Utc::now())?;
    block.anchor = resolve_git_anchor().await;

    let next = state.with_block(block.clone());

    let report = verify_chain(&next);
    if !report.ok {
        let reason = report.error.unwrap_or_default();
        tracing::error!(at_index = ?report.at_index, %reason, "Post-append verification failed");
        return Err(Error::ChainVerificationFailed(reason));
    }

    save_state(&next, options).await?;

    tracing::info!(
        index = block.index,
        hash = %block.hash,
        anchored = block.anchor.is_some(),
        height = next.blocks.len(),
        "Block appended"
    );

    Ok(SubmitOutcome { state: next, block })
}

/// Check amount, accounts, and signature; returns the anchoring fingerprint hash
fn authorize(state: &LedgerState, input: &SubmitTransactionInput) -> Result<String> {
    validate_amount(&input.amount)?;

    let from_account = match &input.from_public_key {
        Some(from) => Some(
            find_account_by_public_key(state, from)
                .ok_or_else(|| Error::UnknownAccount("unknown from account".to_string()))?,
        ),
        None => None,
    };
    let to_account = find_account_by_public_key(state, &input.to_public_key)
        .ok_or_else(|| Error::UnknownAccount("unknown to account".to_string()))?;

    let fingerprint_hash = from_account.unwrap_or(to_account).fingerprint_hash.clone();

    let payload = SignaturePayload {
        from_public_key: input.from_public_key.clone(),
        to_public_key: input.to_public_key.clone(),
        amount: input.amount.clone(),
        fingerprint_hash,
    };

    if !verify_signature(&payload, &input.signature, input.signer()) {
        return Err(Error::InvalidSignature(
            "signature does not match payload and signer".to_string(),
        ));
    }

    Ok(payload.fingerprint_hash)
}

/// Amounts are plain `digits[.digits]` that fit a [`Decimal`]
///
/// No sign, whitespace, exponent, or digit separators: the string is signed
/// and stored verbatim, so only one spelling of a value is accepted.
fn validate_amount(amount: &str) -> Result<()> {
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (amount, None),
    };

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !fraction.map_or(true, is_digits) {
        return Err(Error::InvalidAmount(format!(
            "{:?} is not a plain non-negative decimal",
            amount
        )));
    }

    Decimal::from_str(amount)
        .map_err(|e| Error::InvalidAmount(format!("{:?} out of range: {}", amount, e)))?;

    Ok(())
}

/// Build the next block on top of the current tip (anchor not yet attached)
fn build_block(
    state: &LedgerState,
    input: &SubmitTransactionInput,
    fingerprint_hash: String,
    now: DateTime<Utc>,
) -> Result<Block> {
    let latest = state
        .latest_block()
        .ok_or_else(|| Error::ChainVerificationFailed("no blocks".to_string()))?;
    let index = latest.index + 1;
    let position: u64 = 0;

    let transaction = Transaction {
        id: format!("tx_{}_{}", index, position),
        from: input.from_public_key.clone(),
        to: input.to_public_key.clone(),
        amount: input.amount.clone(),
        nonce: position,
        timestamp: now,
        fingerprint_hash,
        signature: input.signature.clone(),
        public_key: input.signer().to_string(),
    };

    Block::seal(index, latest.hash.clone(), now, vec![transaction])
}
