//! Account registry: binds public keys to HMAC-derived fingerprints

use crate::{
    crypto::hmac_fingerprint,
    types::{Account, LedgerState},
    Error, Result,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Input for [`register_fingerprint`]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountInput {
    /// PEM-encoded ed25519 public key
    pub public_key: String,

    /// Raw identity marker; hashed, never stored
    pub raw_fingerprint: String,

    /// HMAC secret used to derive the stored fingerprint hash
    pub hmac_key: String,
}

// Raw fingerprint material must never reach a log line.
impl std::fmt::Debug for RegisterAccountInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterAccountInput")
            .field("public_key", &self.public_key)
            .field("raw_fingerprint", &"<redacted>")
            .field("hmac_key", &"<redacted>")
            .finish()
    }
}

/// Register `input.public_key`, returning the updated state
///
/// Re-registering a key with the same fingerprint returns the state
/// unchanged; a different fingerprint is rejected with
/// [`Error::AccountAlreadyRegistered`].
pub fn register_fingerprint(state: &LedgerState, input: &RegisterAccountInput) -> Result<LedgerState> {
    let fingerprint_hash = hmac_fingerprint(&input.raw_fingerprint, &input.hmac_key);

    if let Some(existing) = find_account_by_public_key(state, &input.public_key) {
        if existing.fingerprint_hash == fingerprint_hash {
            tracing::debug!(account_id = %existing.id, "Account already registered with same fingerprint");
            return Ok(state.clone());
        }
        return Err(Error::AccountAlreadyRegistered(format!(
            "{} is bound to a different fingerprint",
            existing.id
        )));
    }

    let account = Account {
        id: format!("acct_{}", state.accounts.len() + 1),
        public_key: input.public_key.clone(),
        fingerprint_hash,
        registered_at: Utc::now(),
    };

    tracing::info!(account_id = %account.id, "Account registered");

    Ok(state.with_account(account))
}

/// Look up an account by its public key
pub fn find_account_by_public_key<'a>(state: &'a LedgerState, public_key: &str) -> Option<&'a Account> {
    state.accounts.get(public_key)
}
