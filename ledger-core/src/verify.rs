//! Chain verification
//!
//! Walks the chain from genesis and reports the first block that fails any of:
//!
//! 1. `index` equals the block's position
//! 2. genesis `previousHash` is the fixed seed; every other block links to the
//!    recomputed hash of its predecessor
//! 3. the block carries at least one transaction
//! 4. the stored `hash` equals a fresh recomputation
//! 5. every non-genesis transaction references registered accounts, carries the
//!    anchoring account's fingerprint hash, and has a valid signature from
//!    `from ?? to`

use crate::{
    crypto::verify_signature,
    types::{Block, LedgerState, Transaction, GENESIS_PREVIOUS_HASH},
};
use serde::{Deserialize, Serialize};

/// Outcome of [`verify_chain`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Whether every check passed
    pub ok: bool,

    /// Description of the first failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Index of the first failing block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_index: Option<u64>,
}

impl VerifyReport {
    fn valid() -> Self {
        Self {
            ok: true,
            error: None,
            at_index: None,
        }
    }

    fn invalid(at_index: Option<u64>, error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
            at_index,
        }
    }
}

/// Verify hash linkage, block hashes, and transaction signatures
pub fn verify_chain(state: &LedgerState) -> VerifyReport {
    if state.blocks.is_empty() {
        return VerifyReport::invalid(None, "no blocks".to_string());
    }

    let mut expected_previous = GENESIS_PREVIOUS_HASH.to_string();

    for (position, block) in state.blocks.iter().enumerate() {
        let at = position as u64;

        match verify_block(state, block, at, &expected_previous) {
            Ok(recomputed) => expected_previous = recomputed,
            Err(error) => {
                tracing::debug!(index = at, %error, "Chain verification failed");
                return VerifyReport::invalid(Some(at), error);
            }
        }
    }

    VerifyReport::valid()
}

/// Check one block, returning its recomputed hash
fn verify_block(
    state: &LedgerState,
    block: &Block,
    position: u64,
    expected_previous: &str,
) -> Result<String, String> {
    if block.index != position {
        return Err(format!(
            "unexpected index {} at position {}",
            block.index, position
        ));
    }

    if block.previous_hash != expected_previous {
        return Err(format!("broken link at index {}", position));
    }

    if block.transactions.is_empty() {
        return Err(format!("empty block at index {}", position));
    }

    let recomputed = block
        .compute_hash()
        .map_err(|e| format!("cannot hash block {}: {}", position, e))?;
    if recomputed != block.hash {
        return Err(format!("invalid hash at index {}", position));
    }

    if position > 0 {
        for tx in &block.transactions {
            verify_transaction(state, tx)
                .map_err(|e| format!("transaction {} at index {}: {}", tx.id, position, e))?;
        }
    }

    Ok(recomputed)
}

fn verify_transaction(state: &LedgerState, tx: &Transaction) -> Result<(), &'static str> {
    if tx.public_key != tx.expected_signer() {
        return Err("signer is neither sender nor receiver");
    }

    if let Some(from) = &tx.from {
        if !state.accounts.contains_key(from) {
            return Err("unknown sender account");
        }
    }
    if !state.accounts.contains_key(&tx.to) {
        return Err("unknown receiver account");
    }

    let anchoring = state
        .accounts
        .get(tx.expected_signer())
        .ok_or("unknown signer account")?;
    if anchoring.fingerprint_hash != tx.fingerprint_hash {
        return Err("fingerprint hash does not match account");
    }

    if !verify_signature(&tx.signature_payload(), &tx.signature, &tx.public_key) {
        return Err("invalid signature");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{hmac_fingerprint, key_pair_from_seed, sign_payload, KeyPair};
    use crate::registry::{register_fingerprint, RegisterAccountInput};
    use crate::types::SignaturePayload;
    use chrono::Utc;

    const HMAC_KEY: &str = "verify-hmac-key";

    struct SignedChain {
        state: LedgerState,
        alice: KeyPair,
        bob: KeyPair,
        carol: KeyPair,
    }

    fn signed_tx(index: u64, from: &KeyPair, to: &KeyPair, raw: &str, amount: &str) -> Transaction {
        let payload = SignaturePayload {
            from_public_key: Some(from.public_key.clone()),
            to_public_key: to.public_key.clone(),
            amount: amount.to_string(),
            fingerprint_hash: hmac_fingerprint(raw, HMAC_KEY),
        };

        Transaction {
            id: format!("tx_{}_0", index),
            from: payload.from_public_key.clone(),
            to: payload.to_public_key.clone(),
            amount: payload.amount.clone(),
            nonce: 0,
            timestamp: Utc::now(),
            signature: sign_payload(&payload, &from.private_key).unwrap(),
            fingerprint_hash: payload.fingerprint_hash,
            public_key: from.public_key.clone(),
        }
    }

    /// Genesis plus two signed alice → bob transfers; carol is never registered
    fn signed_chain() -> SignedChain {
        let alice = key_pair_from_seed(&[1; 32]).unwrap();
        let bob = key_pair_from_seed(&[2; 32]).unwrap();
        let carol = key_pair_from_seed(&[3; 32]).unwrap();

        let mut state = LedgerState::new().unwrap();
        for (key, raw) in [(&alice, "device:alice"), (&bob, "device:bob")] {
            let input = RegisterAccountInput {
                public_key: key.public_key.clone(),
                raw_fingerprint: raw.to_string(),
                hmac_key: HMAC_KEY.to_string(),
            };
            state = register_fingerprint(&state, &input).unwrap();
        }

        for (index, amount) in [(1, "5"), (2, "7")] {
            let tx = signed_tx(index, &alice, &bob, "device:alice", amount);
            let tip = state.latest_block().unwrap().hash.clone();
            let block = Block::seal(index, tip, Utc::now(), vec![tx]).unwrap();
            state = state.with_block(block);
        }

        SignedChain {
            state,
            alice,
            bob,
            carol,
        }
    }

    /// Recompute links and hashes from `from` onwards, as a forger would
    fn reseal(state: &mut LedgerState, from: usize) {
        for i in from..state.blocks.len() {
            state.blocks[i].previous_hash = state.blocks[i - 1].hash.clone();
            state.blocks[i].hash = state.blocks[i].compute_hash().unwrap();
        }
    }

    fn assert_rejected_at(state: &LedgerState, index: u64, reason: &str) {
        let report = verify_chain(state);
        assert!(!report.ok);
        assert_eq!(report.at_index, Some(index));
        assert_eq!(
            report.error.as_deref(),
            Some(format!("transaction tx_{}_0 at index {}: {}", index, index, reason).as_str())
        );
    }

    #[test]
    fn test_signed_chain_verifies() {
        let chain = signed_chain();
        assert_eq!(verify_chain(&chain.state), VerifyReport::valid());
    }

    #[test]
    fn test_resealed_amount_fails_signature() {
        let mut chain = signed_chain();
        chain.state.blocks[2].transactions[0].amount = "999".to_string();
        reseal(&mut chain.state, 2);

        assert_rejected_at(&chain.state, 2, "invalid signature");
    }

    #[test]
    fn test_resealed_signer_swap_detected() {
        let mut chain = signed_chain();
        chain.state.blocks[1].transactions[0].public_key = chain.bob.public_key.clone();
        reseal(&mut chain.state, 1);

        assert_rejected_at(&chain.state, 1, "signer is neither sender nor receiver");
    }

    #[test]
    fn test_resealed_unknown_receiver_detected() {
        let mut chain = signed_chain();
        let tx = signed_tx(1, &chain.alice, &chain.carol, "device:alice", "5");
        chain.state.blocks[1].transactions[0] = tx;
        reseal(&mut chain.state, 1);

        assert_rejected_at(&chain.state, 1, "unknown receiver account");
    }

    #[test]
    fn test_resealed_unknown_sender_detected() {
        let mut chain = signed_chain();
        let tx = signed_tx(2, &chain.carol, &chain.bob, "device:carol", "5");
        chain.state.blocks[2].transactions[0] = tx;
        reseal(&mut chain.state, 2);

        assert_rejected_at(&chain.state, 2, "unknown sender account");
    }

    #[test]
    fn test_resealed_fingerprint_mismatch_detected() {
        let mut chain = signed_chain();
        // Validly signed, but bound to a fingerprint alice never registered
        let tx = signed_tx(1, &chain.alice, &chain.bob, "device:mallory", "5");
        chain.state.blocks[1].transactions[0] = tx;
        reseal(&mut chain.state, 1);

        assert_rejected_at(&chain.state, 1, "fingerprint hash does not match account");
    }

    #[test]
    fn test_resealed_replayed_signature_detected() {
        let mut chain = signed_chain();
        let replayed = chain.state.blocks[1].transactions[0].signature.clone();
        chain.state.blocks[2].transactions[0].signature = replayed;
        reseal(&mut chain.state, 2);

        assert_rejected_at(&chain.state, 2, "invalid signature");
    }

    #[test]
    fn test_fresh_state_verifies() {
        let state = LedgerState::new().unwrap();
        assert_eq!(verify_chain(&state), VerifyReport::valid());
    }

    #[test]
    fn test_empty_chain_fails() {
        let mut state = LedgerState::new().unwrap();
        state.blocks.clear();

        let report = verify_chain(&state);
        assert!(!report.ok);
        assert_eq!(report.at_index, None);
        assert_eq!(report.error.as_deref(), Some("no blocks"));
    }

    #[test]
    fn test_tampered_genesis_seed() {
        let mut state = LedgerState::new().unwrap();
        state.blocks[0].previous_hash = "1".repeat(64);

        let report = verify_chain(&state);
        assert!(!report.ok);
        assert_eq!(report.at_index, Some(0));
    }

    #[test]
    fn test_tampered_genesis_hash() {
        let mut state = LedgerState::new().unwrap();
        state.blocks[0].transactions[0].amount = "1000".to_string();

        let report = verify_chain(&state);
        assert!(!report.ok);
        assert_eq!(report.at_index, Some(0));
        assert!(report.error.unwrap().contains("invalid hash"));
    }

    #[test]
    fn test_wrong_index() {
        let mut state = LedgerState::new().unwrap();
        state.blocks[0].index = 7;

        let report = verify_chain(&state);
        assert!(!report.ok);
        assert_eq!(report.at_index, Some(0));
    }

    #[test]
    fn test_report_json_shape() {
        let json = serde_json::to_value(VerifyReport::invalid(Some(3), "x".to_string())).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["atIndex"], 3);

        let json = serde_json::to_value(VerifyReport::valid()).unwrap();
        assert!(json.get("atIndex").is_none());
    }
}
