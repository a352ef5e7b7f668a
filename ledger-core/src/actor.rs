//! Actor-based serialization of ledger writes
//!
//! The free functions in [`crate::ledger`] have no locking: two concurrent
//! submissions against the same document can both read the same tip and the
//! later save silently drops the earlier block. This module implements the
//! single-writer pattern instead:
//! - One task owns the storage path and handles one request at a time
//! - load → validate → append → verify → save is a single critical section
//! - Bounded mailbox gives callers backpressure
//!
//! # Architecture
//!
//! ```text
//!   callers (any number of tasks)
//!            │
//!            ▼
//!   LedgerHandle (Clone) ── mpsc::channel (bounded) ──▶ LedgerActor
//!                                                        │
//!                                                        ▼
//!                                      ledger::submit_signed_transaction
//!                                      ledger::register_account_fingerprint
//!                                                        │
//!                                                        ▼
//!                                                 JSON document
//! ```
//!
//! Only writers that go through the same handle are serialized; a second
//! process writing the same path is still a lost-update hazard.

use crate::{
    anchor::write_anchor_file,
    ledger::{
        load_or_init_state, register_account_fingerprint, submit_signed_transaction,
        SubmitOutcome, SubmitTransactionInput,
    },
    metrics::Metrics,
    registry::RegisterAccountInput,
    storage::StorageOptions,
    types::LedgerState,
    verify::{verify_chain, VerifyReport},
    Config, Error, Result,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Register an account fingerprint
    RegisterAccount {
        /// Key and raw fingerprint to bind
        input: RegisterAccountInput,
        /// Updated state or rejection
        response: oneshot::Sender<Result<LedgerState>>,
    },

    /// Submit a signed transaction
    SubmitTransaction {
        /// Signed transfer
        input: SubmitTransactionInput,
        /// Appended block or rejection
        response: oneshot::Sender<Result<SubmitOutcome>>,
    },

    /// Verify the persisted chain
    VerifyChain {
        /// Verification report
        response: oneshot::Sender<Result<VerifyReport>>,
    },

    /// Snapshot of the persisted state
    GetState {
        /// Current state
        response: oneshot::Sender<Result<LedgerState>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger document
    storage: StorageOptions,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Where to drop anchor files, if anywhere
    anchor_dir: Option<PathBuf>,

    /// Metrics collector
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: StorageOptions,
        mailbox: mpsc::Receiver<LedgerMessage>,
        anchor_dir: Option<PathBuf>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            anchor_dir,
            metrics,
        }
    }

    /// Run the actor event loop until shutdown or all handles are dropped
    pub async fn run(mut self) {
        tracing::debug!(path = %self.storage.path.display(), "Ledger actor started");

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                msg => self.handle_message(msg).await,
            }
        }

        tracing::debug!(path = %self.storage.path.display(), "Ledger actor stopped");
    }

    /// Handle a single message
    async fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::RegisterAccount { input, response } => {
                let result = self.register(input).await;
                let _ = response.send(result);
            }

            LedgerMessage::SubmitTransaction { input, response } => {
                let result = self.submit(input).await;
                let _ = response.send(result);
            }

            LedgerMessage::VerifyChain { response } => {
                let result = self.verify().await;
                let _ = response.send(result);
            }

            LedgerMessage::GetState { response } => {
                let result = load_or_init_state(&self.storage).await;
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }

    async fn register(&self, input: RegisterAccountInput) -> Result<LedgerState> {
        let before = load_or_init_state(&self.storage).await?.accounts.len();
        let state = register_account_fingerprint(&self.storage, input).await?;

        if state.accounts.len() > before {
            self.metrics.record_account_registered();
        }

        Ok(state)
    }

    async fn submit(&self, input: SubmitTransactionInput) -> Result<SubmitOutcome> {
        let outcome = match submit_signed_transaction(&self.storage, input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_rejection(e.kind());
                return Err(e);
            }
        };

        self.metrics.record_block_appended(outcome.state.blocks.len());

        if let Some(dir) = &self.anchor_dir {
            if let Err(e) = write_anchor_file(dir, &outcome.block).await {
                tracing::warn!(index = outcome.block.index, error = %e, "Failed to write anchor file");
            }
        }

        Ok(outcome)
    }

    async fn verify(&self) -> Result<VerifyReport> {
        let state = load_or_init_state(&self.storage).await?;

        let started = Instant::now();
        let report = verify_chain(&state);
        self.metrics
            .record_verify_duration(started.elapsed().as_secs_f64());
        self.metrics.set_chain_height(state.blocks.len());

        Ok(report)
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    metrics: Metrics,
}

impl LedgerHandle {
    /// Register an account fingerprint
    pub async fn register_account_fingerprint(
        &self,
        input: RegisterAccountInput,
    ) -> Result<LedgerState> {
        self.request(|response| LedgerMessage::RegisterAccount { input, response })
            .await
    }

    /// Submit a signed transaction
    pub async fn submit_signed_transaction(
        &self,
        input: SubmitTransactionInput,
    ) -> Result<SubmitOutcome> {
        self.request(|response| LedgerMessage::SubmitTransaction { input, response })
            .await
    }

    /// Verify the persisted chain
    pub async fn verify_chain(&self) -> Result<VerifyReport> {
        self.request(|response| LedgerMessage::VerifyChain { response })
            .await
    }

    /// Snapshot of the persisted state
    pub async fn state(&self) -> Result<LedgerState> {
        self.request(|response| LedgerMessage::GetState { response })
            .await
    }

    /// Metrics recorded by the actor
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown actor; requests already queued are processed first
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }
}

/// Spawn the ledger actor for `storage`
pub fn spawn_ledger_actor(storage: StorageOptions, config: &Config) -> Result<LedgerHandle> {
    let metrics = Metrics::new()?;
    let (tx, rx) = mpsc::channel(config.mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx, config.anchor_dir.clone(), metrics.clone());

    tokio::spawn(async move {
        actor.run().await;
    });

    Ok(LedgerHandle {
        sender: tx,
        metrics,
    })
}
