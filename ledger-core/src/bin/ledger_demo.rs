//! Ledger demonstration client
//!
//! Registers two fresh identities, signs a transfer between them, and prints
//! the resulting block and chain verification report.
//!
//! Reads `LEDGER_PATH`, `LEDGER_HMAC_KEY`, `LEDGER_ANCHOR_DIR`,
//! `LEDGER_MAILBOX_CAPACITY`, and `LEDGER_LOG_FORMAT`.

use ethub_ledger::{
    actor::spawn_ledger_actor,
    config::LogFormat,
    generate_key_pair, Config, RegisterAccountInput, SubmitTransactionInput,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    tracing::info!(path = %config.ledger_path.display(), "Starting ledger demo");

    let ledger = spawn_ledger_actor(config.storage(), &config)?;

    let alice = generate_key_pair()?;
    let bob = generate_key_pair()?;
    let alice_fingerprint = "browser:ABC123|hw:alice";
    let bob_fingerprint = "browser:DEF456|hw:bob";

    for (key, raw) in [(&alice, alice_fingerprint), (&bob, bob_fingerprint)] {
        ledger
            .register_account_fingerprint(RegisterAccountInput {
                public_key: key.public_key.clone(),
                raw_fingerprint: raw.to_string(),
                hmac_key: config.hmac_key.clone(),
            })
            .await?;
    }

    let transfer = SubmitTransactionInput {
        from_public_key: Some(alice.public_key.clone()),
        to_public_key: bob.public_key.clone(),
        amount: "5".to_string(),
        raw_fingerprint: alice_fingerprint.to_string(),
        fingerprint_hmac_key: config.hmac_key.clone(),
        signature: String::new(),
    }
    .sign_with(&alice.private_key)?;

    let outcome = ledger.submit_signed_transaction(transfer).await?;
    println!("{}", serde_json::to_string_pretty(&outcome.block)?);

    let report = ledger.verify_chain().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&outcome.state.meta())?);

    ledger.shutdown().await?;

    if !report.ok {
        anyhow::bail!("chain verification failed");
    }

    Ok(())
}
