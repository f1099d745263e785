//! Transaction submission for distribution calls.
//!
//! The form hands a [`CallDescriptor`] to a [`TransactionSubmitter`] and polls
//! the returned job. The wallet implementation signs locally with an ethers
//! `LocalWallet`, tops up the token allowance when needed, then broadcasts
//! and waits for the receipt. There is no timeout and no cancellation; the
//! job resolves when the node reports the receipt.

use anyhow::{anyhow, Result};
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::mpsc;
use tracing::{debug, info, warn};

use crate::async_job::{spawn_job, AsyncJob};
use crate::config::{get_provider, parse_rpc_url};
use crate::distribution::{Allowance, CallDescriptor};

/// What a successful submission reports back
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Signs and broadcasts assembled contract calls.
pub trait TransactionSubmitter {
    /// Whether a write can be attempted at all (wallet present, chain known).
    fn is_ready(&self) -> bool;

    /// Start the submission; the job yields the receipt or the failure reason.
    fn submit(&self, call: CallDescriptor) -> AsyncJob<SubmissionReceipt>;
}

/// Submitter backed by a local private key and an HTTP provider.
#[derive(Clone)]
pub struct WalletSubmitter {
    rpc_url: String,
    chain_id: u64,
    wallet: Option<LocalWallet>,
}

impl WalletSubmitter {
    pub fn new(rpc_url: String, chain_id: u64, wallet: Option<LocalWallet>) -> Self {
        Self {
            rpc_url,
            chain_id,
            wallet,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.rpc_url.clone(), config.chain_id, config.signer.clone())
    }
}

impl TransactionSubmitter for WalletSubmitter {
    fn is_ready(&self) -> bool {
        self.wallet.is_some() && parse_rpc_url(&self.rpc_url).is_ok()
    }

    fn submit(&self, call: CallDescriptor) -> AsyncJob<SubmissionReceipt> {
        let Some(wallet) = self.wallet.clone() else {
            return failed_job(anyhow!("No signing wallet configured"));
        };
        if call.chain_id != self.chain_id {
            return failed_job(anyhow!(
                "Call targets chain {} but wallet is connected to chain {}",
                call.chain_id,
                self.chain_id
            ));
        }
        let provider = match get_provider(&self.rpc_url) {
            Ok(provider) => provider,
            Err(e) => return failed_job(e),
        };
        spawn_job(move || async move {
            let client = SignerMiddleware::new(provider, wallet.with_chain_id(call.chain_id));
            send_call(&client, &call).await
        })
    }
}

fn failed_job<T>(error: anyhow::Error) -> AsyncJob<T> {
    let (tx, rx) = mpsc::channel();
    let _ = tx.send(Err(error));
    AsyncJob::new(rx)
}

async fn current_allowance<M: Middleware + 'static>(
    client: &M,
    owner: Address,
    allowance: &Allowance,
) -> Result<U256> {
    let tx: TypedTransaction = TransactionRequest::new()
        .to(allowance.token)
        .data(allowance.allowance_calldata(owner)?)
        .into();
    let raw = client
        .call(&tx, None)
        .await
        .map_err(|e| anyhow!("Allowance query failed: {}", e))?;
    if raw.len() < 32 {
        return Err(anyhow!("Allowance query returned {} bytes", raw.len()));
    }
    Ok(U256::from_big_endian(&raw[..32]))
}

async fn ensure_allowance<S: Signer + 'static>(
    client: &SignerMiddleware<Provider<Http>, S>,
    allowance: &Allowance,
) -> Result<()> {
    let owner = client.address();
    let current = current_allowance(client, owner, allowance).await?;
    if current >= allowance.amount {
        return Ok(());
    }

    info!(
        "Approving {} of token {:?} for distributor {:?}",
        allowance.amount, allowance.token, allowance.spender
    );
    let approve = TransactionRequest::new()
        .to(allowance.token)
        .data(allowance.approve_calldata()?);
    let receipt = client
        .send_transaction(approve, None)
        .await
        .map_err(|e| anyhow!("Approve failed: {}", e))?
        .await?
        .ok_or_else(|| anyhow!("Approve transaction dropped from mempool"))?;
    check_status(&receipt, "Approve")?;
    Ok(())
}

fn check_status(receipt: &TransactionReceipt, what: &str) -> Result<()> {
    if receipt.status == Some(U64::zero()) {
        return Err(anyhow!(
            "{} transaction {:?} reverted",
            what,
            receipt.transaction_hash
        ));
    }
    Ok(())
}

async fn send_call<S: Signer + 'static>(
    client: &SignerMiddleware<Provider<Http>, S>,
    call: &CallDescriptor,
) -> Result<SubmissionReceipt> {
    if let Some(allowance) = &call.allowance {
        ensure_allowance(client, allowance).await?;
    }

    let calldata = call.calldata()?;
    debug!("{} calldata 0x{}", call.function.name, hex::encode(&calldata));
    let tx = TransactionRequest::new()
        .to(call.call_target)
        .data(calldata)
        .value(call.native_value);

    info!(
        "Submitting {} to {:?} on chain {}",
        call.function_signature(),
        call.call_target,
        call.chain_id
    );
    let pending = client
        .send_transaction(tx, None)
        .await
        .map_err(|e| anyhow!("Transaction rejected: {}", e))?;
    let tx_hash = pending.tx_hash();
    info!("Broadcast {:?}, waiting for receipt", tx_hash);

    let receipt = pending
        .await?
        .ok_or_else(|| anyhow!("Transaction {:?} dropped from mempool", tx_hash))?;
    if let Err(e) = check_status(&receipt, &call.function.name) {
        warn!("{}", e);
        return Err(e);
    }

    Ok(SubmissionReceipt {
        tx_hash,
        block_number: receipt.block_number.map(|b| b.as_u64()),
        gas_used: receipt.gas_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{send_to_many_call, TransferCall};

    fn sample_call(chain_id: u64) -> CallDescriptor {
        let transfer = TransferCall {
            destination_chain: "Avalanche".to_string(),
            destination_contract: Address::from([2u8; 20]),
            receivers: vec![Address::from([3u8; 20])],
            symbol: "aUSDC".to_string(),
            token: Address::from([4u8; 20]),
            amount: U256::from(1_000_000u64),
        };
        send_to_many_call(Address::from([1u8; 20]), chain_id, &transfer, U256::zero())
    }

    fn test_wallet() -> LocalWallet {
        "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_wallet_submitter_not_ready_without_wallet() {
        let submitter = WalletSubmitter::new("http://localhost:8545".into(), 80001, None);
        assert!(!submitter.is_ready());
    }

    #[test]
    fn test_wallet_submitter_ready_with_wallet() {
        let submitter =
            WalletSubmitter::new("http://localhost:8545".into(), 80001, Some(test_wallet()));
        assert!(submitter.is_ready());
    }

    #[test]
    fn test_submit_without_wallet_fails_immediately() {
        let submitter = WalletSubmitter::new("http://localhost:8545".into(), 80001, None);
        let mut job = submitter.submit(sample_call(80001));
        let err = job.poll().unwrap().unwrap_err();
        assert!(err.to_string().contains("No signing wallet"));
    }

    #[test]
    fn test_submit_rejects_chain_mismatch() {
        let submitter =
            WalletSubmitter::new("http://localhost:8545".into(), 80001, Some(test_wallet()));
        let mut job = submitter.submit(sample_call(5));
        let err = job.poll().unwrap().unwrap_err();
        assert!(err.to_string().contains("chain 5"));
    }

    #[test]
    fn test_malformed_rpc_makes_submitter_not_ready() {
        let submitter = WalletSubmitter::new("localhost".into(), 80001, Some(test_wallet()));
        assert!(!submitter.is_ready());
    }

    #[test]
    fn test_submit_with_malformed_rpc_fails_before_sending() {
        let submitter = WalletSubmitter::new("not a url".into(), 80001, Some(test_wallet()));
        let mut job = submitter.submit(sample_call(80001));
        let err = job.poll().unwrap().unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[test]
    fn test_check_status_reverted() {
        let receipt = TransactionReceipt {
            status: Some(U64::zero()),
            ..Default::default()
        };
        assert!(check_status(&receipt, "sendToMany").is_err());

        let ok = TransactionReceipt {
            status: Some(U64::one()),
            ..Default::default()
        };
        assert!(check_status(&ok, "sendToMany").is_ok());
    }
}
