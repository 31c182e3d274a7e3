//! Rebuilds an account's recent transaction history by scanning blocks
//! backwards from the chain head.
//!
//! There is no index behind this: every call walks the window again from the
//! head. It is only acceptable because the window is capped.

use crate::{error::DappError, network::Ledger, units::format_ether};
use ethers::types::{Address, Transaction, TxHash};
use futures::{stream, StreamExt};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub max_results: usize,
    pub max_blocks_scanned: u64,
    /// How many blocks may be requested ahead of the one being examined
    pub fetch_concurrency: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_results: 100,
            max_blocks_scanned: 1000,
            fetch_concurrency: 4,
        }
    }
}

/// On-chain transaction as shown in the history list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creations
    pub to: Option<Address>,
    /// Decimal ether, full precision
    pub value: String,
    pub block_number: u64,
}

impl TransactionRecord {
    fn from_transaction(tx: &Transaction, block_number: u64) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: format_ether(tx.value),
            block_number: tx
                .block_number
                .map(|n| n.as_u64())
                .unwrap_or(block_number),
        }
    }
}

fn touches(tx: &Transaction, account: Address) -> bool {
    tx.from == account || tx.to == Some(account)
}

/// Returns transactions sent from or to `account`, newest first.
///
/// Stops after `limits.max_results` records or `limits.max_blocks_scanned`
/// blocks, whichever comes first. Blocks the node does not return still
/// count towards the scanned window.
pub async fn reconstruct(
    ledger: &dyn Ledger,
    account: Address,
    limits: HistoryLimits,
) -> Result<Vec<TransactionRecord>, DappError> {
    let mut history = Vec::new();
    if limits.max_results == 0 {
        return Ok(history);
    }

    let head = ledger.block_number().await?;
    let window = limits.max_blocks_scanned.min(head.saturating_add(1));

    let mut blocks = stream::iter((0..window).map(|offset| head - offset))
        .map(|number| async move { (number, ledger.block_with_transactions(number).await) })
        .buffered(limits.fetch_concurrency.max(1));

    let mut scanned = 0u64;
    while let Some((number, block)) = blocks.next().await {
        scanned += 1;
        let Some(block) = block? else {
            debug!("(history) block {} not available, skipping", number);
            continue;
        };

        // later transactions in a block are newer
        for tx in block.transactions.iter().rev() {
            if !touches(tx, account) {
                continue;
            }
            history.push(TransactionRecord::from_transaction(tx, number));
            if history.len() >= limits.max_results {
                debug!(
                    "(history) result cap reached after {} blocks for {:?}",
                    scanned, account
                );
                return Ok(history);
            }
        }
    }

    debug!(
        "(history) scanned {} blocks from head {}, {} records for {:?}",
        scanned,
        head,
        history.len(),
        account
    );
    Ok(history)
}
