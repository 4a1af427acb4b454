use std::fmt::Debug;

use kpg_common::{Money, DEFAULT_CURRENCY};
use log::*;

use crate::{
    db_types::{LedgerEntry, TransactionStatus, TransactionType},
    traits::{LedgerManagement, PaymentPipelineError},
};

/// `WalletApi` exposes vendor wallet balances as a pure projection over the append-only transaction log.
///
/// No balance is ever stored. Recomputing the fold over the same log always yields the same summary, so a
/// replayed webhook that appended nothing cannot move a balance.
pub struct WalletApi<B> {
    db: B,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: LedgerManagement
{
    pub async fn wallet_summary(&self, vendor_id: &str) -> Result<WalletSummary, PaymentPipelineError> {
        let entries = self.db.fetch_ledger_for_vendor(vendor_id).await?;
        let summary = project_wallet(vendor_id, &entries);
        trace!("💸️ Wallet for vendor {vendor_id}: {} over {} entr(ies)", summary.balance, entries.len());
        Ok(summary)
    }

    pub async fn transaction_history(&self, vendor_id: &str) -> Result<Vec<LedgerEntry>, PaymentPipelineError> {
        self.db.fetch_ledger_for_vendor(vendor_id).await
    }
}

/// A vendor's wallet, derived entirely from their ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WalletSummary {
    pub vendor_id: String,
    /// Completed payment credits minus completed withdrawal debits.
    pub balance: Money,
    pub currency: String,
    /// Sum of all completed `Payment` entries.
    pub total_earned: Money,
    /// Sum of all completed `Withdrawal` entries.
    pub total_withdrawn: Money,
    /// Sum of `Withdrawal` entries still awaiting settlement. Informational; not subtracted from the balance.
    pub pending_withdrawals: Money,
    pub payment_count: usize,
    pub withdrawal_count: usize,
    pub entry_count: usize,
}

/// Fold the ledger into a wallet summary. Only `Completed` entries move money; `Pending` withdrawals are
/// totalled separately and `Failed` entries are skipped entirely. `Refund` entries are recorded in the log
/// but do not change the balance here (refund settlement is outside this pipeline).
pub fn project_wallet(vendor_id: &str, entries: &[LedgerEntry]) -> WalletSummary {
    let mut summary = WalletSummary {
        vendor_id: vendor_id.to_string(),
        balance: Money::default(),
        currency: DEFAULT_CURRENCY.to_string(),
        total_earned: Money::default(),
        total_withdrawn: Money::default(),
        pending_withdrawals: Money::default(),
        payment_count: 0,
        withdrawal_count: 0,
        entry_count: entries.len(),
    };
    for entry in entries {
        // entries are ordered oldest-first, so the last one wins the currency
        summary.currency = entry.currency.clone();
        match (entry.transaction_type, entry.status) {
            (TransactionType::Payment, TransactionStatus::Completed) => {
                summary.total_earned = summary.total_earned + entry.amount;
                summary.balance = summary.balance + entry.amount;
                summary.payment_count += 1;
            },
            (TransactionType::Withdrawal, TransactionStatus::Completed) => {
                summary.total_withdrawn = summary.total_withdrawn + entry.amount;
                summary.balance = summary.balance - entry.amount;
                summary.withdrawal_count += 1;
            },
            (TransactionType::Withdrawal, TransactionStatus::Pending) => {
                summary.pending_withdrawals = summary.pending_withdrawals + entry.amount;
            },
            _ => {},
        }
    }
    summary
}
