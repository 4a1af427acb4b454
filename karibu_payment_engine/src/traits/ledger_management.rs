use crate::{db_types::LedgerEntry, traits::PaymentPipelineError};

/// Read access to the append-only vendor transaction log.
///
/// The log is the sole source of truth for wallet balances. There is deliberately no way to mutate or delete
/// entries through this trait.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Fetches every ledger entry for the vendor, ordered by creation time ascending.
    async fn fetch_ledger_for_vendor(&self, vendor_id: &str) -> Result<Vec<LedgerEntry>, PaymentPipelineError>;
}
