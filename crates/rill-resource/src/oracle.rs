//! The block-height oracle.

use async_trait::async_trait;

/// Errors propagated verbatim from the ledger client.
pub type OracleError = Box<dyn std::error::Error + Send + Sync>;

/// Source of the block-height clock.
///
/// Periods are derived from the integer height of an external ledger; the
/// handler consults the oracle at registration, update and latest-lookup
/// time. Fork reconciliation is not this layer's concern: all guarantees
/// are relative to the observed height.
#[async_trait]
pub trait BlockOracle: Send + Sync {
    /// Returns the current block height of the ledger head.
    async fn block_number(&self) -> Result<u64, OracleError>;
}
