use crate::domain::payment::{Booking, LedgerEntry, PaymentStatus};
use crate::domain::transitions::StatusChange;
use anyhow::Result;
use uuid::Uuid;

/// The ledger store is the only shared mutable resource. Every read consults
/// the store directly; there is no in-process cache.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>>;

    /// Persists a new pending attempt and mirrors `payment_status=pending`
    /// onto the booking, as one atomic unit.
    async fn insert_pending(&self, entry: &LedgerEntry) -> Result<()>;

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<LedgerEntry>>;

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<LedgerEntry>>;

    /// Whether any attempt for this booking is already paid.
    async fn has_paid_entry(&self, booking_id: &str) -> Result<bool>;

    /// Full attempt history, oldest first. Entries are never deleted.
    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<LedgerEntry>>;

    /// Applies a status change to the entry and the paired booking patch as
    /// one atomic unit, guarded by the status the caller read. Returns
    /// `false` when the entry no longer holds `expected` — the caller lost a
    /// race and the change must be treated as a no-op.
    async fn apply_change(
        &self,
        entry_id: Uuid,
        booking_id: &str,
        expected: PaymentStatus,
        change: &StatusChange,
    ) -> Result<bool>;
}
