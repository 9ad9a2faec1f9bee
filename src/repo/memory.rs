use crate::domain::payment::{Booking, LedgerEntry, PaymentStatus};
use crate::domain::transitions::StatusChange;
use crate::repo::LedgerStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory ledger + booking store. One lock guards both maps so the
/// entry/booking pair updates with the same atomicity the Postgres
/// transaction provides. Used by tests and fixture deployments.
#[derive(Default, Clone)]
pub struct MemoryLedgerStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, LedgerEntry>,
    bookings: HashMap<String, Booking>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_booking(&self, booking: Booking) {
        let mut inner = self.inner.write().await;
        inner.bookings.insert(booking.id.clone(), booking);
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        let inner = self.inner.read().await;
        Ok(inner.bookings.get(booking_id).cloned())
    }

    async fn insert_pending(&self, entry: &LedgerEntry) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(booking) = inner.bookings.get_mut(&entry.booking_id) {
            booking.payment_status = Some(PaymentStatus::Pending);
        }
        inner.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.values().find(|e| e.invoice_id == invoice_id).cloned())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .values()
            .find(|e| e.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn has_paid_entry(&self, booking_id: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .values()
            .any(|e| e.booking_id == booking_id && e.status == PaymentStatus::Paid))
    }

    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<LedgerEntry> = inner
            .entries
            .values()
            .filter(|e| e.booking_id == booking_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn apply_change(
        &self,
        entry_id: Uuid,
        booking_id: &str,
        expected: PaymentStatus,
        change: &StatusChange,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.entries.get_mut(&entry_id) else {
            anyhow::bail!("ledger entry {entry_id} vanished from store");
        };
        if entry.status != expected {
            // Lost the race; a concurrent trigger moved the entry first.
            return Ok(false);
        }

        entry.status = change.status;
        if change.payment_id.is_some() {
            entry.payment_id = change.payment_id.clone();
        }
        if change.payment_method.is_some() {
            entry.payment_method = change.payment_method.clone();
        }
        if change.refund_amount.is_some() {
            entry.refund_amount = change.refund_amount;
        }
        if change.refund_reason.is_some() {
            entry.refund_reason = change.refund_reason.clone();
        }
        entry.updated_at = chrono::Utc::now();

        if let Some(booking) = inner.bookings.get_mut(booking_id) {
            if let Some(status) = change.booking_status {
                booking.status = status;
            }
            booking.payment_status = Some(change.booking_payment_status);
        }

        Ok(true)
    }
}
