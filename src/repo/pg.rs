use crate::domain::payment::{Booking, BookingStatus, LedgerEntry, PaymentStatus};
use crate::domain::transitions::StatusChange;
use crate::repo::LedgerStore;
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgLedgerStore {
    pub pool: PgPool,
}

const ENTRY_COLUMNS: &str = "id, booking_id, invoice_id, payment_id, amount, currency, status, \
     gateway, payment_method, payment_url, refund_amount, refund_reason, created_at, updated_at";

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry> {
    let status: String = row.get("status");
    let status = PaymentStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown ledger status in store: {status}"))?;

    Ok(LedgerEntry {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        invoice_id: row.get("invoice_id"),
        payment_id: row.get("payment_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status,
        gateway: row.get("gateway"),
        payment_method: row.get("payment_method"),
        payment_url: row.get("payment_url"),
        refund_amount: row.get("refund_amount"),
        refund_reason: row.get("refund_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let status: String = row.get("status");
    let status = BookingStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status in store: {status}"))?;
    let payment_status: Option<String> = row.get("payment_status");

    Ok(Booking {
        id: row.get("id"),
        lawyer_id: row.get("lawyer_id"),
        client_id: row.get("client_id"),
        status,
        payment_status: payment_status.as_deref().and_then(PaymentStatus::parse),
    })
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        let row = sqlx::query(
            "SELECT id, lawyer_id, client_id, status, payment_status FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn insert_pending(&self, entry: &LedgerEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payment_ledger (
                id, booking_id, invoice_id, payment_id, amount, currency, status,
                gateway, payment_method, payment_url, refund_amount, refund_reason,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.booking_id)
        .bind(&entry.invoice_id)
        .bind(&entry.payment_id)
        .bind(entry.amount)
        .bind(&entry.currency)
        .bind(entry.status.as_str())
        .bind(&entry.gateway)
        .bind(&entry.payment_method)
        .bind(&entry.payment_url)
        .bind(entry.refund_amount)
        .bind(&entry.refund_reason)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(tx.as_mut())
        .await?;

        sqlx::query("UPDATE bookings SET payment_status = $2 WHERE id = $1")
            .bind(&entry.booking_id)
            .bind(PaymentStatus::Pending.as_str())
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM payment_ledger WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM payment_ledger WHERE payment_id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn has_paid_entry(&self, booking_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM payment_ledger WHERE booking_id = $1 AND status = $2 LIMIT 1",
        )
        .bind(booking_id)
        .bind(PaymentStatus::Paid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM payment_ledger WHERE booking_id = $1 ORDER BY created_at ASC"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn apply_change(
        &self,
        entry_id: Uuid,
        booking_id: &str,
        expected: PaymentStatus,
        change: &StatusChange,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set on the status the caller read. A racing writer that
        // got there first leaves zero rows updated and the whole unit rolls
        // back untouched.
        let updated = sqlx::query(
            r#"
            UPDATE payment_ledger
            SET status = $3,
                payment_id = COALESCE($4, payment_id),
                payment_method = COALESCE($5, payment_method),
                refund_amount = COALESCE($6, refund_amount),
                refund_reason = COALESCE($7, refund_reason),
                updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(entry_id)
        .bind(expected.as_str())
        .bind(change.status.as_str())
        .bind(&change.payment_id)
        .bind(&change.payment_method)
        .bind(change.refund_amount)
        .bind(&change.refund_reason)
        .execute(tx.as_mut())
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE bookings SET status = COALESCE($2, status), payment_status = $3 WHERE id = $1",
        )
        .bind(booking_id)
        .bind(change.booking_status.map(|s| s.as_str()))
        .bind(change.booking_payment_status.as_str())
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
