use crate::domain::payment::{
    CreateAttemptRequest, CreateAttemptResponse, LedgerEntry, PaymentError, PaymentStatus,
    RefundRequest, RefundResponse, VerifyResponse, WebhookAck, WebhookPayload,
};
use crate::domain::transitions::{apply_transition, PaymentEvent, Transition};
use crate::gateways::{OpenSessionRequest, PayerDetails, PaymentGateway};
use crate::repo::LedgerStore;
use std::sync::Arc;
use uuid::Uuid;

/// Owns the authoritative payment record per booking and applies the three
/// transition triggers (client poll, gateway webhook, admin refund) through
/// the shared pure transition function.
#[derive(Clone)]
pub struct LedgerService {
    pub store: Arc<dyn LedgerStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub currency: String,
}

impl LedgerService {
    /// Opens a payment session and records a pending attempt. Nothing is
    /// persisted when the gateway call fails.
    pub async fn create_attempt(
        &self,
        req: CreateAttemptRequest,
    ) -> Result<CreateAttemptResponse, PaymentError> {
        validate_payer(&req)?;

        if self.store.has_paid_entry(&req.booking_id).await? {
            return Err(PaymentError::AlreadyPaid);
        }

        let description = format!(
            "Legal consultation with {} - {}",
            req.lawyer_name, req.consultation_type
        );
        let session_req = OpenSessionRequest {
            amount: req.amount,
            currency: self.currency.clone(),
            booking_id: req.booking_id.clone(),
            payer: PayerDetails {
                name: req.customer_name.clone(),
                email: req.customer_email.clone(),
                mobile: req.customer_mobile.clone(),
            },
            description,
        };

        let session = self.gateway.open_session(&session_req).await?;

        let now = chrono::Utc::now();
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            booking_id: req.booking_id.clone(),
            invoice_id: session.invoice_id.clone(),
            payment_id: None,
            amount: req.amount,
            currency: self.currency.clone(),
            status: PaymentStatus::Pending,
            gateway: self.gateway.name().to_string(),
            payment_method: None,
            payment_url: Some(session.payment_url.clone()),
            refund_amount: None,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_pending(&entry).await?;

        tracing::info!(
            booking_id = %req.booking_id,
            invoice_id = %session.invoice_id,
            "pending payment attempt recorded"
        );

        Ok(CreateAttemptResponse {
            payment_url: session.payment_url,
            invoice_id: session.invoice_id,
            booking_id: req.booking_id,
            amount: req.amount,
            currency: self.currency.clone(),
        })
    }

    /// Client-initiated verification poll. The ledger entry is looked up by
    /// the invoice id the gateway reports, since only the invoice id is known
    /// at session-open time. An unknown invoice is a no-op: the raw status is
    /// returned without mutating anything.
    pub async fn confirm_by_polling(
        &self,
        payment_id: &str,
    ) -> Result<VerifyResponse, PaymentError> {
        let report = self.gateway.check_status(payment_id).await?;

        let mut applied = false;
        if let Some(entry) = self.store.find_by_invoice_id(&report.invoice_id).await? {
            let event = PaymentEvent::Confirmed {
                payment_id: payment_id.to_string(),
                raw_status: report.raw_status.clone(),
                is_paid: report.is_paid,
                payment_method: report.payment_method.clone(),
            };
            applied = self.apply(&entry, &event).await?;
        }

        Ok(VerifyResponse {
            is_paid: report.is_paid,
            payment_status: report.raw_status,
            invoice_id: report.invoice_id,
            invoice_value: report.amount,
            customer_reference: report.customer_reference,
            payment_method: report.payment_method,
            transaction_date: report.transaction_date,
            applied,
        })
    }

    /// Gateway-pushed status change. Never fails outward: unknown invoices
    /// and unmapped statuses are acknowledged, since the gateway retries
    /// rejected deliveries.
    pub async fn apply_webhook(&self, payload: WebhookPayload) -> Result<WebhookAck, PaymentError> {
        let Some(entry) = self.store.find_by_invoice_id(&payload.invoice_id).await? else {
            tracing::warn!(invoice_id = %payload.invoice_id, "webhook for unknown invoice ignored");
            return Ok(WebhookAck::IGNORED);
        };

        let event = PaymentEvent::Webhook {
            payment_id: payload.payment_id.clone(),
            raw_status: payload.invoice_status.clone(),
            payment_method: payload.payment_gateway.clone(),
        };

        if self.apply(&entry, &event).await? {
            Ok(WebhookAck::PROCESSED)
        } else {
            Ok(WebhookAck::NOOP)
        }
    }

    /// Admin-initiated refund. The gateway refund call is not idempotent, so
    /// it is issued only after the local state check and at most once per
    /// request; on gateway failure the entry stays paid.
    pub async fn request_refund(&self, req: RefundRequest) -> Result<RefundResponse, PaymentError> {
        let entry = self
            .store
            .find_by_payment_id(&req.payment_id)
            .await?
            .filter(|e| e.status == PaymentStatus::Paid)
            .ok_or(PaymentError::NotRefundable)?;

        let receipt = self.gateway.refund(&req.payment_id, req.amount, &req.reason).await?;

        let event = PaymentEvent::RefundCompleted {
            amount: req.amount,
            reason: req.reason.clone(),
        };
        if !self.apply(&entry, &event).await? {
            // A concurrent trigger moved the entry between our read and
            // write; the gateway refund already went through, so surface it.
            tracing::warn!(payment_id = %req.payment_id, "refund applied but ledger entry had already moved");
        }

        tracing::info!(
            payment_id = %req.payment_id,
            refund_id = %receipt.refund_id,
            "refund recorded"
        );
        Ok(RefundResponse { refund_id: receipt.refund_id, amount: req.amount })
    }

    pub async fn booking_history(
        &self,
        booking_id: &str,
    ) -> Result<Vec<LedgerEntry>, PaymentError> {
        Ok(self.store.list_for_booking(booking_id).await?)
    }

    /// Runs the pure transition and, when it yields a change, applies the
    /// entry + booking writes as one guarded unit. A lost compare-and-set
    /// race is reported as "not applied", never as an error.
    async fn apply(&self, entry: &LedgerEntry, event: &PaymentEvent) -> Result<bool, PaymentError> {
        match apply_transition(entry, event) {
            Transition::Apply(change) => {
                let applied = self
                    .store
                    .apply_change(entry.id, &entry.booking_id, entry.status, &change)
                    .await?;
                if applied {
                    tracing::info!(
                        invoice_id = %entry.invoice_id,
                        from = entry.status.as_str(),
                        to = change.status.as_str(),
                        "ledger entry transitioned"
                    );
                }
                Ok(applied)
            }
            Transition::Noop => Ok(false),
        }
    }
}

fn validate_payer(req: &CreateAttemptRequest) -> Result<(), PaymentError> {
    if req.booking_id.trim().is_empty() {
        return Err(PaymentError::Validation("booking_id is required".to_string()));
    }
    if req.customer_name.trim().len() < 2 {
        return Err(PaymentError::Validation("customer_name is too short".to_string()));
    }
    if !req.customer_email.contains('@') {
        return Err(PaymentError::Validation("customer_email is malformed".to_string()));
    }
    if req.customer_mobile.trim().is_empty() {
        return Err(PaymentError::Validation("customer_mobile is required".to_string()));
    }
    Ok(())
}
