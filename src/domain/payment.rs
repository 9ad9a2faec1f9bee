use crate::gateways::GatewayError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a single payment attempt. `Refunded`, `Failed` and `Expired` are
/// terminal; `Paid` can only be left through a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "expired" => Some(PaymentStatus::Expired),
            _ => None,
        }
    }
}

/// Overall booking status values the ledger is allowed to emit as side
/// effects of payment transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    PaymentFailed,
    PaymentExpired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::PaymentFailed => "payment_failed",
            BookingStatus::PaymentExpired => "payment_expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "payment_failed" => Some(BookingStatus::PaymentFailed),
            "payment_expired" => Some(BookingStatus::PaymentExpired),
            _ => None,
        }
    }
}

/// One record of a single try at collecting payment for a booking. Entries
/// are never deleted; a refund is a status change, not a removal.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub booking_id: String,
    /// Gateway-assigned at session open; unique per attempt, used to
    /// correlate webhooks.
    pub invoice_id: String,
    /// Gateway-assigned once the payer completes checkout.
    pub payment_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway: String,
    pub payment_method: Option<String>,
    pub payment_url: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking as seen through the store boundary. The ledger only ever touches
/// the two payment-mirror fields.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: String,
    pub lawyer_id: String,
    pub client_id: String,
    pub status: BookingStatus,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAttemptRequest {
    pub booking_id: String,
    pub amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_mobile: String,
    pub consultation_type: String,
    pub lawyer_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAttemptResponse {
    pub payment_url: String,
    pub invoice_id: String,
    pub booking_id: String,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub payment_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub is_paid: bool,
    pub payment_status: String,
    pub invoice_id: String,
    pub invoice_value: Option<Decimal>,
    pub customer_reference: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_date: Option<String>,
    /// Whether this verification moved the ledger entry forward. Repeated
    /// polls of an already-paid invoice report `false` here.
    pub applied: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub payment_id: String,
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResponse {
    pub refund_id: String,
    pub amount: Decimal,
}

/// Webhook payload as posted by the gateway. Field names are a compatibility
/// surface and must match the gateway's PascalCase exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "InvoiceId")]
    pub invoice_id: String,
    #[serde(rename = "PaymentId")]
    pub payment_id: String,
    #[serde(rename = "InvoiceStatus")]
    pub invoice_status: String,
    #[serde(rename = "CustomerReference")]
    pub customer_reference: String,
    #[serde(rename = "InvoiceValue")]
    pub invoice_value: Decimal,
    #[serde(rename = "PaymentGateway")]
    pub payment_gateway: Option<String>,
    #[serde(rename = "TransactionDate")]
    pub transaction_date: Option<String>,
}

/// Webhook acknowledgments never fail outward; the gateway retries rejected
/// deliveries indefinitely.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub const IGNORED: WebhookAck = WebhookAck { status: "ignored" };
    pub const PROCESSED: WebhookAck = WebhookAck { status: "processed" };
    pub const NOOP: WebhookAck = WebhookAck { status: "noop" };
}

/// Deployment-level payment settings exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSettings {
    pub currency: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub gateway: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("invalid payment request: {0}")]
    Validation(String),
    #[error("payment system unreachable: {0}")]
    GatewayTransport(String),
    #[error("payment gateway rejected the request: {0}")]
    GatewayBusiness(String),
    #[error("booking already has a paid attempt")]
    AlreadyPaid,
    #[error("payment is not in a refundable state")]
    NotRefundable,
    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::GatewayTransport(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "VALIDATION_FAILED",
            PaymentError::GatewayTransport(_) => "GATEWAY_UNREACHABLE",
            PaymentError::GatewayBusiness(_) => "GATEWAY_REJECTED",
            PaymentError::AlreadyPaid => "ALREADY_PAID",
            PaymentError::NotRefundable => "NOT_REFUNDABLE",
            PaymentError::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<GatewayError> for PaymentError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Validation(msg) => PaymentError::Validation(msg),
            GatewayError::Transport(msg) => PaymentError::GatewayTransport(msg),
            GatewayError::Business(msg) => PaymentError::GatewayBusiness(msg),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorEnvelope {
    pub fn from_error(e: &PaymentError) -> Self {
        let message = match e {
            // Transport and storage details stay out of client-facing messages.
            PaymentError::GatewayTransport(_) => "payment system unreachable".to_string(),
            PaymentError::Store(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            error: ErrorPayload {
                code: e.code().to_string(),
                message,
                retryable: e.is_retryable(),
            },
        }
    }
}
