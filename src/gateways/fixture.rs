use crate::gateways::{
    AmountLimits, GatewayError, OpenSessionRequest, PaymentGateway, RefundReceipt, SessionCreated,
    StatusReport,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// In-memory stand-in for the real gateway, selected by deployment
/// configuration so the system can be exercised without live credentials.
/// Response shapes are identical to the real adapter's.
///
/// Identifiers are correlated: opening a session yields `fx-inv-<n>`, and a
/// status check for `fx-pay-<n>` reports the matching `fx-inv-<n>`.
pub struct FixtureGateway {
    pub limits: AmountLimits,
    pub behavior: FixtureBehavior,
    pub open_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub refund_calls: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureBehavior {
    Approve,
    Decline,
    Unreachable,
}

impl FixtureGateway {
    pub fn new(limits: AmountLimits) -> Self {
        Self::with_behavior(limits, FixtureBehavior::Approve)
    }

    pub fn with_behavior(limits: AmountLimits, behavior: FixtureBehavior) -> Self {
        Self {
            limits,
            behavior,
            open_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            refund_calls: AtomicUsize::new(0),
        }
    }

    fn fail_if_configured(&self) -> Result<(), GatewayError> {
        match self.behavior {
            FixtureBehavior::Approve => Ok(()),
            FixtureBehavior::Decline => {
                Err(GatewayError::Business("fixture decline".to_string()))
            }
            FixtureBehavior::Unreachable => {
                Err(GatewayError::Transport("fixture unreachable".to_string()))
            }
        }
    }
}

/// Extracts the shared suffix from either a fixture invoice id or payment id.
pub fn fixture_suffix(id: &str) -> Option<&str> {
    id.strip_prefix("fx-inv-").or_else(|| id.strip_prefix("fx-pay-"))
}

#[async_trait::async_trait]
impl PaymentGateway for FixtureGateway {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn open_session(
        &self,
        request: &OpenSessionRequest,
    ) -> Result<SessionCreated, GatewayError> {
        self.limits.check(request.amount)?;
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_if_configured()?;

        let suffix = Uuid::new_v4();
        Ok(SessionCreated {
            invoice_id: format!("fx-inv-{suffix}"),
            payment_url: format!("https://fixture.invalid/pay/{suffix}?booking_id={}", request.booking_id),
        })
    }

    async fn check_status(&self, payment_id: &str) -> Result<StatusReport, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_if_configured()?;

        let suffix = fixture_suffix(payment_id).ok_or_else(|| {
            GatewayError::Business(format!("unknown payment id: {payment_id}"))
        })?;

        Ok(StatusReport {
            is_paid: true,
            raw_status: "Paid".to_string(),
            invoice_id: format!("fx-inv-{suffix}"),
            amount: None,
            customer_reference: None,
            payment_method: Some("Fixture Payment".to_string()),
            transaction_date: Some(chrono::Utc::now().to_rfc3339()),
        })
    }

    async fn refund(
        &self,
        payment_id: &str,
        _amount: Decimal,
        _reason: &str,
    ) -> Result<RefundReceipt, GatewayError> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_if_configured()?;

        fixture_suffix(payment_id).ok_or_else(|| {
            GatewayError::Business(format!("unknown payment id: {payment_id}"))
        })?;

        Ok(RefundReceipt { refund_id: format!("fx-ref-{}", Uuid::new_v4()) })
    }
}
