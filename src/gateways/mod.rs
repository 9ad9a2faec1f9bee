use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod fixture;
pub mod myfatoorah;

#[derive(Debug, Clone)]
pub struct PayerDetails {
    pub name: String,
    pub email: String,
    pub mobile: String,
}

#[derive(Debug, Clone)]
pub struct OpenSessionRequest {
    pub amount: Decimal,
    pub currency: String,
    pub booking_id: String,
    pub payer: PayerDetails,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub invoice_id: String,
    pub payment_url: String,
}

/// Normalized view of the gateway's payment status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub is_paid: bool,
    pub raw_status: String,
    pub invoice_id: String,
    pub amount: Option<Decimal>,
    pub customer_reference: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub refund_id: String,
}

/// Gateway failures, tagged so callers can decide between retrying and
/// surfacing to the user.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Rejected locally before any network call.
    #[error("invalid gateway request: {0}")]
    Validation(String),
    /// Network failure, timeout or non-2xx transport response. Retryable.
    #[error("gateway transport failure: {0}")]
    Transport(String),
    /// The gateway responded but refused the operation. Not retryable.
    #[error("gateway refused the operation: {0}")]
    Business(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

/// Deployment-configured inclusive bounds on a single payment amount.
#[derive(Debug, Clone, Copy)]
pub struct AmountLimits {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountLimits {
    pub fn check(&self, amount: Decimal) -> Result<(), GatewayError> {
        if amount < self.min || amount > self.max {
            return Err(GatewayError::Validation(format!(
                "amount must be between {} and {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens a hosted checkout session. Out-of-bound amounts fail locally
    /// without touching the network.
    async fn open_session(
        &self,
        request: &OpenSessionRequest,
    ) -> Result<SessionCreated, GatewayError>;

    /// Pure status query by the gateway's payment id; safe to call
    /// repeatedly.
    async fn check_status(&self, payment_id: &str) -> Result<StatusReport, GatewayError>;

    /// Not idempotent at the gateway: calling twice may create two refunds.
    /// The ledger invokes this at most once per refund request.
    async fn refund(
        &self,
        payment_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<RefundReceipt, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_limits_are_inclusive() {
        let limits = AmountLimits { min: dec!(50), max: dec!(50000) };
        assert!(limits.check(dec!(50)).is_ok());
        assert!(limits.check(dec!(50000)).is_ok());
        assert!(limits.check(dec!(300)).is_ok());
        assert!(matches!(limits.check(dec!(49)), Err(GatewayError::Validation(_))));
        assert!(matches!(limits.check(dec!(50001)), Err(GatewayError::Validation(_))));
    }
}
