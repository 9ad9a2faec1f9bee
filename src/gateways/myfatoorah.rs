use crate::gateways::{
    AmountLimits, GatewayError, OpenSessionRequest, PaymentGateway, RefundReceipt, SessionCreated,
    StatusReport,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

/// HTTP adapter for the MyFatoorah invoicing API. Request and response field
/// names are a compatibility surface and must match the gateway exactly.
pub struct MyFatoorahGateway {
    pub base_url: String,
    pub api_key: String,
    pub success_url: String,
    pub error_url: String,
    pub limits: AmountLimits,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GatewayEnvelope<T> {
    #[serde(rename = "IsSuccess")]
    is_success: bool,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Data")]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SendPaymentData {
    #[serde(rename = "InvoiceURL")]
    invoice_url: String,
    #[serde(rename = "InvoiceId")]
    invoice_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusData {
    #[serde(rename = "InvoiceStatus")]
    invoice_status: String,
    #[serde(rename = "InvoiceId")]
    invoice_id: serde_json::Value,
    #[serde(rename = "InvoiceValue")]
    invoice_value: Option<Decimal>,
    #[serde(rename = "CustomerReference")]
    customer_reference: Option<String>,
    #[serde(rename = "InvoiceTransactions")]
    invoice_transactions: Option<Vec<InvoiceTransaction>>,
    #[serde(rename = "CreatedDate")]
    created_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceTransaction {
    #[serde(rename = "PaymentGateway")]
    payment_gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundData {
    #[serde(rename = "RefundId")]
    refund_id: serde_json::Value,
}

/// Builds the SendPayment request body. Kept as a free function so the wire
/// shape can be asserted without a live endpoint.
pub fn send_payment_body(req: &OpenSessionRequest, success_url: &str, error_url: &str) -> serde_json::Value {
    json!({
        "CustomerName": req.payer.name,
        "InvoiceValue": req.amount,
        "DisplayCurrencyIso": req.currency,
        "CustomerMobile": req.payer.mobile,
        "CustomerEmail": req.payer.email,
        "CallBackUrl": format!("{}?booking_id={}", success_url, req.booking_id),
        "ErrorUrl": format!("{}?booking_id={}", error_url, req.booking_id),
        "CustomerReference": req.booking_id,
        "InvoiceItems": [
            {
                "ItemName": req.description,
                "Quantity": 1,
                "UnitPrice": req.amount,
            }
        ],
    })
}

impl MyFatoorahGateway {
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(GatewayError::Transport("gateway timeout".to_string()))
            }
            Err(e) => return Err(GatewayError::Transport(e.to_string())),
        };

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(GatewayError::Transport(format!("HTTP_{}", status.as_u16())));
        }

        let envelope: GatewayEnvelope<T> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed gateway response: {e}")))?;

        if !envelope.is_success {
            return Err(GatewayError::Business(
                envelope.message.unwrap_or_else(|| "gateway rejected the request".to_string()),
            ));
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::Transport("gateway response missing Data".to_string()))
    }
}

fn id_to_string(v: &serde_json::Value) -> String {
    // Invoice and refund ids arrive as numbers or strings depending on the
    // gateway version.
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MyFatoorahGateway {
    fn name(&self) -> &'static str {
        "myfatoorah"
    }

    async fn open_session(
        &self,
        request: &OpenSessionRequest,
    ) -> Result<SessionCreated, GatewayError> {
        self.limits.check(request.amount)?;

        let body = send_payment_body(request, &self.success_url, &self.error_url);
        let data: SendPaymentData = self.post_json("/v2/SendPayment", &body).await?;

        tracing::info!(booking_id = %request.booking_id, "payment session created");
        Ok(SessionCreated {
            invoice_id: id_to_string(&data.invoice_id),
            payment_url: data.invoice_url,
        })
    }

    async fn check_status(&self, payment_id: &str) -> Result<StatusReport, GatewayError> {
        let body = json!({ "Key": payment_id, "KeyType": "PaymentId" });
        let data: PaymentStatusData = self.post_json("/v2/GetPaymentStatus", &body).await?;

        let payment_method = data
            .invoice_transactions
            .as_ref()
            .and_then(|txs| txs.first())
            .and_then(|tx| tx.payment_gateway.clone());

        Ok(StatusReport {
            is_paid: data.invoice_status == "Paid",
            raw_status: data.invoice_status,
            invoice_id: id_to_string(&data.invoice_id),
            amount: data.invoice_value,
            customer_reference: data.customer_reference,
            payment_method,
            transaction_date: data.created_date,
        })
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<RefundReceipt, GatewayError> {
        let body = json!({
            "KeyType": "PaymentId",
            "Key": payment_id,
            "Amount": amount,
            "Comment": reason,
        });
        let data: RefundData = self.post_json("/v2/MakeRefund", &body).await?;

        tracing::info!(%payment_id, %amount, "refund accepted by gateway");
        Ok(RefundReceipt { refund_id: id_to_string(&data.refund_id) })
    }
}
