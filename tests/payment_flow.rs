use consult_payments::domain::payment::{
    Booking, BookingStatus, CreateAttemptRequest, PaymentError, PaymentStatus, RefundRequest,
    WebhookPayload,
};
use consult_payments::gateways::fixture::{fixture_suffix, FixtureGateway};
use consult_payments::gateways::AmountLimits;
use consult_payments::repo::memory::MemoryLedgerStore;
use consult_payments::repo::LedgerStore;
use consult_payments::service::ledger_service::LedgerService;
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn limits() -> AmountLimits {
    AmountLimits { min: dec!(50), max: dec!(50000) }
}

fn service() -> (LedgerService, MemoryLedgerStore, Arc<FixtureGateway>) {
    let store = MemoryLedgerStore::new();
    let gateway = Arc::new(FixtureGateway::new(limits()));
    let service = LedgerService {
        store: Arc::new(store.clone()),
        gateway: gateway.clone(),
        currency: "SAR".to_string(),
    };
    (service, store, gateway)
}

fn booking(id: &str) -> Booking {
    Booking {
        id: id.to_string(),
        lawyer_id: "lawyer-1".to_string(),
        client_id: "client-1".to_string(),
        status: BookingStatus::Pending,
        payment_status: None,
    }
}

fn attempt(booking_id: &str, amount: rust_decimal::Decimal) -> CreateAttemptRequest {
    CreateAttemptRequest {
        booking_id: booking_id.to_string(),
        amount,
        customer_name: "Amal Client".to_string(),
        customer_email: "amal@example.com".to_string(),
        customer_mobile: "512345678".to_string(),
        consultation_type: "Commercial law".to_string(),
        lawyer_name: "Ahmed".to_string(),
    }
}

fn paid_webhook(invoice_id: &str, payment_id: &str) -> WebhookPayload {
    WebhookPayload {
        invoice_id: invoice_id.to_string(),
        payment_id: payment_id.to_string(),
        invoice_status: "Paid".to_string(),
        customer_reference: "B101".to_string(),
        invoice_value: dec!(300),
        payment_gateway: Some("VISA/MASTER".to_string()),
        transaction_date: None,
    }
}

#[tokio::test]
async fn full_lifecycle_webhook_then_poll_then_refund() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B101")).await;

    // Open a session: pending entry, booking mirrors pending.
    let created = service.create_attempt(attempt("B101", dec!(300))).await.unwrap();
    let suffix = fixture_suffix(&created.invoice_id).unwrap().to_string();
    let payment_id = format!("fx-pay-{suffix}");

    let entry = store.find_by_invoice_id(&created.invoice_id).await.unwrap().unwrap();
    assert_eq!(entry.status, PaymentStatus::Pending);
    assert_eq!(
        store.get_booking("B101").await.unwrap().unwrap().payment_status,
        Some(PaymentStatus::Pending)
    );

    // Webhook lands first: entry paid, booking confirmed.
    let ack = service.apply_webhook(paid_webhook(&created.invoice_id, &payment_id)).await.unwrap();
    assert_eq!(ack.status, "processed");

    let entry = store.find_by_invoice_id(&created.invoice_id).await.unwrap().unwrap();
    assert_eq!(entry.status, PaymentStatus::Paid);
    assert_eq!(entry.payment_id.as_deref(), Some(payment_id.as_str()));

    let b = store.get_booking("B101").await.unwrap().unwrap();
    assert_eq!(b.status, BookingStatus::Confirmed);
    assert_eq!(b.payment_status, Some(PaymentStatus::Paid));

    // A later client poll is a no-op that still reports paid.
    let verify = service.confirm_by_polling(&payment_id).await.unwrap();
    assert!(verify.is_paid);
    assert!(!verify.applied);

    // Admin refund: entry refunded, booking cancelled.
    let refund = service
        .request_refund(RefundRequest {
            payment_id: payment_id.clone(),
            amount: dec!(300),
            reason: "client cancelled".to_string(),
        })
        .await
        .unwrap();
    assert!(refund.refund_id.starts_with("fx-ref-"));

    let entry = store.find_by_invoice_id(&created.invoice_id).await.unwrap().unwrap();
    assert_eq!(entry.status, PaymentStatus::Refunded);
    assert_eq!(entry.refund_amount, Some(dec!(300)));
    assert_eq!(entry.refund_reason.as_deref(), Some("client cancelled"));

    let b = store.get_booking("B101").await.unwrap().unwrap();
    assert_eq!(b.status, BookingStatus::Cancelled);
    assert_eq!(b.payment_status, Some(PaymentStatus::Refunded));
}

#[tokio::test]
async fn polling_alone_confirms_a_pending_entry() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B102")).await;

    let created = service.create_attempt(attempt("B102", dec!(250))).await.unwrap();
    let suffix = fixture_suffix(&created.invoice_id).unwrap().to_string();

    let verify = service.confirm_by_polling(&format!("fx-pay-{suffix}")).await.unwrap();
    assert!(verify.is_paid);
    assert!(verify.applied);

    let b = store.get_booking("B102").await.unwrap().unwrap();
    assert_eq!(b.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn duplicate_webhook_is_a_noop_and_booking_stays_consistent() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B103")).await;

    let created = service.create_attempt(attempt("B103", dec!(300))).await.unwrap();
    let suffix = fixture_suffix(&created.invoice_id).unwrap().to_string();
    let payment_id = format!("fx-pay-{suffix}");

    let first = service.apply_webhook(paid_webhook(&created.invoice_id, &payment_id)).await.unwrap();
    let second = service.apply_webhook(paid_webhook(&created.invoice_id, &payment_id)).await.unwrap();
    assert_eq!(first.status, "processed");
    assert_eq!(second.status, "noop");

    let paid: Vec<_> = store
        .list_for_booking("B103")
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.status == PaymentStatus::Paid)
        .collect();
    assert_eq!(paid.len(), 1);
}

#[tokio::test]
async fn failed_attempt_allows_a_new_one() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B104")).await;

    let first = service.create_attempt(attempt("B104", dec!(300))).await.unwrap();
    let mut webhook = paid_webhook(&first.invoice_id, "fx-pay-x");
    webhook.invoice_status = "Failed".to_string();
    service.apply_webhook(webhook).await.unwrap();

    let b = store.get_booking("B104").await.unwrap().unwrap();
    assert_eq!(b.status, BookingStatus::PaymentFailed);
    assert_eq!(b.payment_status, Some(PaymentStatus::Failed));

    // Not paid, so a second attempt is allowed and history keeps both.
    service.create_attempt(attempt("B104", dec!(300))).await.unwrap();
    assert_eq!(store.list_for_booking("B104").await.unwrap().len(), 2);
}

#[tokio::test]
async fn expired_webhook_marks_booking_payment_expired() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B105")).await;

    let created = service.create_attempt(attempt("B105", dec!(300))).await.unwrap();
    let mut webhook = paid_webhook(&created.invoice_id, "fx-pay-x");
    webhook.invoice_status = "Expired".to_string();
    service.apply_webhook(webhook).await.unwrap();

    let entry = store.find_by_invoice_id(&created.invoice_id).await.unwrap().unwrap();
    assert_eq!(entry.status, PaymentStatus::Expired);
    let b = store.get_booking("B105").await.unwrap().unwrap();
    assert_eq!(b.status, BookingStatus::PaymentExpired);
}

#[tokio::test]
async fn gateway_decline_persists_nothing() {
    let store = MemoryLedgerStore::new();
    let gateway = Arc::new(FixtureGateway::with_behavior(
        limits(),
        consult_payments::gateways::fixture::FixtureBehavior::Decline,
    ));
    let service = LedgerService {
        store: Arc::new(store.clone()),
        gateway,
        currency: "SAR".to_string(),
    };
    store.seed_booking(booking("B106")).await;

    let err = service.create_attempt(attempt("B106", dec!(300))).await.unwrap_err();
    assert!(matches!(err, PaymentError::GatewayBusiness(_)));
    assert!(store.list_for_booking("B106").await.unwrap().is_empty());
}

#[tokio::test]
async fn below_minimum_amount_fails_before_any_network_call() {
    let (service, store, gateway) = service();
    store.seed_booking(booking("B107")).await;

    let err = service.create_attempt(attempt("B107", dec!(49))).await.unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
    assert!(store.list_for_booking("B107").await.unwrap().is_empty());
    assert_eq!(gateway.open_calls.load(Ordering::SeqCst), 0);
}
