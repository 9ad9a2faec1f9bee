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

fn service() -> (LedgerService, MemoryLedgerStore, Arc<FixtureGateway>) {
    let store = MemoryLedgerStore::new();
    let gateway = Arc::new(FixtureGateway::new(AmountLimits {
        min: dec!(50),
        max: dec!(50000),
    }));
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

fn attempt(booking_id: &str) -> CreateAttemptRequest {
    CreateAttemptRequest {
        booking_id: booking_id.to_string(),
        amount: dec!(300),
        customer_name: "Amal Client".to_string(),
        customer_email: "amal@example.com".to_string(),
        customer_mobile: "512345678".to_string(),
        consultation_type: "Family law".to_string(),
        lawyer_name: "Fatima".to_string(),
    }
}

async fn pay(service: &LedgerService, invoice_id: &str) -> String {
    let suffix = fixture_suffix(invoice_id).unwrap().to_string();
    let payment_id = format!("fx-pay-{suffix}");
    service
        .apply_webhook(WebhookPayload {
            invoice_id: invoice_id.to_string(),
            payment_id: payment_id.clone(),
            invoice_status: "Paid".to_string(),
            customer_reference: "ref".to_string(),
            invoice_value: dec!(300),
            payment_gateway: None,
            transaction_date: None,
        })
        .await
        .unwrap();
    payment_id
}

#[tokio::test]
async fn paid_booking_rejects_new_attempts_without_a_gateway_call() {
    let (service, store, gateway) = service();
    store.seed_booking(booking("B201")).await;

    let created = service.create_attempt(attempt("B201")).await.unwrap();
    pay(&service, &created.invoice_id).await;
    let calls_after_first = gateway.open_calls.load(Ordering::SeqCst);

    let err = service.create_attempt(attempt("B201")).await.unwrap_err();
    assert!(matches!(err, PaymentError::AlreadyPaid));
    assert_eq!(gateway.open_calls.load(Ordering::SeqCst), calls_after_first);

    // The double-payment invariant holds at every observation point.
    let paid = store
        .list_for_booking("B201")
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.status == PaymentStatus::Paid)
        .count();
    assert_eq!(paid, 1);
}

#[tokio::test]
async fn webhook_for_unknown_invoice_is_acknowledged_and_mutates_nothing() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B202")).await;
    service.create_attempt(attempt("B202")).await.unwrap();

    let ack = service
        .apply_webhook(WebhookPayload {
            invoice_id: "not-ours".to_string(),
            payment_id: "fx-pay-unknown".to_string(),
            invoice_status: "Paid".to_string(),
            customer_reference: "ref".to_string(),
            invoice_value: dec!(300),
            payment_gateway: None,
            transaction_date: None,
        })
        .await
        .unwrap();

    assert_eq!(ack.status, "ignored");
    let entries = store.list_for_booking("B202").await.unwrap();
    assert!(entries.iter().all(|e| e.status == PaymentStatus::Pending));
}

#[tokio::test]
async fn refund_requires_a_paid_entry_and_skips_the_gateway_otherwise() {
    let (service, store, gateway) = service();
    store.seed_booking(booking("B203")).await;
    service.create_attempt(attempt("B203")).await.unwrap();

    // Entry exists but is still pending.
    let err = service
        .request_refund(RefundRequest {
            payment_id: "fx-pay-missing".to_string(),
            amount: dec!(300),
            reason: "test".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotRefundable));
    assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refund_is_not_repeatable() {
    let (service, store, gateway) = service();
    store.seed_booking(booking("B204")).await;

    let created = service.create_attempt(attempt("B204")).await.unwrap();
    let payment_id = pay(&service, &created.invoice_id).await;

    service
        .request_refund(RefundRequest {
            payment_id: payment_id.clone(),
            amount: dec!(300),
            reason: "client cancelled".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 1);

    // Already refunded: rejected locally, no second gateway refund.
    let err = service
        .request_refund(RefundRequest {
            payment_id,
            amount: dec!(300),
            reason: "again".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotRefundable));
    assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_payer_fields_fail_before_any_gateway_call() {
    let (service, _store, gateway) = service();

    let mut req = attempt("B205");
    req.customer_email = "not-an-email".to_string();
    let err = service.create_attempt(req).await.unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
    assert_eq!(gateway.open_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn late_pending_signal_never_regresses_a_paid_entry() {
    let (service, store, _gateway) = service();
    store.seed_booking(booking("B206")).await;

    let created = service.create_attempt(attempt("B206")).await.unwrap();
    pay(&service, &created.invoice_id).await;

    // Out-of-order delivery of an earlier status.
    let ack = service
        .apply_webhook(WebhookPayload {
            invoice_id: created.invoice_id.clone(),
            payment_id: "fx-pay-x".to_string(),
            invoice_status: "Pending".to_string(),
            customer_reference: "ref".to_string(),
            invoice_value: dec!(300),
            payment_gateway: None,
            transaction_date: None,
        })
        .await
        .unwrap();
    assert_eq!(ack.status, "noop");

    let entry = store.find_by_invoice_id(&created.invoice_id).await.unwrap().unwrap();
    assert_eq!(entry.status, PaymentStatus::Paid);
}
