use crate::domain::payment::{BookingStatus, LedgerEntry, PaymentStatus};
use rust_decimal::Decimal;

/// A status-change trigger against one ledger entry. The three entry points
/// (client poll, gateway webhook, admin refund) all reduce to one of these.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    /// Result of a client-initiated status poll.
    Confirmed {
        payment_id: String,
        raw_status: String,
        is_paid: bool,
        payment_method: Option<String>,
    },
    /// Gateway-pushed webhook carrying the gateway's own status string.
    Webhook {
        payment_id: String,
        raw_status: String,
        payment_method: Option<String>,
    },
    /// A refund the gateway has already accepted.
    RefundCompleted { amount: Decimal, reason: String },
}

/// The ledger-entry mutation plus the paired booking patch. Both writes must
/// be applied as one atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: PaymentStatus,
    pub payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub booking_status: Option<BookingStatus>,
    pub booking_payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Apply(StatusChange),
    Noop,
}

/// Maps the gateway's status strings onto ledger statuses. Anything the
/// gateway sends that is not one of the three known strings leaves the entry
/// pending.
pub fn map_gateway_status(raw: &str) -> Option<PaymentStatus> {
    match raw {
        "Paid" => Some(PaymentStatus::Paid),
        "Failed" => Some(PaymentStatus::Failed),
        "Expired" => Some(PaymentStatus::Expired),
        _ => None,
    }
}

/// Pure transition function shared by all three trigger paths.
///
/// Transitions only move forward: pending may become paid, failed or expired;
/// paid may only become refunded. Re-applying the current target status, or a
/// late-arriving signal for an earlier state, is a no-op rather than an
/// error, which makes racing poll/webhook deliveries safe to apply in any
/// order.
pub fn apply_transition(entry: &LedgerEntry, event: &PaymentEvent) -> Transition {
    let target = match event {
        PaymentEvent::Confirmed { raw_status, is_paid, .. } => {
            if *is_paid {
                Some(PaymentStatus::Paid)
            } else {
                map_gateway_status(raw_status)
            }
        }
        PaymentEvent::Webhook { raw_status, .. } => map_gateway_status(raw_status),
        PaymentEvent::RefundCompleted { .. } => Some(PaymentStatus::Refunded),
    };

    let Some(target) = target else {
        return Transition::Noop;
    };

    let allowed = matches!(
        (entry.status, target),
        (PaymentStatus::Pending, PaymentStatus::Paid)
            | (PaymentStatus::Pending, PaymentStatus::Failed)
            | (PaymentStatus::Pending, PaymentStatus::Expired)
            | (PaymentStatus::Paid, PaymentStatus::Refunded)
    );
    if !allowed {
        return Transition::Noop;
    }

    let (payment_id, payment_method) = match event {
        PaymentEvent::Confirmed { payment_id, payment_method, .. }
        | PaymentEvent::Webhook { payment_id, payment_method, .. } => {
            (Some(payment_id.clone()), payment_method.clone())
        }
        PaymentEvent::RefundCompleted { .. } => (None, None),
    };

    let (refund_amount, refund_reason) = match event {
        PaymentEvent::RefundCompleted { amount, reason } => {
            (Some(*amount), Some(reason.clone()))
        }
        _ => (None, None),
    };

    let booking_status = match target {
        PaymentStatus::Paid => Some(BookingStatus::Confirmed),
        PaymentStatus::Failed => Some(BookingStatus::PaymentFailed),
        PaymentStatus::Expired => Some(BookingStatus::PaymentExpired),
        PaymentStatus::Refunded => Some(BookingStatus::Cancelled),
        PaymentStatus::Pending => None,
    };

    Transition::Apply(StatusChange {
        status: target,
        payment_id,
        payment_method,
        refund_amount,
        refund_reason,
        booking_status,
        booking_payment_status: target,
    })
}
