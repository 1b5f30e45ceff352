use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, NotificationKind, TransactionId, TransactionType, UserId};

/// all events the core emits about a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    LoanRequested {
        loan_id: LoanId,
        loan_number: String,
        requested_amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanApplied {
        loan_id: LoanId,
        loan_number: String,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        principal: Money,
        total_amount_payable: Money,
        timestamp: DateTime<Utc>,
    },
    LoanDisbursed {
        loan_id: LoanId,
        transaction_id: TransactionId,
        amount: Money,
        end_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    PaymentReceived {
        loan_id: LoanId,
        transaction_id: TransactionId,
        transaction_type: TransactionType,
        amount: Money,
        remaining_amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanClosed {
        loan_id: LoanId,
        total_paid: Money,
        timestamp: DateTime<Utc>,
    },
    PenaltyApplied {
        loan_id: LoanId,
        amount: Money,
        penalty_total: Money,
        remaining_amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        previous_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            DomainEvent::LoanRequested { loan_id, .. }
            | DomainEvent::LoanApplied { loan_id, .. }
            | DomainEvent::LoanApproved { loan_id, .. }
            | DomainEvent::LoanDisbursed { loan_id, .. }
            | DomainEvent::PaymentReceived { loan_id, .. }
            | DomainEvent::LoanClosed { loan_id, .. }
            | DomainEvent::PenaltyApplied { loan_id, .. }
            | DomainEvent::LoanRejected { loan_id, .. } => *loan_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::LoanRequested { .. } => "loan_requested",
            DomainEvent::LoanApplied { .. } => "loan_applied",
            DomainEvent::LoanApproved { .. } => "loan_approved",
            DomainEvent::LoanDisbursed { .. } => "loan_disbursed",
            DomainEvent::PaymentReceived { .. } => "payment_received",
            DomainEvent::LoanClosed { .. } => "loan_closed",
            DomainEvent::PenaltyApplied { .. } => "penalty_applied",
            DomainEvent::LoanRejected { .. } => "loan_rejected",
        }
    }
}

/// best-effort delivery of domain events
///
/// Implementations must not block and must swallow their own failures:
/// nothing they do can undo a committed balance change.
pub trait EventNotifier: Send + Sync {
    fn emit(&self, user_id: UserId, kind: NotificationKind, event: DomainEvent);
}

/// writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl EventNotifier for TracingNotifier {
    fn emit(&self, user_id: UserId, kind: NotificationKind, event: DomainEvent) {
        info!(
            user = %user_id,
            loan = %event.loan_id(),
            kind = ?kind,
            event = event.name(),
            "domain event"
        );
    }
}

/// a delivered notification
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub event: DomainEvent,
}

/// hands events to a delivery worker over an unbounded channel
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventNotifier for ChannelNotifier {
    fn emit(&self, user_id: UserId, kind: NotificationKind, event: DomainEvent) {
        let name = event.name();
        if self.sender.send(Envelope { user_id, kind, event }).is_err() {
            debug!(event = name, "notification dropped, delivery worker gone");
        }
    }
}

/// keeps events in memory for inspection
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Envelope>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_events(&self) -> Vec<Envelope> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn events(&self) -> Vec<Envelope> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventNotifier for RecordingNotifier {
    fn emit(&self, user_id: UserId, kind: NotificationKind, event: DomainEvent) {
        let envelope = Envelope { user_id, kind, event };
        match self.events.lock() {
            Ok(mut events) => events.push(envelope),
            Err(poisoned) => poisoned.into_inner().push(envelope),
        }
    }
}
