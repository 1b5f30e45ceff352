pub mod calendar;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod lifecycle;
pub mod loan;
pub mod payments;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod transaction;
pub mod types;

// re-export key types
pub use config::LendingConfig;
pub use decimal::{Money, Rate};
pub use errors::{LendingError, Result};
pub use events::{ChannelNotifier, DomainEvent, Envelope, EventNotifier, RecordingNotifier, TracingNotifier};
pub use interest::{
    compute_preclose_amount, compute_terms, PenaltyAccrual, PenaltyConfig, PenaltyEngine, PrecloseQuote,
    TermsCalculation, TermsRequest,
};
pub use loan::{ApprovedTerms, Loan, LoanFields};
pub use payments::{HmacPaymentVerifier, PaymentOutcome, PaymentReconciler, PaymentVerifier};
pub use retry::RetryPolicy;
pub use scheduler::{PenaltySweeper, SweepSummary};
pub use service::{LendingService, NewLoanRequest};
pub use store::{InMemoryLoanStore, InMemoryTransactionStore, LoanStore, TransactionStore};
pub use transaction::{GatewayReference, Transaction, TransactionRequest};
pub use types::{BankId, InterestType, LoanId, LoanStatus, NotificationKind, TransactionId, TransactionType, UserId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
