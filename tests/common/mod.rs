#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use lending_core_rs::{
    GatewayReference, HmacPaymentVerifier, InMemoryLoanStore, InMemoryTransactionStore, InterestType,
    LendingConfig, LendingService, Loan, Money, NewLoanRequest, PenaltyEngine, PenaltySweeper, Rate,
    RecordingNotifier, RetryPolicy, SafeTimeProvider, TermsRequest, TimeSource, TransactionRequest,
    TransactionType, Uuid,
};
use rust_decimal::Decimal;
use std::sync::Arc;

pub const GATEWAY_SECRET: &str = "integration_gateway_secret";

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

pub struct Harness {
    pub service: Arc<LendingService>,
    pub loans: Arc<InMemoryLoanStore>,
    pub transactions: Arc<InMemoryTransactionStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: HmacPaymentVerifier,
    pub time: Arc<SafeTimeProvider>,
    pub config: LendingConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LendingConfig {
            retry: RetryPolicy::immediate(3),
            ..LendingConfig::default()
        })
    }

    pub fn with_config(config: LendingConfig) -> Self {
        let loans = Arc::new(InMemoryLoanStore::new());
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(start())));
        let verifier = Arc::new(HmacPaymentVerifier::new(GATEWAY_SECRET).unwrap());

        let service = Arc::new(LendingService::new(
            loans.clone(),
            transactions.clone(),
            verifier,
            notifier.clone(),
            config.clone(),
            time.clone(),
        ));

        Self {
            service,
            loans,
            transactions,
            notifier,
            gateway: HmacPaymentVerifier::new(GATEWAY_SECRET).unwrap(),
            time,
            config,
        }
    }

    pub fn sweeper(&self) -> PenaltySweeper {
        PenaltySweeper::new(
            self.loans.clone(),
            self.notifier.clone(),
            PenaltyEngine::new(self.config.penalty_config()),
            self.config.retry,
            self.time.clone(),
        )
    }

    pub fn advance_days(&self, days: i64) {
        self.time.test_control().unwrap().advance(chrono::Duration::days(days));
    }

    /// requested -> applied -> approved -> active
    pub async fn active_loan(&self, terms: TermsRequest) -> Loan {
        let user = Uuid::new_v4();
        let loan = self
            .service
            .create_loan(
                user,
                NewLoanRequest {
                    bank_id: Uuid::new_v4(),
                    requested_amount: terms.principal,
                    requested_tenure: terms.tenure_days,
                },
            )
            .await
            .unwrap();
        self.service.apply(loan.id, user).await.unwrap();
        self.service.review(loan.id, terms).await.unwrap();
        let (loan, _) = self.service.approve(loan.id).await.unwrap();
        loan
    }

    /// gateway-signed payment request
    pub fn payment(&self, loan: &Loan, amount: Money, transaction_type: TransactionType) -> TransactionRequest {
        let order_id = format!("order_{}", &Uuid::new_v4().simple().to_string()[..12]);
        let payment_id = format!("pay_{}", &Uuid::new_v4().simple().to_string()[..12]);
        TransactionRequest {
            loan_id: loan.id,
            user_id: loan.user_id,
            amount,
            transaction_type,
            gateway: GatewayReference {
                signature: self.gateway.sign(&order_id, &payment_id),
                order_id,
                payment_id,
            },
        }
    }
}

pub fn terms(principal: i64, tenure_days: u32, interest_type: InterestType, rate: Decimal) -> TermsRequest {
    TermsRequest {
        principal: Money::from_major(principal),
        tenure_days,
        interest_type,
        interest_rate: Rate::from_percent(rate),
    }
}
