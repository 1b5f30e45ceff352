/// quick start - minimal example to get started
use lending_core_rs::{
    GatewayReference, HmacPaymentVerifier, InMemoryLoanStore, InMemoryTransactionStore, InterestType,
    LendingConfig, LendingService, Money, NewLoanRequest, Rate, SafeTimeProvider, TermsRequest, TimeSource,
    TracingNotifier, TransactionRequest, TransactionType, Uuid,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gateway = HmacPaymentVerifier::new("demo_secret")?;
    let service = LendingService::new(
        Arc::new(InMemoryLoanStore::new()),
        Arc::new(InMemoryTransactionStore::new()),
        Arc::new(HmacPaymentVerifier::new("demo_secret")?),
        Arc::new(TracingNotifier),
        LendingConfig::default(),
        Arc::new(SafeTimeProvider::new(TimeSource::Test(Utc::now()))),
    );

    // borrower asks for 10,000 over 30 days
    let user = Uuid::new_v4();
    let loan = service
        .create_loan(user, NewLoanRequest {
            bank_id: Uuid::new_v4(),
            requested_amount: Money::from_major(10_000),
            requested_tenure: 30,
        })
        .await?;
    service.apply(loan.id, user).await?;

    // staff approves at 10% flat and disburses
    service
        .review(loan.id, TermsRequest {
            principal: Money::from_major(10_000),
            tenure_days: 30,
            interest_type: InterestType::Flat,
            interest_rate: Rate::from_percent(dec!(10)),
        })
        .await?;
    let (loan, _) = service.approve(loan.id).await?;

    // make a payment
    let (order_id, payment_id) = ("order_demo_1".to_string(), "pay_demo_1".to_string());
    service
        .make_payment(TransactionRequest {
            loan_id: loan.id,
            user_id: user,
            amount: Money::from_major(500),
            transaction_type: TransactionType::Repayment,
            gateway: GatewayReference {
                signature: gateway.sign(&order_id, &payment_id),
                order_id,
                payment_id,
            },
        })
        .await?;

    // print current state
    println!("{}", service.get_loan(loan.id).await?.to_json_pretty());

    Ok(())
}
