/// lifecycle - a loan from request to closure, with the events it emits
use lending_core_rs::{
    GatewayReference, HmacPaymentVerifier, InMemoryLoanStore, InMemoryTransactionStore, InterestType,
    LendingConfig, LendingService, Loan, Money, NewLoanRequest, Rate, RecordingNotifier, SafeTimeProvider,
    TermsRequest, TimeSource, TransactionRequest, TransactionType, Uuid,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

const SECRET: &str = "lifecycle_demo_secret";

fn signed(gateway: &HmacPaymentVerifier, loan: &Loan, n: u32, amount: Money) -> TransactionRequest {
    let order_id = format!("order_{:04}", n);
    let payment_id = format!("pay_{:04}", n);
    TransactionRequest {
        loan_id: loan.id,
        user_id: loan.user_id,
        amount,
        transaction_type: TransactionType::Repayment,
        gateway: GatewayReference {
            signature: gateway.sign(&order_id, &payment_id),
            order_id,
            payment_id,
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan lifecycle ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    )));
    let controller = time.test_control().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let gateway = HmacPaymentVerifier::new(SECRET)?;

    let service = LendingService::new(
        Arc::new(InMemoryLoanStore::new()),
        Arc::new(InMemoryTransactionStore::new()),
        Arc::new(HmacPaymentVerifier::new(SECRET)?),
        notifier.clone(),
        LendingConfig::default(),
        time.clone(),
    );

    // 1. request and application
    println!("1. request");
    println!("----------");
    let user = Uuid::new_v4();
    let loan = service
        .create_loan(user, NewLoanRequest {
            bank_id: Uuid::new_v4(),
            requested_amount: Money::from_major(25_000),
            requested_tenure: 60,
        })
        .await?;
    println!("  loan number: {}", loan.loan_number);
    println!("  status: {}", loan.status);
    let loan = service.apply(loan.id, user).await?;
    println!("  ✓ submitted, status: {}", loan.status);

    // 2. review: staff trims the amount and sets daily interest
    println!("\n2. review");
    println!("---------");
    let loan = service
        .review(loan.id, TermsRequest {
            principal: Money::from_major(20_000),
            tenure_days: 45,
            interest_type: InterestType::Daily,
            interest_rate: Rate::from_percent(dec!(0.05)),
        })
        .await?;
    let terms = loan.terms.clone().ok_or("approved loan without terms")?;
    println!("  principal: {}", terms.principal_amount);
    println!("  total interest: {}", terms.total_interest);
    println!("  total payable: {}", terms.total_amount_payable);

    // 3. disbursement
    println!("\n3. disbursement");
    println!("---------------");
    let (loan, disbursement) = service.approve(loan.id).await?;
    println!("  ✓ disbursed {} on {}", disbursement.amount, time.now().format("%Y-%m-%d"));
    if let Some(end) = loan.end_date {
        println!("  due: {}", end.format("%Y-%m-%d"));
    }

    // 4. repayments
    println!("\n4. repayments");
    println!("-------------");
    for (n, amount) in [(1, 8_000), (2, 7_000)] {
        controller.advance(Duration::days(14));
        let outcome = service
            .make_payment(signed(&gateway, &loan, n, Money::from_major(amount)))
            .await?;
        println!(
            "  {}: paid {}, remaining {}",
            time.now().format("%Y-%m-%d"),
            outcome.transaction.amount,
            outcome.loan.remaining_amount
        );
    }

    controller.advance(Duration::days(10));
    let current = service.get_loan(loan.id).await?;
    let outcome = service
        .make_payment(signed(&gateway, &current, 3, current.remaining_amount))
        .await?;
    println!("  {}: final payment {}", time.now().format("%Y-%m-%d"), outcome.transaction.amount);
    println!("  status: {}", outcome.loan.status);

    // 5. what the borrower was told
    println!("\n5. events");
    println!("---------");
    for envelope in notifier.take_events() {
        println!("  [{:?}] {}", envelope.kind, envelope.event.name());
    }

    println!("\n6. ledger");
    println!("---------");
    for tx in service.transactions_for_loan(loan.id).await? {
        println!("  {:?} {} at {}", tx.transaction_type, tx.amount, tx.created_at.format("%Y-%m-%d"));
    }

    Ok(())
}
