/// preclose - settle a daily-interest loan early
use lending_core_rs::{
    GatewayReference, HmacPaymentVerifier, InMemoryLoanStore, InMemoryTransactionStore, InterestType,
    LendingConfig, LendingError, LendingService, Money, NewLoanRequest, Rate, SafeTimeProvider, TermsRequest,
    TimeSource, TracingNotifier, TransactionRequest, TransactionType, Uuid,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== pre-closure ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    )));
    let controller = time.test_control().unwrap();
    let gateway = HmacPaymentVerifier::new("preclose_demo")?;

    let service = LendingService::new(
        Arc::new(InMemoryLoanStore::new()),
        Arc::new(InMemoryTransactionStore::new()),
        Arc::new(HmacPaymentVerifier::new("preclose_demo")?),
        Arc::new(TracingNotifier),
        LendingConfig::default(),
        time.clone(),
    );

    let user = Uuid::new_v4();
    let loan = service
        .create_loan(user, NewLoanRequest {
            bank_id: Uuid::new_v4(),
            requested_amount: Money::from_major(10_000),
            requested_tenure: 30,
        })
        .await?;
    service.apply(loan.id, user).await?;
    service
        .review(loan.id, TermsRequest {
            principal: Money::from_major(10_000),
            tenure_days: 30,
            interest_type: InterestType::Daily,
            interest_rate: Rate::from_percent(dec!(1)),
        })
        .await?;
    let (loan, _) = service.approve(loan.id).await?;
    println!("full-term payable: {}", loan.total_amount_payable());

    // watch the payoff grow day by day
    for _ in 0..4 {
        controller.advance(Duration::days(5));
        let quote = service.preclose_quote(loan.id).await?;
        println!(
            "  day {:>2}: interest {} + charge {} -> payoff {}",
            quote.days_elapsed, quote.interest_accrued, quote.preclose_charge, quote.payoff
        );
    }

    let quote = service.preclose_quote(loan.id).await?;
    let pay = |amount: Money, n: u32| {
        let order_id = format!("order_pc_{}", n);
        let payment_id = format!("pay_pc_{}", n);
        TransactionRequest {
            loan_id: loan.id,
            user_id: user,
            amount,
            transaction_type: TransactionType::PrecloseRepayment,
            gateway: GatewayReference {
                signature: gateway.sign(&order_id, &payment_id),
                order_id,
                payment_id,
            },
        }
    };

    // pre-closure is all or nothing
    match service.make_payment(pay(quote.payoff - Money::from_major(1), 1)).await {
        Err(LendingError::AmountMismatch { expected, provided }) => {
            println!("\nrejected partial payoff: expected {}, provided {}", expected, provided);
        }
        other => println!("\nunexpected: {:?}", other),
    }

    let outcome = service.make_payment(pay(quote.payoff, 2)).await?;
    println!("\n✓ settled with {}", outcome.transaction.amount);
    println!("  status: {}", outcome.loan.status);
    println!("  paid: {}", outcome.loan.paid_amount);
    println!("  interest waived: {}", outcome.loan.waived_amount);

    Ok(())
}
