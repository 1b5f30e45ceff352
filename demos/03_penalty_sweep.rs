/// penalty sweep - late fees on matured loans, run by the background sweeper
use lending_core_rs::{
    telemetry, HmacPaymentVerifier, InMemoryLoanStore, InMemoryTransactionStore, InterestType, LendingConfig,
    LendingService, Money, NewLoanRequest, PenaltyEngine, PenaltySweeper, Rate, RecordingNotifier,
    SafeTimeProvider, TermsRequest, TimeSource, Uuid,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing("info");
    println!("=== penalty sweep ===\n");

    let config = LendingConfig::from_env()?;
    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap(),
    )));
    let controller = time.test_control().unwrap();
    let loans = Arc::new(InMemoryLoanStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let service = LendingService::new(
        loans.clone(),
        Arc::new(InMemoryTransactionStore::new()),
        Arc::new(HmacPaymentVerifier::new("sweep_demo")?),
        notifier.clone(),
        config.clone(),
        time.clone(),
    );

    // three loans with different tenures
    let mut ids = Vec::new();
    for tenure in [10, 20, 60] {
        let user = Uuid::new_v4();
        let loan = service
            .create_loan(user, NewLoanRequest {
                bank_id: Uuid::new_v4(),
                requested_amount: Money::from_major(10_000),
                requested_tenure: tenure,
            })
            .await?;
        service.apply(loan.id, user).await?;
        service
            .review(loan.id, TermsRequest {
                principal: Money::from_major(10_000),
                tenure_days: tenure,
                interest_type: InterestType::Flat,
                interest_rate: Rate::from_percent(dec!(10)),
            })
            .await?;
        service.approve(loan.id).await?;
        ids.push((tenure, loan.id));
    }

    let sweeper = Arc::new(PenaltySweeper::new(
        loans.clone(),
        notifier.clone(),
        PenaltyEngine::new(config.penalty_config()),
        config.retry,
        time.clone(),
    ));

    // one manual sweep per simulated day
    println!("late fee: {}% of principal per sweep\n", config.late_fee_percent);
    for _ in 0..25 {
        controller.advance(Duration::days(1));
        let summary = sweeper.run_once().await?;
        if summary.penalized > 0 {
            println!(
                "  {}: penalized {} of {} overdue",
                time.now().format("%Y-%m-%d"),
                summary.penalized,
                summary.examined
            );
        }
    }

    println!();
    for (tenure, id) in &ids {
        let loan = service.get_loan(*id).await?;
        println!(
            "  {}-day loan: status {}, penalty {}, remaining {}",
            tenure, loan.status, loan.penalty_amount, loan.remaining_amount
        );
    }

    // the same sweeper on a timer, stopped through the shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = sweeper.clone().spawn(std::time::Duration::from_millis(50), shutdown_rx);
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    shutdown_tx.send(true)?;
    handle.await?;

    let penalties = notifier
        .events()
        .iter()
        .filter(|e| e.event.name() == "penalty_applied")
        .count();
    println!("\n{} penalty notifications sent", penalties);

    Ok(())
}
