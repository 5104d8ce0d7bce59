use chrono::{NaiveDate, TimeZone, Utc};
use mkopo_runtime::datastore::{LoanStore, MemoryLoanStore};
use mkopo_runtime::model::{Client, LoanRecord, LoanStatus};
use mkopo_runtime::stats::StatsEngine;
use std::sync::Arc;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn client(id: &str, id_number: &str, name: &str) -> Client {
    Client {
        id: id.into(),
        name: name.into(),
        id_number: id_number.into(),
        phone_number1: "+254700000001".into(),
        phone_number2: None,
        business_location: "Market Row".into(),
        permit_number: None,
        home_address: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn loan(id: &str, amount: f64, rate: f64, status: LoanStatus) -> LoanRecord {
    LoanRecord {
        id: id.into(),
        client_id: "c1".into(),
        loan_amount: amount,
        interest_rate: rate,
        registration_fee: 0.0,
        loan_duration: 30,
        application_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        disbursement_date: None,
        first_installment_date: None,
        last_installment_date: None,
        daily_payment_check: false,
        loan_officer: "Michael Johnson".into(),
        status,
        created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn monetary_totals_follow_the_accrual_policy() {
    let store = MemoryLoanStore::new();
    store.insert_client(client("c1", "ID000001", "Amos Otieno")).await.unwrap();
    store.insert_loan(loan("l1", 1000.0, 10.0, LoanStatus::Pending)).await.unwrap();
    store.insert_loan(loan("l2", 5000.0, 10.0, LoanStatus::Active)).await.unwrap();
    store.insert_loan(loan("l3", 2000.0, 5.0, LoanStatus::Completed)).await.unwrap();

    let engine = StatsEngine::new(Arc::new(store));
    let fetched = engine.dashboard_stats(today()).await;
    assert!(fetched.is_live());
    let stats = fetched.value;

    assert_eq!(stats.total_loans, 3);
    assert_eq!(stats.active_loans, 1);
    // PENDING contributes nothing to the money columns.
    assert_eq!(stats.total_disbursed, 7000.0);
    // ACTIVE interest accrues at disbursement: 500 + 100 completed.
    assert_eq!(stats.total_interest_earned, 600.0);
    assert_eq!(stats.total_active_interest, 500.0);
    assert_eq!(stats.total_expected_return, 7600.0);
    assert_eq!(stats.total_active_expected_return, 5500.0);
    assert_eq!(stats.loan_status_distribution[&LoanStatus::Pending], 1);
    assert_eq!(stats.loan_status_distribution[&LoanStatus::Active], 1);
    assert_eq!(stats.loan_status_distribution[&LoanStatus::Completed], 1);
    // Canonical statuses are always present, zero or not.
    assert_eq!(stats.loan_status_distribution.len(), 7);
    assert_eq!(stats.loan_status_distribution[&LoanStatus::Rejected], 0);
}

#[tokio::test]
async fn empty_book_yields_all_zeroes() {
    let engine = StatsEngine::new(Arc::new(MemoryLoanStore::new()));
    let stats = engine.dashboard_stats(today()).await.value;

    assert_eq!(stats.total_loans, 0);
    assert_eq!(stats.active_loans, 0);
    assert_eq!(stats.loans_ending_soon, 0);
    assert_eq!(stats.total_disbursed, 0.0);
    assert!(stats.upcoming_payments.is_empty());
    assert!(stats.loan_status_distribution.values().all(|&v| v == 0));
}

#[tokio::test]
async fn ending_soon_counts_only_the_next_30_days() {
    let store = MemoryLoanStore::new();
    store.insert_client(client("c1", "ID000001", "Amos Otieno")).await.unwrap();

    let mut inside = loan("l1", 1000.0, 10.0, LoanStatus::Active);
    inside.last_installment_date = NaiveDate::from_ymd_opt(2025, 7, 10);
    let mut boundary = loan("l2", 1000.0, 10.0, LoanStatus::Active);
    boundary.last_installment_date = NaiveDate::from_ymd_opt(2025, 7, 15);
    let mut outside = loan("l3", 1000.0, 10.0, LoanStatus::Active);
    outside.last_installment_date = NaiveDate::from_ymd_opt(2025, 7, 16);
    let mut past = loan("l4", 1000.0, 10.0, LoanStatus::Active);
    past.last_installment_date = NaiveDate::from_ymd_opt(2025, 6, 14);

    for l in [inside, boundary, outside, past] {
        store.insert_loan(l).await.unwrap();
    }

    let engine = StatsEngine::new(Arc::new(store));
    let stats = engine.dashboard_stats(today()).await.value;
    // Inclusive window [today, today + 30].
    assert_eq!(stats.loans_ending_soon, 2);
}

#[tokio::test]
async fn upcoming_payments_are_the_five_soonest() {
    let store = MemoryLoanStore::new();
    store.insert_client(client("c1", "ID000001", "Amos Otieno")).await.unwrap();

    for day in [21, 17, 19, 16, 20, 18] {
        let mut l = loan(&format!("l{}", day), 3000.0, 10.0, LoanStatus::Active);
        l.first_installment_date = NaiveDate::from_ymd_opt(2025, 6, day);
        store.insert_loan(l).await.unwrap();
    }

    let engine = StatsEngine::new(Arc::new(store));
    let stats = engine.dashboard_stats(today()).await.value;

    assert_eq!(stats.upcoming_payments.len(), 5);
    let due: Vec<_> = stats.upcoming_payments.iter().map(|p| p.due_date).collect();
    let expected: Vec<_> = [16, 17, 18, 19, 20]
        .iter()
        .map(|d| NaiveDate::from_ymd_opt(2025, 6, *d).unwrap())
        .collect();
    assert_eq!(due, expected);
    let first = &stats.upcoming_payments[0];
    assert_eq!(first.client_name, "Amos Otieno");
    assert_eq!(first.client_id, "ID000001");
    assert_eq!(first.currency, "KES");
    // 3300 / 30 per day.
    assert_eq!(first.amount, 110.0);
}
