//! Hand-authored substitute dataset served when the store is unreachable.
//! The figures are illustrative, internally consistent with the sample
//! records below, and deliberately small enough to eyeball.

use crate::charts::{DashboardCharts, MonthlyCount, NamedValue, RepaymentTrends, TrendPoint};
use crate::datastore::LoanStore;
use crate::errors::StoreError;
use crate::model::{
    Client, ClientWithLoans, Guarantor, LoanRecord, LoanStatus, LoanWithClient, MediaFile,
    Reference,
};
use crate::stats::DashboardStats;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn sample_clients() -> Vec<Client> {
    vec![
        Client {
            id: "sample_client_1".into(),
            name: "John Doe".into(),
            id_number: "ID123456".into(),
            phone_number1: "+254712345678".into(),
            phone_number2: None,
            business_location: "Downtown Market".into(),
            permit_number: Some("P-12345".into()),
            home_address: Some("123 Main St".into()),
            created_at: at(2025, 1, 15),
            updated_at: at(2025, 1, 15),
        },
        Client {
            id: "sample_client_2".into(),
            name: "Jane Smith".into(),
            id_number: "ID789012".into(),
            phone_number1: "+254798765432".into(),
            phone_number2: Some("+254711223344".into()),
            business_location: "Central Plaza".into(),
            permit_number: Some("P-67890".into()),
            home_address: Some("456 Oak Ave".into()),
            created_at: at(2025, 2, 20),
            updated_at: at(2025, 2, 20),
        },
    ]
}

pub fn sample_loans() -> Vec<LoanRecord> {
    vec![
        LoanRecord {
            id: "sample_loan_1".into(),
            client_id: "sample_client_1".into(),
            loan_amount: 5000.0,
            interest_rate: 10.0,
            registration_fee: 100.0,
            loan_duration: 30,
            application_date: ymd(2025, 1, 20),
            disbursement_date: Some(ymd(2025, 1, 25)),
            first_installment_date: Some(ymd(2025, 2, 1)),
            last_installment_date: Some(ymd(2025, 2, 25)),
            daily_payment_check: true,
            loan_officer: "Michael Johnson".into(),
            status: LoanStatus::Active,
            created_at: at(2025, 1, 20),
            updated_at: at(2025, 1, 25),
        },
        LoanRecord {
            id: "sample_loan_2".into(),
            client_id: "sample_client_2".into(),
            loan_amount: 10000.0,
            interest_rate: 12.0,
            registration_fee: 200.0,
            loan_duration: 60,
            application_date: ymd(2025, 2, 25),
            disbursement_date: Some(ymd(2025, 3, 1)),
            first_installment_date: Some(ymd(2025, 3, 10)),
            last_installment_date: Some(ymd(2025, 5, 10)),
            daily_payment_check: false,
            loan_officer: "Sarah Williams".into(),
            status: LoanStatus::Disbursed,
            created_at: at(2025, 2, 25),
            updated_at: at(2025, 3, 1),
        },
        LoanRecord {
            id: "sample_loan_3".into(),
            client_id: "sample_client_1".into(),
            loan_amount: 3000.0,
            interest_rate: 8.0,
            registration_fee: 50.0,
            loan_duration: 15,
            application_date: ymd(2025, 4, 5),
            disbursement_date: None,
            first_installment_date: None,
            last_installment_date: None,
            daily_payment_check: true,
            loan_officer: "Michael Johnson".into(),
            status: LoanStatus::Pending,
            created_at: at(2025, 4, 5),
            updated_at: at(2025, 4, 5),
        },
    ]
}

pub fn sample_guarantors() -> Vec<Guarantor> {
    vec![
        Guarantor {
            id: "sample_guarantor_1".into(),
            name: "Robert Brown".into(),
            id_number: "ID-G12345".into(),
            phone_number: "+254722334455".into(),
            client_id: "sample_client_1".into(),
            loan_record_id: "sample_loan_1".into(),
        },
        Guarantor {
            id: "sample_guarantor_2".into(),
            name: "Emily Davis".into(),
            id_number: "ID-G67890".into(),
            phone_number: "+254733445566".into(),
            client_id: "sample_client_2".into(),
            loan_record_id: "sample_loan_2".into(),
        },
    ]
}

pub fn sample_references() -> Vec<Reference> {
    vec![
        Reference {
            id: "sample_reference_1".into(),
            name: "Thomas Wilson".into(),
            phone_number: "+254744556677".into(),
            relationship: "Friend".into(),
            client_id: "sample_client_1".into(),
            loan_record_id: "sample_loan_1".into(),
        },
        Reference {
            id: "sample_reference_2".into(),
            name: "Patricia Moore".into(),
            phone_number: "+254755667788".into(),
            relationship: "Colleague".into(),
            client_id: "sample_client_1".into(),
            loan_record_id: "sample_loan_1".into(),
        },
    ]
}

pub fn sample_media_files() -> Vec<MediaFile> {
    vec![MediaFile {
        id: "sample_media_1".into(),
        file_name: "contract_loan1.pdf".into(),
        file_type: "CONTRACT_PDF".into(),
        file_url: "https://example.com/contracts/contract_loan1.pdf".into(),
        description: Some("Signed Contract".into()),
        client_id: "sample_client_1".into(),
        loan_record_id: "sample_loan_1".into(),
    }]
}

/// Load the whole sample dataset into a store. Used for demo runs without a
/// configured database and for tests.
pub async fn seed(store: &dyn LoanStore) -> Result<(), StoreError> {
    for client in sample_clients() {
        store.insert_client(client).await?;
    }
    for loan in sample_loans() {
        store.insert_loan(loan).await?;
    }
    for guarantor in sample_guarantors() {
        store.insert_guarantor(guarantor).await?;
    }
    for reference in sample_references() {
        store.insert_reference(reference).await?;
    }
    for media in sample_media_files() {
        store.insert_media_file(media).await?;
    }
    Ok(())
}

pub fn sample_loans_with_clients() -> Vec<LoanWithClient> {
    let clients = sample_clients();
    sample_loans()
        .into_iter()
        .map(|loan| {
            let client = clients
                .iter()
                .find(|c| c.id == loan.client_id)
                .cloned()
                .unwrap_or_else(|| clients[0].clone());
            LoanWithClient { loan, client }
        })
        .collect()
}

pub fn sample_clients_with_loans() -> Vec<ClientWithLoans> {
    let loans = sample_loans();
    sample_clients()
        .into_iter()
        .map(|client| {
            let loan_records = loans.iter().filter(|l| l.client_id == client.id).cloned().collect();
            ClientWithLoans { client, loan_records }
        })
        .collect()
}

/// Pre-shaped stats payload served on store outage.
pub fn substitute_stats() -> DashboardStats {
    let mut distribution: BTreeMap<LoanStatus, i64> =
        LoanStatus::ALL.iter().map(|s| (*s, 0)).collect();
    distribution.insert(LoanStatus::Pending, 1);
    distribution.insert(LoanStatus::Disbursed, 1);
    distribution.insert(LoanStatus::Active, 1);

    DashboardStats {
        total_loans: 3,
        active_loans: 1,
        loans_ending_soon: 1,
        total_disbursed: 15000.0,
        total_interest_earned: 500.0,
        total_active_interest: 500.0,
        total_expected_return: 16700.0,
        total_active_expected_return: 5500.0,
        upcoming_payments: vec![],
        loan_status_distribution: distribution,
    }
}

/// Pre-shaped chart payload served on store outage. The trend series here is
/// static; it carries the `estimated` marker like the live one.
pub fn substitute_charts() -> DashboardCharts {
    let monthly_loans = crate::charts::MONTH_NAMES
        .iter()
        .map(|name| MonthlyCount {
            name: name.to_string(),
            loans: match *name {
                "Jan" | "Feb" | "Apr" => 1,
                _ => 0,
            },
        })
        .collect();

    DashboardCharts {
        monthly_loans,
        loan_durations: vec![
            NamedValue {
                name: "Short Term (30 days)".to_string(),
                value: 2,
            },
            NamedValue {
                name: "Medium Term (60 days)".to_string(),
                value: 1,
            },
            NamedValue {
                name: "Long Term (90+ days)".to_string(),
                value: 0,
            },
        ],
        repayment_trends: RepaymentTrends {
            estimated: true,
            daily: [
                ("Mon", 16100),
                ("Tue", 17200),
                ("Wed", 15800),
                ("Thu", 16900),
                ("Fri", 16400),
                ("Sat", 15600),
                ("Sun", 17000),
            ]
            .into_iter()
            .map(|(name, amount)| TrendPoint {
                name: name.to_string(),
                amount,
            })
            .collect(),
            weekly: [113000, 118500, 110800, 116200]
                .into_iter()
                .enumerate()
                .map(|(i, amount)| TrendPoint {
                    name: format!("Week {}", i + 1),
                    amount,
                })
                .collect(),
            monthly: [321000, 365000, 407000, 452000, 497000, 549000]
                .into_iter()
                .enumerate()
                .map(|(i, amount)| TrendPoint {
                    name: crate::charts::MONTH_NAMES[i].to_string(),
                    amount,
                })
                .collect(),
        },
        loan_officer_distribution: vec![
            NamedValue {
                name: "Michael Johnson".to_string(),
                value: 2,
            },
            NamedValue {
                name: "Sarah Williams".to_string(),
                value: 1,
            },
        ],
    }
}
