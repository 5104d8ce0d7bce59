use chrono::Utc;
use fake::Fake;
use fake::faker::address::en::CityName;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use mkopo_common::time::days_from;
use mkopo_runtime::datastore::LoanStore;
use mkopo_runtime::errors::StoreError;
use mkopo_runtime::model::{Client, Guarantor, LoanRecord, LoanStatus, Reference};
use rand::Rng;

const OFFICERS: [&str; 4] = ["Michael Johnson", "Sarah Williams", "David Kimani", "Grace Wanjiru"];
const STATUSES: [LoanStatus; 7] = LoanStatus::ALL;
const DURATIONS: [i64; 5] = [15, 30, 45, 60, 90];
const RELATIONSHIPS: [&str; 4] = ["Spouse", "Sibling", "Friend", "Business Partner"];

/// Populate the store with `count` generated clients, each carrying one to
/// three loans in assorted lifecycle stages. Disbursed loans get a coherent
/// date chain: disbursement shortly after application, installments spanning
/// the duration.
pub async fn seed_demo(store: &dyn LoanStore, count: usize) -> Result<usize, StoreError> {
    let mut rng = rand::rng();
    let now = Utc::now();
    let today = now.date_naive();
    let mut loans_created = 0;

    for i in 0..count {
        let name: String = Name().fake_with_rng(&mut rng);
        let client = Client {
            id: String::new(),
            name: name.clone(),
            id_number: format!("ID{:06}", 100_000 + i),
            phone_number1: PhoneNumber().fake_with_rng(&mut rng),
            phone_number2: None,
            business_location: CityName().fake_with_rng(&mut rng),
            permit_number: None,
            home_address: None,
            created_at: now,
            updated_at: now,
        };
        let client_id = store.insert_client(client).await?;

        for _ in 0..rng.random_range(1..=3) {
            let status = STATUSES[rng.random_range(0..STATUSES.len())];
            let duration = DURATIONS[rng.random_range(0..DURATIONS.len())];
            let amount = rng.random_range(1..=40) as f64 * 1000.0;
            let applied = today
                .checked_sub_days(chrono::Days::new(rng.random_range(0..180)))
                .unwrap_or(today);

            let mut loan = LoanRecord {
                id: String::new(),
                client_id: client_id.clone(),
                loan_amount: amount,
                interest_rate: rng.random_range(5..=20) as f64,
                registration_fee: 200.0,
                loan_duration: duration,
                application_date: applied,
                disbursement_date: None,
                first_installment_date: None,
                last_installment_date: None,
                daily_payment_check: rng.random_bool(0.5),
                loan_officer: OFFICERS[rng.random_range(0..OFFICERS.len())].to_string(),
                status,
                created_at: now,
                updated_at: now,
            };
            if status.is_disbursed() {
                let disbursed = days_from(applied, rng.random_range(1..=5));
                loan.disbursement_date = Some(disbursed);
                loan.first_installment_date = Some(days_from(disbursed, 1));
                loan.last_installment_date = Some(days_from(disbursed, duration as u64));
            }
            let loan_id = store.insert_loan(loan).await?;
            loans_created += 1;

            if rng.random_bool(0.6) {
                store
                    .insert_guarantor(Guarantor {
                        id: String::new(),
                        name: Name().fake_with_rng(&mut rng),
                        id_number: format!("GD{:06}", rng.random_range(100_000..1_000_000)),
                        phone_number: PhoneNumber().fake_with_rng(&mut rng),
                        client_id: client_id.clone(),
                        loan_record_id: loan_id.clone(),
                    })
                    .await?;
            }
            if rng.random_bool(0.6) {
                store
                    .insert_reference(Reference {
                        id: String::new(),
                        name: Name().fake_with_rng(&mut rng),
                        phone_number: PhoneNumber().fake_with_rng(&mut rng),
                        relationship: RELATIONSHIPS[rng.random_range(0..RELATIONSHIPS.len())]
                            .to_string(),
                        client_id: client_id.clone(),
                        loan_record_id: loan_id.clone(),
                    })
                    .await?;
            }
        }
    }

    Ok(loans_created)
}
