use crate::datastore::{LoanFilter, LoanStore};
use crate::errors::StoreError;
use crate::fallback::{DEFAULT_TIMEOUT, Fetched, with_fallback};
use crate::model::{LoanRecord, LoanStatus, LoanWithClient};
use crate::substitute;
use chrono::NaiveDate;
use mkopo_common::time::days_from;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Statuses that count as disbursed capital.
pub const DISBURSED_STATUSES: [LoanStatus; 3] =
    [LoanStatus::Active, LoanStatus::Completed, LoanStatus::Disbursed];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingPayment {
    pub id: String,
    pub client_name: String,
    pub client_id: String,
    pub phone_number: String,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_loans: i64,
    pub active_loans: i64,
    pub loans_ending_soon: i64,
    pub total_disbursed: f64,
    pub total_interest_earned: f64,
    pub total_active_interest: f64,
    pub total_expected_return: f64,
    pub total_active_expected_return: f64,
    pub upcoming_payments: Vec<UpcomingPayment>,
    pub loan_status_distribution: BTreeMap<LoanStatus, i64>,
}

/// Monetary accumulators over the disbursed slice of the book.
///
/// Policy: interest on ACTIVE loans is recognized at disbursement, not at
/// collection, so it counts into `interest_earned` alongside the interest of
/// COMPLETED loans. DISBURSED rows contribute principal and expected return
/// only.
#[derive(Debug, Default, PartialEq)]
pub struct MoneyTotals {
    pub disbursed: f64,
    pub interest_earned: f64,
    pub active_interest: f64,
    pub expected_return: f64,
    pub active_expected_return: f64,
}

impl MoneyTotals {
    pub fn fold(loans: &[LoanRecord]) -> Self {
        let mut totals = Self::default();
        for loan in loans.iter().filter(|l| l.status.is_disbursed()) {
            let interest = loan.interest_amount();
            let expected = loan.expected_return();

            totals.disbursed += loan.loan_amount;
            totals.expected_return += expected;

            match loan.status {
                LoanStatus::Completed => totals.interest_earned += interest,
                LoanStatus::Active => {
                    totals.active_interest += interest;
                    totals.active_expected_return += expected;
                    totals.interest_earned += interest;
                }
                _ => {}
            }
        }
        totals
    }
}

/// Count per status; every canonical status gets an entry, zero or not.
pub fn status_distribution(loans: &[LoanRecord]) -> BTreeMap<LoanStatus, i64> {
    let mut distribution: BTreeMap<LoanStatus, i64> =
        LoanStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for loan in loans {
        *distribution.entry(loan.status).or_insert(0) += 1;
    }
    distribution
}

/// The 5 soonest upcoming installments, ascending by due date. Input rows
/// are expected to already be ACTIVE with a first installment date set.
pub fn upcoming_payments(rows: Vec<LoanWithClient>) -> Vec<UpcomingPayment> {
    let mut dated: Vec<(NaiveDate, LoanWithClient)> = rows
        .into_iter()
        .filter_map(|r| r.loan.first_installment_date.map(|d| (d, r)))
        .collect();
    dated.sort_by_key(|(due, _)| *due);

    dated
        .into_iter()
        .take(5)
        .map(|(due, row)| UpcomingPayment {
            id: row.loan.id.clone(),
            client_name: row.client.name,
            client_id: row.client.id_number,
            phone_number: row.client.phone_number1,
            due_date: due,
            amount: row.loan.installment_amount(),
            currency: "KES".to_string(),
        })
        .collect()
}

pub struct StatsEngine {
    store: Arc<dyn LoanStore>,
    timeout: Duration,
}

impl StatsEngine {
    pub fn new(store: Arc<dyn LoanStore>) -> Self {
        Self::with_timeout(store, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn LoanStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Dashboard statistics for the whole book as of `today`. Recomputed on
    /// every call; degrades to the substitute payload as one unit when the
    /// store fails or the timer wins.
    pub async fn dashboard_stats(&self, today: NaiveDate) -> Fetched<DashboardStats> {
        with_fallback(
            "dashboard stats",
            self.timeout,
            self.compute(today),
            substitute::substitute_stats(),
        )
        .await
    }

    async fn compute(&self, today: NaiveDate) -> Result<DashboardStats, StoreError> {
        let ending_soon_filter = LoanFilter::with_status(LoanStatus::Active)
            .last_installment_between(today, days_from(today, 30));
        let upcoming_filter = LoanFilter::with_status(LoanStatus::Active)
            .first_installment_between(today, days_from(today, 7));
        let all_filter = LoanFilter::default();
        let active_filter = LoanFilter::with_status(LoanStatus::Active);
        let disbursed_filter = LoanFilter::with_statuses(&DISBURSED_STATUSES);

        // Independent sub-queries fan out; results merge only after all
        // complete.
        let (all_loans, active_loans, loans_ending_soon, disbursed_loans, upcoming_rows) =
            tokio::try_join!(
                self.store.list_loans(&all_filter),
                self.store.count_loans(&active_filter),
                self.store.count_loans(&ending_soon_filter),
                self.store.list_loans(&disbursed_filter),
                self.store.list_loans_with_clients(&upcoming_filter),
            )?;

        let totals = MoneyTotals::fold(&disbursed_loans);

        Ok(DashboardStats {
            total_loans: all_loans.len() as i64,
            active_loans,
            loans_ending_soon,
            total_disbursed: totals.disbursed,
            total_interest_earned: totals.interest_earned,
            total_active_interest: totals.active_interest,
            total_expected_return: totals.expected_return,
            total_active_expected_return: totals.active_expected_return,
            upcoming_payments: upcoming_payments(upcoming_rows),
            loan_status_distribution: status_distribution(&all_loans),
        })
    }
}
