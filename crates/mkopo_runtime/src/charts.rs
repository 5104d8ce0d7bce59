use crate::datastore::{LoanFilter, LoanStore};
use crate::errors::StoreError;
use crate::fallback::{DEFAULT_TIMEOUT, Fetched, with_fallback};
use crate::model::{LoanRecord, LoanStatus};
use crate::substitute;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub name: String,
    pub loans: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub name: String,
    pub amount: i64,
}

/// Synthesized repayment series. There is no payments ledger to derive real
/// trends from, so the amounts are estimates off the active book with
/// bounded jitter; `estimated` is always true so consumers can label it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentTrends {
    pub estimated: bool,
    pub daily: Vec<TrendPoint>,
    pub weekly: Vec<TrendPoint>,
    pub monthly: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub monthly_loans: Vec<MonthlyCount>,
    pub loan_durations: Vec<NamedValue>,
    pub repayment_trends: RepaymentTrends,
    pub loan_officer_distribution: Vec<NamedValue>,
}

/// 12 Jan-Dec buckets of application counts. Callers pass the current-year
/// slice; bucketing is purely by the month component.
pub fn monthly_loans(loans: &[LoanRecord]) -> Vec<MonthlyCount> {
    let mut buckets: Vec<MonthlyCount> = MONTH_NAMES
        .iter()
        .map(|name| MonthlyCount {
            name: name.to_string(),
            loans: 0,
        })
        .collect();
    for loan in loans {
        buckets[loan.application_date.month0() as usize].loans += 1;
    }
    buckets
}

/// Histogram over loan duration. Boundaries: 30 is short, 31-60 medium,
/// 61 and up long; the three buckets partition the record set.
pub fn duration_buckets(loans: &[LoanRecord]) -> Vec<NamedValue> {
    let mut short = 0;
    let mut medium = 0;
    let mut long = 0;
    for loan in loans {
        if loan.loan_duration <= 30 {
            short += 1;
        } else if loan.loan_duration <= 60 {
            medium += 1;
        } else {
            long += 1;
        }
    }
    vec![
        NamedValue {
            name: "Short Term (30 days)".to_string(),
            value: short,
        },
        NamedValue {
            name: "Medium Term (60 days)".to_string(),
            value: medium,
        },
        NamedValue {
            name: "Long Term (90+ days)".to_string(),
            value: long,
        },
    ]
}

/// Loan counts grouped by the raw `loanOfficer` string. No normalization:
/// differently cased or spelled entries stay distinct. Sorted by name for
/// stable output.
pub fn officer_distribution(loans: &[LoanRecord]) -> Vec<NamedValue> {
    let mut groups: BTreeMap<&str, i64> = BTreeMap::new();
    for loan in loans {
        *groups.entry(loan.loan_officer.as_str()).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|(name, value)| NamedValue {
            name: name.to_string(),
            value,
        })
        .collect()
}

/// Estimated repayment series off the active book, in whole KES.
///
/// Daily: `Σ principal/duration` per day with jitter in [0.8, 1.2].
/// Weekly: the daily total with jitter in [0.9, 1.1].
/// Monthly: the weekly total with the same jitter band times a linear trend
/// factor rising from 0.7 to 1.2 across the six months.
pub fn repayment_trends(active_loans: &[LoanRecord], rng: &mut impl Rng) -> RepaymentTrends {
    let mut daily = Vec::with_capacity(DAY_NAMES.len());
    for name in DAY_NAMES {
        let mut amount = 0.0;
        for loan in active_loans {
            if loan.loan_duration <= 0 {
                continue;
            }
            let per_day = loan.loan_amount / loan.loan_duration as f64;
            amount += per_day * rng.random_range(0.8..=1.2);
        }
        daily.push(TrendPoint {
            name: name.to_string(),
            amount: (amount * 100.0).round() as i64,
        });
    }

    let daily_total: i64 = daily.iter().map(|p| p.amount).sum();
    let mut weekly = Vec::with_capacity(4);
    for week in 1..=4 {
        weekly.push(TrendPoint {
            name: format!("Week {}", week),
            amount: (daily_total as f64 * rng.random_range(0.9..=1.1)).round() as i64,
        });
    }

    let weekly_total: i64 = weekly.iter().map(|p| p.amount).sum();
    let mut monthly = Vec::with_capacity(6);
    for (i, name) in MONTH_NAMES.iter().take(6).enumerate() {
        let trend = 0.7 + 0.5 * i as f64 / 5.0;
        monthly.push(TrendPoint {
            name: name.to_string(),
            amount: (weekly_total as f64 * rng.random_range(0.9..=1.1) * trend).round() as i64,
        });
    }

    RepaymentTrends {
        estimated: true,
        daily,
        weekly,
        monthly,
    }
}

pub struct ChartEngine {
    store: Arc<dyn LoanStore>,
    timeout: Duration,
}

impl ChartEngine {
    pub fn new(store: Arc<dyn LoanStore>) -> Self {
        Self::with_timeout(store, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn LoanStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Chart payload for the dashboard. A fixed `seed` makes the estimated
    /// trend series reproducible; unseeded calls draw from OS entropy.
    /// All-real or all-substitute, same as the stats endpoint.
    pub async fn dashboard_charts(
        &self,
        today: NaiveDate,
        seed: Option<u64>,
    ) -> Fetched<DashboardCharts> {
        with_fallback(
            "dashboard charts",
            self.timeout,
            self.compute(today, seed),
            substitute::substitute_charts(),
        )
        .await
    }

    async fn compute(
        &self,
        today: NaiveDate,
        seed: Option<u64>,
    ) -> Result<DashboardCharts, StoreError> {
        let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        let year_end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
        let year_filter = LoanFilter::default().application_between(year_start, year_end);
        let all_filter = LoanFilter::default();
        let active_filter = LoanFilter::with_status(LoanStatus::Active);

        let (year_loans, all_loans, active_loans) = tokio::try_join!(
            self.store.list_loans(&year_filter),
            self.store.list_loans(&all_filter),
            self.store.list_loans(&active_filter),
        )?;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(DashboardCharts {
            monthly_loans: monthly_loans(&year_loans),
            loan_durations: duration_buckets(&all_loans),
            repayment_trends: repayment_trends(&active_loans, &mut rng),
            loan_officer_distribution: officer_distribution(&all_loans),
        })
    }
}
