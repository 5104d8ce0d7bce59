pub mod csv;
pub mod pdf;

use crate::datastore::{LoanFilter, LoanStore};
use crate::fallback::{DEFAULT_TIMEOUT, with_fallback};
use crate::model::{LoanStatus, LoanWithClient};
use crate::substitute;
use chrono::NaiveDate;
use mkopo_common::time::fmt_ymd;
use std::sync::Arc;
use std::time::Duration;

/// Body served when a report has no rows for the selected period.
pub const NO_DATA: &str = "No data available for the selected period";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Loans,
    Payments,
    Clients,
    Summary,
}

impl ReportKind {
    /// Unknown inputs silently fall back to the loans report.
    pub fn parse(s: &str) -> Self {
        match s {
            "payments" => ReportKind::Payments,
            "clients" => ReportKind::Clients,
            "summary" => ReportKind::Summary,
            _ => ReportKind::Loans,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Loans => "loans",
            ReportKind::Payments => "payments",
            ReportKind::Clients => "clients",
            ReportKind::Summary => "summary",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Loans => "Loans Report",
            ReportKind::Payments => "Payments Report",
            ReportKind::Clients => "Clients Report",
            ReportKind::Summary => "Summary Report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Pdf,
}

impl ReportFormat {
    /// Unknown inputs silently fall back to CSV.
    pub fn parse(s: &str) -> Self {
        match s {
            "pdf" => ReportFormat::Pdf,
            _ => ReportFormat::Csv,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv",
            ReportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(i64),
    Money(f64),
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => n.to_string(),
            Cell::Money(v) => {
                if v.fract() == 0.0 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
        }
    }
}

/// Flattened report projection. Column order is fixed per report kind and
/// every row carries a cell for every column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Finished export: bytes plus the HTTP metadata the handler needs.
#[derive(Debug)]
pub struct Report {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

pub struct ReportEngine {
    store: Arc<dyn LoanStore>,
    timeout: Duration,
}

impl ReportEngine {
    pub fn new(store: Arc<dyn LoanStore>) -> Self {
        Self::with_timeout(store, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn LoanStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Build the report for `[from, to]` inclusive. Store failures degrade
    /// to the substitute dataset; only an encoding failure surfaces as an
    /// error.
    pub async fn generate(
        &self,
        kind: ReportKind,
        format: ReportFormat,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Report, crate::errors::ReportError> {
        let table = self.build_table(kind, from, to).await;

        let bytes = match format {
            ReportFormat::Csv => csv::encode(&table)?,
            ReportFormat::Pdf => pdf::encode(&table, kind, from, to)?,
        };

        Ok(Report {
            bytes,
            content_type: format.content_type(),
            filename: format!(
                "{}_report_{}_to_{}.{}",
                kind.as_str(),
                fmt_ymd(from),
                fmt_ymd(to),
                format.extension()
            ),
        })
    }

    pub async fn build_table(&self, kind: ReportKind, from: NaiveDate, to: NaiveDate) -> ReportTable {
        match kind {
            ReportKind::Loans => self.loans_table(from, to).await,
            ReportKind::Payments => payments_table(),
            ReportKind::Clients => self.clients_table(from, to).await,
            ReportKind::Summary => self.summary_table(from, to).await,
        }
    }

    async fn loans_table(&self, from: NaiveDate, to: NaiveDate) -> ReportTable {
        let filter = LoanFilter::default().application_between(from, to);
        let rows = with_fallback(
            "loan report rows",
            self.timeout,
            self.store.list_loans_with_clients(&filter),
            substitute::sample_loans_with_clients(),
        )
        .await
        .value;
        loans_table_from(rows)
    }

    async fn clients_table(&self, from: NaiveDate, to: NaiveDate) -> ReportTable {
        let rows = with_fallback(
            "client report rows",
            self.timeout,
            self.store.list_clients_with_loans(Some((from, to))),
            substitute::sample_clients_with_loans(),
        )
        .await
        .value;

        let mut table = ReportTable::new(&[
            "ID",
            "Name",
            "IDNumber",
            "PhoneNumber",
            "BusinessLocation",
            "TotalLoans",
            "ActiveLoans",
            "TotalAmount",
        ]);
        let mut rows = rows;
        rows.sort_by(|a, b| a.client.name.cmp(&b.client.name));
        for row in rows {
            let total_loans = row.loan_records.len() as i64;
            let active_loans = row
                .loan_records
                .iter()
                .filter(|l| l.status == LoanStatus::Active)
                .count() as i64;
            let total_amount: f64 = row.loan_records.iter().map(|l| l.loan_amount).sum();
            table.rows.push(vec![
                Cell::Text(row.client.id),
                Cell::Text(row.client.name),
                Cell::Text(row.client.id_number),
                Cell::Text(row.client.phone_number1),
                Cell::Text(row.client.business_location),
                Cell::Count(total_loans),
                Cell::Count(active_loans),
                Cell::Money(total_amount),
            ]);
        }
        table
    }

    async fn summary_table(&self, from: NaiveDate, to: NaiveDate) -> ReportTable {
        let filter = LoanFilter::default().application_between(from, to);
        let loans = with_fallback(
            "summary report rows",
            self.timeout,
            self.store.list_loans(&filter),
            substitute::sample_loans(),
        )
        .await
        .value;

        let count = |status: LoanStatus| loans.iter().filter(|l| l.status == status).count() as i64;
        let total_amount: f64 = loans.iter().map(|l| l.loan_amount).sum();
        let total_interest: f64 = loans.iter().map(|l| l.interest_amount()).sum();

        let mut table = ReportTable::new(&[
            "TotalLoans",
            "PendingLoans",
            "ApprovedLoans",
            "DisbursedLoans",
            "ActiveLoans",
            "CompletedLoans",
            "DefaultedLoans",
            "RejectedLoans",
            "TotalAmount",
            "TotalInterest",
            "Period",
        ]);
        table.rows.push(vec![
            Cell::Count(loans.len() as i64),
            Cell::Count(count(LoanStatus::Pending)),
            Cell::Count(count(LoanStatus::Approved)),
            Cell::Count(count(LoanStatus::Disbursed)),
            Cell::Count(count(LoanStatus::Active)),
            Cell::Count(count(LoanStatus::Completed)),
            Cell::Count(count(LoanStatus::Defaulted)),
            Cell::Count(count(LoanStatus::Rejected)),
            Cell::Money(total_amount),
            Cell::Money(total_interest),
            Cell::Text(format!("{} to {}", fmt_ymd(from), fmt_ymd(to))),
        ]);
        table
    }
}

fn loans_table_from(mut rows: Vec<LoanWithClient>) -> ReportTable {
    rows.sort_by(|a, b| b.loan.application_date.cmp(&a.loan.application_date));

    let mut table = ReportTable::new(&[
        "ID",
        "ClientName",
        "ClientID",
        "PhoneNumber",
        "LoanAmount",
        "InterestRate",
        "TotalAmount",
        "ApplicationDate",
        "DisbursementDate",
        "Status",
        "LoanOfficer",
    ]);
    for row in rows {
        table.rows.push(vec![
            Cell::Text(row.loan.id.clone()),
            Cell::Text(row.client.name),
            Cell::Text(row.client.id_number),
            Cell::Text(row.client.phone_number1),
            Cell::Money(row.loan.loan_amount),
            Cell::Money(row.loan.interest_rate),
            Cell::Money(row.loan.expected_return()),
            Cell::Text(fmt_ymd(row.loan.application_date)),
            Cell::Text(
                row.loan
                    .disbursement_date
                    .map(fmt_ymd)
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
            Cell::Text(row.loan.status.as_str().to_string()),
            Cell::Text(row.loan.loan_officer),
        ]);
    }
    table
}

/// Fixed illustrative dataset: there is no payments ledger, so the payments
/// report is a placeholder regardless of the requested range.
fn payments_table() -> ReportTable {
    let mut table = ReportTable::new(&[
        "ID",
        "ClientName",
        "LoanID",
        "PaymentDate",
        "Amount",
        "PaymentMethod",
        "ReceivedBy",
    ]);
    table.rows.push(vec![
        Cell::Text("1".into()),
        Cell::Text("John Doe".into()),
        Cell::Text("LOAN-001".into()),
        Cell::Text("2023-05-01".into()),
        Cell::Money(5000.0),
        Cell::Text("Cash".into()),
        Cell::Text("Jane Smith".into()),
    ]);
    table.rows.push(vec![
        Cell::Text("2".into()),
        Cell::Text("Alice Johnson".into()),
        Cell::Text("LOAN-002".into()),
        Cell::Text("2023-05-02".into()),
        Cell::Money(3000.0),
        Cell::Text("M-Pesa".into()),
        Cell::Text("Jane Smith".into()),
    ]);
    table
}
