use chrono::NaiveDate;
use mkopo_runtime::datastore::MemoryLoanStore;
use mkopo_runtime::report::{NO_DATA, ReportEngine, ReportFormat, ReportKind};
use mkopo_runtime::substitute;
use std::sync::Arc;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seeded_engine() -> ReportEngine {
    let store = MemoryLoanStore::new();
    substitute::seed(&store).await.unwrap();
    ReportEngine::new(Arc::new(store))
}

fn parse_csv(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers().unwrap().iter().map(|s| s.to_string()).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn loans_csv_is_sorted_newest_first() {
    let engine = seeded_engine().await;
    let report = engine
        .generate(ReportKind::Loans, ReportFormat::Csv, ymd(2025, 1, 1), ymd(2025, 12, 31))
        .await
        .unwrap();

    assert_eq!(report.content_type, "text/csv");
    assert_eq!(report.filename, "loans_report_2025-01-01_to_2025-12-31.csv");

    let (headers, rows) = parse_csv(&report.bytes);
    assert_eq!(headers.len(), 11);
    assert_eq!(headers[0], "ID");
    assert_eq!(headers[6], "TotalAmount");
    assert_eq!(rows.len(), 3);
    // Application dates descend: Apr, Feb, Jan.
    assert_eq!(rows[0][7], "2025-04-05");
    assert_eq!(rows[1][7], "2025-02-25");
    assert_eq!(rows[2][7], "2025-01-20");
    // The pending loan has no disbursement date.
    assert_eq!(rows[0][8], "N/A");
    assert_eq!(rows[0][9], "PENDING");
    // 5000 principal at 10% flat.
    assert_eq!(rows[2][4], "5000");
    assert_eq!(rows[2][6], "5500");
}

#[tokio::test]
async fn empty_period_serves_the_no_data_sentinel() {
    let engine = seeded_engine().await;
    let report = engine
        .generate(ReportKind::Loans, ReportFormat::Csv, ymd(2020, 1, 1), ymd(2020, 12, 31))
        .await
        .unwrap();
    assert_eq!(report.bytes, NO_DATA.as_bytes());

    // An inverted range can never match anything either.
    let inverted = engine
        .generate(ReportKind::Loans, ReportFormat::Csv, ymd(2025, 12, 31), ymd(2025, 1, 1))
        .await
        .unwrap();
    assert_eq!(inverted.bytes, NO_DATA.as_bytes());
}

#[tokio::test]
async fn payments_report_is_the_fixed_placeholder() {
    let engine = seeded_engine().await;
    let report = engine
        .generate(ReportKind::Payments, ReportFormat::Csv, ymd(2025, 1, 1), ymd(2025, 1, 2))
        .await
        .unwrap();

    let (headers, rows) = parse_csv(&report.bytes);
    assert_eq!(headers[0], "ID");
    assert_eq!(headers[5], "PaymentMethod");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "John Doe");
    assert_eq!(rows[1][5], "M-Pesa");
}

#[tokio::test]
async fn clients_csv_aggregates_per_client() {
    let engine = seeded_engine().await;
    let report = engine
        .generate(ReportKind::Clients, ReportFormat::Csv, ymd(2025, 1, 1), ymd(2025, 12, 31))
        .await
        .unwrap();

    let (headers, rows) = parse_csv(&report.bytes);
    assert_eq!(headers.len(), 8);
    assert_eq!(rows.len(), 2);
    // Sorted by name: Jane before John.
    assert_eq!(rows[0][1], "Jane Smith");
    assert_eq!(rows[1][1], "John Doe");
    // John Doe: two loans, one active, 8000 total.
    assert_eq!(rows[1][5], "2");
    assert_eq!(rows[1][6], "1");
    assert_eq!(rows[1][7], "8000");
}

#[tokio::test]
async fn summary_is_always_a_single_row() {
    let engine = seeded_engine().await;
    let report = engine
        .generate(ReportKind::Summary, ReportFormat::Csv, ymd(2025, 1, 1), ymd(2025, 12, 31))
        .await
        .unwrap();

    let (headers, rows) = parse_csv(&report.bytes);
    assert_eq!(headers.len(), 11);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row[0], "3"); // total
    assert_eq!(row[1], "1"); // pending
    assert_eq!(row[3], "1"); // disbursed
    assert_eq!(row[4], "1"); // active
    assert_eq!(row[8], "18000"); // 5000 + 10000 + 3000
    assert_eq!(row[9], "1940"); // 500 + 1200 + 240
    assert_eq!(row[10], "2025-01-01 to 2025-12-31");
}

#[tokio::test]
async fn unknown_kind_and_format_fall_back_to_loans_csv() {
    assert_eq!(ReportKind::parse("bogus"), ReportKind::Loans);
    assert_eq!(ReportKind::parse(""), ReportKind::Loans);
    assert_eq!(ReportKind::parse("summary"), ReportKind::Summary);
    assert_eq!(ReportFormat::parse("bogus"), ReportFormat::Csv);
    assert_eq!(ReportFormat::parse("pdf"), ReportFormat::Pdf);

    let engine = seeded_engine().await;
    let report = engine
        .generate(
            ReportKind::parse("bogus"),
            ReportFormat::parse("bogus"),
            ymd(2025, 1, 1),
            ymd(2025, 12, 31),
        )
        .await
        .unwrap();
    assert_eq!(report.content_type, "text/csv");
    assert!(report.filename.starts_with("loans_report_"));
}
