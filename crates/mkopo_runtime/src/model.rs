use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a loan record.
///
/// The historical data carried two incompatible status sets (a 4-value and a
/// 7-value one); this is the single canonical union. Only the statuses for
/// which money actually left the till count as disbursed capital — `PENDING`
/// never contributes to monetary totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Disbursed,
    Active,
    Completed,
    Defaulted,
    Rejected,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 7] = [
        LoanStatus::Pending,
        LoanStatus::Approved,
        LoanStatus::Disbursed,
        LoanStatus::Active,
        LoanStatus::Completed,
        LoanStatus::Defaulted,
        LoanStatus::Rejected,
    ];

    /// True when the principal has been handed out.
    pub fn is_disbursed(self) -> bool {
        matches!(self, LoanStatus::Disbursed | LoanStatus::Active | LoanStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Disbursed => "DISBURSED",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Completed => "COMPLETED",
            LoanStatus::Defaulted => "DEFAULTED",
            LoanStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<LoanStatus> {
        match s {
            "PENDING" => Some(LoanStatus::Pending),
            "APPROVED" => Some(LoanStatus::Approved),
            "DISBURSED" => Some(LoanStatus::Disbursed),
            "ACTIVE" => Some(LoanStatus::Active),
            "COMPLETED" => Some(LoanStatus::Completed),
            "DEFAULTED" => Some(LoanStatus::Defaulted),
            "REJECTED" => Some(LoanStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    /// National ID number; unique per client.
    pub id_number: String,
    pub phone_number1: String,
    #[serde(default)]
    pub phone_number2: Option<String>,
    pub business_location: String,
    #[serde(default)]
    pub permit_number: Option<String>,
    #[serde(default)]
    pub home_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub id: String,
    pub client_id: String,
    /// Principal in KES. Monetary fields default to 0 when absent so the
    /// aggregation math never sees NaN.
    #[serde(default)]
    pub loan_amount: f64,
    /// Flat interest rate in percent.
    #[serde(default)]
    pub interest_rate: f64,
    #[serde(default)]
    pub registration_fee: f64,
    /// Repayment period in days.
    #[serde(default)]
    pub loan_duration: i64,
    pub application_date: NaiveDate,
    #[serde(default)]
    pub disbursement_date: Option<NaiveDate>,
    #[serde(default)]
    pub first_installment_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_installment_date: Option<NaiveDate>,
    #[serde(default)]
    pub daily_payment_check: bool,
    /// Free-text officer name; not normalized anywhere.
    pub loan_officer: String,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRecord {
    /// Flat interest over the whole duration.
    pub fn interest_amount(&self) -> f64 {
        self.loan_amount * self.interest_rate / 100.0
    }

    /// Principal plus interest.
    pub fn expected_return(&self) -> f64 {
        self.loan_amount + self.interest_amount()
    }

    /// Even per-day installment of principal plus interest, rounded to 2
    /// decimal places. 0 when the duration is not positive.
    pub fn installment_amount(&self) -> f64 {
        if self.loan_duration <= 0 {
            return 0.0;
        }
        let per_day = self.expected_return() / self.loan_duration as f64;
        (per_day * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guarantor {
    pub id: String,
    pub name: String,
    pub id_number: String,
    pub phone_number: String,
    pub client_id: String,
    pub loan_record_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub relationship: String,
    pub client_id: String,
    pub loan_record_id: String,
}

/// Opaque pointer to an uploaded document (contract PDF etc.); the contents
/// live in external object storage and are never read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub client_id: String,
    pub loan_record_id: String,
}

/// Loan row with its owning client eagerly attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanWithClient {
    #[serde(flatten)]
    pub loan: LoanRecord,
    pub client: Client,
}

/// Client row with all of its loan records attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientWithLoans {
    #[serde(flatten)]
    pub client: Client,
    pub loan_records: Vec<LoanRecord>,
}

/// Full search projection: client, loans, and the descriptive records
/// attached to each loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    #[serde(flatten)]
    pub client: Client,
    pub loan_records: Vec<LoanBundle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBundle {
    #[serde(flatten)]
    pub loan: LoanRecord,
    pub guarantors: Vec<Guarantor>,
    pub references: Vec<Reference>,
    pub media_files: Vec<MediaFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn loan(amount: f64, rate: f64, duration: i64) -> LoanRecord {
        LoanRecord {
            id: "l1".into(),
            client_id: "c1".into(),
            loan_amount: amount,
            interest_rate: rate,
            registration_fee: 0.0,
            loan_duration: duration,
            application_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            disbursement_date: None,
            first_installment_date: None,
            last_installment_date: None,
            daily_payment_check: false,
            loan_officer: "Officer".into(),
            status: LoanStatus::Active,
            created_at: Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn interest_and_expected_return() {
        let l = loan(5000.0, 10.0, 30);
        assert_eq!(l.interest_amount(), 500.0);
        assert_eq!(l.expected_return(), 5500.0);
    }

    #[test]
    fn installment_is_rounded_to_cents() {
        let l = loan(1000.0, 7.0, 30);
        // 1070 / 30 = 35.666..., rounds to 35.67
        assert_eq!(l.installment_amount(), 35.67);
    }

    #[test]
    fn installment_is_zero_for_non_positive_duration() {
        assert_eq!(loan(1000.0, 10.0, 0).installment_amount(), 0.0);
        assert_eq!(loan(1000.0, 10.0, -5).installment_amount(), 0.0);
    }

    #[test]
    fn pending_is_not_disbursed() {
        assert!(!LoanStatus::Pending.is_disbursed());
        assert!(!LoanStatus::Approved.is_disbursed());
        assert!(!LoanStatus::Rejected.is_disbursed());
        assert!(LoanStatus::Active.is_disbursed());
        assert!(LoanStatus::Completed.is_disbursed());
        assert!(LoanStatus::Disbursed.is_disbursed());
    }

    #[test]
    fn status_wire_format_is_screaming_snake() {
        let json = serde_json::to_string(&LoanStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
        let back: LoanStatus = serde_json::from_str("\"DEFAULTED\"").unwrap();
        assert_eq!(back, LoanStatus::Defaulted);
    }

    #[test]
    fn missing_monetary_fields_deserialize_to_zero() {
        let json = serde_json::json!({
            "id": "l9",
            "clientId": "c1",
            "applicationDate": "2025-04-05",
            "loanOfficer": "Michael Johnson",
            "status": "PENDING",
            "createdAt": "2025-04-05T00:00:00Z",
            "updatedAt": "2025-04-05T00:00:00Z"
        });
        let loan: LoanRecord = serde_json::from_value(json).unwrap();
        assert_eq!(loan.loan_amount, 0.0);
        assert_eq!(loan.interest_rate, 0.0);
        assert_eq!(loan.interest_amount(), 0.0);
    }
}
