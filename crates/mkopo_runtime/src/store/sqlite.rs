use crate::datastore::{LoanFilter, LoanStore};
use crate::errors::StoreError;
use crate::model::{
    Client, ClientProfile, ClientWithLoans, Guarantor, LoanBundle, LoanRecord, LoanStatus,
    LoanWithClient, MediaFile, Reference,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        id_number TEXT NOT NULL UNIQUE,
        phone_number1 TEXT NOT NULL,
        phone_number2 TEXT,
        business_location TEXT NOT NULL,
        permit_number TEXT,
        home_address TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS loan_records (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        loan_amount REAL NOT NULL DEFAULT 0,
        interest_rate REAL NOT NULL DEFAULT 0,
        registration_fee REAL NOT NULL DEFAULT 0,
        loan_duration INTEGER NOT NULL DEFAULT 0,
        application_date TEXT NOT NULL,
        disbursement_date TEXT,
        first_installment_date TEXT,
        last_installment_date TEXT,
        daily_payment_check INTEGER NOT NULL DEFAULT 0,
        loan_officer TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS guarantors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        id_number TEXT NOT NULL,
        phone_number TEXT NOT NULL,
        client_id TEXT NOT NULL,
        loan_record_id TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS loan_references (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        phone_number TEXT NOT NULL,
        relationship TEXT NOT NULL,
        client_id TEXT NOT NULL,
        loan_record_id TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS media_files (
        id TEXT PRIMARY KEY,
        file_name TEXT NOT NULL,
        file_type TEXT NOT NULL,
        file_url TEXT NOT NULL,
        description TEXT,
        client_id TEXT NOT NULL,
        loan_record_id TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_loan_records_client ON loan_records (client_id)",
    "CREATE INDEX IF NOT EXISTS idx_loan_records_status ON loan_records (status)",
];

enum Bind {
    Text(String),
    Date(NaiveDate),
}

/// WHERE clause and bind list for a `LoanFilter`. Dates are stored as
/// `YYYY-MM-DD` text so inclusive range comparisons work lexicographically.
fn loan_where(filter: &LoanFilter) -> (String, Vec<Bind>) {
    let mut clauses: Vec<String> = vec![];
    let mut binds: Vec<Bind> = vec![];

    if let Some(statuses) = &filter.statuses
        && !statuses.is_empty()
    {
        let marks = vec!["?"; statuses.len()].join(", ");
        clauses.push(format!("status IN ({})", marks));
        binds.extend(statuses.iter().map(|s| Bind::Text(s.as_str().to_string())));
    }
    if let Some((from, to)) = filter.application_between {
        clauses.push("application_date >= ? AND application_date <= ?".to_string());
        binds.push(Bind::Date(from));
        binds.push(Bind::Date(to));
    }
    if let Some((from, to)) = filter.first_installment_between {
        clauses.push(
            "first_installment_date IS NOT NULL AND first_installment_date >= ? AND first_installment_date <= ?"
                .to_string(),
        );
        binds.push(Bind::Date(from));
        binds.push(Bind::Date(to));
    }
    if let Some((from, to)) = filter.last_installment_between {
        clauses.push(
            "last_installment_date IS NOT NULL AND last_installment_date >= ? AND last_installment_date <= ?"
                .to_string(),
        );
        binds.push(Bind::Date(from));
        binds.push(Bind::Date(to));
    }

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), binds)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub struct SqliteLoanStore {
    pool: SqlitePool,
}

impl SqliteLoanStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<Client, StoreError> {
        Ok(Client {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            id_number: row.try_get("id_number")?,
            phone_number1: row.try_get("phone_number1")?,
            phone_number2: row.try_get("phone_number2")?,
            business_location: row.try_get("business_location")?,
            permit_number: row.try_get("permit_number")?,
            home_address: row.try_get("home_address")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_loan(row: &sqlx::sqlite::SqliteRow) -> Result<LoanRecord, StoreError> {
        let status: String = row.try_get("status")?;
        let status = LoanStatus::parse(&status)
            .ok_or_else(|| StoreError::Malformed(format!("unknown loan status '{}'", status)))?;
        Ok(LoanRecord {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            loan_amount: row.try_get::<Option<f64>, _>("loan_amount")?.unwrap_or(0.0),
            interest_rate: row.try_get::<Option<f64>, _>("interest_rate")?.unwrap_or(0.0),
            registration_fee: row.try_get::<Option<f64>, _>("registration_fee")?.unwrap_or(0.0),
            loan_duration: row.try_get::<Option<i64>, _>("loan_duration")?.unwrap_or(0),
            application_date: row.try_get::<NaiveDate, _>("application_date")?,
            disbursement_date: row.try_get::<Option<NaiveDate>, _>("disbursement_date")?,
            first_installment_date: row.try_get::<Option<NaiveDate>, _>("first_installment_date")?,
            last_installment_date: row.try_get::<Option<NaiveDate>, _>("last_installment_date")?,
            daily_payment_check: row.try_get("daily_payment_check")?,
            loan_officer: row.try_get("loan_officer")?,
            status,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_guarantor(row: &sqlx::sqlite::SqliteRow) -> Result<Guarantor, StoreError> {
        Ok(Guarantor {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            id_number: row.try_get("id_number")?,
            phone_number: row.try_get("phone_number")?,
            client_id: row.try_get("client_id")?,
            loan_record_id: row.try_get("loan_record_id")?,
        })
    }

    fn row_to_reference(row: &sqlx::sqlite::SqliteRow) -> Result<Reference, StoreError> {
        Ok(Reference {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phone_number: row.try_get("phone_number")?,
            relationship: row.try_get("relationship")?,
            client_id: row.try_get("client_id")?,
            loan_record_id: row.try_get("loan_record_id")?,
        })
    }

    fn row_to_media(row: &sqlx::sqlite::SqliteRow) -> Result<MediaFile, StoreError> {
        Ok(MediaFile {
            id: row.try_get("id")?,
            file_name: row.try_get("file_name")?,
            file_type: row.try_get("file_type")?,
            file_url: row.try_get("file_url")?,
            description: row.try_get("description")?,
            client_id: row.try_get("client_id")?,
            loan_record_id: row.try_get("loan_record_id")?,
        })
    }

    async fn fetch_loans(&self, filter: &LoanFilter) -> Result<Vec<LoanRecord>, StoreError> {
        let (clause, binds) = loan_where(filter);
        let sql = format!("SELECT * FROM loan_records{}", clause);
        let mut q = sqlx::query(&sql);
        for bind in binds {
            q = match bind {
                Bind::Text(s) => q.bind(s),
                Bind::Date(d) => q.bind(d),
            };
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_loan).collect()
    }

    async fn fetch_clients_by_ids(
        &self,
        ids: &HashSet<String>,
    ) -> Result<HashMap<String, Client>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!("SELECT * FROM clients WHERE id IN ({})", placeholders(ids.len()));
        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(&self.pool).await?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in &rows {
            let client = Self::row_to_client(row)?;
            out.insert(client.id.clone(), client);
        }
        Ok(out)
    }
}

#[async_trait]
impl LoanStore for SqliteLoanStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_client(&self, mut client: Client) -> Result<String, StoreError> {
        if client.id.is_empty() {
            client.id = Uuid::new_v4().to_string();
        }
        sqlx::query(
            "INSERT INTO clients (id, name, id_number, phone_number1, phone_number2,
             business_location, permit_number, home_address, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.id_number)
        .bind(&client.phone_number1)
        .bind(&client.phone_number2)
        .bind(&client.business_location)
        .bind(&client.permit_number)
        .bind(&client.home_address)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(client.id)
    }

    async fn insert_loan(&self, mut loan: LoanRecord) -> Result<String, StoreError> {
        if loan.id.is_empty() {
            loan.id = Uuid::new_v4().to_string();
        }
        sqlx::query(
            "INSERT INTO loan_records (id, client_id, loan_amount, interest_rate,
             registration_fee, loan_duration, application_date, disbursement_date,
             first_installment_date, last_installment_date, daily_payment_check,
             loan_officer, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&loan.id)
        .bind(&loan.client_id)
        .bind(loan.loan_amount)
        .bind(loan.interest_rate)
        .bind(loan.registration_fee)
        .bind(loan.loan_duration)
        .bind(loan.application_date)
        .bind(loan.disbursement_date)
        .bind(loan.first_installment_date)
        .bind(loan.last_installment_date)
        .bind(loan.daily_payment_check)
        .bind(&loan.loan_officer)
        .bind(loan.status.as_str())
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(loan.id)
    }

    async fn insert_guarantor(&self, mut guarantor: Guarantor) -> Result<String, StoreError> {
        if guarantor.id.is_empty() {
            guarantor.id = Uuid::new_v4().to_string();
        }
        sqlx::query(
            "INSERT INTO guarantors (id, name, id_number, phone_number, client_id, loan_record_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&guarantor.id)
        .bind(&guarantor.name)
        .bind(&guarantor.id_number)
        .bind(&guarantor.phone_number)
        .bind(&guarantor.client_id)
        .bind(&guarantor.loan_record_id)
        .execute(&self.pool)
        .await?;
        Ok(guarantor.id)
    }

    async fn insert_reference(&self, mut reference: Reference) -> Result<String, StoreError> {
        if reference.id.is_empty() {
            reference.id = Uuid::new_v4().to_string();
        }
        sqlx::query(
            "INSERT INTO loan_references (id, name, phone_number, relationship, client_id, loan_record_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&reference.id)
        .bind(&reference.name)
        .bind(&reference.phone_number)
        .bind(&reference.relationship)
        .bind(&reference.client_id)
        .bind(&reference.loan_record_id)
        .execute(&self.pool)
        .await?;
        Ok(reference.id)
    }

    async fn insert_media_file(&self, mut media: MediaFile) -> Result<String, StoreError> {
        if media.id.is_empty() {
            media.id = Uuid::new_v4().to_string();
        }
        sqlx::query(
            "INSERT INTO media_files (id, file_name, file_type, file_url, description, client_id, loan_record_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&media.id)
        .bind(&media.file_name)
        .bind(&media.file_type)
        .bind(&media.file_url)
        .bind(&media.description)
        .bind(&media.client_id)
        .bind(&media.loan_record_id)
        .execute(&self.pool)
        .await?;
        Ok(media.id)
    }

    async fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<LoanRecord>, StoreError> {
        self.fetch_loans(filter).await
    }

    async fn count_loans(&self, filter: &LoanFilter) -> Result<i64, StoreError> {
        let (clause, binds) = loan_where(filter);
        let sql = format!("SELECT COUNT(*) FROM loan_records{}", clause);
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for bind in binds {
            q = match bind {
                Bind::Text(s) => q.bind(s),
                Bind::Date(d) => q.bind(d),
            };
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn list_loans_with_clients(
        &self,
        filter: &LoanFilter,
    ) -> Result<Vec<LoanWithClient>, StoreError> {
        let loans = self.fetch_loans(filter).await?;
        let ids: HashSet<String> = loans.iter().map(|l| l.client_id.clone()).collect();
        let clients = self.fetch_clients_by_ids(&ids).await?;

        let mut out = Vec::with_capacity(loans.len());
        for loan in loans {
            let client = clients.get(&loan.client_id).cloned().ok_or_else(|| {
                StoreError::Malformed(format!("loan {} has no client {}", loan.id, loan.client_id))
            })?;
            out.push(LoanWithClient { loan, client });
        }
        Ok(out)
    }

    async fn list_clients_with_loans(
        &self,
        created_between: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ClientWithLoans>, StoreError> {
        let rows = if let Some((from, to)) = created_between {
            sqlx::query("SELECT * FROM clients WHERE date(created_at) >= ? AND date(created_at) <= ?")
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT * FROM clients").fetch_all(&self.pool).await?
        };

        let mut clients = Vec::with_capacity(rows.len());
        for row in &rows {
            clients.push(Self::row_to_client(row)?);
        }

        // One pass over all matching loans, grouped in memory.
        let ids: HashSet<String> = clients.iter().map(|c| c.id.clone()).collect();
        let mut by_client: HashMap<String, Vec<LoanRecord>> = HashMap::new();
        if !ids.is_empty() {
            let sql = format!(
                "SELECT * FROM loan_records WHERE client_id IN ({})",
                placeholders(ids.len())
            );
            let mut q = sqlx::query(&sql);
            for id in &ids {
                q = q.bind(id);
            }
            for row in q.fetch_all(&self.pool).await?.iter() {
                let loan = Self::row_to_loan(row)?;
                by_client.entry(loan.client_id.clone()).or_default().push(loan);
            }
        }

        Ok(clients
            .into_iter()
            .map(|client| {
                let loan_records = by_client.remove(&client.id).unwrap_or_default();
                ClientWithLoans { client, loan_records }
            })
            .collect())
    }

    async fn find_client_by_id_number(
        &self,
        id_number: &str,
    ) -> Result<Option<ClientProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM clients WHERE id_number = ?")
            .bind(id_number)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let client = Self::row_to_client(&row)?;

        let loan_rows = sqlx::query("SELECT * FROM loan_records WHERE client_id = ? ORDER BY created_at DESC")
            .bind(&client.id)
            .fetch_all(&self.pool)
            .await?;
        let mut loans = Vec::with_capacity(loan_rows.len());
        for row in &loan_rows {
            loans.push(Self::row_to_loan(row)?);
        }

        let mut guarantors: HashMap<String, Vec<Guarantor>> = HashMap::new();
        for row in sqlx::query("SELECT * FROM guarantors WHERE client_id = ?")
            .bind(&client.id)
            .fetch_all(&self.pool)
            .await?
            .iter()
        {
            let g = Self::row_to_guarantor(row)?;
            guarantors.entry(g.loan_record_id.clone()).or_default().push(g);
        }
        let mut references: HashMap<String, Vec<Reference>> = HashMap::new();
        for row in sqlx::query("SELECT * FROM loan_references WHERE client_id = ?")
            .bind(&client.id)
            .fetch_all(&self.pool)
            .await?
            .iter()
        {
            let r = Self::row_to_reference(row)?;
            references.entry(r.loan_record_id.clone()).or_default().push(r);
        }
        let mut media_files: HashMap<String, Vec<MediaFile>> = HashMap::new();
        for row in sqlx::query("SELECT * FROM media_files WHERE client_id = ?")
            .bind(&client.id)
            .fetch_all(&self.pool)
            .await?
            .iter()
        {
            let m = Self::row_to_media(row)?;
            media_files.entry(m.loan_record_id.clone()).or_default().push(m);
        }

        let loan_records = loans
            .into_iter()
            .map(|loan| {
                let id = loan.id.clone();
                LoanBundle {
                    loan,
                    guarantors: guarantors.remove(&id).unwrap_or_default(),
                    references: references.remove(&id).unwrap_or_default(),
                    media_files: media_files.remove(&id).unwrap_or_default(),
                }
            })
            .collect();

        Ok(Some(ClientProfile { client, loan_records }))
    }
}
