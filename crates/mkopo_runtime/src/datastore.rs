use crate::errors::StoreError;
use crate::model::{
    Client, ClientProfile, ClientWithLoans, Guarantor, LoanBundle, LoanRecord, LoanStatus,
    LoanWithClient, MediaFile, Reference,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Typed filter over loan records. All bounds are inclusive; an installment
/// window only matches rows where the corresponding date is actually set.
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    pub statuses: Option<Vec<LoanStatus>>,
    pub application_between: Option<(NaiveDate, NaiveDate)>,
    pub first_installment_between: Option<(NaiveDate, NaiveDate)>,
    pub last_installment_between: Option<(NaiveDate, NaiveDate)>,
}

impl LoanFilter {
    pub fn with_status(status: LoanStatus) -> Self {
        Self {
            statuses: Some(vec![status]),
            ..Self::default()
        }
    }

    pub fn with_statuses(statuses: &[LoanStatus]) -> Self {
        Self {
            statuses: Some(statuses.to_vec()),
            ..Self::default()
        }
    }

    pub fn application_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.application_between = Some((from, to));
        self
    }

    pub fn first_installment_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.first_installment_between = Some((from, to));
        self
    }

    pub fn last_installment_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.last_installment_between = Some((from, to));
        self
    }

    pub fn matches(&self, loan: &LoanRecord) -> bool {
        if let Some(statuses) = &self.statuses
            && !statuses.contains(&loan.status)
        {
            return false;
        }
        if let Some((from, to)) = self.application_between
            && !(loan.application_date >= from && loan.application_date <= to)
        {
            return false;
        }
        if let Some((from, to)) = self.first_installment_between {
            match loan.first_installment_date {
                Some(d) if d >= from && d <= to => {}
                _ => return false,
            }
        }
        if let Some((from, to)) = self.last_installment_between {
            match loan.last_installment_date {
                Some(d) if d >= from && d <= to => {}
                _ => return false,
            }
        }
        true
    }
}

/// Read/write boundary over the persistent store. Result ordering is not
/// guaranteed; callers sort what they need sorted.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Cheap liveness probe (`SELECT 1` equivalent).
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_client(&self, client: Client) -> Result<String, StoreError>;
    async fn insert_loan(&self, loan: LoanRecord) -> Result<String, StoreError>;
    async fn insert_guarantor(&self, guarantor: Guarantor) -> Result<String, StoreError>;
    async fn insert_reference(&self, reference: Reference) -> Result<String, StoreError>;
    async fn insert_media_file(&self, media: MediaFile) -> Result<String, StoreError>;

    async fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<LoanRecord>, StoreError>;
    async fn count_loans(&self, filter: &LoanFilter) -> Result<i64, StoreError>;
    async fn list_loans_with_clients(
        &self,
        filter: &LoanFilter,
    ) -> Result<Vec<LoanWithClient>, StoreError>;
    /// Clients created in the given window (all clients when `None`), each
    /// with its loan records attached.
    async fn list_clients_with_loans(
        &self,
        created_between: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ClientWithLoans>, StoreError>;
    /// Lookup by national ID number with the full relation set attached.
    async fn find_client_by_id_number(
        &self,
        id_number: &str,
    ) -> Result<Option<ClientProfile>, StoreError>;
}

#[derive(Default)]
struct MemoryTables {
    clients: HashMap<String, Client>,
    loans: HashMap<String, LoanRecord>,
    guarantors: HashMap<String, Guarantor>,
    references: HashMap<String, Reference>,
    media_files: HashMap<String, MediaFile>,
}

/// In-process store used for tests and no-database runs.
pub struct MemoryLoanStore {
    data: Arc<Mutex<MemoryTables>>,
}

impl Default for MemoryLoanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLoanStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(MemoryTables::default())),
        }
    }
}

fn ensure_id(id: &mut String) -> String {
    if id.is_empty() {
        *id = Uuid::new_v4().to_string();
    }
    id.clone()
}

#[async_trait]
impl LoanStore for MemoryLoanStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_client(&self, mut client: Client) -> Result<String, StoreError> {
        let id = ensure_id(&mut client.id);
        self.data.lock().unwrap().clients.insert(id.clone(), client);
        Ok(id)
    }

    async fn insert_loan(&self, mut loan: LoanRecord) -> Result<String, StoreError> {
        let id = ensure_id(&mut loan.id);
        self.data.lock().unwrap().loans.insert(id.clone(), loan);
        Ok(id)
    }

    async fn insert_guarantor(&self, mut guarantor: Guarantor) -> Result<String, StoreError> {
        let id = ensure_id(&mut guarantor.id);
        self.data.lock().unwrap().guarantors.insert(id.clone(), guarantor);
        Ok(id)
    }

    async fn insert_reference(&self, mut reference: Reference) -> Result<String, StoreError> {
        let id = ensure_id(&mut reference.id);
        self.data.lock().unwrap().references.insert(id.clone(), reference);
        Ok(id)
    }

    async fn insert_media_file(&self, mut media: MediaFile) -> Result<String, StoreError> {
        let id = ensure_id(&mut media.id);
        self.data.lock().unwrap().media_files.insert(id.clone(), media);
        Ok(id)
    }

    async fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<LoanRecord>, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(data.loans.values().filter(|l| filter.matches(l)).cloned().collect())
    }

    async fn count_loans(&self, filter: &LoanFilter) -> Result<i64, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(data.loans.values().filter(|l| filter.matches(l)).count() as i64)
    }

    async fn list_loans_with_clients(
        &self,
        filter: &LoanFilter,
    ) -> Result<Vec<LoanWithClient>, StoreError> {
        let data = self.data.lock().unwrap();
        let mut out = vec![];
        for loan in data.loans.values().filter(|l| filter.matches(l)) {
            let client = data
                .clients
                .get(&loan.client_id)
                .ok_or_else(|| {
                    StoreError::Malformed(format!("loan {} has no client {}", loan.id, loan.client_id))
                })?
                .clone();
            out.push(LoanWithClient {
                loan: loan.clone(),
                client,
            });
        }
        Ok(out)
    }

    async fn list_clients_with_loans(
        &self,
        created_between: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ClientWithLoans>, StoreError> {
        let data = self.data.lock().unwrap();
        let mut out = vec![];
        for client in data.clients.values() {
            if let Some((from, to)) = created_between {
                let created = client.created_at.date_naive();
                if created < from || created > to {
                    continue;
                }
            }
            let loans = data
                .loans
                .values()
                .filter(|l| l.client_id == client.id)
                .cloned()
                .collect();
            out.push(ClientWithLoans {
                client: client.clone(),
                loan_records: loans,
            });
        }
        Ok(out)
    }

    async fn find_client_by_id_number(
        &self,
        id_number: &str,
    ) -> Result<Option<ClientProfile>, StoreError> {
        let data = self.data.lock().unwrap();
        let Some(client) = data.clients.values().find(|c| c.id_number == id_number) else {
            return Ok(None);
        };
        let mut bundles = vec![];
        for loan in data.loans.values().filter(|l| l.client_id == client.id) {
            bundles.push(LoanBundle {
                loan: loan.clone(),
                guarantors: data
                    .guarantors
                    .values()
                    .filter(|g| g.loan_record_id == loan.id)
                    .cloned()
                    .collect(),
                references: data
                    .references
                    .values()
                    .filter(|r| r.loan_record_id == loan.id)
                    .cloned()
                    .collect(),
                media_files: data
                    .media_files
                    .values()
                    .filter(|m| m.loan_record_id == loan.id)
                    .cloned()
                    .collect(),
            });
        }
        bundles.sort_by(|a, b| b.loan.created_at.cmp(&a.loan.created_at));
        Ok(Some(ClientProfile {
            client: client.clone(),
            loan_records: bundles,
        }))
    }
}

use crate::store::sqlite::SqliteLoanStore;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;

/// Build the loan store for the process. The store is constructed here and
/// handed to the engines explicitly; nothing holds it at module scope.
pub async fn init_loan_store(database_url: Option<&str>) -> Result<Arc<dyn LoanStore>, StoreError> {
    let Some(url) = database_url.filter(|u| !u.is_empty()) else {
        println!("⚠️ No database configured. Using in-memory loan store.");
        return Ok(Arc::new(MemoryLoanStore::new()));
    };

    if !url.starts_with("sqlite") && !url.starts_with("file:") && url != ":memory:" {
        return Err(StoreError::InvalidUrl(format!(
            "unsupported database url '{}' (expected sqlite://...)",
            url
        )));
    }

    println!("🔌 Connecting to database...");
    let mut db_path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:")
        .to_string();

    let url = if db_path == ":memory:" || db_path.is_empty() {
        "sqlite::memory:".to_string()
    } else {
        let path_obj = Path::new(&db_path);
        let mut full_path = path_obj.to_path_buf();
        if full_path.is_relative() {
            full_path = std::env::current_dir()?.join(full_path);
        }

        // Ensure parent directory and file exist before sqlx opens the pool
        if let Some(parent) = full_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        if !full_path.exists() {
            std::fs::File::create(&full_path)?;
        }

        db_path = full_path.to_string_lossy().to_string();
        format!("sqlite://{}", db_path)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    let store = SqliteLoanStore::new(pool);
    store.migrate().await?;
    Ok(Arc::new(store))
}
