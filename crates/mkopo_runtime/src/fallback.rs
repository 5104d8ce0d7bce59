use crate::datastore::LoanStore;
use crate::errors::StoreError;
use std::future::Future;
use std::time::Duration;

/// Default budget for one store round trip before the substitute dataset is
/// served instead.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug)]
pub enum FallbackReason {
    TimedOut(Duration),
    Failed(StoreError),
}

#[derive(Debug)]
pub enum DataSource {
    Live,
    Substitute(FallbackReason),
}

/// A value plus where it came from. The HTTP layer always answers 200, but
/// callers and tests can still tell live data from the substitute.
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Fetched<T> {
    pub fn live(value: T) -> Self {
        Self {
            value,
            source: DataSource::Live,
        }
    }

    pub fn substitute(value: T, reason: FallbackReason) -> Self {
        Self {
            value,
            source: DataSource::Substitute(reason),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.source, DataSource::Live)
    }
}

/// Race `operation` against a timer. If the timer fires first or the
/// operation errs, log once and hand back `fallback`; the losing future is
/// dropped, so a late result can never be applied. No retries.
pub async fn with_fallback<T, F>(
    name: &str,
    timeout: Duration,
    operation: F,
    fallback: T,
) -> Fetched<T>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Fetched::live(value),
        Ok(Err(err)) => {
            eprintln!("⚠️ {} failed, serving substitute data: {}", name, err);
            Fetched::substitute(fallback, FallbackReason::Failed(err))
        }
        Err(_) => {
            eprintln!("⚠️ {} timed out after {:?}, serving substitute data", name, timeout);
            Fetched::substitute(fallback, FallbackReason::TimedOut(timeout))
        }
    }
}

/// Liveness probe: races the store's ping against the timer.
pub async fn is_store_available(store: &dyn LoanStore, timeout: Duration) -> bool {
    matches!(tokio::time::timeout(timeout, store.ping()).await, Ok(Ok(())))
}
